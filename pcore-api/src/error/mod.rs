//! Error handling module for the process core

use core::fmt;

use crate::types::RegionKind;

/// Common error type used throughout the process core
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Process creation attempted with every table slot occupied
    TableFull,
    /// Stack or heap region could not be allocated
    AllocationFailed(RegionKind),
    /// Operation on an absent record or with an unusable argument
    InvalidArgument(&'static str),
    /// Path reserved but not wired in this core
    NotImplemented(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::TableFull => write!(f, "Process table full"),
            Error::AllocationFailed(kind) => write!(f, "Allocation failed: {} region", kind),
            Error::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            Error::NotImplemented(msg) => write!(f, "Not implemented: {}", msg),
        }
    }
}

impl core::error::Error for Error {}

/// Result type for operations that can fail
pub type Result<T> = core::result::Result<T, Error>;

/// Creates a new invalid argument error
pub fn invalid_argument(msg: &'static str) -> Error {
    Error::InvalidArgument(msg)
}

/// Creates a new not implemented error
pub fn not_implemented(msg: &'static str) -> Error {
    Error::NotImplemented(msg)
}

/// Creates a new allocation failure for the given region
pub fn allocation_failed(kind: RegionKind) -> Error {
    Error::AllocationFailed(kind)
}
