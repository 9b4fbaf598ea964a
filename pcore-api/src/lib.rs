//! PCore API - Shared types and interfaces for the process core
//!
//! This crate holds everything the process core shares with its
//! collaborators: identifier and region types, the common error type,
//! the tunable process configuration and the allocation interface the
//! memory module implements.
//!
//! # Modules
//!
//! - **Types**: pids, addresses, process states and memory regions
//! - **Error**: the error kinds reported by process operations
//! - **Config**: limits and sizes used when creating processes
//! - **Memory**: the `RegionAllocator` interface consumed by the core

#![no_std]

extern crate alloc;

pub mod config;
pub mod error;
pub mod memory;
pub mod types;

pub use crate::config::ProcessConfig;
pub use crate::error::{Error, Result};
pub use crate::memory::RegionAllocator;
pub use crate::types::*;
