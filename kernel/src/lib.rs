//! PCore Kernel Library
//!
//! Process-management core of a monolithic kernel: the process control
//! block, the ready/blocked/zombie queues, the round-robin scheduler, the
//! architecture context switch and the zombie reaper.
//!
//! # Architecture
//!
//! - **Process Management** (`process`): process records, the process table,
//!   the queue discipline, lifecycle operations and the reaper
//! - **Scheduling** (`sched`): round-robin selection and the run loop
//! - **Architecture** (`arch`): register snapshots and the context switch
//!   capability, with a bare-metal x86_64 engine and a simulated host CPU
//! - **Kernel API** (`api`): the `process_*` / `scheduler_*` entry points the
//!   rest of the kernel calls
//! - **Logging** (`log`): console backend for the `log` facade
//!
//! # Usage
//!
//! ```no_run
//! use kernel::arch::host::HostContext;
//! use kernel::process::ProcessManager;
//! use pcore_api::ProcessConfig;
//! use pcore_memory::RegionPool;
//!
//! let pool = RegionPool::new(0x10_0000, 0x100_0000, 16).unwrap();
//! let mut manager = ProcessManager::new(ProcessConfig::default(), pool, HostContext::new(), 0x1000).unwrap();
//! let worker = manager.create("worker", 1, 0x2000).unwrap();
//! assert_eq!(manager.select_next(), worker);
//! ```
//!
//! # Features
//!
//! - `baremetal`: real x86_64 context switch instead of the simulated CPU

#![no_std]

extern crate alloc;

/// Register snapshots and the context switch capability
pub mod arch;

/// Kernel-facing process and scheduler entry points
pub mod api;

/// Console logger for the `log` facade
pub mod log;

/// Process records, table, queues and lifecycle
pub mod process;

/// Round-robin scheduling
pub mod sched;

pub use pcore_api::{Error, Pid, Priority, ProcessConfig, ProcessState, Result};
pub use process::{ProcessManager, ProcessRef};
