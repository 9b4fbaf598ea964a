//! Kernel process API
//!
//! The `process_*` and `scheduler_*` entry points the rest of the kernel
//! calls. They forward to the one [`ProcessManager`] installed by
//! [`process_manager_init`].
//!
//! The kernel core runs on a single logical CPU and is never re-entered
//! while one of these calls is in progress; each call masks interrupts for
//! its duration. That is what makes the unsynchronized cell below sound, and
//! it is also why no lock is held across a context switch: the switched-to
//! context resumes inside its own call into this module.

use alloc::vec::Vec;
use core::cell::UnsafeCell;

use pcore_api::error::{invalid_argument, Result};
use pcore_api::{Address, Pid, Priority, ProcessConfig, ProcessState};
use pcore_memory::MemoryBackends;

use crate::arch::{self, ArchContext};
use crate::process::{ProcessManager, ProcessRef, ProcessSummary};

/// Manager type used by the kernel
pub type KernelProcessManager = ProcessManager<MemoryBackends, ArchContext>;

struct KernelCell(UnsafeCell<Option<KernelProcessManager>>);

// SAFETY: single logical CPU; every access goes through `with_manager`,
// which runs with interrupts masked and is never re-entered.
unsafe impl Sync for KernelCell {}

static MANAGER: KernelCell = KernelCell(UnsafeCell::new(None));

fn with_manager<R>(f: impl FnOnce(&mut KernelProcessManager) -> R) -> Option<R> {
    arch::without_interrupts(|| {
        // SAFETY: see `KernelCell`; no other reference to the manager is live.
        let slot = unsafe { &mut *MANAGER.0.get() };
        slot.as_mut().map(f)
    })
}

fn not_initialized() -> pcore_api::Error {
    invalid_argument("process manager not initialized")
}

/// Build the process manager and its idle process
///
/// # Panics
///
/// Failure to create the idle process is fatal: the scheduler has nothing
/// to fall back to without it.
pub fn process_manager_init(config: ProcessConfig, allocator: MemoryBackends, engine: ArchContext, idle_entry: Address) {
    let manager = match ProcessManager::new(config, allocator, engine, idle_entry) {
        Ok(manager) => manager,
        Err(err) => {
            log::error!("Failed to create idle process: {}", err);
            panic!("Failed to create idle process");
        }
    };

    arch::without_interrupts(|| {
        // SAFETY: see `KernelCell`.
        let slot = unsafe { &mut *MANAGER.0.get() };
        if slot.is_some() {
            log::warn!("Process manager re-initialized; previous table dropped");
        }
        *slot = Some(manager);
    });
    log::info!("Process manager initialized");
}

/// Check whether [`process_manager_init`] has run
pub fn process_manager_initialized() -> bool {
    with_manager(|_| ()).is_some()
}

/// Create a process and make it READY
pub fn process_create(name: &str, priority: Priority, entry_point: Address) -> Result<ProcessRef> {
    with_manager(|manager| manager.create(name, priority, entry_point)).unwrap_or_else(|| Err(not_initialized()))
}

/// Change the state of a process
pub fn process_set_state(process: ProcessRef, state: ProcessState) -> Result<()> {
    with_manager(|manager| manager.set_state(process, state)).unwrap_or_else(|| Err(not_initialized()))
}

/// First process named `name`
pub fn process_find(name: &str) -> Option<ProcessRef> {
    with_manager(|manager| manager.find_by_name(name)).flatten()
}

/// Process with pid `pid`
pub fn process_find_by_pid(pid: Pid) -> Option<ProcessRef> {
    with_manager(|manager| manager.find_by_pid(pid)).flatten()
}

/// Summary of one process
pub fn process_info(process: ProcessRef) -> Option<ProcessSummary> {
    with_manager(|manager| manager.get(process).map(|record| record.summary())).flatten()
}

/// The running process
pub fn process_current() -> Option<ProcessRef> {
    with_manager(|manager| manager.current()).flatten()
}

/// Diagnostic dump of every process table slot
pub fn process_list_all() -> Vec<ProcessSummary> {
    with_manager(|manager| manager.list_all()).unwrap_or_default()
}

/// Reclaim exited processes
pub fn process_reap_zombies() -> usize {
    with_manager(|manager| manager.reap_zombies()).unwrap_or(0)
}

/// Terminate the running process
pub fn process_exit() -> Result<()> {
    with_manager(|manager| manager.exit_current()).unwrap_or_else(|| Err(not_initialized()))
}

/// Give up the CPU
pub fn scheduler_yield() -> Result<()> {
    with_manager(|manager| manager.yield_current()).unwrap_or_else(|| Err(not_initialized()))
}

/// Block the running process
pub fn scheduler_block() -> Result<()> {
    with_manager(|manager| manager.block_current()).unwrap_or_else(|| Err(not_initialized()))
}

/// Wake a blocked process
pub fn scheduler_unblock(process: ProcessRef) -> Result<()> {
    with_manager(|manager| manager.unblock(process)).unwrap_or_else(|| Err(not_initialized()))
}

/// Scheduler main loop; never returns
pub fn scheduler_run_loop() -> ! {
    loop {
        match with_manager(|manager| manager.run_once()) {
            Some(Ok(_)) => {}
            Some(Err(err)) => {
                log::error!("scheduler: {}", err);
                arch::wait_for_interrupt();
            }
            None => {
                log::error!("scheduler: process manager not initialized");
                arch::wait_for_interrupt();
            }
        }
    }
}

/// Exit path of every process
///
/// Reached through the exit trampoline when an entry point returns.
/// Marks the caller ZOMBIE and yields; if the scheduler ever resumes it
/// anyway, the CPU is parked here.
pub extern "C" fn process_exit_handler() -> ! {
    if let Err(err) = process_exit() {
        log::error!("process exit failed: {}", err);
    }
    loop {
        arch::wait_for_interrupt();
    }
}

/// Body of the idle process
pub extern "C" fn idle_main() -> ! {
    loop {
        process_reap_zombies();
        if let Err(err) = scheduler_yield() {
            log::error!("idle: {}", err);
        }
        arch::wait_for_interrupt();
    }
}
