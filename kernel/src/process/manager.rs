//! Process lifecycle manager
//!
//! [`ProcessManager`] is the scheduler context: it owns the process table,
//! the three queues, the current and idle references, the pid counter, the
//! memory collaborator and the context switch engine. Every process and
//! scheduler operation is a method on it; nothing here is global.

use alloc::vec::Vec;

use pcore_api::error::{invalid_argument, not_implemented, Error, Result};
use pcore_api::{Address, Pid, Priority, ProcessConfig, ProcessState, Region, RegionAllocator, RegionKind};

use super::queue::{Links, ProcessQueue, QueueKind};
use super::record::{ProcessRecord, ProcessSummary};
use super::table::{ProcessRef, ProcessTable};
use crate::arch::ContextSwitch;
use crate::sched::RoundRobin;

/// Name the idle process is created with
pub const IDLE_PROCESS_NAME: &str = "idle";

// ============================================================================
// Process Manager
// ============================================================================

/// Scheduler context owning every process record
pub struct ProcessManager<A: RegionAllocator, C: ContextSwitch> {
    pub(crate) config: ProcessConfig,
    pub(crate) table: ProcessTable,
    pub(crate) queues: [ProcessQueue; 3],
    /// The RUNNING record, if anything has been dispatched yet
    pub(crate) current: Option<ProcessRef>,
    pub(crate) idle: ProcessRef,
    next_pid: Pid,
    pub(crate) scheduler: RoundRobin,
    pub(crate) allocator: A,
    pub(crate) engine: C,
}

impl<A: RegionAllocator, C: ContextSwitch> ProcessManager<A, C> {
    /// Build a manager and its idle process
    ///
    /// # Arguments
    ///
    /// * `config` - Table capacity and region sizes
    /// * `allocator` - Memory collaborator stacks and heaps are drawn from
    /// * `engine` - Context switch implementation for this target
    /// * `idle_entry` - Entry point of the idle process
    ///
    /// # Returns
    ///
    /// The manager with the idle process parked in READY, or the error that
    /// prevented the idle process from being created.
    pub fn new(config: ProcessConfig, allocator: A, engine: C, idle_entry: Address) -> Result<Self> {
        config.validate()?;

        let mut manager = Self {
            config,
            table: ProcessTable::with_capacity(config.max_processes),
            queues: QueueKind::ALL.map(ProcessQueue::new),
            current: None,
            // Replaced below; a fresh table hands out slot 0, generation 0 first
            idle: ProcessRef::new(0, 0),
            next_pid: 1,
            scheduler: RoundRobin::new(),
            allocator,
            engine,
        };

        let idle = manager.spawn(IDLE_PROCESS_NAME, 0, idle_entry)?;
        manager.idle = idle;
        // Idle is never queued; READY here only means "parked"
        if let Some(record) = manager.table.get_mut(idle) {
            record.state = ProcessState::Ready;
        }
        Ok(manager)
    }

    /// Create a process and put it on the ready queue
    ///
    /// Stack and heap are allocated in that order; if the heap cannot be
    /// allocated the stack is released again before the error is returned,
    /// so a failed creation leaves nothing behind and consumes no pid.
    pub fn create(&mut self, name: &str, priority: Priority, entry_point: Address) -> Result<ProcessRef> {
        let handle = self.spawn(name, priority, entry_point)?;
        let rotation = self.scheduler.rotation();
        if let Some(record) = self.table.get_mut(handle) {
            // Joins the scheduler in the next rotation
            record.rotation = rotation;
        }
        self.transition(handle, ProcessState::Ready)?;
        Ok(handle)
    }

    /// Allocate, prime and insert a NEW record
    fn spawn(&mut self, name: &str, priority: Priority, entry_point: Address) -> Result<ProcessRef> {
        if self.table.is_full() {
            log::warn!("Cannot create process {}: process table full", name);
            return Err(Error::TableFull);
        }
        let pid = self.next_pid;
        let next_pid = pid.checked_add(1).ok_or(invalid_argument("pid space exhausted"))?;

        let stack = self.allocate_region(name, RegionKind::Stack, self.config.stack_size)?;
        let heap = match self.allocate_region(name, RegionKind::Heap, self.config.heap_size) {
            Ok(heap) => heap,
            Err(err) => {
                self.allocator.release(stack.base);
                return Err(err);
            }
        };

        let mut record = ProcessRecord::new(pid, name, priority, entry_point, stack, heap);
        // SAFETY: the stack was just allocated for this record and nothing else references it.
        unsafe { self.engine.prime(&mut record.registers, entry_point, stack) };

        let Some(handle) = self.table.insert(record) else {
            self.allocator.release(heap.base);
            self.allocator.release(stack.base);
            return Err(Error::TableFull);
        };
        self.next_pid = next_pid;

        if let Some(record) = self.table.get(handle) {
            log::info!("Created process: {} (PID: {})", record.name(), pid);
        }
        Ok(handle)
    }

    fn allocate_region(&mut self, name: &str, kind: RegionKind, size: usize) -> Result<Region> {
        self.allocator.allocate_region(size).ok_or_else(|| {
            log::warn!("Cannot create process {}: {} allocation of {} bytes failed", name, kind, size);
            Error::AllocationFailed(kind)
        })
    }

    /// Change the state of `handle`, keeping queue membership in step
    ///
    /// This is the only sanctioned way to change a record's state.
    ///
    /// # Errors
    ///
    /// * `InvalidArgument` - absent or stale handle, a return to NEW, RUNNING
    ///   for anything but the current record, idle leaving READY/RUNNING, or
    ///   a ZOMBIE leaving ZOMBIE (only the reaper retires it)
    /// * `NotImplemented` - SUSPENDED and DEAD have no transitions in this core
    pub fn set_state(&mut self, handle: ProcessRef, state: ProcessState) -> Result<()> {
        let Some(record) = self.table.get(handle) else {
            return Err(invalid_argument("no such process"));
        };
        let old_state = record.state;
        match state {
            ProcessState::Suspended => return Err(not_implemented("SUSPENDED transitions")),
            ProcessState::Dead => return Err(not_implemented("DEAD transitions")),
            ProcessState::New => return Err(invalid_argument("a process cannot return to NEW")),
            ProcessState::Running if self.current != Some(handle) => {
                return Err(invalid_argument("only the dispatcher makes a process RUNNING"));
            }
            _ => {}
        }
        if old_state == ProcessState::Zombie && state != ProcessState::Zombie {
            return Err(invalid_argument("a ZOMBIE process can only be reaped"));
        }
        self.transition(handle, state)
    }

    /// Move `handle` to `state`: unlink from the old queue, link into the new one
    pub(crate) fn transition(&mut self, handle: ProcessRef, state: ProcessState) -> Result<()> {
        let record = self.table.get(handle).ok_or(invalid_argument("no such process"))?;
        let (pid, old_state, old_queue) = (record.pid, record.state, record.link.queue);

        if handle == self.idle {
            if !matches!(state, ProcessState::Ready | ProcessState::Running) {
                return Err(invalid_argument("the idle process must stay runnable"));
            }
        } else {
            if let Some(queue) = old_queue {
                self.queues[queue.index()].unlink(&mut self.table, handle.index());
            }
            if let Some(queue) = QueueKind::for_state(state) {
                self.queues[queue.index()].push_front(&mut self.table, handle.index());
            }
        }

        if let Some(record) = self.table.get_mut(handle) {
            record.state = state;
        }
        log::debug!("Process {}: {} -> {}", pid, old_state, state);
        Ok(())
    }

    /// First record named `name`, in table order
    pub fn find_by_name(&self, name: &str) -> Option<ProcessRef> {
        self.table.find_by_name(name)
    }

    /// Record with pid `pid`
    pub fn find_by_pid(&self, pid: Pid) -> Option<ProcessRef> {
        self.table.find_by_pid(pid)
    }

    /// Look up a record; `None` for stale handles
    pub fn get(&self, handle: ProcessRef) -> Option<&ProcessRecord> {
        self.table.get(handle)
    }

    /// State of `handle`, if it still exists
    pub fn state_of(&self, handle: ProcessRef) -> Option<ProcessState> {
        self.table.get(handle).map(ProcessRecord::state)
    }

    /// The RUNNING record
    pub fn current(&self) -> Option<ProcessRef> {
        self.current
    }

    /// The idle process
    pub fn idle(&self) -> ProcessRef {
        self.idle
    }

    /// Number of live records, idle included
    pub fn process_count(&self) -> usize {
        self.table.len()
    }

    pub fn config(&self) -> &ProcessConfig {
        &self.config
    }

    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    pub fn allocator_mut(&mut self) -> &mut A {
        &mut self.allocator
    }

    pub fn engine(&self) -> &C {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut C {
        &mut self.engine
    }

    /// Members of `queue`, head first
    pub fn queue_members(&self, queue: QueueKind) -> Vec<ProcessRef> {
        self.queues[queue.index()]
            .iter(&self.table)
            .filter_map(|index| self.table.handle_at(index))
            .collect()
    }

    pub fn queue_len(&self, queue: QueueKind) -> usize {
        self.queues[queue.index()].len()
    }

    /// Check the state/queue invariant for every live record
    ///
    /// Each non-idle record must be on exactly the queue its state maps to,
    /// each queue's links must be consistent, and at most one record may be
    /// RUNNING, namely `current`.
    pub fn check_consistency(&self) -> Result<()> {
        for queue in &self.queues {
            let mut prev = None;
            let mut count = 0;
            for index in queue.iter(&self.table) {
                let link = self.table.link(index);
                if link.prev != prev {
                    return Err(invalid_argument("queue back link is broken"));
                }
                prev = Some(index);
                count += 1;
                if count > self.table.capacity() {
                    return Err(invalid_argument("queue contains a cycle"));
                }
            }
            if count != queue.len() {
                return Err(invalid_argument("queue length is out of date"));
            }
        }

        let mut running = 0;
        for (handle, record) in self.table.iter() {
            if record.state == ProcessState::Running {
                running += 1;
                if self.current != Some(handle) {
                    return Err(invalid_argument("RUNNING record is not current"));
                }
            }
            let expected = if handle == self.idle { None } else { QueueKind::for_state(record.state) };
            if record.link.queue != expected {
                return Err(invalid_argument("queue membership does not match state"));
            }
        }
        if running > 1 {
            return Err(invalid_argument("more than one RUNNING record"));
        }
        Ok(())
    }

    /// Summaries of every occupied slot, also dumped to the log
    pub fn list_all(&self) -> Vec<ProcessSummary> {
        let summaries: Vec<ProcessSummary> = self.table.iter().map(|(_, record)| record.summary()).collect();

        log::info!("=== Processes ({}) ===", summaries.len());
        log::info!("PID   State     Pri Name");
        for summary in &summaries {
            log::info!("{:<5} {:<9} {:<3} {}", summary.pid, summary.state, summary.priority, summary.name);
        }
        summaries
    }
}
