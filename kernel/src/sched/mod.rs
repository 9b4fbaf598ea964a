//! Round-robin scheduler
//!
//! Selection walks the ready queue from the successor of the last
//! dispatched record, wrapping at the tail, and falls back to the idle
//! process when nothing is ready.
//!
//! Dispatch takes the chosen record off the ready queue and a yield puts it
//! back at the head, so queue positions shift between selections. Each
//! record is therefore stamped with the rotation it was last dispatched in,
//! and the walk prefers records not yet served in the current rotation.
//! Only once every READY record has had its turn does a new rotation start.
//! With a stable queue the order is exactly the plain cursor walk.

use pcore_api::error::{invalid_argument, Result};
use pcore_api::{ProcessState, RegionAllocator};

use crate::arch::{self, ContextSwitch};
use crate::process::queue::QueueKind;
use crate::process::{ProcessManager, ProcessRef};

/// Round-robin state carried across selections
#[derive(Debug, Clone)]
pub struct RoundRobin {
    /// Last dispatched ready record
    cursor: Option<ProcessRef>,
    rotation: u64,
    /// Iterations since the last reap
    ticks: u32,
}

impl RoundRobin {
    pub const fn new() -> Self {
        Self { cursor: None, rotation: 1, ticks: 0 }
    }

    pub fn cursor(&self) -> Option<ProcessRef> {
        self.cursor
    }

    pub fn rotation(&self) -> u64 {
        self.rotation
    }
}

impl Default for RoundRobin {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: RegionAllocator, C: ContextSwitch> ProcessManager<A, C> {
    /// Pick the next record to run
    ///
    /// Returns idle when the ready queue is empty. Never dequeues anything;
    /// dispatch is left to [`context_switch`](ProcessManager::context_switch).
    pub fn select_next(&mut self) -> ProcessRef {
        let ready = &self.queues[QueueKind::Ready.index()];
        let Some(head) = ready.head() else {
            return self.idle;
        };

        // A cursor that left the ready queue (dispatched, blocked, reaped) restarts at the head
        let start = self
            .scheduler
            .cursor
            .filter(|cursor| self.table.get(*cursor).is_some_and(|record| record.queue() == Some(QueueKind::Ready)))
            .map_or(head, |cursor| cursor.index());

        let rotation = self.scheduler.rotation;
        let mut first_ready = None;
        let mut chosen = None;
        let mut index = start;
        for _ in 0..ready.len() {
            index = ready.next_of(&self.table, index).unwrap_or(head);
            let Some(record) = self.table.record_at(index) else {
                continue;
            };
            if record.state() != ProcessState::Ready {
                continue;
            }
            if first_ready.is_none() {
                first_ready = Some(index);
            }
            if record.rotation < rotation {
                chosen = Some(index);
                break;
            }
        }

        let index = match (chosen, first_ready) {
            (Some(index), _) => index,
            (None, Some(index)) => {
                // Everyone ready has been served: start the next rotation
                self.scheduler.rotation += 1;
                index
            }
            (None, None) => return self.idle,
        };

        let Some(handle) = self.table.handle_at(index) else {
            return self.idle;
        };
        let rotation = self.scheduler.rotation;
        if let Some(record) = self.table.get_mut(handle) {
            record.rotation = rotation;
        }
        self.scheduler.cursor = Some(handle);
        handle
    }

    /// One scheduler iteration: select, switch if needed, periodic reap
    ///
    /// # Returns
    ///
    /// The record that owns the CPU afterwards.
    pub fn run_once(&mut self) -> Result<ProcessRef> {
        let next = self.select_next();
        if self.current != Some(next) {
            self.context_switch(self.current, next)?;
        } else if self.state_of(next) != Some(ProcessState::Running) {
            self.transition(next, ProcessState::Running)?;
        }

        self.scheduler.ticks += 1;
        if self.scheduler.ticks >= self.config.reap_interval {
            self.scheduler.ticks = 0;
            self.reap_zombies();
        }
        Ok(next)
    }

    /// Run the scheduler forever
    pub fn run_loop(&mut self) -> ! {
        loop {
            if let Err(err) = self.run_once() {
                log::error!("scheduler: {}", err);
                arch::wait_for_interrupt();
            }
        }
    }

    /// Give up the CPU voluntarily
    ///
    /// The current record goes back to READY if it is still RUNNING; a
    /// record that already marked itself BLOCKED or ZOMBIE keeps that state.
    pub fn yield_current(&mut self) -> Result<()> {
        if let Some(current) = self.current {
            if self.state_of(current) == Some(ProcessState::Running) {
                self.set_state(current, ProcessState::Ready)?;
            }
        }
        self.run_once().map(|_| ())
    }

    /// Block the current record until [`unblock`](ProcessManager::unblock) is called for it
    pub fn block_current(&mut self) -> Result<()> {
        let current = self.current.ok_or(invalid_argument("no process is running"))?;
        if current == self.idle {
            return Err(invalid_argument("the idle process cannot block"));
        }
        self.set_state(current, ProcessState::Blocked)?;
        self.yield_current()
    }

    /// Make a BLOCKED record runnable again (event satisfied)
    pub fn unblock(&mut self, handle: ProcessRef) -> Result<()> {
        match self.state_of(handle) {
            Some(ProcessState::Blocked) => self.set_state(handle, ProcessState::Ready),
            Some(_) => Err(invalid_argument("process is not BLOCKED")),
            None => Err(invalid_argument("no such process")),
        }
    }
}
