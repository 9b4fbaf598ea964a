//! Context Switch Implementation
//!
//! Bookkeeping around the architecture switch: state updates and the
//! current reference are settled first, then the engine transfers control
//! as the very last step. Nothing in the manager is touched after the
//! transfer, so a switch that only returns when this context is resumed
//! later leaves no half-finished update behind.

use pcore_api::error::{invalid_argument, Result};
use pcore_api::{ProcessState, RegionAllocator};

use super::manager::ProcessManager;
use super::table::ProcessRef;
use crate::arch::ContextSwitch;

impl<A: RegionAllocator, C: ContextSwitch> ProcessManager<A, C> {
    /// Transfer the CPU from `from` to `to`
    ///
    /// # Arguments
    ///
    /// * `from` - Record giving up the CPU; `None` when nothing worth saving runs (boot)
    /// * `to` - Record to run; must be READY, or already current
    ///
    /// `from` goes back to READY only if it is still RUNNING: a BLOCKED or
    /// ZOMBIE state set by the caller beforehand is preserved. A primed NEW
    /// context and a previously saved one are loaded the same way.
    ///
    /// # Returns
    ///
    /// * `Ok(())` once the engine has switched
    /// * `Err(InvalidArgument)` for stale handles or a target that is not runnable
    pub fn context_switch(&mut self, from: Option<ProcessRef>, to: ProcessRef) -> Result<()> {
        let target = self.table.get(to).ok_or(invalid_argument("switch target does not exist"))?;
        let target_state = target.state();
        if from == Some(to) {
            if target_state != ProcessState::Running {
                self.transition(to, ProcessState::Running)?;
            }
            self.current = Some(to);
            return Ok(());
        }
        if target_state != ProcessState::Ready {
            return Err(invalid_argument("switch target is not READY"));
        }
        // Copy out: the incoming snapshot must not alias the outgoing one
        let load = *target.registers();

        if let Some(from) = from {
            let from_state = self.state_of(from).ok_or(invalid_argument("switch source does not exist"))?;
            if from_state == ProcessState::Running {
                self.transition(from, ProcessState::Ready)?;
            }
        }
        self.transition(to, ProcessState::Running)?;
        self.current = Some(to);

        let save = match from {
            Some(from) => self.table.get_mut(from).map(|record| &mut record.registers),
            None => None,
        };
        // SAFETY: `load` was primed at creation or saved by an earlier switch,
        // and its stack belongs to a record that is live and not a reaped zombie.
        unsafe { self.engine.switch(save, &load) };
        Ok(())
    }

    /// Terminate the current process
    ///
    /// Marks it ZOMBIE and yields. Its memory is released later by the
    /// reaper, once the CPU has moved off its stack.
    pub fn exit_current(&mut self) -> Result<()> {
        let current = self.current.ok_or(invalid_argument("no process is running"))?;
        if current == self.idle {
            return Err(invalid_argument("the idle process cannot exit"));
        }
        if let Some(record) = self.table.get(current) {
            log::info!("Process {} ({}) exiting", record.pid(), record.name());
        }
        self.set_state(current, ProcessState::Zombie)?;
        self.yield_current()
    }
}
