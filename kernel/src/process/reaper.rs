//! Zombie reaper

use pcore_api::RegionAllocator;

use super::manager::ProcessManager;
use super::queue::QueueKind;
use crate::arch::ContextSwitch;

impl<A: RegionAllocator, C: ContextSwitch> ProcessManager<A, C> {
    /// Reclaim every zombie the CPU is no longer running on
    ///
    /// For each reaped record the stack and heap go back to the memory
    /// collaborator exactly once and the table slot is freed; the pid is
    /// never handed out again. A zombie that is still current is skipped
    /// because its stack is in use; the next reap picks it up.
    ///
    /// # Returns
    ///
    /// Number of records reaped; 0 when the zombie queue is empty.
    pub fn reap_zombies(&mut self) -> usize {
        let zombies = QueueKind::Zombie.index();
        let mut reaped = 0;
        let mut cursor = self.queues[zombies].head();

        while let Some(index) = cursor {
            cursor = self.queues[zombies].next_of(&self.table, index);
            let Some(handle) = self.table.handle_at(index) else {
                continue;
            };
            if self.current == Some(handle) {
                continue;
            }

            self.queues[zombies].unlink(&mut self.table, index);
            if let Some(record) = self.table.remove(handle) {
                log::debug!("Reaping zombie process {}", record.pid());
                self.allocator.release(record.stack().base);
                self.allocator.release(record.heap().base);
                reaped += 1;
            }
        }
        reaped
    }
}
