//! Process table
//!
//! Fixed-capacity arena of process records. A record is addressed by a
//! [`ProcessRef`]: its slot index plus the slot's generation at insertion
//! time. Freeing a slot bumps the generation, so references to a reaped
//! record stop resolving even after the slot is reused.

use alloc::vec::Vec;
use hashbrown::HashMap;

use pcore_api::Pid;

use super::queue::{Links, QueueLink};
use super::record::ProcessRecord;

/// Stable handle to a process record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessRef {
    index: usize,
    generation: u32,
}

impl ProcessRef {
    pub(crate) const fn new(index: usize, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Table slot the record lives in
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    record: Option<ProcessRecord>,
}

/// Process table with O(1) average-case PID lookup
#[derive(Debug)]
pub struct ProcessTable {
    /// Allocated once at full capacity; never grows, so slot addresses are stable
    slots: Vec<Slot>,
    pid_index: HashMap<Pid, usize>,
    live: usize,
}

impl ProcessTable {
    pub fn with_capacity(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || Slot { generation: 0, record: None });
        let mut pid_index = HashMap::new();
        pid_index.reserve(capacity);
        Self { slots, pid_index, live: 0 }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of live records
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn is_full(&self) -> bool {
        self.live == self.slots.len()
    }

    /// Store `record` in the first free slot
    pub fn insert(&mut self, record: ProcessRecord) -> Option<ProcessRef> {
        let index = self.slots.iter().position(|slot| slot.record.is_none())?;
        let slot = &mut self.slots[index];
        self.pid_index.insert(record.pid, index);
        slot.record = Some(record);
        self.live += 1;
        Some(ProcessRef::new(index, slot.generation))
    }

    /// Take the record out and retire the handle
    pub fn remove(&mut self, handle: ProcessRef) -> Option<ProcessRecord> {
        let slot = self.slots.get_mut(handle.index)?;
        if slot.generation != handle.generation {
            return None;
        }
        let record = slot.record.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.pid_index.remove(&record.pid);
        self.live -= 1;
        Some(record)
    }

    pub fn get(&self, handle: ProcessRef) -> Option<&ProcessRecord> {
        let slot = self.slots.get(handle.index)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.record.as_ref()
    }

    pub fn get_mut(&mut self, handle: ProcessRef) -> Option<&mut ProcessRecord> {
        let slot = self.slots.get_mut(handle.index)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.record.as_mut()
    }

    /// Current handle of an occupied slot
    pub fn handle_at(&self, index: usize) -> Option<ProcessRef> {
        let slot = self.slots.get(index)?;
        slot.record.as_ref().map(|_| ProcessRef::new(index, slot.generation))
    }

    /// Record in slot `index`, whatever its generation
    pub fn record_at(&self, index: usize) -> Option<&ProcessRecord> {
        self.slots.get(index)?.record.as_ref()
    }

    pub fn record_at_mut(&mut self, index: usize) -> Option<&mut ProcessRecord> {
        self.slots.get_mut(index)?.record.as_mut()
    }

    /// Find process by PID
    pub fn find_by_pid(&self, pid: Pid) -> Option<ProcessRef> {
        let index = *self.pid_index.get(&pid)?;
        self.handle_at(index)
    }

    /// First record in slot order carrying `name`
    pub fn find_by_name(&self, name: &str) -> Option<ProcessRef> {
        self.iter().find(|(_, record)| record.name() == name).map(|(handle, _)| handle)
    }

    /// Occupied slots in slot order
    pub fn iter(&self) -> impl Iterator<Item = (ProcessRef, &ProcessRecord)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.record
                .as_ref()
                .map(|record| (ProcessRef::new(index, slot.generation), record))
        })
    }
}

impl Links for ProcessTable {
    fn link(&self, index: usize) -> QueueLink {
        self.record_at(index).map(|record| record.link).unwrap_or_default()
    }

    fn set_link(&mut self, index: usize, link: QueueLink) {
        if let Some(record) = self.record_at_mut(index) {
            record.link = link;
        }
    }
}
