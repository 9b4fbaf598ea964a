//! Simulated CPU for hosted builds
//!
//! Implements [`ContextSwitch`] without touching real registers or memory.
//! Primed stack words are recorded in a map and every transfer of control is
//! logged, so tests can check exactly what a real engine would have done.
//! A switch returns immediately; the "CPU" is then running the loaded context.

use alloc::vec::Vec;
use hashbrown::HashMap;

use pcore_api::{Address, Region};

use super::{ContextSwitch, CpuFlags, InitialFrame, RegisterFile, WORD};

/// Address the host engine primes as the exit trampoline
pub const HOST_EXIT_TRAMPOLINE: Address = 0x7ee7_0000;

/// Simulated single CPU
#[derive(Debug, Default)]
pub struct HostContext {
    /// Registers of whatever is "running"
    live: RegisterFile,
    /// Words written below primed stack tops
    stack_words: HashMap<Address, usize>,
    /// Instruction pointers control was transferred to, in order
    transfers: Vec<Address>,
    switches: u64,
}

impl HostContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers of the running context
    pub fn live(&self) -> &RegisterFile {
        &self.live
    }

    /// Mutable live registers, to simulate the running code changing them
    pub fn live_mut(&mut self) -> &mut RegisterFile {
        &mut self.live
    }

    /// Word written at `addr` by [`prime`](ContextSwitch::prime)
    pub fn stack_word(&self, addr: Address) -> Option<usize> {
        self.stack_words.get(&addr).copied()
    }

    /// Where the running context would land if its entry function returned now
    ///
    /// Models the restore path: the flags word at the stack pointer is
    /// popped, and the word above it is the return address.
    pub fn return_address(&self) -> Option<Address> {
        self.stack_word(self.live.sp() + WORD)
    }

    /// Instruction pointers control was transferred to, oldest first
    pub fn transfers(&self) -> &[Address] {
        &self.transfers
    }

    /// Number of completed switches
    pub fn switch_count(&self) -> u64 {
        self.switches
    }
}

impl ContextSwitch for HostContext {
    unsafe fn prime(&mut self, regs: &mut RegisterFile, entry: Address, stack: Region) {
        let frame = InitialFrame::for_stack(stack);
        self.stack_words.insert(frame.return_slot, self.exit_trampoline());
        self.stack_words.insert(frame.flags_slot, CpuFlags::DEFAULT.bits());

        regs.set_ip(entry);
        regs.set_sp(frame.sp);
        regs.set_flags(CpuFlags::DEFAULT);
    }

    unsafe fn switch(&mut self, save: Option<&mut RegisterFile>, load: &RegisterFile) {
        if let Some(save) = save {
            *save = self.live;
        }
        self.live = *load;
        self.transfers.push(load.ip());
        self.switches += 1;
    }

    fn exit_trampoline(&self) -> Address {
        HOST_EXIT_TRAMPOLINE
    }
}
