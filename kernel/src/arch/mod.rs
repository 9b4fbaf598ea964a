// Architecture abstraction layer
// Register snapshots and the context switch capability the process core is written against

use core::mem::size_of;

use bitflags::bitflags;
use pcore_api::{Address, Region};
use static_assertions::const_assert_eq;

pub mod host;

#[cfg(all(target_arch = "x86_64", feature = "baremetal"))]
pub mod x86_64;

/// Engine used by the kernel API on this build
#[cfg(all(target_arch = "x86_64", feature = "baremetal"))]
pub type ArchContext = x86_64::X86_64Context;

/// Engine used by the kernel API on this build
#[cfg(not(all(target_arch = "x86_64", feature = "baremetal")))]
pub type ArchContext = host::HostContext;

/// Machine word size in bytes
pub const WORD: usize = size_of::<usize>();

/// Number of machine words in a register snapshot
pub const REGISTER_SLOTS: usize = 16;

/// Slot holding the instruction pointer
pub const IP_SLOT: usize = 0;
/// Slot holding the stack pointer
pub const SP_SLOT: usize = 1;
/// Slot holding the flags word
pub const FLAGS_SLOT: usize = 2;
/// First slot of callee-saved / general purpose registers
pub const GPR_SLOT: usize = 3;

bitflags! {
    /// CPU flags word (x86 RFLAGS layout)
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CpuFlags: usize {
        const CARRY = 1 << 0;
        /// Always set on x86
        const RESERVED = 1 << 1;
        const ZERO = 1 << 6;
        const SIGN = 1 << 7;
        const INTERRUPT_ENABLE = 1 << 9;
        const DIRECTION = 1 << 10;
    }
}

impl CpuFlags {
    /// Flags a freshly created process starts with (0x202)
    pub const DEFAULT: CpuFlags = CpuFlags::RESERVED.union(CpuFlags::INTERRUPT_ENABLE);
}

/// Architecture register snapshot
///
/// Slot 0 is the instruction pointer, slot 1 the stack pointer and slot 2
/// the flags word. The remaining slots hold registers the engine chooses to
/// preserve across a switch. The layout is shared with assembly, so it is
/// `repr(C)` and its size is fixed.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegisterFile {
    slots: [usize; REGISTER_SLOTS],
}

const_assert_eq!(size_of::<RegisterFile>(), REGISTER_SLOTS * WORD);

impl RegisterFile {
    /// All registers zero
    pub const fn zeroed() -> Self {
        Self { slots: [0; REGISTER_SLOTS] }
    }

    pub fn ip(&self) -> Address {
        self.slots[IP_SLOT]
    }

    pub fn set_ip(&mut self, ip: Address) {
        self.slots[IP_SLOT] = ip;
    }

    pub fn sp(&self) -> Address {
        self.slots[SP_SLOT]
    }

    pub fn set_sp(&mut self, sp: Address) {
        self.slots[SP_SLOT] = sp;
    }

    pub fn flags(&self) -> CpuFlags {
        CpuFlags::from_bits_retain(self.slots[FLAGS_SLOT])
    }

    pub fn set_flags(&mut self, flags: CpuFlags) {
        self.slots[FLAGS_SLOT] = flags.bits();
    }

    /// Raw access to a slot; `None` past the end
    pub fn slot(&self, index: usize) -> Option<usize> {
        self.slots.get(index).copied()
    }

    /// Raw write to a slot; out-of-range writes are ignored
    pub fn set_slot(&mut self, index: usize, value: usize) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = value;
        }
    }

    pub fn is_zeroed(&self) -> bool {
        self.slots.iter().all(|&word| word == 0)
    }
}

/// Layout of the words primed below a new process's stack top
///
/// ```text
///   top (16-byte aligned)
///   top - 1 word : exit trampoline address   <- entry point returns here
///   top - 2 words: default flags word        <- initial stack pointer
/// ```
///
/// Restoring a context pops the flags word, which leaves the trampoline
/// address exactly where a `call` would have put a return address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitialFrame {
    /// Initial stack pointer
    pub sp: Address,
    /// Address of the exit trampoline word
    pub return_slot: Address,
    /// Address of the flags word
    pub flags_slot: Address,
}

impl InitialFrame {
    /// Compute the frame for `stack`
    pub const fn for_stack(stack: Region) -> Self {
        let top = stack.top() & !0xF;
        Self {
            sp: top - 2 * WORD,
            return_slot: top - WORD,
            flags_slot: top - 2 * WORD,
        }
    }
}

/// Context switch capability
///
/// The process core depends only on this contract, never on a register
/// layout. One implementation exists per target.
pub trait ContextSwitch {
    /// Prepare `regs` so that restoring them starts `entry` on `stack`
    ///
    /// Writes the exit trampoline address and the default flags word below
    /// the stack top (see [`InitialFrame`]) and points the instruction and
    /// stack pointers at the entry point and the primed frame.
    ///
    /// # Safety
    ///
    /// `stack` must be memory exclusively owned by the process being primed
    /// and at least [`MIN_STACK_SIZE`](pcore_api::config::MIN_STACK_SIZE) bytes long.
    unsafe fn prime(&mut self, regs: &mut RegisterFile, entry: Address, stack: Region);

    /// Save the live registers into `save` (if any), load `load` and transfer control
    ///
    /// Runs with interrupts masked from before the save until the transfer.
    /// On real hardware the call returns only when the saved context is
    /// resumed by a later switch.
    ///
    /// # Safety
    ///
    /// `load` must be a snapshot produced by [`prime`](ContextSwitch::prime)
    /// or by an earlier save, and its stack must still be owned by a live process.
    unsafe fn switch(&mut self, save: Option<&mut RegisterFile>, load: &RegisterFile);

    /// Address primed as the return address of every entry point
    fn exit_trampoline(&self) -> Address;
}

/// Run `f` with interrupts masked, restoring the previous state afterwards
#[inline]
pub fn without_interrupts<R>(f: impl FnOnce() -> R) -> R {
    #[cfg(all(target_arch = "x86_64", feature = "baremetal"))]
    {
        let enabled = x86_64::intr_off();
        let result = f();
        if enabled {
            x86_64::intr_on();
        }
        result
    }

    #[cfg(not(all(target_arch = "x86_64", feature = "baremetal")))]
    {
        f()
    }
}

/// Park the CPU until something happens
#[inline]
pub fn wait_for_interrupt() {
    #[cfg(all(target_arch = "x86_64", feature = "baremetal"))]
    x86_64::halt();

    #[cfg(not(all(target_arch = "x86_64", feature = "baremetal")))]
    core::hint::spin_loop();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_flags_word() {
        assert_eq!(CpuFlags::DEFAULT.bits(), 0x202);
        assert!(CpuFlags::DEFAULT.contains(CpuFlags::INTERRUPT_ENABLE));
    }

    #[test]
    fn test_register_accessors() {
        let mut regs = RegisterFile::zeroed();
        assert!(regs.is_zeroed());
        regs.set_ip(0x4000);
        regs.set_sp(0x8ff0);
        regs.set_flags(CpuFlags::DEFAULT);
        regs.set_slot(GPR_SLOT, 7);
        regs.set_slot(REGISTER_SLOTS, 1);

        assert_eq!(regs.ip(), 0x4000);
        assert_eq!(regs.sp(), 0x8ff0);
        assert_eq!(regs.slot(FLAGS_SLOT), Some(0x202));
        assert_eq!(regs.slot(GPR_SLOT), Some(7));
        assert_eq!(regs.slot(REGISTER_SLOTS), None);
    }

    #[test]
    fn test_initial_frame_is_aligned() {
        let frame = InitialFrame::for_stack(Region::new(0x1_0000, 0x4000));
        assert_eq!(frame.return_slot, 0x1_4000 - WORD);
        assert_eq!(frame.sp, 0x1_4000 - 2 * WORD);
        assert_eq!(frame.flags_slot, frame.sp);

        // Unaligned tops are rounded down first
        let frame = InitialFrame::for_stack(Region::new(0x1_0000, 0x4008));
        assert_eq!(frame.return_slot, 0x1_4000 - WORD);
    }
}
