//! x86_64 context switch
//!
//! Bare-metal engine. The register snapshot layout used by the assembly:
//!
//! | offset | slot | register |
//! |--------|------|----------|
//! | 0x00   | 0    | rip (resume point) |
//! | 0x08   | 1    | rsp |
//! | 0x10   | 2    | rflags |
//! | 0x18   | 3    | rbx |
//! | 0x20   | 4    | rbp |
//! | 0x28   | 5    | r12 |
//! | 0x30   | 6    | r13 |
//! | 0x38   | 7    | r14 |
//! | 0x40   | 8    | r15 |
//!
//! Only callee-saved registers are kept; the caller of `switch` already
//! treats everything else as clobbered.

use core::arch::{asm, naked_asm};
use core::ptr;

use pcore_api::{Address, Region};

use super::{ContextSwitch, CpuFlags, InitialFrame, RegisterFile};

/// Real x86_64 CPU
#[derive(Debug, Default)]
pub struct X86_64Context;

impl X86_64Context {
    pub const fn new() -> Self {
        Self
    }
}

impl ContextSwitch for X86_64Context {
    unsafe fn prime(&mut self, regs: &mut RegisterFile, entry: Address, stack: Region) {
        let frame = InitialFrame::for_stack(stack);
        // SAFETY: the caller guarantees the stack is owned by this process and
        // large enough; both slots lie inside it.
        unsafe {
            (frame.return_slot as *mut usize).write(self.exit_trampoline());
            (frame.flags_slot as *mut usize).write(CpuFlags::DEFAULT.bits());
        }

        regs.set_ip(entry);
        regs.set_sp(frame.sp);
        regs.set_flags(CpuFlags::DEFAULT);
    }

    unsafe fn switch(&mut self, save: Option<&mut RegisterFile>, load: &RegisterFile) {
        let save = save.map_or(ptr::null_mut(), |regs| regs as *mut RegisterFile);
        // SAFETY: forwarded from the caller's contract.
        unsafe { switch_registers(save, load) }
    }

    fn exit_trampoline(&self) -> Address {
        exit_trampoline as *const () as usize
    }
}

/// Save the current context into `save` (skipped when null) and resume `load`
///
/// Flags are pushed on the outgoing stack and interrupts masked before
/// anything is saved. The incoming flags are popped from the incoming stack
/// right before the jump, so a primed context starts with 0x202 and a resumed
/// one gets back exactly the flags it switched away with.
#[unsafe(naked)]
unsafe extern "C" fn switch_registers(save: *mut RegisterFile, load: *const RegisterFile) {
    naked_asm!(
        "pushfq",
        "cli",
        "test rdi, rdi",
        "jz 2f",
        "mov [rdi + 0x18], rbx",
        "mov [rdi + 0x20], rbp",
        "mov [rdi + 0x28], r12",
        "mov [rdi + 0x30], r13",
        "mov [rdi + 0x38], r14",
        "mov [rdi + 0x40], r15",
        "mov [rdi + 0x08], rsp",
        "mov rax, [rsp]",
        "mov [rdi + 0x10], rax",
        "lea rax, [rip + 3f]",
        "mov [rdi], rax",
        "2:",
        "mov rbx, [rsi + 0x18]",
        "mov rbp, [rsi + 0x20]",
        "mov r12, [rsi + 0x28]",
        "mov r13, [rsi + 0x30]",
        "mov r14, [rsi + 0x38]",
        "mov r15, [rsi + 0x40]",
        "mov rax, [rsi]",
        "mov rsp, [rsi + 0x08]",
        "popfq",
        "jmp rax",
        "3:",
        "ret",
    );
}

/// Landing pad for entry points that return
///
/// Entered by `ret`, so the stack is one word off the ABI alignment; it is
/// realigned before calling into the exit path, which never comes back.
#[unsafe(naked)]
pub unsafe extern "C" fn exit_trampoline() -> ! {
    naked_asm!(
        "and rsp, -16",
        "call {handler}",
        "ud2",
        handler = sym crate::api::process_exit_handler,
    );
}

/// Disable interrupts and return previous state
#[inline]
pub fn intr_off() -> bool {
    let flags: u64;
    unsafe {
        asm!("pushfq; pop {}; cli", out(reg) flags);
    }
    (flags & CpuFlags::INTERRUPT_ENABLE.bits() as u64) != 0
}

/// Enable interrupts
#[inline]
pub fn intr_on() {
    unsafe {
        asm!("sti", options(nomem, nostack));
    }
}

/// Halt until the next interrupt
#[inline]
pub fn halt() {
    unsafe {
        asm!("hlt", options(nomem, nostack));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_trampoline_address() {
        let engine = X86_64Context::new();
        assert_ne!(engine.exit_trampoline(), 0);
        assert_eq!(engine.exit_trampoline(), exit_trampoline as *const () as usize);
    }
}
