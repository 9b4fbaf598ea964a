//! Context switch tests
//! Priming, save/restore through the simulated CPU, and the exit path

mod common;

use common::{entry, manager, spawn_all};
use kernel::arch::host::HOST_EXIT_TRAMPOLINE;
use kernel::arch::{ContextSwitch, CpuFlags, GPR_SLOT, REGISTER_SLOTS, WORD};
use kernel::process::QueueKind;
use pcore_api::{Error, ProcessState};

mod priming_tests {
    use super::*;

    /// A new record starts at its entry point on a primed stack
    #[test]
    fn test_new_process_context_is_primed() {
        let mut manager = manager();
        let handles = spawn_all(&mut manager, &["A"]);
        let record = manager.get(handles[0]).unwrap();
        let regs = *record.registers();

        assert_eq!(regs.ip(), entry(0));
        assert_eq!(regs.sp(), record.stack().top() - 2 * WORD);
        assert_eq!(regs.flags(), CpuFlags::DEFAULT);
        for slot in GPR_SLOT..REGISTER_SLOTS {
            assert_eq!(regs.slot(slot), Some(0));
        }

        let cpu = manager.engine();
        assert_eq!(cpu.stack_word(regs.sp()), Some(0x202));
        assert_eq!(cpu.stack_word(regs.sp() + WORD), Some(HOST_EXIT_TRAMPOLINE));
        assert_eq!(cpu.exit_trampoline(), HOST_EXIT_TRAMPOLINE);
    }

    /// First dispatch loads the primed snapshot exactly like a resume
    #[test]
    fn test_first_dispatch_loads_primed_snapshot() {
        let mut manager = manager();
        spawn_all(&mut manager, &["A"]);
        let a = manager.run_once().unwrap();

        let primed = *manager.get(a).unwrap().registers();
        assert_eq!(manager.engine().live(), &primed);
        assert_eq!(manager.engine().transfers(), &[entry(0)]);
        assert_eq!(manager.current(), Some(a));
    }
}

mod switch_tests {
    use super::*;

    /// Outgoing registers are captured and restored on the next dispatch
    #[test]
    fn test_switch_saves_and_restores_registers() {
        let mut manager = manager();
        spawn_all(&mut manager, &["A", "B"]);
        let a = manager.run_once().unwrap();
        let resume_at = entry(0) + 0x40;

        // A runs for a while
        manager.engine_mut().live_mut().set_ip(resume_at);
        manager.engine_mut().live_mut().set_slot(GPR_SLOT, 0xaa);

        manager.yield_current().unwrap();
        let saved = *manager.get(a).unwrap().registers();
        assert_eq!(saved.ip(), resume_at);
        assert_eq!(saved.slot(GPR_SLOT), Some(0xaa));
        assert_eq!(manager.state_of(a), Some(ProcessState::Ready));
        assert!(manager.queue_members(QueueKind::Ready).contains(&a));

        manager.yield_current().unwrap();
        assert_eq!(manager.current(), Some(a));
        assert_eq!(manager.engine().live().ip(), resume_at);
        assert_eq!(manager.engine().live().slot(GPR_SLOT), Some(0xaa));
        assert_eq!(manager.engine().transfers().last(), Some(&resume_at));
    }

    /// A RUNNING source goes back to READY; the target becomes RUNNING and current
    #[test]
    fn test_switch_updates_states_and_current() {
        let mut manager = manager();
        let handles = spawn_all(&mut manager, &["A", "B"]);
        let first = manager.run_once().unwrap();
        let other = if first == handles[0] { handles[1] } else { handles[0] };

        manager.context_switch(Some(first), other).unwrap();
        assert_eq!(manager.state_of(first), Some(ProcessState::Ready));
        assert_eq!(manager.state_of(other), Some(ProcessState::Running));
        assert_eq!(manager.current(), Some(other));
        assert_eq!(manager.get(other).unwrap().queue(), None);
        assert!(manager.check_consistency().is_ok());
    }

    /// States set by the caller before the switch are left alone
    #[test]
    fn test_switch_preserves_blocked_and_zombie() {
        let mut manager = manager();
        let handles = spawn_all(&mut manager, &["A", "B", "C"]);
        let first = manager.run_once().unwrap();
        let mut others = handles.iter().copied().filter(|&h| h != first);
        let (second, third) = (others.next().unwrap(), others.next().unwrap());

        manager.set_state(first, ProcessState::Blocked).unwrap();
        manager.context_switch(Some(first), second).unwrap();
        assert_eq!(manager.state_of(first), Some(ProcessState::Blocked));
        assert_eq!(manager.queue_members(QueueKind::Blocked), [first]);

        manager.set_state(second, ProcessState::Zombie).unwrap();
        manager.context_switch(Some(second), third).unwrap();
        assert_eq!(manager.state_of(second), Some(ProcessState::Zombie));
        assert_eq!(manager.queue_members(QueueKind::Zombie), [second]);
        assert_eq!(manager.current(), Some(third));
        assert!(manager.check_consistency().is_ok());
    }

    /// Only READY records can be switched to
    #[test]
    fn test_switch_to_blocked_is_rejected() {
        let mut manager = manager();
        let handles = spawn_all(&mut manager, &["A"]);
        manager.set_state(handles[0], ProcessState::Blocked).unwrap();

        assert!(matches!(manager.context_switch(None, handles[0]), Err(Error::InvalidArgument(_))));
        assert_eq!(manager.current(), None);
        assert_eq!(manager.engine().switch_count(), 0);
    }
}

mod exit_path_tests {
    use super::*;

    /// Returning from the entry point lands in the exit trampoline, which retires the process
    #[test]
    fn test_exit_through_trampoline() {
        let mut manager = manager();
        let handles = spawn_all(&mut manager, &["A", "B"]);
        let a = manager.run_once().unwrap();
        assert_eq!(a, handles[0]);
        let (pid, stack, heap) = {
            let record = manager.get(a).unwrap();
            (record.pid(), record.stack().base, record.heap().base)
        };

        // The word the entry function would return into
        assert_eq!(manager.engine().return_address(), Some(HOST_EXIT_TRAMPOLINE));

        // What the trampoline's handler does
        manager.exit_current().unwrap();

        assert_eq!(manager.current(), Some(handles[1]));
        assert_eq!(manager.find_by_pid(pid), None);
        assert_eq!(manager.allocator().release_count(stack), 1);
        assert_eq!(manager.allocator().release_count(heap), 1);
        assert_eq!(manager.queue_len(QueueKind::Zombie), 0);
        assert_eq!(manager.engine().transfers(), &[entry(0), entry(1)]);
    }

    /// A zombie is not reaped while the CPU still runs on its stack
    #[test]
    fn test_current_zombie_waits_for_switch() {
        let mut manager = manager();
        spawn_all(&mut manager, &["A", "B"]);
        let first = manager.run_once().unwrap();

        manager.set_state(first, ProcessState::Zombie).unwrap();
        assert_eq!(manager.reap_zombies(), 0);
        assert_eq!(manager.state_of(first), Some(ProcessState::Zombie));

        manager.yield_current().unwrap();
        assert_ne!(manager.current(), Some(first));
        assert_eq!(manager.state_of(first), None);
    }

    /// Idle can neither exit nor block
    #[test]
    fn test_idle_cannot_exit() {
        let mut manager = manager();
        assert_eq!(manager.run_once().unwrap(), manager.idle());
        assert!(matches!(manager.exit_current(), Err(Error::InvalidArgument(_))));
        assert!(matches!(manager.block_current(), Err(Error::InvalidArgument(_))));
        assert_eq!(manager.state_of(manager.idle()), Some(ProcessState::Running));
    }

    /// The last process exiting leaves idle running
    #[test]
    fn test_last_exit_falls_back_to_idle() {
        let mut manager = manager();
        spawn_all(&mut manager, &["A"]);
        manager.run_once().unwrap();
        manager.exit_current().unwrap();

        assert_eq!(manager.current(), Some(manager.idle()));
        assert_eq!(manager.process_count(), 1);
        assert!(manager.check_consistency().is_ok());
    }
}
