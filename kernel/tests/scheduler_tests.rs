//! Scheduler tests
//! Round-robin selection, idle fallback, blocking and dispatch fairness

mod common;

use std::collections::HashSet;

use common::{entry, manager, manager_with, names, spawn_all, test_config};
use kernel::process::{ProcessRef, QueueKind};
use pcore_api::ProcessState;

fn select_names(manager: &mut common::TestManager, count: usize) -> Vec<String> {
    let picks: Vec<ProcessRef> = (0..count).map(|_| manager.select_next()).collect();
    names(manager, &picks)
}

mod selection_tests {
    use super::*;

    /// The cursor walks from the successor of the last pick and wraps
    #[test]
    fn test_rotating_cursor_order() {
        let mut manager = manager();
        spawn_all(&mut manager, &["A", "B", "C"]);
        // Queue is C, B, A (head insertion); the walk starts after the head
        assert_eq!(select_names(&mut manager, 6), ["B", "A", "C", "B", "A", "C"]);
    }

    /// Two ready processes alternate and idle never shows up
    #[test]
    fn test_two_processes_alternate() {
        let mut manager = manager();
        spawn_all(&mut manager, &["A", "B"]);
        assert_eq!(select_names(&mut manager, 6), ["A", "B", "A", "B", "A", "B"]);
    }

    /// N selections over N ready records return each exactly once, in a stable order
    #[test]
    fn test_round_robin_fairness() {
        let mut manager = manager();
        let handles = spawn_all(&mut manager, &["P0", "P1", "P2", "P3", "P4"]);

        let first: Vec<ProcessRef> = (0..5).map(|_| manager.select_next()).collect();
        let second: Vec<ProcessRef> = (0..5).map(|_| manager.select_next()).collect();

        let distinct: HashSet<ProcessRef> = first.iter().copied().collect();
        let expected: HashSet<ProcessRef> = handles.iter().copied().collect();
        assert_eq!(distinct, expected);
        assert_eq!(first, second);
    }

    /// Selection does not dequeue anything
    #[test]
    fn test_select_leaves_queues_alone() {
        let mut manager = manager();
        spawn_all(&mut manager, &["A", "B"]);
        let before = manager.queue_members(QueueKind::Ready);
        manager.select_next();
        manager.select_next();
        assert_eq!(manager.queue_members(QueueKind::Ready), before);
    }

    /// Empty ready queue means idle, every time, without queueing idle
    #[test]
    fn test_idle_fallback() {
        let mut manager = manager();
        let idle = manager.idle();
        for _ in 0..3 {
            assert_eq!(manager.select_next(), idle);
        }
        assert_eq!(manager.queue_len(QueueKind::Ready), 0);
        assert_eq!(manager.get(idle).unwrap().queue(), None);
        assert!(manager.check_consistency().is_ok());
    }

    /// Only blocked processes left: idle runs
    #[test]
    fn test_all_blocked_falls_back_to_idle() {
        let mut manager = manager();
        let handles = spawn_all(&mut manager, &["A", "B"]);
        for &handle in &handles {
            manager.set_state(handle, ProcessState::Blocked).unwrap();
        }
        assert_eq!(manager.select_next(), manager.idle());
    }
}

mod dispatch_tests {
    use super::*;

    /// A blocked process is skipped and stays off the ready queue until woken
    #[test]
    fn test_blocked_process_is_skipped() {
        let mut manager = manager();
        let handles = spawn_all(&mut manager, &["A", "B"]);
        let (a, b) = (handles[0], handles[1]);

        assert_eq!(manager.run_once().unwrap(), a);
        assert_eq!(manager.state_of(a), Some(ProcessState::Running));

        manager.block_current().unwrap();
        assert_eq!(manager.current(), Some(b));
        assert_eq!(manager.state_of(a), Some(ProcessState::Blocked));
        assert_eq!(manager.queue_members(QueueKind::Blocked), [a]);
        assert!(!manager.queue_members(QueueKind::Ready).contains(&a));

        // B is running and A is blocked: nothing is ready
        assert_eq!(manager.select_next(), manager.idle());
        assert!(manager.check_consistency().is_ok());

        manager.unblock(a).unwrap();
        assert_eq!(manager.queue_members(QueueKind::Ready), [a]);
        assert_eq!(manager.select_next(), a);
    }

    /// Dispatch plus yield serves every process once per rotation
    #[test]
    fn test_dispatch_and_yield_fairness() {
        let mut manager = manager();
        let handles = spawn_all(&mut manager, &["A", "B", "C", "D"]);
        let everyone: HashSet<ProcessRef> = handles.iter().copied().collect();

        let mut dispatched = vec![manager.run_once().unwrap()];
        for _ in 0..11 {
            manager.yield_current().unwrap();
            dispatched.push(manager.current().unwrap());
            assert!(manager.check_consistency().is_ok());
        }

        for rotation in dispatched.chunks(4) {
            let served: HashSet<ProcessRef> = rotation.iter().copied().collect();
            assert_eq!(served, everyone, "rotation {:?}", names(&manager, rotation));
        }
    }

    /// A process created mid-rotation waits for the next rotation
    #[test]
    fn test_mid_rotation_arrival_joins_next_rotation() {
        let mut manager = manager();
        spawn_all(&mut manager, &["A", "B", "C"]);

        let mut dispatched = vec![manager.run_once().unwrap()];
        manager.create("D", 1, entry(3)).unwrap();
        for _ in 0..6 {
            manager.yield_current().unwrap();
            dispatched.push(manager.current().unwrap());
        }

        let order = names(&manager, &dispatched);
        let rest_of_first: HashSet<&str> = order[1..3].iter().map(String::as_str).collect();
        let next: HashSet<&str> = order[3..7].iter().map(String::as_str).collect();
        assert!(!rest_of_first.contains("D"));
        assert!(!rest_of_first.contains(order[0].as_str()));
        let everyone: HashSet<&str> = ["A", "B", "C", "D"].into_iter().collect();
        assert_eq!(next, everyone);
    }

    /// Yielding with nobody else ready keeps the same process running without a switch
    #[test]
    fn test_yield_alone_keeps_running() {
        let mut manager = manager();
        let handles = spawn_all(&mut manager, &["A"]);
        manager.run_once().unwrap();
        let switches = manager.engine().switch_count();

        manager.yield_current().unwrap();
        assert_eq!(manager.current(), Some(handles[0]));
        assert_eq!(manager.state_of(handles[0]), Some(ProcessState::Running));
        assert_eq!(manager.engine().switch_count(), switches);
        assert_eq!(manager.queue_len(QueueKind::Ready), 0);
    }

    /// Idle runs when nothing else can, and gives way as soon as work arrives
    #[test]
    fn test_idle_runs_until_work_arrives() {
        let mut manager = manager();
        let idle = manager.idle();
        assert_eq!(manager.run_once().unwrap(), idle);
        assert_eq!(manager.state_of(idle), Some(ProcessState::Running));

        let a = manager.create("A", 1, entry(0)).unwrap();
        assert_eq!(manager.run_once().unwrap(), a);
        assert_eq!(manager.state_of(idle), Some(ProcessState::Ready));
        assert_eq!(manager.get(idle).unwrap().queue(), None);
        assert!(manager.check_consistency().is_ok());
    }

    /// Zombies are reaped on the configured iteration only
    #[test]
    fn test_reap_interval() {
        let mut manager = manager_with(test_config().with_reap_interval(3));
        let handles = spawn_all(&mut manager, &["A", "B"]);
        let a = handles[0];

        assert_eq!(manager.run_once().unwrap(), a);
        manager.exit_current().unwrap();
        assert_eq!(manager.state_of(a), Some(ProcessState::Zombie));
        assert_eq!(manager.queue_len(QueueKind::Zombie), 1);

        manager.run_once().unwrap();
        assert_eq!(manager.state_of(a), None);
        assert_eq!(manager.queue_len(QueueKind::Zombie), 0);
    }

    /// Priority is carried but does not change the order
    #[test]
    fn test_priority_is_informational() {
        let mut manager = manager();
        manager.create("low", 1, entry(0)).unwrap();
        manager.create("high", 200, entry(1)).unwrap();
        assert_eq!(select_names(&mut manager, 4), ["low", "high", "low", "high"]);
    }
}
