//! Unit tests for the atomic lifecycle state cell.

use std::sync::Arc;
use std::thread;

use agent_conduit::lifecycle::{LifecycleState, StateCell};

#[test]
fn new_cell_is_not_started() {
    let cell = StateCell::new();
    assert_eq!(cell.load(), LifecycleState::NotStarted);
}

#[test]
fn transition_follows_the_startup_path() {
    let cell = StateCell::new();
    assert!(cell.transition(LifecycleState::NotStarted, LifecycleState::Starting));
    assert!(cell.transition(LifecycleState::Starting, LifecycleState::Running));
    assert_eq!(cell.load(), LifecycleState::Running);
}

#[test]
fn transition_from_wrong_state_is_rejected() {
    let cell = StateCell::new();
    assert!(!cell.transition(LifecycleState::Starting, LifecycleState::Running));
    assert_eq!(cell.load(), LifecycleState::NotStarted);
}

#[test]
fn begin_shutdown_claims_from_not_started() {
    let cell = StateCell::new();
    assert!(cell.begin_shutdown());
    assert_eq!(cell.load(), LifecycleState::ShuttingDown);
}

#[test]
fn begin_shutdown_claims_from_starting() {
    let cell = StateCell::new();
    assert!(cell.transition(LifecycleState::NotStarted, LifecycleState::Starting));
    assert!(cell.begin_shutdown());
    assert_eq!(cell.load(), LifecycleState::ShuttingDown);
}

#[test]
fn begin_shutdown_claims_from_running() {
    let cell = StateCell::new();
    assert!(cell.transition(LifecycleState::NotStarted, LifecycleState::Starting));
    assert!(cell.transition(LifecycleState::Starting, LifecycleState::Running));
    assert!(cell.begin_shutdown());
    assert_eq!(cell.load(), LifecycleState::ShuttingDown);
}

#[test]
fn begin_shutdown_is_exclusive_once_claimed() {
    let cell = StateCell::new();
    assert!(cell.begin_shutdown());
    assert!(!cell.begin_shutdown());
    assert!(cell.transition(LifecycleState::ShuttingDown, LifecycleState::Stopped));
    assert!(!cell.begin_shutdown());
}

#[test]
fn begin_shutdown_is_won_by_exactly_one_racing_thread() {
    let cell = Arc::new(StateCell::new());

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let cell = Arc::clone(&cell);
            thread::spawn(move || cell.begin_shutdown())
        })
        .collect();

    let wins = handles
        .into_iter()
        .map(|handle| handle.join().expect("racing thread"))
        .filter(|won| *won)
        .count();

    assert_eq!(wins, 1);
    assert_eq!(cell.load(), LifecycleState::ShuttingDown);
}
