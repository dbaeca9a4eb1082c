//! Lifecycle state storage.

use std::sync::atomic::{AtomicU8, Ordering};

/// Process lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LifecycleState {
    /// Startup has not begun.
    NotStarted = 0,
    /// Startup sequence in flight.
    Starting = 1,
    /// Transport bound; serving the peer.
    Running = 2,
    /// First termination trigger arrived; teardown in flight.
    ShuttingDown = 3,
    /// Terminal.
    Stopped = 4,
}

impl LifecycleState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::NotStarted,
            1 => Self::Starting,
            2 => Self::Running,
            3 => Self::ShuttingDown,
            _ => Self::Stopped,
        }
    }
}

/// Atomic cell holding a [`LifecycleState`].
///
/// `begin_shutdown` is the reentrancy guard for the one shutdown sequence:
/// the claim is a compare-and-swap, so exactly one of any number of racing
/// callers wins, no matter which trigger source they came from.
#[derive(Debug)]
pub struct StateCell(AtomicU8);

impl StateCell {
    /// New cell in [`LifecycleState::NotStarted`].
    #[must_use]
    pub fn new() -> Self {
        Self(AtomicU8::new(LifecycleState::NotStarted as u8))
    }

    /// Current state.
    #[must_use]
    pub fn load(&self) -> LifecycleState {
        LifecycleState::from_u8(self.0.load(Ordering::SeqCst))
    }

    /// Compare-and-swap transition; true when the transition happened.
    #[must_use]
    pub fn transition(&self, from: LifecycleState, to: LifecycleState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Atomically claim the one shutdown sequence.
    ///
    /// Moves any pre-shutdown state to [`LifecycleState::ShuttingDown`] and
    /// returns true for exactly one caller; returns false once the state is
    /// `ShuttingDown` or `Stopped`.
    #[must_use]
    pub fn begin_shutdown(&self) -> bool {
        let mut current = self.0.load(Ordering::SeqCst);
        loop {
            if current >= LifecycleState::ShuttingDown as u8 {
                return false;
            }
            match self.0.compare_exchange(
                current,
                LifecycleState::ShuttingDown as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}
