//! Activity state management

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle of a background activity
///
/// The capture loop uses all three states. The reminder scheduler goes
/// straight from Running back to Idle.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityState {
    /// Not running, owns no resources
    Idle = 0,

    /// Loop body is executing
    Running = 1,

    /// Cancellation requested or the loop hit a terminal error; resources are
    /// being released
    Stopping = 2,
}

impl ActivityState {
    /// Convert from u8 value. Returns Idle for invalid values.
    #[inline]
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ActivityState::Running,
            2 => ActivityState::Stopping,
            _ => ActivityState::Idle,
        }
    }

    /// Check if this state transition is valid
    pub fn can_transition_to(&self, target: &ActivityState) -> bool {
        use ActivityState::*;

        match (self, target) {
            (Idle, Running) => true,
            (Running, Stopping) => true,
            // the scheduler holds nothing that needs releasing
            (Running, Idle) => true,
            (Stopping, Idle) => true,

            // Self-transitions
            (a, b) if a == b => true,

            _ => false,
        }
    }

    /// Get a human-readable description of this state
    pub fn description(&self) -> &'static str {
        match self {
            ActivityState::Idle => "Idle",
            ActivityState::Running => "Running",
            ActivityState::Stopping => "Stopping",
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, ActivityState::Running)
    }
}

impl std::fmt::Display for ActivityState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Lock-free state cell shared between the coordinator and one activity.
#[derive(Debug, Clone)]
pub struct SharedState {
    inner: Arc<AtomicU8>,
    name: &'static str,
}

impl SharedState {
    pub fn new(name: &'static str) -> Self {
        Self {
            inner: Arc::new(AtomicU8::new(ActivityState::Idle as u8)),
            name,
        }
    }

    pub fn get(&self) -> ActivityState {
        ActivityState::from_u8(self.inner.load(Ordering::Acquire))
    }

    /// Move to `target` if the transition is legal. Returns whether it happened.
    pub fn transition(&self, target: ActivityState) -> bool {
        let current = self.get();
        if !current.can_transition_to(&target) {
            log::warn!("{}: refused transition {} -> {}", self.name, current, target);
            return false;
        }
        self.inner
            .compare_exchange(current as u8, target as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Unconditional reset, used once an activity has fully exited.
    pub fn reset(&self) {
        self.inner.store(ActivityState::Idle as u8, Ordering::Release);
    }
}
