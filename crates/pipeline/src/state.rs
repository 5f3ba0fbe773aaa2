//! Pipeline lifecycle states and a shared read-only view of them.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle of a pipeline job.
///
/// [`Idle`](Self::Idle) is the initial state. [`Completed`](Self::Completed),
/// [`Aborted`](Self::Aborted) and [`Failed`](Self::Failed) are terminal.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum PipelineState {
    /// No job has been started.
    #[default]
    Idle = 0,
    /// Chunks are being pulled from the source.
    Running = 1,
    /// Pulling is suspended until a resume arrives.
    Paused = 2,
    /// The source was exhausted and the sink committed.
    Completed = 3,
    /// The user aborted the job; partial output was removed.
    Aborted = 4,
    /// A stage failed; partial output was removed.
    Failed = 5,
}

impl PipelineState {
    /// Returns `true` for states that end a job.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Aborted | Self::Failed)
    }

    /// Returns `true` while a job owns open stages.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Running | Self::Paused)
    }

    /// Returns the lowercase name used in diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
            Self::Failed => "failed",
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Running,
            2 => Self::Paused,
            3 => Self::Completed,
            4 => Self::Aborted,
            5 => Self::Failed,
            _ => Self::Idle,
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Cloneable, read-only view of the controller's current state.
///
/// Only the controller publishes into it. Listeners use it to decide which
/// keys are meaningful and to detach once the job has ended.
#[derive(Clone, Debug, Default)]
pub struct StateWatch {
    state: Arc<AtomicU8>,
}

impl StateWatch {
    /// Returns the most recently published state.
    #[must_use]
    pub fn get(&self) -> PipelineState {
        PipelineState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Returns `true` once the watched job reached a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.get().is_terminal()
    }

    pub(crate) fn publish(&self, state: PipelineState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(!PipelineState::Idle.is_terminal());
        assert!(!PipelineState::Running.is_terminal());
        assert!(!PipelineState::Paused.is_terminal());
        assert!(PipelineState::Completed.is_terminal());
        assert!(PipelineState::Aborted.is_terminal());
        assert!(PipelineState::Failed.is_terminal());
    }

    #[test]
    fn watch_round_trips_every_state() {
        let watch = StateWatch::default();
        assert_eq!(watch.get(), PipelineState::Idle);
        for state in [
            PipelineState::Running,
            PipelineState::Paused,
            PipelineState::Completed,
            PipelineState::Aborted,
            PipelineState::Failed,
            PipelineState::Idle,
        ] {
            watch.publish(state);
            assert_eq!(watch.get(), state);
        }
    }

    #[test]
    fn clones_observe_the_same_state() {
        let watch = StateWatch::default();
        let observer = watch.clone();
        watch.publish(PipelineState::Aborted);
        assert!(observer.is_terminal());
    }

    #[test]
    fn display_uses_lowercase_names() {
        assert_eq!(PipelineState::Paused.to_string(), "paused");
    }
}
