//! Error taxonomy of the pipeline.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::exit_code::ExitCode;
use crate::stage::StageKind;
use crate::state::PipelineState;

/// Convenience alias for pipeline results.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors surfaced by the pipeline.
///
/// A user abort is not an error; it is reported through
/// [`PipelineState::Aborted`] on the job report.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The input is unreadable or the output directory is unwritable.
    /// Raised before any job exists.
    #[error("cannot use {}: {reason}", path.display())]
    Validation {
        /// Offending path.
        path: PathBuf,
        /// Human-readable explanation.
        reason: String,
    },

    /// `start` was called while a job is still held by the controller.
    #[error("a compression job is already {state}")]
    AlreadyRunning {
        /// State of the job that is still held.
        state: PipelineState,
    },

    /// Reading, compressing or writing failed mid-stream.
    #[error("stage failure in {stage}: {source}")]
    Stage {
        /// Stage that failed.
        stage: StageKind,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The partial output could not be removed during teardown.
    #[error("could not remove partial output {}: {source}", path.display())]
    Cleanup {
        /// Artifact that could not be removed.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
}

impl PipelineError {
    /// Creates a validation error for `path`.
    pub fn validation(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Validation {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a stage error.
    pub const fn stage(stage: StageKind, source: io::Error) -> Self {
        Self::Stage { stage, source }
    }

    /// Returns the stage responsible for a [`PipelineError::Stage`].
    #[must_use]
    pub const fn failed_stage(&self) -> Option<StageKind> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Maps the error onto the process exit code.
    #[must_use]
    pub const fn exit_code(&self) -> ExitCode {
        match self {
            Self::Validation { .. } => ExitCode::FileSelect,
            Self::AlreadyRunning { .. } => ExitCode::Syntax,
            Self::Stage { .. } => ExitCode::FileIo,
            Self::Cleanup { .. } => ExitCode::Cleanup,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_error_names_the_stage() {
        let err = PipelineError::stage(StageKind::Sink, io::Error::other("disk full"));
        assert_eq!(err.to_string(), "stage failure in sink: disk full");
        assert_eq!(err.failed_stage(), Some(StageKind::Sink));
        assert_eq!(err.exit_code(), ExitCode::FileIo);
    }

    #[test]
    fn validation_error_mentions_path() {
        let err = PipelineError::validation("/nope/input.bin", "file does not exist");
        assert_eq!(
            err.to_string(),
            "cannot use /nope/input.bin: file does not exist"
        );
        assert_eq!(err.exit_code(), ExitCode::FileSelect);
        assert_eq!(err.failed_stage(), None);
    }

    #[test]
    fn already_running_reports_state() {
        let err = PipelineError::AlreadyRunning {
            state: PipelineState::Paused,
        };
        assert_eq!(err.to_string(), "a compression job is already paused");
    }

    #[test]
    fn cleanup_error_is_non_zero() {
        let err = PipelineError::Cleanup {
            path: PathBuf::from("out/file.gz"),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        assert_ne!(err.exit_code().as_i32(), 0);
        assert!(err.to_string().starts_with("could not remove partial output out/file.gz"));
    }
}
