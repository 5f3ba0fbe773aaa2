//! The job a controller runs and the report it hands back.

use std::ffi::OsString;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use compress::{CompressionLevel, GZIP_SUFFIX};

use crate::error::{PipelineError, Result};
use crate::exit_code::ExitCode;
use crate::stage::DEFAULT_CHUNK_SIZE;
use crate::state::PipelineState;

/// Tunables shared by every job a controller runs.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct JobConfig {
    /// Raw bytes pulled from the source per step.
    pub chunk_size: NonZeroUsize,
    /// Gzip level; defaults to the best ratio.
    pub level: CompressionLevel,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            chunk_size: NonZeroUsize::new(DEFAULT_CHUNK_SIZE).unwrap_or(NonZeroUsize::MIN),
            level: CompressionLevel::Best,
        }
    }
}

/// Derives `output_dir/<input file name>.gz`.
///
/// Returns `None` when `input` has no file name component.
#[must_use]
pub fn output_path_for(input: &Path, output_dir: &Path) -> Option<PathBuf> {
    let mut name = OsString::from(input.file_name()?);
    name.push(GZIP_SUFFIX);
    Some(output_dir.join(name))
}

/// One compression job: where to read, where to write, and how far it got.
///
/// Created before `start`, owned and mutated exclusively by the controller,
/// and discarded once the job reaches a terminal state.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PipelineJob {
    source: PathBuf,
    sink: PathBuf,
    total_bytes: u64,
    bytes_processed: u64,
    state: PipelineState,
}

impl PipelineJob {
    /// Creates a job reading `source` and publishing to `sink`.
    pub fn new(source: impl Into<PathBuf>, sink: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            sink: sink.into(),
            total_bytes: 0,
            bytes_processed: 0,
            state: PipelineState::Idle,
        }
    }

    /// Creates a job writing `<input file name>.gz` into `output_dir`.
    pub fn for_input(input: &Path, output_dir: &Path) -> Result<Self> {
        let sink = output_path_for(input, output_dir)
            .ok_or_else(|| PipelineError::validation(input, "path has no file name"))?;
        Ok(Self::new(input, sink))
    }

    /// Input path.
    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Output path.
    #[must_use]
    pub fn sink(&self) -> &Path {
        &self.sink
    }

    /// Input size, known once the job started.
    #[must_use]
    pub const fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Raw bytes consumed so far.
    #[must_use]
    pub const fn bytes_processed(&self) -> u64 {
        self.bytes_processed
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> PipelineState {
        self.state
    }

    pub(crate) fn set_total(&mut self, total_bytes: u64) {
        self.total_bytes = total_bytes;
    }

    pub(crate) fn set_state(&mut self, state: PipelineState) {
        self.state = state;
    }

    pub(crate) fn record_progress(&mut self, bytes_processed: u64) {
        debug_assert!(bytes_processed >= self.bytes_processed);
        debug_assert!(bytes_processed <= self.total_bytes);
        self.bytes_processed = bytes_processed.clamp(self.bytes_processed, self.total_bytes);
    }
}

/// What teardown did about the partial output.
#[derive(Debug, Default)]
pub enum CleanupStatus {
    /// The job completed; nothing was deleted.
    #[default]
    NotRequired,
    /// The partial output was removed.
    Removed,
    /// Removal failed; the error is kept for the exit status.
    Failed(PipelineError),
}

impl CleanupStatus {
    /// Returns the cleanup error, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&PipelineError> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// Final account of a job, handed back when the controller lets go of it.
#[derive(Debug)]
pub struct JobReport {
    /// Terminal state.
    pub state: PipelineState,
    /// Input path.
    pub source: PathBuf,
    /// Output path; holds a complete artifact only when `state` is completed.
    pub output: PathBuf,
    /// Raw bytes consumed.
    pub bytes_processed: u64,
    /// Input size.
    pub total_bytes: u64,
    /// Compressed bytes produced.
    pub compressed_bytes: u64,
    /// The stage error behind a failed job.
    pub error: Option<PipelineError>,
    /// Outcome of teardown.
    pub cleanup: CleanupStatus,
}

impl JobReport {
    /// Exit status for the job.
    ///
    /// Completed and user-aborted jobs exit `0`; a stage failure is
    /// non-zero; a failed cleanup escalates either.
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        let base = match self.state {
            PipelineState::Failed => self
                .error
                .as_ref()
                .map_or(ExitCode::FileIo, PipelineError::exit_code),
            _ => ExitCode::Ok,
        };
        match self.cleanup.error() {
            Some(err) => base.escalate(err.exit_code()),
            None => base,
        }
    }

    /// Human-readable one-liner distinguishing abort from failure.
    #[must_use]
    pub fn message(&self) -> String {
        match (self.state, &self.error) {
            (PipelineState::Completed, _) => "Compression finished".to_owned(),
            (PipelineState::Aborted, _) => "Compression aborted".to_owned(),
            (PipelineState::Failed, Some(err)) => format!("Compression failed: {err}"),
            (state, _) => format!("Compression ended in state {state}"),
        }
    }
}
