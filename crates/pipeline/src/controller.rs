//! The controller: sole owner of a job and the only place commands apply.
//!
//! A controller pulls one chunk at a time through
//! Source → [`ProgressTap`] → [`Codec`] → Sink and checks its command queue
//! between chunks. Pausing simply stops the pull; the codec keeps its state,
//! so output never depends on when or how often the job was paused.

use std::io;

use tracing::{debug, error, info, trace, warn};

use crate::command::{Command, CommandReceiver, Poll};
use crate::error::{PipelineError, Result};
use crate::job::{CleanupStatus, JobConfig, JobReport, PipelineJob};
use crate::progress::{ProgressSender, ReportEvent};
use crate::stage::{ChunkSink, ChunkSource, Codec, FileSink, FileSource, ProgressTap, StageKind};
use crate::state::{PipelineState, StateWatch};

/// A source the controller can own.
pub type BoxedSource = Box<dyn ChunkSource + Send>;
/// A sink the controller can own.
pub type BoxedSink = Box<dyn ChunkSink + Send>;

/// Stages and bookkeeping of the job currently held by the controller.
struct ActiveJob {
    job: PipelineJob,
    source: Option<BoxedSource>,
    tap: ProgressTap,
    codec: Codec,
    sink: BoxedSink,
    error: Option<PipelineError>,
    cleanup: CleanupStatus,
}

enum Pumped {
    Forwarded,
    Exhausted,
}

/// Moves one chunk from the source through to the sink.
fn pump(active: &mut ActiveJob) -> std::result::Result<Pumped, (StageKind, io::Error)> {
    let Some(source) = active.source.as_mut() else {
        return Ok(Pumped::Exhausted);
    };
    let Some(chunk) = source.next_chunk().map_err(|err| (StageKind::Source, err))? else {
        return Ok(Pumped::Exhausted);
    };
    let (chunk, sample) = active.tap.observe(chunk);
    active.job.record_progress(sample.bytes_processed);
    let compressed = active
        .codec
        .compress(chunk)
        .map_err(|err| (StageKind::Codec, err))?;
    // Empty codec output still goes to the sink so write counts follow chunks.
    active
        .sink
        .write_chunk(compressed)
        .map_err(|err| (StageKind::Sink, err))?;
    trace!(
        target: "compressor::pipeline",
        bytes_processed = sample.bytes_processed,
        total_bytes = sample.total_bytes,
        "chunk forwarded"
    );
    Ok(Pumped::Forwarded)
}

/// Flushes the codec trailer and publishes the artifact.
fn finalize(active: &mut ActiveJob) -> std::result::Result<(), (StageKind, io::Error)> {
    let tail = active.codec.finish().map_err(|err| (StageKind::Codec, err))?;
    active
        .sink
        .write_chunk(tail)
        .map_err(|err| (StageKind::Sink, err))?;
    active.sink.commit().map_err(|err| (StageKind::Sink, err))
}

/// Owns pipeline state and drives one job at a time.
///
/// # Examples
///
/// ```
/// use pipeline::{JobConfig, PipelineController, PipelineJob, PipelineState, control_channel};
///
/// let dir = tempfile::tempdir().unwrap();
/// let input = dir.path().join("notes.txt");
/// std::fs::write(&input, b"pause, resume, abort").unwrap();
///
/// let (_commands, receiver) = control_channel();
/// let mut controller = PipelineController::new(receiver, JobConfig::default());
/// controller
///     .start(PipelineJob::for_input(&input, dir.path()).unwrap())
///     .unwrap();
///
/// let report = controller.run().unwrap();
/// assert_eq!(report.state, PipelineState::Completed);
/// assert!(dir.path().join("notes.txt.gz").exists());
/// ```
pub struct PipelineController {
    commands: CommandReceiver,
    config: JobConfig,
    events: Option<ProgressSender>,
    watch: StateWatch,
    state: PipelineState,
    active: Option<ActiveJob>,
}

impl PipelineController {
    /// Creates an idle controller reading commands from `commands`.
    #[must_use]
    pub fn new(commands: CommandReceiver, config: JobConfig) -> Self {
        Self {
            commands,
            config,
            events: None,
            watch: StateWatch::default(),
            state: PipelineState::Idle,
            active: None,
        }
    }

    /// Forwards progress samples and state changes to `events`.
    #[must_use]
    pub fn with_reporter(mut self, events: ProgressSender) -> Self {
        self.events = Some(events);
        self
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> PipelineState {
        self.state
    }

    /// Returns a read-only view of the state for listeners.
    ///
    /// The watch keeps showing a terminal state after the report is taken,
    /// until the next job starts.
    #[must_use]
    pub fn state_watch(&self) -> StateWatch {
        self.watch.clone()
    }

    /// The job currently held, if any.
    #[must_use]
    pub fn job(&self) -> Option<&PipelineJob> {
        self.active.as_ref().map(|active| &active.job)
    }

    /// Opens the job's input and output and starts streaming.
    ///
    /// # Errors
    ///
    /// [`PipelineError::AlreadyRunning`] unless the controller is idle, and
    /// [`PipelineError::Stage`] when either stream cannot be opened. In both
    /// cases the controller state is unchanged.
    pub fn start(&mut self, job: PipelineJob) -> Result<()> {
        self.ensure_idle()?;
        let source = FileSource::open(job.source(), self.config.chunk_size)
            .map_err(|err| PipelineError::stage(StageKind::Source, err))?;
        let sink =
            FileSink::create(job.sink()).map_err(|err| PipelineError::stage(StageKind::Sink, err))?;
        self.start_with_stages(job, Box::new(source), Box::new(sink))
    }

    /// Starts `job` over caller-provided stages.
    ///
    /// # Errors
    ///
    /// [`PipelineError::AlreadyRunning`] unless the controller is idle.
    pub fn start_with_stages(
        &mut self,
        mut job: PipelineJob,
        source: BoxedSource,
        sink: BoxedSink,
    ) -> Result<()> {
        self.ensure_idle()?;
        let total_bytes = source.total_bytes();
        job.set_total(total_bytes);
        info!(
            target: "compressor::pipeline",
            source = %job.source().display(),
            sink = %sink.location().display(),
            total_bytes,
            level = self.config.level.as_u32(),
            chunk_size = self.config.chunk_size.get(),
            "job started"
        );
        self.emit(ReportEvent::Started { total_bytes });
        self.active = Some(ActiveJob {
            job,
            source: Some(source),
            tap: ProgressTap::new(total_bytes, self.events.clone()),
            codec: Codec::new(self.config.level),
            sink,
            error: None,
            cleanup: CleanupStatus::NotRequired,
        });
        self.transition(PipelineState::Running);
        Ok(())
    }

    /// Applies one command against the current state and returns the result.
    ///
    /// Commands that make no sense in the current state are ignored.
    pub fn handle(&mut self, command: Command) -> PipelineState {
        match (self.state, command) {
            (PipelineState::Running, Command::Pause) => {
                debug!(target: "compressor::control", "pause");
                self.transition(PipelineState::Paused);
            }
            (PipelineState::Paused, Command::Resume) => {
                debug!(target: "compressor::control", "resume");
                self.transition(PipelineState::Running);
            }
            (PipelineState::Running | PipelineState::Paused, Command::Abort) => {
                info!(target: "compressor::control", "abort requested");
                self.teardown(PipelineState::Aborted);
            }
            (state, command) => {
                trace!(target: "compressor::control", %state, %command, "command ignored");
            }
        }
        self.state
    }

    /// Records an irrecoverable stage failure and tears the job down.
    pub fn on_stage_error(&mut self, stage: StageKind, err: io::Error) {
        if !self.state.is_active() {
            trace!(target: "compressor::pipeline", %stage, error = %err, "late stage error ignored");
            return;
        }
        error!(target: "compressor::pipeline", %stage, error = %err, "stage failed");
        if let Some(active) = self.active.as_mut() {
            active.error = Some(PipelineError::stage(stage, err));
        }
        self.teardown(PipelineState::Failed);
    }

    /// Finishes the stream once the source is exhausted and publishes the
    /// output.
    pub fn on_complete(&mut self) {
        if self.state != PipelineState::Running {
            return;
        }
        let Some(active) = self.active.as_mut() else {
            return;
        };
        if let Err((stage, err)) = finalize(active) {
            self.on_stage_error(stage, err);
            return;
        }
        active.source = None;
        info!(
            target: "compressor::pipeline",
            bytes_processed = active.job.bytes_processed(),
            compressed_bytes = active.codec.compressed_bytes(),
            output = %active.sink.location().display(),
            "job completed"
        );
        self.transition(PipelineState::Completed);
    }

    /// Pulls one chunk through the stages if running.
    pub fn step(&mut self) -> PipelineState {
        if self.state != PipelineState::Running {
            return self.state;
        }
        let Some(active) = self.active.as_mut() else {
            return self.state;
        };
        match pump(active) {
            Ok(Pumped::Forwarded) => {}
            Ok(Pumped::Exhausted) => self.on_complete(),
            Err((stage, err)) => self.on_stage_error(stage, err),
        }
        self.state
    }

    /// Drives the held job to a terminal state, applying queued commands
    /// between chunks, and hands back its report.
    ///
    /// Returns `None` when no job was started. While paused the loop blocks on
    /// the command queue; if every sender is gone by then the job is aborted,
    /// since nothing could ever resume it.
    pub fn run(&mut self) -> Option<JobReport> {
        loop {
            match self.state {
                PipelineState::Idle => return None,
                state if state.is_terminal() => return self.take_report(),
                PipelineState::Running => {
                    self.apply_pending();
                    self.step();
                }
                _ => {
                    self.apply_pending();
                    if self.state != PipelineState::Paused {
                        continue;
                    }
                    if let Some(command) = self.commands.recv() {
                        self.handle(command);
                    } else {
                        warn!(
                            target: "compressor::control",
                            "command channel closed while paused; aborting"
                        );
                        self.handle(Command::Abort);
                    }
                }
            }
        }
    }

    /// Hands back the report of a finished job and returns to idle.
    ///
    /// Returns `None` while a job is still running or paused.
    pub fn take_report(&mut self) -> Option<JobReport> {
        if !self.state.is_terminal() {
            return None;
        }
        let active = self.active.take()?;
        let report = JobReport {
            state: self.state,
            source: active.job.source().to_path_buf(),
            output: active.job.sink().to_path_buf(),
            bytes_processed: active.job.bytes_processed(),
            total_bytes: active.job.total_bytes(),
            compressed_bytes: active.codec.compressed_bytes(),
            error: active.error,
            cleanup: active.cleanup,
        };
        self.state = PipelineState::Idle;
        Some(report)
    }

    /// Applies every queued command; a queued abort preempts the rest.
    fn apply_pending(&mut self) {
        let mut pending = Vec::new();
        while let Poll::Ready(command) = self.commands.poll() {
            pending.push(command);
        }
        if pending.contains(&Command::Abort) {
            self.handle(Command::Abort);
            return;
        }
        for command in pending {
            self.handle(command);
        }
    }

    /// Stops pulling, discards the partial output and enters `state`.
    fn teardown(&mut self, state: PipelineState) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        active.source = None;
        active.cleanup = discard_partial(active.sink.as_mut());
        info!(
            target: "compressor::pipeline",
            %state,
            bytes_processed = active.job.bytes_processed(),
            total_bytes = active.job.total_bytes(),
            "job torn down"
        );
        self.transition(state);
    }

    fn transition(&mut self, state: PipelineState) {
        self.state = state;
        if let Some(active) = self.active.as_mut() {
            active.job.set_state(state);
        }
        self.watch.publish(state);
        self.emit(ReportEvent::StateChanged(state));
    }

    fn emit(&self, event: ReportEvent) {
        if let Some(events) = &self.events {
            events.send(event);
        }
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.state == PipelineState::Idle {
            Ok(())
        } else {
            Err(PipelineError::AlreadyRunning { state: self.state })
        }
    }
}

impl std::fmt::Debug for PipelineController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineController")
            .field("state", &self.state)
            .field("config", &self.config)
            .field("job", &self.job())
            .finish_non_exhaustive()
    }
}

/// Best-effort removal of the partial artifact. Failures are logged and kept
/// for the exit status, never raised.
fn discard_partial(sink: &mut dyn ChunkSink) -> CleanupStatus {
    let path = sink.location().to_path_buf();
    match sink.discard() {
        Ok(()) => {
            debug!(target: "compressor::cleanup", path = %path.display(), "partial output removed");
            CleanupStatus::Removed
        }
        Err(source) => {
            error!(
                target: "compressor::cleanup",
                path = %path.display(),
                error = %source,
                "could not remove partial output"
            );
            CleanupStatus::Failed(PipelineError::Cleanup { path, source })
        }
    }
}
