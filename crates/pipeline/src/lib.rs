#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `pipeline` streams one input file through a gzip codec into an output file
//! while accepting pause, resume and abort commands. A
//! [`PipelineController`] owns the single active [`PipelineJob`], wires
//! Source → [`ProgressTap`](stage::ProgressTap) → [`Codec`](stage::Codec) →
//! Sink, and is the only component that ever changes the job's
//! [`PipelineState`].
//!
//! # Design
//!
//! - Listeners never touch the pipeline. They turn input into [`Command`]s
//!   (see [`KeyMap::translate`]) and send them over a single-consumer queue
//!   created by [`control_channel`]. The controller applies queued commands
//!   between chunks, so commands are serialised without locks.
//! - Stages move [`ByteChunk`]s by value, one at a time. Pausing stops the
//!   pull from the source and nothing else; the codec keeps its state.
//! - Progress leaves the controller as [`ReportEvent`]s on an unbounded queue
//!   and is rendered by a [`ProgressReporter`] on another thread.
//!
//! # Invariants
//!
//! - `bytes_processed` never decreases and never exceeds `total_bytes`.
//! - The output path holds a complete gzip artifact only after the job
//!   completed; the file sink writes into a scratch file and renames it on
//!   commit.
//! - Abort is irrevocable and preempts any queued pause or resume.
//! - Compressed output is byte-identical with or without pause/resume cycles.
//!
//! # Errors
//!
//! Stage failures never escape the controller: they become a
//! [`PipelineState::Failed`] transition and are carried on the
//! [`JobReport`]. [`PipelineError`] is returned only by pre-start validation
//! and by [`PipelineController::start`].

mod command;
mod controller;
mod error;
mod exit_code;
mod job;
mod progress;
pub mod stage;
mod state;
#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-support")))]
pub mod testing;
pub mod validate;

pub use crate::command::{
    Command, CommandReceiver, CommandSender, Key, KeyMap, Poll, control_channel,
};
pub use crate::controller::{BoxedSink, BoxedSource, PipelineController};
pub use crate::error::{PipelineError, Result};
pub use crate::exit_code::ExitCode;
pub use crate::job::{CleanupStatus, JobConfig, JobReport, PipelineJob, output_path_for};
pub use crate::progress::{
    ProgressReceiver, ProgressReporter, ProgressSample, ProgressSender, ReportEvent,
    drive_reporter, progress_channel,
};
pub use crate::stage::{ByteChunk, StageKind};
pub use crate::state::{PipelineState, StateWatch};
