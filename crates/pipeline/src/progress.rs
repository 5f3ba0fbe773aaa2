//! Progress samples and the reporter side of the pipeline.
//!
//! The controller and its [`ProgressTap`](crate::stage::ProgressTap) push
//! [`ReportEvent`]s into an unbounded queue, so reporting never holds up a
//! chunk. A [`ProgressReporter`] consumes them on its own thread by running
//! [`drive_reporter`]; rendering is entirely the reporter's business.

use crossbeam_channel::{Receiver, Sender, TryIter, unbounded};
use tracing::trace;

use crate::state::PipelineState;

/// Point-in-time count of raw bytes consumed versus the input size.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ProgressSample {
    /// Raw input bytes handed to the codec so far.
    pub bytes_processed: u64,
    /// Size of the input.
    pub total_bytes: u64,
}

impl ProgressSample {
    /// Completed fraction in `0.0..=1.0`; an empty input counts as complete.
    #[must_use]
    pub fn fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            1.0
        } else {
            self.bytes_processed as f64 / self.total_bytes as f64
        }
    }
}

/// Messages carried from the pipeline to its reporter.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReportEvent {
    /// A job started over an input of `total_bytes`.
    Started {
        /// Size of the input.
        total_bytes: u64,
    },
    /// Raw bytes were consumed.
    Sample(ProgressSample),
    /// The controller changed state.
    StateChanged(PipelineState),
}

/// Creates the queue between the pipeline and a reporter.
#[must_use]
pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    let (tx, rx) = unbounded();
    (ProgressSender { tx }, ProgressReceiver { rx })
}

/// Producer half of the progress queue. Sending never blocks.
#[derive(Clone, Debug)]
pub struct ProgressSender {
    tx: Sender<ReportEvent>,
}

impl ProgressSender {
    /// Queues `event`. A reporter that went away is not an error.
    pub fn send(&self, event: ReportEvent) {
        if self.tx.send(event).is_err() {
            trace!(target: "compressor::progress", ?event, "reporter gone, event dropped");
        }
    }
}

/// Consumer half of the progress queue.
#[derive(Debug)]
pub struct ProgressReceiver {
    rx: Receiver<ReportEvent>,
}

impl ProgressReceiver {
    /// Blocks for the next event; `None` once every sender is gone.
    pub fn recv(&self) -> Option<ReportEvent> {
        self.rx.recv().ok()
    }

    /// Drains the events queued so far without blocking.
    pub fn try_iter(&self) -> TryIter<'_, ReportEvent> {
        self.rx.try_iter()
    }
}

/// Renders progress for one job at a time.
pub trait ProgressReporter {
    /// Per-job rendering state.
    type Handle;

    /// Starts rendering a job over `total_bytes`.
    fn init(&mut self, total_bytes: u64) -> Self::Handle;

    /// Reports that `bytes_processed` raw bytes have been consumed.
    fn update(&mut self, handle: &Self::Handle, bytes_processed: u64);

    /// Reports a non-terminal state change such as pause or resume.
    fn state_changed(&mut self, _handle: &Self::Handle, _state: PipelineState) {}

    /// Ends rendering once the job reached the terminal `state`.
    fn finish(&mut self, _handle: Self::Handle, _state: PipelineState) {}
}

/// Feeds every queued event into `reporter` until all senders are dropped.
pub fn drive_reporter<R: ProgressReporter>(reporter: &mut R, events: &ProgressReceiver) {
    let mut handle = None;
    while let Some(event) = events.recv() {
        match event {
            ReportEvent::Started { total_bytes } => handle = Some(reporter.init(total_bytes)),
            ReportEvent::Sample(sample) => {
                if let Some(handle) = &handle {
                    reporter.update(handle, sample.bytes_processed);
                }
            }
            ReportEvent::StateChanged(state) if state.is_terminal() => {
                if let Some(handle) = handle.take() {
                    reporter.finish(handle, state);
                }
            }
            ReportEvent::StateChanged(state) => {
                if let Some(handle) = &handle {
                    reporter.state_changed(handle, state);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::CollectingReporter;

    #[test]
    fn fraction_handles_empty_input() {
        let sample = ProgressSample::default();
        assert!((sample.fraction() - 1.0).abs() < f64::EPSILON);
        let half = ProgressSample {
            bytes_processed: 5,
            total_bytes: 10,
        };
        assert!((half.fraction() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn drive_reporter_dispatches_in_order() {
        let (tx, rx) = progress_channel();
        tx.send(ReportEvent::Started { total_bytes: 10 });
        tx.send(ReportEvent::Sample(ProgressSample {
            bytes_processed: 4,
            total_bytes: 10,
        }));
        tx.send(ReportEvent::StateChanged(PipelineState::Paused));
        tx.send(ReportEvent::StateChanged(PipelineState::Running));
        tx.send(ReportEvent::Sample(ProgressSample {
            bytes_processed: 10,
            total_bytes: 10,
        }));
        tx.send(ReportEvent::StateChanged(PipelineState::Completed));
        drop(tx);

        let mut reporter = CollectingReporter::default();
        drive_reporter(&mut reporter, &rx);

        assert_eq!(reporter.totals, [10]);
        assert_eq!(reporter.updates, [4, 10]);
        assert_eq!(
            reporter.states,
            [PipelineState::Paused, PipelineState::Running]
        );
        assert_eq!(reporter.finished, [PipelineState::Completed]);
    }

    #[test]
    fn samples_before_start_are_ignored() {
        let (tx, rx) = progress_channel();
        tx.send(ReportEvent::Sample(ProgressSample {
            bytes_processed: 1,
            total_bytes: 1,
        }));
        drop(tx);
        let mut reporter = CollectingReporter::default();
        drive_reporter(&mut reporter, &rx);
        assert!(reporter.updates.is_empty());
    }

    #[test]
    fn reporter_thread_returns_after_senders_drop() {
        let (tx, rx) = progress_channel();
        let mut reporter = CollectingReporter::default();
        std::thread::scope(|scope| {
            let worker = scope.spawn(|| drive_reporter(&mut reporter, &rx));
            tx.send(ReportEvent::Started { total_bytes: 3 });
            tx.send(ReportEvent::StateChanged(PipelineState::Aborted));
            drop(tx);
            worker.join().unwrap();
        });
        assert_eq!(reporter.finished, [PipelineState::Aborted]);
    }
}
