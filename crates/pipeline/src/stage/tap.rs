use crate::progress::{ProgressSample, ProgressSender, ReportEvent};

use super::ByteChunk;

/// Pass-through counter between the source and the codec.
///
/// Counts raw (pre-compression) bytes, so samples reflect the fraction of the
/// input consumed. Samples are forwarded without waiting on the receiver.
#[derive(Debug)]
pub struct ProgressTap {
    processed: u64,
    total: u64,
    events: Option<ProgressSender>,
}

impl ProgressTap {
    /// Creates a tap for an input of `total` bytes.
    #[must_use]
    pub const fn new(total: u64, events: Option<ProgressSender>) -> Self {
        Self {
            processed: 0,
            total,
            events,
        }
    }

    /// Records `chunk` and forwards the resulting sample.
    ///
    /// The chunk itself passes through untouched.
    pub fn observe(&mut self, chunk: ByteChunk) -> (ByteChunk, ProgressSample) {
        self.processed = self
            .processed
            .saturating_add(chunk.len() as u64)
            .min(self.total);
        let sample = self.sample();
        if let Some(events) = &self.events {
            events.send(ReportEvent::Sample(sample));
        }
        (chunk, sample)
    }

    /// Current counters.
    #[must_use]
    pub const fn sample(&self) -> ProgressSample {
        ProgressSample {
            bytes_processed: self.processed,
            total_bytes: self.total,
        }
    }
}
