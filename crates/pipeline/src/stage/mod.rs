//! Pipeline stages: Source → ProgressTap → Codec → Sink.
//!
//! Stages never touch job state. They hand chunks forward by value and report
//! failures through their `io::Result`s; the controller decides what a
//! failure means for the job.

use std::fmt;
use std::io;
use std::path::Path;

mod codec;
mod sink;
mod source;
mod tap;

pub use codec::Codec;
pub use sink::FileSink;
pub use source::FileSource;
pub use tap::ProgressTap;

/// Default number of raw bytes pulled from the source per step.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// An owned, immutable run of bytes moving between stages.
///
/// Forwarding a chunk moves it; no stage keeps a chunk after handing it on.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ByteChunk(Vec<u8>);

impl ByteChunk {
    /// Wraps `bytes` without copying.
    #[must_use]
    pub const fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Number of bytes carried.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` when the chunk carries no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrows the payload.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Unwraps the payload.
    #[must_use]
    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for ByteChunk {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for ByteChunk {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Identifies the stage that produced an error.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum StageKind {
    /// Reading raw bytes.
    Source,
    /// Compressing.
    Codec,
    /// Writing compressed bytes.
    Sink,
}

impl StageKind {
    /// Lowercase stage name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Codec => "codec",
            Self::Sink => "sink",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Sequential producer of raw chunks.
pub trait ChunkSource {
    /// Total number of bytes this source will yield, known upfront.
    fn total_bytes(&self) -> u64;

    /// Pulls the next chunk, or `None` once the source is exhausted.
    fn next_chunk(&mut self) -> io::Result<Option<ByteChunk>>;
}

/// Sequential consumer of compressed chunks.
///
/// A sink owns a partial artifact until [`commit`](Self::commit) succeeds.
/// [`discard`](Self::discard) must leave nothing behind at
/// [`location`](Self::location).
pub trait ChunkSink {
    /// Where the finished artifact will live.
    fn location(&self) -> &Path;

    /// Appends a chunk.
    fn write_chunk(&mut self, chunk: ByteChunk) -> io::Result<()>;

    /// Flushes and publishes the finished artifact.
    fn commit(&mut self) -> io::Result<()>;

    /// Closes without finalising and deletes the partial artifact.
    fn discard(&mut self) -> io::Result<()>;
}
