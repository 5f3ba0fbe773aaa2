//! In-memory stages and reporters for exercising the controller.
//!
//! Compiled for unit tests and behind the `test-support` feature so dependent
//! crates can drive a controller without touching the filesystem.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::command::{Command, CommandSender};
use crate::progress::ProgressReporter;
use crate::stage::{ByteChunk, ChunkSink, ChunkSource};
use crate::state::PipelineState;

/// Serves a byte vector in fixed-size chunks.
#[derive(Debug)]
pub struct MemorySource {
    data: Vec<u8>,
    offset: usize,
    chunk_size: usize,
    pulls: usize,
    fail_on: Option<usize>,
    script: Vec<(usize, Command, CommandSender)>,
}

impl MemorySource {
    /// Creates a source over `data`.
    #[must_use]
    pub fn new(data: Vec<u8>, chunk_size: usize) -> Self {
        Self {
            data,
            offset: 0,
            chunk_size: chunk_size.max(1),
            pulls: 0,
            fail_on: None,
            script: Vec::new(),
        }
    }

    /// Makes the `n`th pull (1-based) fail with an I/O error.
    #[must_use]
    pub const fn failing_on_pull(mut self, n: usize) -> Self {
        self.fail_on = Some(n);
        self
    }

    /// Queues `command` on `commands` right after the `n`th chunk is pulled.
    #[must_use]
    pub fn sending_after(mut self, n: usize, command: Command, commands: &CommandSender) -> Self {
        self.script.push((n, command, commands.clone()));
        self
    }

    /// Number of successful pulls so far.
    #[must_use]
    pub const fn pulls(&self) -> usize {
        self.pulls
    }
}

impl ChunkSource for MemorySource {
    fn total_bytes(&self) -> u64 {
        self.data.len() as u64
    }

    fn next_chunk(&mut self) -> io::Result<Option<ByteChunk>> {
        if self.fail_on == Some(self.pulls + 1) {
            return Err(io::Error::other("injected read failure"));
        }
        if self.offset >= self.data.len() {
            return Ok(None);
        }
        let end = self.data.len().min(self.offset + self.chunk_size);
        let chunk = ByteChunk::new(self.data[self.offset..end].to_vec());
        self.offset = end;
        self.pulls += 1;
        for (after, command, commands) in &self.script {
            if *after == self.pulls {
                commands.send(*command);
            }
        }
        Ok(Some(chunk))
    }
}

/// Lazily yields `total` zero bytes, for large inputs without the memory.
#[derive(Debug)]
pub struct ZeroSource {
    remaining: u64,
    total: u64,
    chunk_size: usize,
}

impl ZeroSource {
    /// Creates a source of `total` zero bytes.
    #[must_use]
    pub fn new(total: u64, chunk_size: usize) -> Self {
        Self {
            remaining: total,
            total,
            chunk_size: chunk_size.max(1),
        }
    }
}

impl ChunkSource for ZeroSource {
    fn total_bytes(&self) -> u64 {
        self.total
    }

    fn next_chunk(&mut self) -> io::Result<Option<ByteChunk>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        let len = self.remaining.min(self.chunk_size as u64);
        self.remaining -= len;
        Ok(Some(ByteChunk::new(vec![0; len as usize])))
    }
}

/// What a [`MemorySink`] observed, shared with its [`SinkProbe`].
#[derive(Debug, Default)]
struct SinkRecord {
    bytes: Vec<u8>,
    writes: usize,
    committed: bool,
    discarded: bool,
}

/// Collects compressed chunks in memory.
#[derive(Debug)]
pub struct MemorySink {
    location: PathBuf,
    record: Arc<Mutex<SinkRecord>>,
    fail_write_on: Option<usize>,
    fail_discard: bool,
}

impl MemorySink {
    /// Creates a sink that pretends to publish at `location`.
    pub fn new(location: impl Into<PathBuf>) -> Self {
        Self {
            location: location.into(),
            record: Arc::default(),
            fail_write_on: None,
            fail_discard: false,
        }
    }

    /// Makes the `n`th write (1-based) fail with an I/O error.
    #[must_use]
    pub const fn failing_on_write(mut self, n: usize) -> Self {
        self.fail_write_on = Some(n);
        self
    }

    /// Makes [`discard`](ChunkSink::discard) fail.
    #[must_use]
    pub const fn failing_discard(mut self) -> Self {
        self.fail_discard = true;
        self
    }

    /// Returns a handle that keeps observing the sink after it is boxed.
    #[must_use]
    pub fn probe(&self) -> SinkProbe {
        SinkProbe {
            record: Arc::clone(&self.record),
        }
    }

    fn record(&self) -> MutexGuard<'_, SinkRecord> {
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ChunkSink for MemorySink {
    fn location(&self) -> &Path {
        &self.location
    }

    fn write_chunk(&mut self, chunk: ByteChunk) -> io::Result<()> {
        let fail_on = self.fail_write_on;
        let mut record = self.record();
        record.writes += 1;
        if fail_on == Some(record.writes) {
            return Err(io::Error::other("injected write failure"));
        }
        record.bytes.extend_from_slice(chunk.as_slice());
        Ok(())
    }

    fn commit(&mut self) -> io::Result<()> {
        self.record().committed = true;
        Ok(())
    }

    fn discard(&mut self) -> io::Result<()> {
        if self.fail_discard {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        let mut record = self.record();
        if !record.committed {
            record.bytes.clear();
            record.discarded = true;
        }
        Ok(())
    }
}

/// Read-only view of a [`MemorySink`].
#[derive(Clone, Debug)]
pub struct SinkProbe {
    record: Arc<Mutex<SinkRecord>>,
}

impl SinkProbe {
    fn record(&self) -> MutexGuard<'_, SinkRecord> {
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Bytes currently held by the sink.
    #[must_use]
    pub fn bytes(&self) -> Vec<u8> {
        self.record().bytes.clone()
    }

    /// Number of write calls, failed ones included.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.record().writes
    }

    /// Whether the sink was committed.
    #[must_use]
    pub fn committed(&self) -> bool {
        self.record().committed
    }

    /// Whether the partial output was discarded.
    #[must_use]
    pub fn discarded(&self) -> bool {
        self.record().discarded
    }

    /// Whether an artifact would exist at the sink's location.
    #[must_use]
    pub fn artifact_exists(&self) -> bool {
        let record = self.record();
        record.committed || (!record.discarded && record.writes > 0)
    }
}

/// Reporter that records every call.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    /// Totals passed to `init`.
    pub totals: Vec<u64>,
    /// Byte counts passed to `update`.
    pub updates: Vec<u64>,
    /// Non-terminal state changes.
    pub states: Vec<PipelineState>,
    /// Terminal states passed to `finish`.
    pub finished: Vec<PipelineState>,
}

impl ProgressReporter for CollectingReporter {
    type Handle = ();

    fn init(&mut self, total_bytes: u64) -> Self::Handle {
        self.totals.push(total_bytes);
    }

    fn update(&mut self, _handle: &Self::Handle, bytes_processed: u64) {
        self.updates.push(bytes_processed);
    }

    fn state_changed(&mut self, _handle: &Self::Handle, state: PipelineState) {
        self.states.push(state);
    }

    fn finish(&mut self, _handle: Self::Handle, state: PipelineState) {
        self.finished.push(state);
    }
}
