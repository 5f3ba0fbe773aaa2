use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use super::{ByteChunk, ChunkSink};

/// Writes the compressed stream to a scratch file next to the output path and
/// renames it into place on commit.
///
/// Until [`commit`](ChunkSink::commit) succeeds nothing exists at the output
/// path, so an interrupted job can never leave a truncated artifact there.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    scratch: Option<NamedTempFile>,
    committed: bool,
}

impl FileSink {
    /// Prepares a sink publishing to `path`.
    ///
    /// A stale artifact already at `path` is removed first, as opening a
    /// truncating writer would.
    pub fn create(path: &Path) -> io::Result<Self> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        if remove_if_present(path)? {
            debug!(target: "compressor::cleanup", path = %path.display(), "removed stale output");
        }
        let scratch = tempfile::Builder::new()
            .prefix(".compressor-")
            .suffix(".partial")
            .tempfile_in(dir)?;
        Ok(Self {
            path: path.to_path_buf(),
            scratch: Some(scratch),
            committed: false,
        })
    }

    /// Location of the scratch file while the job is in flight.
    #[must_use]
    pub fn scratch_path(&self) -> Option<&Path> {
        self.scratch.as_ref().map(NamedTempFile::path)
    }

    fn scratch_mut(&mut self) -> io::Result<&mut NamedTempFile> {
        self.scratch
            .as_mut()
            .ok_or_else(|| io::Error::other("sink already closed"))
    }
}

impl ChunkSink for FileSink {
    fn location(&self) -> &Path {
        &self.path
    }

    fn write_chunk(&mut self, chunk: ByteChunk) -> io::Result<()> {
        self.scratch_mut()?.write_all(chunk.as_slice())
    }

    fn commit(&mut self) -> io::Result<()> {
        let mut scratch = self
            .scratch
            .take()
            .ok_or_else(|| io::Error::other("sink already closed"))?;
        scratch.flush()?;
        scratch.as_file().sync_all()?;
        match scratch.persist(&self.path) {
            Ok(_file) => {
                self.committed = true;
                Ok(())
            }
            Err(err) => {
                // Keep the scratch file so discard can still remove it.
                self.scratch = Some(err.file);
                Err(err.error)
            }
        }
    }

    fn discard(&mut self) -> io::Result<()> {
        if self.committed {
            return Ok(());
        }
        if let Some(scratch) = self.scratch.take() {
            scratch.close()?;
        }
        remove_if_present(&self.path)?;
        Ok(())
    }
}

fn remove_if_present(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_appears_only_after_commit() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("data.bin.gz");
        let mut sink = FileSink::create(&target).unwrap();

        sink.write_chunk(ByteChunk::new(b"hello ".to_vec())).unwrap();
        sink.write_chunk(ByteChunk::new(b"world".to_vec())).unwrap();
        assert!(!target.exists());
        assert!(sink.scratch_path().unwrap().exists());

        sink.commit().unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"hello world");
        assert!(sink.scratch_path().is_none());
    }

    #[test]
    fn discard_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("data.bin.gz");
        let mut sink = FileSink::create(&target).unwrap();
        sink.write_chunk(ByteChunk::new(vec![1; 128])).unwrap();
        let scratch = sink.scratch_path().unwrap().to_path_buf();

        sink.discard().unwrap();
        assert!(!target.exists());
        assert!(!scratch.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn discard_after_commit_keeps_output() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("kept.gz");
        let mut sink = FileSink::create(&target).unwrap();
        sink.write_chunk(ByteChunk::new(vec![3; 4])).unwrap();
        sink.commit().unwrap();
        sink.discard().unwrap();
        assert!(target.exists());
    }

    #[test]
    fn stale_output_is_removed_on_create() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("stale.gz");
        fs::write(&target, b"old run").unwrap();
        let mut sink = FileSink::create(&target).unwrap();
        assert!(!target.exists());
        sink.discard().unwrap();
        assert!(!target.exists());
    }

    #[test]
    fn writes_after_close_fail() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = FileSink::create(&dir.path().join("x.gz")).unwrap();
        sink.discard().unwrap();
        assert!(sink.write_chunk(ByteChunk::new(vec![0])).is_err());
        assert!(sink.commit().is_err());
    }

    #[test]
    fn missing_directory_fails_to_create() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("missing").join("x.gz");
        assert!(FileSink::create(&target).is_err());
    }
}
