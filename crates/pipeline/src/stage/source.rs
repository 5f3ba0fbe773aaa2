use std::fs::File;
use std::io::{self, Read};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use super::{ByteChunk, ChunkSource};

/// Reads an input file in fixed-size chunks.
///
/// The size reported by the file's metadata at open time is authoritative:
/// the source never yields more than that many bytes, even if the file grows
/// while being read. A file that shrinks below that size fails with
/// [`io::ErrorKind::UnexpectedEof`] instead of ending early.
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    reader: io::Take<File>,
    total_bytes: u64,
    chunk_size: NonZeroUsize,
}

impl FileSource {
    /// Opens `path` for sequential reading.
    pub fn open(path: &Path, chunk_size: NonZeroUsize) -> io::Result<Self> {
        let file = File::open(path)?;
        let total_bytes = file.metadata()?.len();
        Ok(Self {
            path: path.to_path_buf(),
            reader: file.take(total_bytes),
            total_bytes,
            chunk_size,
        })
    }

    /// Path the source reads from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ChunkSource for FileSource {
    fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    fn next_chunk(&mut self) -> io::Result<Option<ByteChunk>> {
        let want = self.chunk_size.get();
        let mut buf = Vec::with_capacity(want);
        // Fill the chunk completely unless EOF intervenes, so chunk boundaries
        // depend only on the input and not on short reads.
        (&mut self.reader).take(want as u64).read_to_end(&mut buf)?;
        if buf.is_empty() {
            let missing = self.reader.limit();
            if missing > 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!(
                        "input shrank while reading: {missing} of {} bytes missing",
                        self.total_bytes
                    ),
                ));
            }
            Ok(None)
        } else {
            Ok(Some(ByteChunk::new(buf)))
        }
    }
}
