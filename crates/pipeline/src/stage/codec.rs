use std::io;

use compress::CompressionLevel;
use compress::gzip::CountingGzipEncoder;
use tracing::debug;

use super::ByteChunk;

/// Stateful gzip transform over the whole input.
///
/// One encoder lives for the entire job, so the output is a single gzip
/// member regardless of when chunks arrive. Suspending delivery is simply
/// not calling [`compress`](Self::compress); nothing is reset.
pub struct Codec {
    encoder: Option<CountingGzipEncoder<Vec<u8>>>,
    compressed_bytes: u64,
}

impl Codec {
    /// Creates a codec at `level`.
    #[must_use]
    pub fn new(level: CompressionLevel) -> Self {
        debug!(target: "compressor::codec", level = level.as_u32(), "gzip stream opened");
        Self {
            encoder: Some(CountingGzipEncoder::with_sink(Vec::new(), level)),
            compressed_bytes: 0,
        }
    }

    /// Feeds one raw chunk and returns whatever compressed bytes are ready.
    ///
    /// The returned chunk may be empty while deflate is still buffering.
    pub fn compress(&mut self, chunk: ByteChunk) -> io::Result<ByteChunk> {
        let encoder = self.encoder.as_mut().ok_or_else(finished)?;
        encoder.write(chunk.as_slice())?;
        let ready = std::mem::take(encoder.get_mut());
        self.compressed_bytes = encoder.bytes_written();
        Ok(ByteChunk::new(ready))
    }

    /// Ends the stream and returns the remaining bytes, trailer included.
    pub fn finish(&mut self) -> io::Result<ByteChunk> {
        let encoder = self.encoder.take().ok_or_else(finished)?;
        let (rest, total) = encoder.finish_into_inner()?;
        self.compressed_bytes = total;
        debug!(target: "compressor::codec", compressed_bytes = total, "stream finished");
        Ok(ByteChunk::new(rest))
    }

    /// Compressed bytes produced so far.
    #[must_use]
    pub const fn compressed_bytes(&self) -> u64 {
        self.compressed_bytes
    }
}

impl std::fmt::Debug for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Codec")
            .field("finished", &self.encoder.is_none())
            .field("compressed_bytes", &self.compressed_bytes)
            .finish()
    }
}

fn finished() -> io::Error {
    io::Error::other("compression stream already finished")
}

#[cfg(test)]
mod tests {
    use super::*;
    use compress::gzip::decompress_to_vec;

    fn run(codec: &mut Codec, input: &[u8], chunk: usize) -> Vec<u8> {
        let mut out = Vec::new();
        for piece in input.chunks(chunk) {
            out.extend(codec.compress(ByteChunk::new(piece.to_vec())).unwrap().into_vec());
        }
        out.extend(codec.finish().unwrap().into_vec());
        out
    }

    #[test]
    fn output_decodes_to_input() {
        let input = b"abcdefghij".repeat(10_000);
        let mut codec = Codec::new(CompressionLevel::Best);
        let out = run(&mut codec, &input, 4096);
        assert_eq!(decompress_to_vec(&out).unwrap(), input);
        assert_eq!(codec.compressed_bytes(), out.len() as u64);
    }

    #[test]
    fn same_chunks_same_bytes() {
        let input: Vec<u8> = (0..200_000u32).map(|i| (i % 7) as u8).collect();
        let a = run(&mut Codec::new(CompressionLevel::Best), &input, 65_536);
        let b = run(&mut Codec::new(CompressionLevel::Best), &input, 65_536);
        assert_eq!(a, b);
    }

    #[test]
    fn use_after_finish_is_an_error() {
        let mut codec = Codec::new(CompressionLevel::Best);
        codec.finish().unwrap();
        assert!(codec.compress(ByteChunk::new(vec![1])).is_err());
        assert!(codec.finish().is_err());
    }
}
