//! # Overview
//!
//! Gzip helpers for the compressor pipeline. [`CountingGzipEncoder`] accepts
//! incremental input and forwards compressed bytes to a caller-provided sink
//! while tracking how many compressed bytes were produced. The deflate state
//! lives inside the encoder, so a caller may stop feeding it for any length of
//! time and continue later without disturbing the stream.
//!
//! # Examples
//!
//! Compress data incrementally into a buffer and decode it again:
//!
//! ```
//! use compress::CompressionLevel;
//! use compress::gzip::{CountingGzipEncoder, decompress_to_vec};
//!
//! let mut encoder = CountingGzipEncoder::with_sink(Vec::new(), CompressionLevel::Best);
//! encoder.write(b"pay").unwrap();
//! encoder.write(b"load").unwrap();
//! let (compressed, _) = encoder.finish_into_inner().unwrap();
//! assert_eq!(decompress_to_vec(&compressed).unwrap(), b"payload");
//! ```

use std::io::{self, IoSliceMut, Read, Write};

use flate2::{read::MultiGzDecoder, write::GzEncoder};

use crate::counting::{CountingSink, CountingWriter};
use crate::level::CompressionLevel;

/// Streaming gzip encoder that records the number of compressed bytes produced.
pub struct CountingGzipEncoder<W = CountingSink>
where
    W: Write,
{
    inner: GzEncoder<CountingWriter<W>>,
}

impl CountingGzipEncoder<CountingSink> {
    /// Creates a new encoder that discards the compressed output while tracking its length.
    #[must_use]
    pub fn new(level: CompressionLevel) -> Self {
        Self::with_sink(CountingSink, level)
    }

    /// Completes the stream and returns the total number of compressed bytes generated.
    pub fn finish(self) -> io::Result<u64> {
        let (_sink, bytes) = self.finish_into_inner()?;
        Ok(bytes)
    }
}

impl<W> CountingGzipEncoder<W>
where
    W: Write,
{
    /// Creates a new encoder that writes compressed bytes into `sink`.
    pub fn with_sink(sink: W, level: CompressionLevel) -> Self {
        Self {
            inner: GzEncoder::new(CountingWriter::new(sink), level.into()),
        }
    }

    /// Appends data to the compression stream.
    pub fn write(&mut self, input: &[u8]) -> io::Result<()> {
        self.inner.write_all(input)
    }

    /// Returns the number of compressed bytes forwarded to the sink so far.
    ///
    /// Deflate buffers internally, so this lags behind the input until
    /// [`finish_into_inner`](Self::finish_into_inner) drains the stream.
    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.inner.get_ref().bytes()
    }

    /// Provides immutable access to the underlying sink.
    #[must_use]
    pub fn get_ref(&self) -> &W {
        self.inner.get_ref().inner_ref()
    }

    /// Provides mutable access to the underlying sink.
    ///
    /// Draining bytes out of the sink does not affect the compression state.
    pub fn get_mut(&mut self) -> &mut W {
        self.inner.get_mut().inner_mut()
    }

    /// Completes the stream and returns the sink together with the number of compressed bytes.
    pub fn finish_into_inner(self) -> io::Result<(W, u64)> {
        let writer = self.inner.finish()?;
        Ok(writer.into_parts())
    }
}

impl<W: Write> Write for CountingGzipEncoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Streaming gzip decoder that records the number of decompressed bytes produced.
///
/// Concatenated gzip members are decoded back to back.
pub struct CountingGzipDecoder<R> {
    inner: MultiGzDecoder<R>,
    bytes: u64,
}

impl<R: Read> CountingGzipDecoder<R> {
    /// Creates a new decoder that wraps the provided reader.
    pub fn new(reader: R) -> Self {
        Self {
            inner: MultiGzDecoder::new(reader),
            bytes: 0,
        }
    }

    /// Returns the number of decompressed bytes read so far.
    #[must_use]
    pub const fn bytes_read(&self) -> u64 {
        self.bytes
    }

    /// Consumes the decoder and returns the wrapped reader.
    pub fn into_inner(self) -> R {
        self.inner.into_inner()
    }
}

impl<R: Read> Read for CountingGzipDecoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = self.inner.read(buf)?;
        self.bytes = self.bytes.saturating_add(read as u64);
        Ok(read)
    }

    fn read_vectored(&mut self, bufs: &mut [IoSliceMut<'_>]) -> io::Result<usize> {
        let read = self.inner.read_vectored(bufs)?;
        self.bytes = self.bytes.saturating_add(read as u64);
        Ok(read)
    }
}

/// Compresses `input` into a new [`Vec`] as a single gzip member.
pub fn compress_to_vec(input: &[u8], level: CompressionLevel) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), level.into());
    encoder.write_all(input)?;
    encoder.finish()
}

/// Decompresses `input` into a new [`Vec`].
pub fn decompress_to_vec(input: &[u8]) -> io::Result<Vec<u8>> {
    let mut decoder = CountingGzipDecoder::new(input);
    let mut output = Vec::new();
    io::copy(&mut decoder, &mut output)?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counting_encoder_tracks_bytes() {
        let mut encoder = CountingGzipEncoder::new(CompressionLevel::Default);
        encoder.write(b"payload").expect("compress payload");
        let compressed = encoder.finish().expect("finish stream");
        assert!(compressed > 0);
    }

    #[test]
    fn encoder_with_sink_forwards_bytes() {
        let mut encoder = CountingGzipEncoder::with_sink(Vec::new(), CompressionLevel::Best);
        encoder.write(b"payload").expect("compress payload");
        let (compressed, bytes) = encoder.finish_into_inner().expect("finish stream");
        assert_eq!(bytes as usize, compressed.len());
    }

    #[test]
    fn output_starts_with_gzip_magic() {
        let compressed = compress_to_vec(b"abc", CompressionLevel::Best).expect("compress");
        assert_eq!(&compressed[..2], &[0x1f, 0x8b]);
    }

    #[test]
    fn header_carries_no_timestamp() {
        let compressed = compress_to_vec(b"abc", CompressionLevel::Best).expect("compress");
        assert_eq!(&compressed[4..8], &[0, 0, 0, 0]);
    }

    #[test]
    fn drained_sink_continues_same_stream() {
        let input = b"The quick brown fox jumps over the lazy dog".repeat(64);
        let mut encoder = CountingGzipEncoder::with_sink(Vec::new(), CompressionLevel::Best);
        let mut collected = Vec::new();
        for chunk in input.chunks(97) {
            encoder.write(chunk).expect("write chunk");
            collected.append(encoder.get_mut());
        }
        let (tail, total) = encoder.finish_into_inner().expect("finish");
        collected.extend_from_slice(&tail);

        let mut undrained = CountingGzipEncoder::with_sink(Vec::new(), CompressionLevel::Best);
        for chunk in input.chunks(97) {
            undrained.write(chunk).expect("write chunk");
        }
        let (expected, _) = undrained.finish_into_inner().expect("finish");

        assert_eq!(collected.len() as u64, total);
        assert_eq!(collected, expected);
        assert_eq!(decompress_to_vec(&collected).expect("decode"), input);
    }

    #[test]
    fn decoder_tracks_bytes() {
        let compressed = compress_to_vec(b"payload", CompressionLevel::Default).expect("compress");
        let mut decoder = CountingGzipDecoder::new(&compressed[..]);
        let mut output = Vec::new();
        decoder.read_to_end(&mut output).expect("decompress");
        assert_eq!(output, b"payload");
        assert_eq!(decoder.bytes_read(), output.len() as u64);
    }
}
