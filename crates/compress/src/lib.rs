#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `compress` exposes the codec primitives used by the compressor pipeline.
//! The pipeline compresses one input file as a single continuous gzip member,
//! so the crate centres on a streaming encoder that keeps its deflate state
//! alive across arbitrarily spaced calls.
//!
//! # Design
//!
//! The [`gzip`] module wraps [`flate2`](https://docs.rs/flate2) with counting
//! encoder and decoder types. Callers feed raw bytes incrementally and drain
//! the compressed output from the sink they supplied, while the wrapper tracks
//! totals for diagnostics and progress reporting.
//!
//! # Invariants
//!
//! - The gzip header never carries a timestamp or file name, so the same input
//!   always yields the same output bytes.
//! - Output for a given sequence of [`gzip::CountingGzipEncoder::write`] calls
//!   does not depend on how much time passed between them, nor on when the
//!   caller drains the sink.
//! - Streams are finalised explicitly via
//!   [`gzip::CountingGzipEncoder::finish_into_inner`], which emits the trailer
//!   and reports the final compressed length.
//!
//! # Errors
//!
//! Encoder and decoder functions return [`std::io::Result`]. Invalid numeric
//! levels are reported through [`CompressionLevelError`].
//!
//! # Examples
//!
//! ```
//! use compress::gzip::{CountingGzipEncoder, decompress_to_vec};
//! use compress::CompressionLevel;
//!
//! # fn main() -> std::io::Result<()> {
//! let mut encoder = CountingGzipEncoder::with_sink(Vec::new(), CompressionLevel::Best);
//! encoder.write(b"streaming ")?;
//! encoder.write(b"example payload")?;
//! let (compressed, compressed_len) = encoder.finish_into_inner()?;
//! assert_eq!(compressed.len() as u64, compressed_len);
//! assert_eq!(decompress_to_vec(&compressed)?, b"streaming example payload");
//! # Ok(())
//! # }
//! ```

mod counting;
pub mod gzip;
mod level;

pub use counting::CountingSink;
pub use level::{CompressionLevel, CompressionLevelError};

/// File name suffix appended to compressed artifacts.
pub const GZIP_SUFFIX: &str = ".gz";
