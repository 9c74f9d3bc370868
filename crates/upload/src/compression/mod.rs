//! Gzip support for stored payloads.
//!
//! - [`GzipCodec`] / [`Gzip`]: compress payloads and measure gzip input with `flate2`
//! - [`Compressibility`] / [`GzipHeuristic`]: decide whether compressing is worth trying

use bytes::{Bytes, BytesMut};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::io;
use std::io::Write;
use tracing::trace;

mod heuristic;
pub use heuristic::GzipHeuristic;

/// Compresses whole payloads and measures gzip-encoded ones.
#[cfg_attr(test, mockall::automock)]
pub trait GzipCodec: Send + Sync {
    /// Gzip-compresses `data`.
    fn compress(&self, data: &[u8]) -> io::Result<Bytes>;

    /// Returns the decompressed length of gzip-encoded `data`.
    ///
    /// The inflated content is streamed into a sink and never held in memory.
    fn decompressed_len(&self, data: &[u8]) -> io::Result<u64>;
}

/// Tells whether a payload is worth storing gzip-compressed.
#[cfg_attr(test, mockall::automock)]
pub trait Compressibility: Send + Sync {
    /// `ext` is the lowercase file extension including the dot, or empty;
    /// `mime_type` is the effective mime type, or empty.
    fn is_gzippable(&self, ext: &str, mime_type: &str, data: &[u8]) -> bool;
}

/// [`GzipCodec`] backed by `flate2`.
#[derive(Debug, Clone, Copy)]
pub struct Gzip {
    level: Compression,
}

impl Gzip {
    pub fn new(level: Compression) -> Self {
        Self { level }
    }
}

impl Default for Gzip {
    /// Ingest favors speed over ratio.
    fn default() -> Self {
        Self::new(Compression::fast())
    }
}

impl GzipCodec for Gzip {
    fn compress(&self, data: &[u8]) -> io::Result<Bytes> {
        let mut encoder = GzEncoder::new(Writer::with_capacity(data.len() / 2), self.level);
        encoder.write_all(data)?;
        let bytes = encoder.finish()?.take();
        trace!(from = data.len(), to = bytes.len(), "gzip compressed payload");
        Ok(bytes)
    }

    fn decompressed_len(&self, data: &[u8]) -> io::Result<u64> {
        let len = io::copy(&mut GzDecoder::new(data), &mut io::sink())?;
        trace!(from = data.len(), to = len, "measured gzip payload");
        Ok(len)
    }
}

// inspired by actix-http
struct Writer {
    buf: BytesMut,
}

impl Writer {
    fn with_capacity(capacity: usize) -> Self {
        Self { buf: BytesMut::with_capacity(capacity) }
    }

    fn take(&mut self) -> Bytes {
        self.buf.split().freeze()
    }
}

impl io::Write for Writer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
