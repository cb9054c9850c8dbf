//! Chunked transcode loop.
//!
//! Reads a source in chunks, pushes each through a [`FilterChain`] as a
//! non-final chunk, then pushes one empty final chunk so every stage
//! flushes its residue. Output is written as soon as the chain produces it.

use crate::error::{Error, Result};
use crate::metrics::Metrics;
use crate::pipeline::FilterChain;
use std::io::{self, Read, Write};
use tracing::{debug, info};

/// Chunk size used when the caller has no preference.
pub const DEFAULT_CHUNK_BYTES: usize = 4096;

/// Length and CRC-32 of a byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Digest {
    pub len: u64,
    pub crc32: u32,
}

impl Digest {
    /// Digest of an in-memory buffer.
    pub fn of(data: &[u8]) -> Self {
        Self {
            len: data.len() as u64,
            crc32: crc32fast::hash(data),
        }
    }
}

/// Run `source` through `chain` into `sink`.
///
/// Updates `metrics` with byte counts, checksums and per-stage statistics.
///
/// # Errors
/// - `Error::Config` if `chunk_bytes` is zero
/// - `Error::Io` on read or write failure
/// - Any error raised by a stage; the sink may hold partial output
pub fn transcode<R: Read, W: Write>(
    mut source: R,
    mut sink: W,
    chain: &mut FilterChain,
    chunk_bytes: usize,
    metrics: &mut Metrics,
) -> Result<()> {
    if chunk_bytes == 0 {
        return Err(Error::Config("chunk size must be at least 1 byte".to_string()));
    }

    let mut input_crc = crc32fast::Hasher::new();
    let mut output_crc = crc32fast::Hasher::new();
    let mut chunk = vec![0u8; chunk_bytes];
    let mut produced = Vec::new();

    loop {
        let n = match source.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };

        let data = &chunk[..n];
        input_crc.update(data);
        metrics.input_bytes += n as u64;
        metrics.chunks_read += 1;

        produced.clear();
        chain.apply(data, &mut produced, false)?;
        sink.write_all(&produced)?;
        output_crc.update(&produced);
        metrics.output_bytes += produced.len() as u64;
    }

    debug!(chunks = metrics.chunks_read, "source exhausted");

    produced.clear();
    chain.apply(&[], &mut produced, true)?;
    sink.write_all(&produced)?;
    sink.flush()?;
    output_crc.update(&produced);
    metrics.output_bytes += produced.len() as u64;

    metrics.input_crc32 = input_crc.finalize();
    metrics.output_crc32 = output_crc.finalize();
    metrics.stages = chain.stats().to_vec();
    metrics.complete();

    info!(
        input_bytes = metrics.input_bytes,
        output_bytes = metrics.output_bytes,
        duration_ms = metrics.duration().as_millis() as u64,
        "transcode complete"
    );
    Ok(())
}

/// Run `source` through `chain` and digest the output without storing it.
pub fn digest_through<R: Read>(source: R, chain: &mut FilterChain, chunk_bytes: usize) -> Result<Digest> {
    let mut metrics = Metrics::new();
    transcode(source, io::sink(), chain, chunk_bytes, &mut metrics)?;
    Ok(Digest {
        len: metrics.output_bytes,
        crc32: metrics.output_crc32,
    })
}
