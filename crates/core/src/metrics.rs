//! Metrics collection and reporting for a transcode run.
//!
//! This module provides observable insights into a run:
//! - Throughput (bytes in/out)
//! - Compression ratio
//! - Per-stage byte counts
//! - Stream checksums and verification outcome
//!
//! # Design
//!
//! Metrics are a plain struct updated explicitly by the driver at each step.
//! Everything is single-threaded; nothing here is shared between runs.

use crate::pipeline::StageStats;
use std::time::{Duration, Instant};

/// Metrics for one transcode.
#[derive(Debug, Clone)]
pub struct Metrics {
    // === Timing ===
    /// When the transcode started
    pub start_time: Instant,

    /// When the transcode ended (set on completion)
    pub end_time: Option<Instant>,

    // === Input/Output ===
    /// Total bytes read from the source
    pub input_bytes: u64,

    /// Total bytes written to the sink
    pub output_bytes: u64,

    /// Number of non-final chunks pushed through the chain
    pub chunks_read: u64,

    /// CRC-32 of everything read
    pub input_crc32: u32,

    /// CRC-32 of everything written
    pub output_crc32: u32,

    // === Stages ===
    /// Byte counts per stage, in chain order
    pub stages: Vec<StageStats>,

    // === Verification ===
    /// Outcome of the round-trip check, if one was run
    pub verified: Option<bool>,
}

impl Metrics {
    /// Create new metrics with start time set to now.
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            end_time: None,
            input_bytes: 0,
            output_bytes: 0,
            chunks_read: 0,
            input_crc32: 0,
            output_crc32: 0,
            stages: Vec::new(),
            verified: None,
        }
    }

    /// Mark the transcode as complete.
    pub fn complete(&mut self) {
        self.end_time = Some(Instant::now());
    }

    /// Get total duration (or current elapsed if not complete).
    pub fn duration(&self) -> Duration {
        match self.end_time {
            Some(end) => end.duration_since(self.start_time),
            None => self.start_time.elapsed(),
        }
    }

    /// Compute size ratio (output / input).
    ///
    /// Returns 0.0 if nothing was read.
    pub fn compression_ratio(&self) -> f64 {
        if self.input_bytes == 0 {
            0.0
        } else {
            self.output_bytes as f64 / self.input_bytes as f64
        }
    }

    /// Compute throughput in input bytes/second.
    pub fn throughput_bps(&self) -> f64 {
        let duration_secs = self.duration().as_secs_f64();
        if duration_secs == 0.0 {
            0.0
        } else {
            self.input_bytes as f64 / duration_secs
        }
    }

    /// Print a human-readable summary to stdout.
    pub fn print_summary(&self) {
        let duration_ms = self.duration().as_millis();

        println!("\n=== Transcode Summary ===");
        println!("Duration: {} ms", duration_ms);
        println!();

        println!("Input:  {} bytes (crc32 {:08x})", self.input_bytes, self.input_crc32);
        println!("Output: {} bytes (crc32 {:08x})", self.output_bytes, self.output_crc32);
        println!("Ratio:  {:.1}%", self.compression_ratio() * 100.0);
        println!("Chunks: {}", self.chunks_read);
        println!();

        if !self.stages.is_empty() {
            println!("=== Stages ===");
            for stage in &self.stages {
                println!(
                    "{:<16} {:>12} -> {:>12} bytes",
                    stage.name, stage.bytes_in, stage.bytes_out
                );
            }
            println!();
        }

        match self.verified {
            Some(true) => println!("Verification: PASSED ✓"),
            Some(false) => println!("Verification: FAILED ✗"),
            None => {}
        }

        println!("Throughput: {:.2} MB/s", self.throughput_bps() / 1_000_000.0);
        println!();
    }

    /// Export metrics as a simple text format (for parsing/testing).
    pub fn export_text(&self) -> String {
        let mut text = format!(
            "duration_ms={}\n\
             input_bytes={}\n\
             output_bytes={}\n\
             chunks_read={}\n\
             input_crc32={:08x}\n\
             output_crc32={:08x}\n\
             compression_ratio={:.4}\n",
            self.duration().as_millis(),
            self.input_bytes,
            self.output_bytes,
            self.chunks_read,
            self.input_crc32,
            self.output_crc32,
            self.compression_ratio(),
        );
        for stage in &self.stages {
            text.push_str(&format!(
                "stage.{}={}/{}\n",
                stage.name, stage.bytes_in, stage.bytes_out
            ));
        }
        if let Some(verified) = self.verified {
            text.push_str(&format!("verified={}\n", verified));
        }
        text
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new();
        assert!(metrics.end_time.is_none());
        assert!(metrics.verified.is_none());
        assert!(metrics.duration().as_millis() < 100); // Should be recent
    }

    #[test]
    fn test_compression_ratio() {
        let mut metrics = Metrics::new();
        assert_eq!(metrics.compression_ratio(), 0.0);

        metrics.input_bytes = 1000;
        metrics.output_bytes = 750;
        assert_eq!(metrics.compression_ratio(), 0.75);
    }

    #[test]
    fn test_throughput() {
        let mut metrics = Metrics::new();
        metrics.input_bytes = 1_000_000;

        std::thread::sleep(Duration::from_millis(20));
        metrics.complete();

        assert!(metrics.throughput_bps() > 0.0);
    }

    #[test]
    fn test_export_text() {
        let mut metrics = Metrics::new();
        metrics.input_bytes = 1000;
        metrics.output_bytes = 400;
        metrics.input_crc32 = 0xDEADBEEF;
        metrics.stages.push(StageStats {
            name: "rle-encode".to_string(),
            bytes_in: 1000,
            bytes_out: 400,
        });
        metrics.verified = Some(true);

        let text = metrics.export_text();
        assert!(text.contains("input_bytes=1000"));
        assert!(text.contains("output_bytes=400"));
        assert!(text.contains("input_crc32=deadbeef"));
        assert!(text.contains("stage.rle-encode=1000/400"));
        assert!(text.contains("verified=true"));
    }
}
