//! Filter chain composition and format selection.
//!
//! A [`FilterChain`] strings [`Stage`]s together: stage *i*'s output is
//! stage *i+1*'s input, in declared order. Two swap buffers carry the data
//! between stages and are overwritten on every call; only the stages keep
//! state across calls.
//!
//! # State Machine
//!
//! ```text
//! Streaming --(apply, is_final)--> Flushing --(returns)--> Done
//! ```
//!
//! During the final call every stage receives `is_final = true` in order, so
//! residue from an early stage still flows through the later ones. A chain
//! that returned an error is also `Done`.

use crate::error::{PipelineError, Result};
use crate::filter::{Filter, Stage};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, info};

/// Format selector for one side of a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Bytes as-is
    Raw,
    /// Run-length encoded image rows
    Rle,
    /// Huffman unit
    Huffman,
    /// Run-length encoded, then Huffman coded
    RleHuffman,
    /// Plain-text pixel image (handled outside the filter chain)
    Ppm,
}

impl Format {
    /// Stages that turn raw bytes into this format.
    pub fn encode_stages(self) -> Result<Vec<Stage>> {
        match self {
            Format::Raw => Ok(Vec::new()),
            Format::Rle => Ok(vec![Stage::rle_encode()]),
            Format::Huffman => Ok(vec![Stage::huffman_encode()]),
            Format::RleHuffman => Ok(vec![Stage::rle_encode(), Stage::huffman_encode()]),
            Format::Ppm => Err(PipelineError::UnsupportedFormat(self.to_string()).into()),
        }
    }

    /// Stages that turn this format back into raw bytes.
    ///
    /// The reverse of [`Format::encode_stages`], in reverse order.
    pub fn decode_stages(self) -> Result<Vec<Stage>> {
        match self {
            Format::Raw => Ok(Vec::new()),
            Format::Rle => Ok(vec![Stage::rle_decode()]),
            Format::Huffman => Ok(vec![Stage::huffman_decode()]),
            Format::RleHuffman => Ok(vec![Stage::huffman_decode(), Stage::rle_decode()]),
            Format::Ppm => Err(PipelineError::UnsupportedFormat(self.to_string()).into()),
        }
    }

    /// Whether this format carries run-length encoded image rows.
    pub fn is_image(self) -> bool {
        matches!(self, Format::Rle | Format::RleHuffman | Format::Ppm)
    }
}

impl FromStr for Format {
    type Err = PipelineError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "raw" => Ok(Format::Raw),
            "rle" => Ok(Format::Rle),
            "huffman" => Ok(Format::Huffman),
            "rle+huffman" => Ok(Format::RleHuffman),
            "ppm" => Ok(Format::Ppm),
            other => Err(PipelineError::UnknownFormat(other.to_string())),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Format::Raw => "raw",
            Format::Rle => "rle",
            Format::Huffman => "huffman",
            Format::RleHuffman => "rle+huffman",
            Format::Ppm => "ppm",
        })
    }
}

/// Chain lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainState {
    /// Accepting non-final chunks
    Streaming,
    /// Inside the final call
    Flushing,
    /// Final call returned; terminal
    Done,
}

/// Byte counts for one stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageStats {
    pub name: String,
    pub bytes_in: u64,
    pub bytes_out: u64,
}

/// Ordered composition of stages, applied chunk by chunk.
#[derive(Debug)]
pub struct FilterChain {
    stages: Vec<Stage>,
    stats: Vec<StageStats>,
    state: ChainState,
    /// Output of the previous stage
    front: Vec<u8>,
    /// Output of the current stage
    back: Vec<u8>,
}

impl Default for FilterChain {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterChain {
    /// Create an empty chain (pure copy-through).
    pub fn new() -> Self {
        Self::from_stages(Vec::new())
    }

    /// Create a chain from stages in application order.
    pub fn from_stages(stages: Vec<Stage>) -> Self {
        let stats = stages
            .iter()
            .map(|stage| StageStats {
                name: stage.name().to_string(),
                ..StageStats::default()
            })
            .collect();
        Self {
            stages,
            stats,
            state: ChainState::Streaming,
            front: Vec::new(),
            back: Vec::new(),
        }
    }

    /// Build the chain converting `input` into `output`: decode stages of
    /// the input format followed by encode stages of the output format.
    pub fn for_conversion(input: Format, output: Format) -> Result<Self> {
        let mut stages = input.decode_stages()?;
        stages.extend(output.encode_stages()?);

        let chain = Self::from_stages(stages);
        info!(
            %input,
            %output,
            stages = ?chain.stage_names(),
            "filter chain built"
        );
        Ok(chain)
    }

    /// Attach a Graphviz export path to every Huffman encoder in the chain.
    pub fn with_dot_path(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        for stage in &mut self.stages {
            if let Stage::HuffmanEncode(encoder) = stage {
                *encoder = std::mem::take(encoder).with_dot_path(path.clone());
            }
        }
        self
    }

    /// Add a stage at the end of the chain.
    pub fn push(&mut self, stage: Stage) {
        self.stats.push(StageStats {
            name: stage.name().to_string(),
            ..StageStats::default()
        });
        self.stages.push(stage);
    }

    /// Get number of stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Check if chain is empty.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn state(&self) -> ChainState {
        self.state
    }

    /// Per-stage byte counts so far.
    pub fn stats(&self) -> &[StageStats] {
        &self.stats
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Push one chunk through every stage, appending the chain's output to
    /// `output`.
    ///
    /// # Errors
    /// - `PipelineError::Finished` if the chain is already `Done`
    /// - Any error a stage reports; the chain is `Done` afterwards
    pub fn apply(&mut self, input: &[u8], output: &mut Vec<u8>, is_final: bool) -> Result<()> {
        if self.state == ChainState::Done {
            return Err(PipelineError::Finished.into());
        }
        if is_final {
            self.state = ChainState::Flushing;
            debug!(stages = self.stages.len(), "flushing filter chain");
        }

        let result = self.run_stages(input, output, is_final);
        if result.is_err() || is_final {
            self.state = ChainState::Done;
        }
        result
    }

    fn run_stages(&mut self, input: &[u8], output: &mut Vec<u8>, is_final: bool) -> Result<()> {
        if self.stages.is_empty() {
            output.extend_from_slice(input);
            return Ok(());
        }

        for (i, stage) in self.stages.iter_mut().enumerate() {
            self.back.clear();
            let source: &[u8] = if i == 0 { input } else { &self.front };
            stage.apply(source, &mut self.back, is_final)?;

            let stats = &mut self.stats[i];
            stats.bytes_in += source.len() as u64;
            stats.bytes_out += self.back.len() as u64;
            if is_final {
                debug!(
                    stage = stage.name(),
                    bytes_in = stats.bytes_in,
                    bytes_out = stats.bytes_out,
                    "stage flushed"
                );
            }

            std::mem::swap(&mut self.front, &mut self.back);
        }

        output.extend_from_slice(&self.front);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, ErrorKind};
    use crate::rle::raw_image;

    fn run_chunked(chain: &mut FilterChain, data: &[u8], chunk: usize) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        for piece in data.chunks(chunk) {
            chain.apply(piece, &mut output, false)?;
        }
        chain.apply(&[], &mut output, true)?;
        Ok(output)
    }

    fn sample_image() -> Vec<u8> {
        let pixels: Vec<u8> = (0..16 * 8)
            .flat_map(|i: u32| {
                let shade = (i / 5) as u8;
                [shade, shade, 200]
            })
            .collect();
        raw_image(16, 8, &pixels)
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("raw".parse::<Format>().unwrap(), Format::Raw);
        assert_eq!("rle+huffman".parse::<Format>().unwrap(), Format::RleHuffman);
        assert_eq!(Format::RleHuffman.to_string(), "rle+huffman");
        assert!(matches!(
            "gif".parse::<Format>(),
            Err(PipelineError::UnknownFormat(_))
        ));
    }

    #[test]
    fn test_ppm_unsupported() {
        let err = FilterChain::for_conversion(Format::Ppm, Format::Raw).unwrap_err();
        assert!(matches!(
            err,
            Error::Pipeline(PipelineError::UnsupportedFormat(_))
        ));
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_stage_order() {
        let chain = FilterChain::for_conversion(Format::Raw, Format::RleHuffman).unwrap();
        assert_eq!(chain.stage_names(), vec!["rle-encode", "huffman-encode"]);

        let chain = FilterChain::for_conversion(Format::RleHuffman, Format::Raw).unwrap();
        assert_eq!(chain.stage_names(), vec!["huffman-decode", "rle-decode"]);

        let chain = FilterChain::for_conversion(Format::Huffman, Format::Rle).unwrap();
        assert_eq!(chain.stage_names(), vec!["huffman-decode", "rle-encode"]);
    }

    #[test]
    fn test_empty_chain_copies() {
        let mut chain = FilterChain::new();
        assert!(chain.is_empty());
        let output = run_chunked(&mut chain, b"copy me through", 4).unwrap();
        assert_eq!(output, b"copy me through");
    }

    #[test]
    fn test_state_transitions() {
        let mut chain = FilterChain::for_conversion(Format::Raw, Format::Huffman).unwrap();
        let mut output = Vec::new();
        assert_eq!(chain.state(), ChainState::Streaming);

        chain.apply(b"abc", &mut output, false).unwrap();
        assert_eq!(chain.state(), ChainState::Streaming);

        chain.apply(&[], &mut output, true).unwrap();
        assert_eq!(chain.state(), ChainState::Done);

        assert!(matches!(
            chain.apply(&[], &mut output, true),
            Err(Error::Pipeline(PipelineError::Finished))
        ));
    }

    #[test]
    fn test_error_ends_chain() {
        let mut chain = FilterChain::for_conversion(Format::Rle, Format::Raw).unwrap();
        let mut output = Vec::new();
        // Run of length 0
        assert!(chain.apply(&[1, 0, 1, 0, 1, 0, 0, 0, 0, 0], &mut output, false).is_err());
        assert_eq!(chain.state(), ChainState::Done);
    }

    #[test]
    fn test_rle_huffman_round_trip() {
        let image = sample_image();

        let mut encode = FilterChain::for_conversion(Format::Raw, Format::RleHuffman).unwrap();
        let encoded = run_chunked(&mut encode, &image, 7).unwrap();

        let mut decode = FilterChain::for_conversion(Format::RleHuffman, Format::Raw).unwrap();
        let decoded = run_chunked(&mut decode, &encoded, 5).unwrap();
        assert_eq!(decoded, image);
    }

    #[test]
    fn test_chunk_invariance() {
        let image = sample_image();
        let mut whole = FilterChain::for_conversion(Format::Raw, Format::RleHuffman).unwrap();
        let expected = run_chunked(&mut whole, &image, image.len()).unwrap();

        for chunk in [1, 2, 3, 13, 64, 4096] {
            let mut chain = FilterChain::for_conversion(Format::Raw, Format::RleHuffman).unwrap();
            assert_eq!(run_chunked(&mut chain, &image, chunk).unwrap(), expected);
        }
    }

    #[test]
    fn test_transcode_between_formats() {
        let image = sample_image();
        let mut to_rle = FilterChain::for_conversion(Format::Raw, Format::Rle).unwrap();
        let rle = run_chunked(&mut to_rle, &image, 10).unwrap();

        let mut rle_to_huffman = FilterChain::for_conversion(Format::Rle, Format::Huffman).unwrap();
        let huffman = run_chunked(&mut rle_to_huffman, &rle, 10).unwrap();

        let mut back = FilterChain::for_conversion(Format::Huffman, Format::Raw).unwrap();
        assert_eq!(run_chunked(&mut back, &huffman, 10).unwrap(), image);
    }

    #[test]
    fn test_stage_stats() {
        let image = sample_image();
        let mut chain = FilterChain::for_conversion(Format::Raw, Format::RleHuffman).unwrap();
        let output = run_chunked(&mut chain, &image, 32).unwrap();

        let stats = chain.stats();
        assert_eq!(stats[0].name, "rle-encode");
        assert_eq!(stats[0].bytes_in, image.len() as u64);
        assert_eq!(stats[1].bytes_in, stats[0].bytes_out);
        assert_eq!(stats[1].bytes_out, output.len() as u64);
    }

    #[test]
    fn test_push() {
        let mut chain = FilterChain::new();
        chain.push(Stage::huffman_encode());
        chain.push(Stage::huffman_decode());
        assert_eq!(chain.len(), 2);
        assert_eq!(run_chunked(&mut chain, b"there and back", 3).unwrap(), b"there and back");
    }
}
