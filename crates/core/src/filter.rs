//! Filter stage abstractions.
//!
//! A stage turns input chunks into output bytes. Every stage honours the
//! same contract:
//!
//! - `apply` appends whatever output the chunk makes available (possibly
//!   nothing) to `output`
//! - feeding a stream as many chunks must produce the same total output as
//!   feeding it as one chunk
//! - once a call with `is_final = true` returns, all residue has been
//!   emitted

use crate::error::Result;
use crate::huffman::{HuffmanDecoder, HuffmanEncoder};
use crate::rle::{RleDecoder, RleEncoder};

/// Uniform contract for a transformation step.
pub trait Filter {
    /// Get stage name.
    fn name(&self) -> &str;

    /// Process one chunk, appending output to `output`.
    fn apply(&mut self, input: &[u8], output: &mut Vec<u8>, is_final: bool) -> Result<()>;
}

/// Copies input through unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct Identity;

impl Filter for Identity {
    fn name(&self) -> &str {
        "identity"
    }

    fn apply(&mut self, input: &[u8], output: &mut Vec<u8>, _is_final: bool) -> Result<()> {
        output.extend_from_slice(input);
        Ok(())
    }
}

/// The closed set of stages a filter chain can hold.
#[derive(Debug)]
pub enum Stage {
    Identity(Identity),
    RleEncode(RleEncoder),
    RleDecode(RleDecoder),
    HuffmanEncode(HuffmanEncoder),
    HuffmanDecode(HuffmanDecoder),
}

impl Stage {
    pub fn rle_encode() -> Self {
        Stage::RleEncode(RleEncoder::new())
    }

    pub fn rle_decode() -> Self {
        Stage::RleDecode(RleDecoder::new())
    }

    pub fn huffman_encode() -> Self {
        Stage::HuffmanEncode(HuffmanEncoder::new())
    }

    pub fn huffman_decode() -> Self {
        Stage::HuffmanDecode(HuffmanDecoder::new())
    }
}

impl Filter for Stage {
    fn name(&self) -> &str {
        match self {
            Stage::Identity(stage) => stage.name(),
            Stage::RleEncode(stage) => stage.name(),
            Stage::RleDecode(stage) => stage.name(),
            Stage::HuffmanEncode(stage) => stage.name(),
            Stage::HuffmanDecode(stage) => stage.name(),
        }
    }

    fn apply(&mut self, input: &[u8], output: &mut Vec<u8>, is_final: bool) -> Result<()> {
        match self {
            Stage::Identity(stage) => stage.apply(input, output, is_final),
            Stage::RleEncode(stage) => stage.apply(input, output, is_final),
            Stage::RleDecode(stage) => stage.apply(input, output, is_final),
            Stage::HuffmanEncode(stage) => stage.apply(input, output, is_final),
            Stage::HuffmanDecode(stage) => stage.apply(input, output, is_final),
        }
    }
}
