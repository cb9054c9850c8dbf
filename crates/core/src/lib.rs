//! bitconvert-core: Streaming byte transcoding between raw, RLE and Huffman encodings
//!
//! This library provides the core components for converting a byte stream
//! from one encoded representation to another by pushing bounded chunks
//! through a chain of composable stages:
//! - Packs and unpacks individual bits with deterministic padding
//! - Builds Huffman codes and serializes them alongside the payload
//! - Run-length encodes fixed-width RGB rows incrementally
//! - Composes stages and flushes their residue exactly once
//!
//! # Architecture
//!
//! The system is designed around clear module boundaries:
//! - `bitio`: Low-level bit reading/writing
//! - `huffman`: Huffman tree, code table and unit wire format
//! - `rle`: Run-length encoder/decoder state machines
//! - `filter`: The stage contract and the closed set of stages
//! - `pipeline`: Filter chain composition and format selection
//! - `driver`: Chunked read/transform/write loop
//! - `metrics`: Observable run behavior
//!
//! # Design Principles
//!
//! - **No panics**: All errors are structured and surface to the caller
//! - **Bounded residue**: Streaming stages hold at most a partial row or byte
//! - **Deterministic**: The same input always produces the same bytes
//! - **Chunk-invariant**: Output never depends on how input was split

pub mod bitio;
pub mod driver;
pub mod error;
pub mod filter;
pub mod huffman;
pub mod metrics;
pub mod pipeline;
pub mod rle;

// Re-export commonly used types
pub use error::{Error, ErrorKind, Result};
pub use filter::{Filter, Stage};
pub use pipeline::{ChainState, FilterChain, Format};
