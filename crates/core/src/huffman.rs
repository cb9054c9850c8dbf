//! Huffman entropy coding with a self-describing wire format.
//!
//! The tree is built from byte frequencies with a min-heap, stored in a flat
//! arena (nodes refer to their children by index), and flattened into a
//! [`CodeTable`] by depth-first traversal: `0` on a left descent, `1` on a
//! right descent.
//!
//! # Unit Format
//!
//! ```text
//! +----------------------+
//! | length (8)           |  u64 little-endian, uncompressed byte count
//! +----------------------+
//! | 256 code slots       |  per slot: u16 LE code length, then that many
//! | (variable)           |  code bits MSB-first, zero-padded to a byte
//! +----------------------+
//! | payload (variable)   |  codes packed back-to-back, zero-padded once
//! +----------------------+
//! ```
//!
//! A unit with length 0 stops after the length field. Units may be
//! concatenated; the decoder reads them in sequence.
//!
//! # Determinism
//!
//! Heap ties are broken by node creation order. Leaves are created in
//! ascending byte order and branches after them, so the same input always
//! yields the same tree and the same bytes on the wire.

use crate::bitio::{BitReader, BitWriter};
use crate::error::{BitIoError, Error, HuffmanError, Result};
use crate::filter::Filter;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, trace, warn};

/// Longest code a 256-symbol alphabet can produce.
pub const MAX_CODE_LENGTH: u16 = 255;

/// Index of a node in a [`HuffmanTree`] arena.
pub type NodeId = usize;

/// A node in the Huffman tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    /// A byte value and how often it occurred
    Leaf { symbol: u8, frequency: u64 },
    /// Two subtrees; frequency is the sum of theirs
    Branch {
        left: NodeId,
        right: NodeId,
        frequency: u64,
    },
}

impl Node {
    pub fn frequency(&self) -> u64 {
        match *self {
            Node::Leaf { frequency, .. } | Node::Branch { frequency, .. } => frequency,
        }
    }
}

/// Count occurrences of every byte value.
pub fn frequencies(data: &[u8]) -> [u64; 256] {
    let mut freqs = [0u64; 256];
    for &byte in data {
        freqs[byte as usize] += 1;
    }
    freqs
}

/// A Huffman tree stored as an arena of nodes.
///
/// # Invariants
/// - Every branch's frequency equals the sum of the leaf frequencies below it
/// - The root is a branch whenever at least two distinct symbols exist
/// - An empty tree (no symbols) has no root
#[derive(Debug, Clone, Default)]
pub struct HuffmanTree {
    nodes: Vec<Node>,
    root: Option<NodeId>,
}

impl HuffmanTree {
    /// Build a tree from per-byte frequencies.
    ///
    /// Symbols with zero frequency are left out. An all-zero table yields an
    /// empty tree; a single non-zero symbol yields a one-leaf tree.
    pub fn from_frequencies(freqs: &[u64; 256]) -> Self {
        let mut nodes = Vec::new();
        let mut heap = BinaryHeap::new();

        for (symbol, &frequency) in freqs.iter().enumerate() {
            if frequency > 0 {
                let id = nodes.len();
                nodes.push(Node::Leaf {
                    symbol: symbol as u8,
                    frequency,
                });
                heap.push(Reverse((frequency, id)));
            }
        }

        // Combine the two lightest nodes until one remains
        while heap.len() > 1 {
            let (Some(Reverse((left_freq, left))), Some(Reverse((right_freq, right)))) =
                (heap.pop(), heap.pop())
            else {
                break;
            };
            let frequency = left_freq + right_freq;
            let id = nodes.len();
            nodes.push(Node::Branch {
                left,
                right,
                frequency,
            });
            heap.push(Reverse((frequency, id)));
        }

        let root = heap.pop().map(|Reverse((_, id))| id);
        Self { nodes, root }
    }

    /// Build a tree from the byte frequencies of `data`.
    pub fn from_data(data: &[u8]) -> Self {
        Self::from_frequencies(&frequencies(data))
    }

    /// Root node, if any symbols were present.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Look up a node by id.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Number of nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Total frequency (number of encoded bytes).
    pub fn total_frequency(&self) -> u64 {
        self.root
            .and_then(|id| self.node(id))
            .map_or(0, Node::frequency)
    }

    /// Derive the code table by depth-first traversal.
    ///
    /// A one-leaf tree gets the one-bit code `0` so the payload still
    /// carries one bit per byte.
    pub fn code_table(&self) -> CodeTable {
        let mut table = CodeTable::empty();
        let Some(root) = self.root else {
            return table;
        };

        let mut stack = vec![(root, Vec::new())];
        while let Some((id, path)) = stack.pop() {
            match self.nodes[id] {
                Node::Leaf { symbol, .. } => {
                    table.codes[symbol as usize] = if path.is_empty() { vec![false] } else { path };
                }
                Node::Branch { left, right, .. } => {
                    let mut right_path = path.clone();
                    right_path.push(true);
                    stack.push((right, right_path));

                    let mut left_path = path;
                    left_path.push(false);
                    stack.push((left, left_path));
                }
            }
        }

        table
    }

    /// Render the tree in Graphviz dot format.
    ///
    /// Edges are labelled with the bit they contribute to a code.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph huffman {\n");
        for (id, node) in self.nodes.iter().enumerate() {
            match *node {
                Node::Leaf { symbol, frequency } => {
                    out.push_str(&format!(
                        "  n{} [shape=box, label=\"{} ({})\"];\n",
                        id,
                        dot_symbol(symbol),
                        frequency
                    ));
                }
                Node::Branch {
                    left,
                    right,
                    frequency,
                } => {
                    out.push_str(&format!("  n{} [label=\"{}\"];\n", id, frequency));
                    out.push_str(&format!("  n{} -> n{} [label=\"0\"];\n", id, left));
                    out.push_str(&format!("  n{} -> n{} [label=\"1\"];\n", id, right));
                }
            }
        }
        out.push_str("}\n");
        out
    }

    /// One-line nested rendering, e.g. `{3: {1: b}, {2: a}}`.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        if let Some(root) = self.root {
            self.describe_node(root, &mut out);
        }
        out
    }

    fn describe_node(&self, id: NodeId, out: &mut String) {
        match self.nodes[id] {
            Node::Leaf { symbol, frequency } => {
                out.push_str(&format!("{{{}: {}}}", frequency, display_symbol(symbol)));
            }
            Node::Branch {
                left,
                right,
                frequency,
            } => {
                out.push_str(&format!("{{{}: ", frequency));
                self.describe_node(left, out);
                out.push_str(", ");
                self.describe_node(right, out);
                out.push('}');
            }
        }
    }
}

fn display_symbol(symbol: u8) -> String {
    if symbol.is_ascii_graphic() {
        (symbol as char).to_string()
    } else {
        symbol.to_string()
    }
}

fn dot_symbol(symbol: u8) -> String {
    match symbol {
        b'"' => "\\\"".to_string(),
        b'\\' => "\\\\".to_string(),
        _ => display_symbol(symbol),
    }
}

/// Mapping from each byte value to its code, MSB-first.
///
/// Absent symbols map to the empty code. Tables derived from a tree are
/// prefix-free; tables read from the wire are checked when the decode trie
/// is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeTable {
    codes: [Vec<bool>; 256],
}

impl CodeTable {
    fn empty() -> Self {
        Self {
            codes: std::array::from_fn(|_| Vec::new()),
        }
    }

    /// Code for `symbol` (empty if absent).
    pub fn code(&self, symbol: u8) -> &[bool] {
        &self.codes[symbol as usize]
    }

    /// Symbols with a non-empty code, in ascending order.
    pub fn symbols(&self) -> impl Iterator<Item = (u8, &[bool])> + '_ {
        self.codes
            .iter()
            .enumerate()
            .filter(|(_, code)| !code.is_empty())
            .map(|(symbol, code)| (symbol as u8, code.as_slice()))
    }

    /// Length of the longest code.
    pub fn max_code_length(&self) -> usize {
        self.codes.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Whether no assigned code is a prefix of another.
    pub fn is_prefix_free(&self) -> bool {
        let assigned: Vec<_> = self.symbols().collect();
        assigned.iter().enumerate().all(|(i, (_, a))| {
            assigned
                .iter()
                .enumerate()
                .all(|(j, (_, b))| i == j || !b.starts_with(a))
        })
    }

    /// Payload size in bits for the given frequencies.
    pub fn encoded_bits(&self, freqs: &[u64; 256]) -> u64 {
        freqs
            .iter()
            .zip(self.codes.iter())
            .map(|(&freq, code)| freq * code.len() as u64)
            .sum()
    }

    /// Write all 256 slots. Each slot ends on a byte boundary.
    pub fn write_to(&self, writer: &mut BitWriter) -> Result<()> {
        for code in &self.codes {
            writer.write_aligned_u16(code.len() as u16)?;
            writer.write_code(code);
            writer.flush();
        }
        Ok(())
    }

    /// Read all 256 slots.
    pub fn read_from(reader: &mut BitReader<'_>) -> Result<Self> {
        let mut table = Self::empty();
        for (symbol, slot) in table.codes.iter_mut().enumerate() {
            let length = reader.read_aligned_u16().map_err(truncated_table)?;
            if length > MAX_CODE_LENGTH {
                return Err(HuffmanError::CodeLengthTooLong {
                    symbol: symbol as u8,
                    length,
                    max: MAX_CODE_LENGTH,
                }
                .into());
            }
            for _ in 0..length {
                slot.push(reader.read_bit().map_err(truncated_table)?);
            }
            reader.align();
        }
        Ok(table)
    }
}

fn truncated_table(err: Error) -> Error {
    match err {
        Error::BitIo(BitIoError::UnexpectedEof) => HuffmanError::Truncated {
            expected: 0,
            decoded: 0,
        }
        .into(),
        other => other,
    }
}

impl fmt::Display for CodeTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (symbol, code)) in self.symbols().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{{{}: ", display_symbol(symbol))?;
            for &bit in code {
                f.write_str(if bit { "1" } else { "0" })?;
            }
            f.write_str("}")?;
        }
        Ok(())
    }
}

/// Decoding trie: code bits walk from the root to a symbol.
#[derive(Debug)]
struct DecodeTrie {
    nodes: Vec<TrieNode>,
}

#[derive(Debug, Clone, Copy)]
enum TrieNode {
    Branch([Option<u32>; 2]),
    Leaf(u8),
}

impl DecodeTrie {
    fn from_table(table: &CodeTable) -> Result<Self> {
        let mut nodes = vec![TrieNode::Branch([None, None])];

        for (symbol, code) in table.symbols() {
            let mut current = 0usize;
            for (depth, &bit) in code.iter().enumerate() {
                let is_last = depth + 1 == code.len();
                let TrieNode::Branch(children) = nodes[current] else {
                    // Walked through another symbol's leaf
                    return Err(HuffmanError::AmbiguousCode { symbol }.into());
                };
                let next = match children[bit as usize] {
                    Some(_) if is_last => {
                        return Err(HuffmanError::AmbiguousCode { symbol }.into());
                    }
                    Some(child) => child as usize,
                    None => {
                        let id = nodes.len();
                        nodes.push(if is_last {
                            TrieNode::Leaf(symbol)
                        } else {
                            TrieNode::Branch([None, None])
                        });
                        if let TrieNode::Branch(children) = &mut nodes[current] {
                            children[bit as usize] = Some(id as u32);
                        }
                        id
                    }
                };
                current = next;
            }
        }

        Ok(Self { nodes })
    }

    fn has_codes(&self) -> bool {
        matches!(self.nodes[0], TrieNode::Branch([Some(_), _]) | TrieNode::Branch([_, Some(_)]))
    }

    /// Walk bits from the root until a leaf is reached.
    fn decode_symbol(&self, reader: &mut BitReader<'_>) -> Result<u8> {
        let mut current = 0usize;
        loop {
            let position = reader.position();
            let bit = reader.read_bit()?;
            let TrieNode::Branch(children) = self.nodes[current] else {
                return Err(HuffmanError::InvalidCode { position }.into());
            };
            match children[bit as usize] {
                Some(child) => current = child as usize,
                None => return Err(HuffmanError::InvalidCode { position }.into()),
            }
            if let TrieNode::Leaf(symbol) = self.nodes[current] {
                return Ok(symbol);
            }
        }
    }
}

/// Append one encoded unit for `data` to `output`.
///
/// Returns the tree used, for diagnostics.
pub fn encode_into(data: &[u8], output: &mut Vec<u8>) -> Result<HuffmanTree> {
    let freqs = frequencies(data);
    let tree = HuffmanTree::from_frequencies(&freqs);
    let mut writer = BitWriter::with_buffer(std::mem::take(output));

    writer.write_aligned_u64(data.len() as u64)?;

    if !data.is_empty() {
        let table = tree.code_table();
        debug!(
            input_bytes = data.len(),
            distinct_symbols = table.symbols().count(),
            max_code_length = table.max_code_length(),
            payload_bits = table.encoded_bits(&freqs),
            "built huffman code"
        );
        trace!(codes = %table, "huffman code table");

        table.write_to(&mut writer)?;
        for &byte in data {
            writer.write_code(table.code(byte));
        }
    }

    *output = writer.finish();
    Ok(tree)
}

/// Encode `data` as a single unit.
pub fn encode(data: &[u8]) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    encode_into(data, &mut output)?;
    Ok(output)
}

/// Decode every unit in `bytes`, appending the result to `output`.
///
/// Zero input bytes decode to nothing.
pub fn decode_into(bytes: &[u8], output: &mut Vec<u8>) -> Result<()> {
    let mut reader = BitReader::new(bytes);
    while !reader.is_empty() {
        decode_unit(&mut reader, output)?;
    }
    Ok(())
}

/// Decode every unit in `bytes`.
pub fn decode(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    decode_into(bytes, &mut output)?;
    Ok(output)
}

fn decode_unit(reader: &mut BitReader<'_>, output: &mut Vec<u8>) -> Result<()> {
    let expected = reader.read_aligned_u64().map_err(|err| match err {
        Error::BitIo(BitIoError::UnexpectedEof) => HuffmanError::Truncated {
            expected: 0,
            decoded: 0,
        }
        .into(),
        other => other,
    })?;
    if expected == 0 {
        return Ok(());
    }

    let table = CodeTable::read_from(reader).map_err(|err| match err {
        Error::Huffman(HuffmanError::Truncated { .. }) => HuffmanError::Truncated {
            expected,
            decoded: 0,
        }
        .into(),
        other => other,
    })?;
    let trie = DecodeTrie::from_table(&table)?;
    if !trie.has_codes() {
        return Err(HuffmanError::EmptyCodeTable { length: expected }.into());
    }

    // Every symbol costs at least one bit
    if expected > reader.bits_remaining() as u64 {
        return Err(HuffmanError::Truncated {
            expected,
            decoded: 0,
        }
        .into());
    }

    output.reserve(expected as usize);
    for decoded in 0..expected {
        let symbol = trie.decode_symbol(reader).map_err(|err| match err {
            Error::BitIo(BitIoError::UnexpectedEof) => {
                HuffmanError::Truncated { expected, decoded }.into()
            }
            other => other,
        })?;
        output.push(symbol);
    }
    reader.align();

    Ok(())
}

/// Filter stage that Huffman-encodes its whole input as one unit.
///
/// Encoding needs two passes over the data, so every chunk is buffered and
/// the unit is emitted on the final call.
#[derive(Debug, Default)]
pub struct HuffmanEncoder {
    buffer: Vec<u8>,
    dot_path: Option<PathBuf>,
}

impl HuffmanEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also write the tree as a Graphviz file to `path` when the unit is
    /// emitted. Failure to write it is logged and otherwise ignored.
    pub fn with_dot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.dot_path = Some(path.into());
        self
    }

    fn export_dot(&self, tree: &HuffmanTree) {
        let Some(path) = &self.dot_path else {
            return;
        };
        match std::fs::write(path, tree.to_dot()) {
            Ok(()) => debug!(path = %path.display(), nodes = tree.len(), "wrote huffman tree"),
            Err(err) => warn!(path = %path.display(), error = %err, "failed to write huffman tree"),
        }
    }
}

impl Filter for HuffmanEncoder {
    fn name(&self) -> &str {
        "huffman-encode"
    }

    fn apply(&mut self, input: &[u8], output: &mut Vec<u8>, is_final: bool) -> Result<()> {
        self.buffer.extend_from_slice(input);
        if is_final {
            let tree = encode_into(&self.buffer, output)?;
            self.export_dot(&tree);
            self.buffer = Vec::new();
        }
        Ok(())
    }
}

/// Filter stage that decodes Huffman units.
///
/// Input is buffered until the final call, then every unit is decoded.
#[derive(Debug, Default)]
pub struct HuffmanDecoder {
    buffer: Vec<u8>,
}

impl HuffmanDecoder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Filter for HuffmanDecoder {
    fn name(&self) -> &str {
        "huffman-decode"
    }

    fn apply(&mut self, input: &[u8], output: &mut Vec<u8>, is_final: bool) -> Result<()> {
        self.buffer.extend_from_slice(input);
        if is_final {
            decode_into(&self.buffer, output)?;
            self.buffer = Vec::new();
        }
        Ok(())
    }
}
