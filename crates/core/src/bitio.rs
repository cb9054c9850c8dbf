//! Bit-level I/O utilities for reading and writing individual bits.
//!
//! This module provides BitWriter and BitReader for the Huffman wire format.
//! Both operate in MSB-first (most significant bit first) order within each
//! byte, and both support byte-aligned fixed-width integers (little-endian)
//! mixed in with the bit stream.
//!
//! # Padding Rules
//! - BitWriter: `flush` pads an incomplete byte with trailing zeros
//! - BitWriter: aligned writes are only valid at a byte boundary
//! - BitReader: `align` discards the rest of the current byte
//!
//! # Example
//! ```
//! use bitconvert_core::bitio::{BitReader, BitWriter};
//!
//! let mut writer = BitWriter::new();
//! writer.write_aligned_u16(0x0102).unwrap();
//! writer.write_bit(true);
//! writer.write_bits(0b01, 2).unwrap();
//! writer.flush();
//! // 02 01 | 101 padded to 10100000
//!
//! let bytes = writer.finish();
//! assert_eq!(bytes, vec![0x02, 0x01, 0b1010_0000]);
//!
//! let mut reader = BitReader::new(&bytes);
//! assert_eq!(reader.read_aligned_u16().unwrap(), 0x0102);
//! assert!(reader.read_bit().unwrap());
//! assert_eq!(reader.read_bits(2).unwrap(), 0b01);
//! ```

use crate::error::{BitIoError, Result};

/// Writes bits MSB-first into a byte buffer.
///
/// Accumulates bits in a one-byte cache and emits each byte as soon as it
/// fills up. `flush` forces out a partial byte, zero-padding the low bits.
///
/// # Invariants
/// - `bit_buffer` contains up to 7 bits (never a full byte)
/// - `bit_count` is always < 8
#[derive(Debug, Clone)]
pub struct BitWriter {
    /// Completed bytes
    bytes: Vec<u8>,
    /// Accumulator for the current partial byte (MSB-aligned)
    bit_buffer: u8,
    /// Number of bits in bit_buffer (0-7)
    bit_count: u8,
}

impl BitWriter {
    /// Create a new BitWriter with empty output.
    pub fn new() -> Self {
        Self::with_buffer(Vec::new())
    }

    /// Create a BitWriter that appends to an existing buffer.
    ///
    /// Bytes already in `bytes` are left untouched.
    pub fn with_buffer(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            bit_buffer: 0,
            bit_count: 0,
        }
    }

    /// Append a single bit.
    pub fn write_bit(&mut self, bit: bool) {
        if bit {
            self.bit_buffer |= 0x80 >> self.bit_count;
        }
        self.bit_count += 1;

        if self.bit_count == 8 {
            self.bytes.push(self.bit_buffer);
            self.bit_buffer = 0;
            self.bit_count = 0;
        }
    }

    /// Write up to 64 bits to the output.
    ///
    /// Bits are written MSB-first. For example, writing value=0b101 with count=3
    /// writes bits 1, 0, 1 in that order.
    ///
    /// # Errors
    /// Returns `BitIoError::InvalidBitCount` if count > 64.
    pub fn write_bits(&mut self, value: u64, count: usize) -> Result<()> {
        if count > 64 {
            return Err(BitIoError::InvalidBitCount(count).into());
        }

        for shift in (0..count).rev() {
            self.write_bit((value >> shift) & 1 == 1);
        }

        Ok(())
    }

    /// Append a sequence of bits in order.
    pub fn write_code(&mut self, bits: &[bool]) {
        for &bit in bits {
            self.write_bit(bit);
        }
    }

    /// Write a little-endian u16 at a byte boundary.
    ///
    /// # Errors
    /// Returns `BitIoError::Alignment` if bits are pending.
    pub fn write_aligned_u16(&mut self, value: u16) -> Result<()> {
        self.write_aligned(&value.to_le_bytes())
    }

    /// Write a little-endian u64 at a byte boundary.
    ///
    /// # Errors
    /// Returns `BitIoError::Alignment` if bits are pending.
    pub fn write_aligned_u64(&mut self, value: u64) -> Result<()> {
        self.write_aligned(&value.to_le_bytes())
    }

    fn write_aligned(&mut self, bytes: &[u8]) -> Result<()> {
        if self.bit_count != 0 {
            return Err(BitIoError::Alignment {
                pending: self.bit_count,
            }
            .into());
        }
        self.bytes.extend_from_slice(bytes);
        Ok(())
    }

    /// Emit any partial byte, zero-padding its unused low bits.
    ///
    /// No-op if nothing is pending.
    pub fn flush(&mut self) {
        if self.bit_count > 0 {
            self.bytes.push(self.bit_buffer);
            self.bit_buffer = 0;
            self.bit_count = 0;
        }
    }

    /// Finish writing and return the output bytes.
    ///
    /// Any pending bits are flushed first. This consumes the writer.
    pub fn finish(mut self) -> Vec<u8> {
        self.flush();
        self.bytes
    }

    /// Number of bits waiting in the partial byte (0-7).
    pub fn pending_bits(&self) -> u8 {
        self.bit_count
    }

    /// Return the number of complete bytes written so far.
    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    /// Return the total number of bits written (including partial byte).
    pub fn bit_len(&self) -> usize {
        self.bytes.len() * 8 + self.bit_count as usize
    }
}

impl Default for BitWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads bits MSB-first from a byte buffer.
///
/// Padding bits at the end of the buffer are not distinguishable from data;
/// the caller decides how many bits are meaningful.
///
/// # Invariants
/// - `bit_position` never exceeds `data.len() * 8`
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    /// Source data
    data: &'a [u8],
    /// Current bit position (0 = MSB of first byte)
    bit_position: usize,
}

impl<'a> BitReader<'a> {
    /// Create a new BitReader for the given data.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            bit_position: 0,
        }
    }

    /// Read a single bit.
    ///
    /// # Errors
    /// Returns `BitIoError::UnexpectedEof` if no bits remain.
    pub fn read_bit(&mut self) -> Result<bool> {
        let byte = *self
            .data
            .get(self.bit_position / 8)
            .ok_or(BitIoError::UnexpectedEof)?;
        let bit = byte & (0x80 >> (self.bit_position % 8)) != 0;
        self.bit_position += 1;
        Ok(bit)
    }

    /// Read up to 64 bits, MSB-first.
    ///
    /// # Errors
    /// - `BitIoError::InvalidBitCount` if count > 64
    /// - `BitIoError::UnexpectedEof` if not enough bits remain
    pub fn read_bits(&mut self, count: usize) -> Result<u64> {
        if count > 64 {
            return Err(BitIoError::InvalidBitCount(count).into());
        }
        if count > self.bits_remaining() {
            return Err(BitIoError::UnexpectedEof.into());
        }

        let mut result = 0u64;
        for _ in 0..count {
            result = (result << 1) | self.read_bit()? as u64;
        }
        Ok(result)
    }

    /// Discard `count` bits.
    pub fn skip(&mut self, count: usize) -> Result<()> {
        for _ in 0..count {
            self.read_bit()?;
        }
        Ok(())
    }

    /// Discard the remaining bits of the current byte.
    pub fn align(&mut self) {
        let offset = self.bit_position % 8;
        if offset != 0 {
            self.bit_position += 8 - offset;
        }
    }

    /// Read a little-endian u16 at a byte boundary.
    pub fn read_aligned_u16(&mut self) -> Result<u16> {
        let bytes = self.read_aligned::<2>()?;
        Ok(u16::from_le_bytes(bytes))
    }

    /// Read a little-endian u64 at a byte boundary.
    pub fn read_aligned_u64(&mut self) -> Result<u64> {
        let bytes = self.read_aligned::<8>()?;
        Ok(u64::from_le_bytes(bytes))
    }

    fn read_aligned<const N: usize>(&mut self) -> Result<[u8; N]> {
        let offset = self.bit_position % 8;
        if offset != 0 {
            return Err(BitIoError::Alignment {
                pending: offset as u8,
            }
            .into());
        }

        let start = self.bit_position / 8;
        let bytes: [u8; N] = self
            .data
            .get(start..start + N)
            .and_then(|slice| slice.try_into().ok())
            .ok_or(BitIoError::UnexpectedEof)?;
        self.bit_position += N * 8;
        Ok(bytes)
    }

    /// Return the number of bits remaining in the buffer.
    pub fn bits_remaining(&self) -> usize {
        self.data.len() * 8 - self.bit_position
    }

    /// Return the current bit position.
    pub fn position(&self) -> usize {
        self.bit_position
    }

    /// Check if we're at the end of the buffer.
    pub fn is_empty(&self) -> bool {
        self.bit_position >= self.data.len() * 8
    }
}
