//! Run-length coding for fixed-width rows of RGB pixels.
//!
//! Both directions are incremental state machines: they accept arbitrary
//! chunk boundaries (down to single bytes) and carry partial header, pixel,
//! run and row state between calls.
//!
//! # Raw Image Format
//!
//! ```text
//! +------------------+
//! | width (2)        |  u16 little-endian
//! +------------------+
//! | height (2)       |  u16 little-endian
//! +------------------+
//! | pixels           |  width * height RGB triplets, row by row
//! +------------------+
//! ```
//!
//! # Encoded Format
//!
//! ```text
//! +------------------+
//! | width (2)        |  copied from the raw header
//! +------------------+
//! | height (2)       |  copied from the raw header
//! +------------------+
//! | per row:         |
//! |   run_count (2)  |  u16 little-endian
//! |   runs           |  run_count * (length, red, green, blue)
//! +------------------+
//! ```
//!
//! # Invariants
//!
//! - Run lengths are 1-255; a longer stretch of one color becomes several runs
//! - Run lengths of a row sum exactly to the width
//! - Adjacent runs share a color only when the first one is full (255)

use crate::error::{Result, RleError};
use crate::filter::Filter;
use tracing::{debug, trace};

/// Longest run a single length byte can express.
pub const MAX_RUN_LENGTH: u8 = 255;

/// A stretch of identical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    pub length: u8,
    pub color: [u8; 3],
}

/// Build a raw image buffer: header followed by `pixels`.
pub fn raw_image(width: u16, height: u16, pixels: &[u8]) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + pixels.len());
    data.extend_from_slice(&width.to_le_bytes());
    data.extend_from_slice(&height.to_le_bytes());
    data.extend_from_slice(pixels);
    data
}

/// Run-length encode a complete raw image buffer.
pub fn encode(data: &[u8]) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    RleEncoder::new().apply(data, &mut output, true)?;
    Ok(output)
}

/// Expand a complete run-length encoded buffer.
pub fn decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    RleDecoder::new().apply(data, &mut output, true)?;
    Ok(output)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EncodeState {
    Width1,
    Width2,
    Height1,
    Height2,
    PixelRed,
    PixelGreen,
    PixelBlue,
    Done,
}

/// Incremental run-length encoder.
///
/// Residue between calls is at most one partial row of runs.
#[derive(Debug)]
pub struct RleEncoder {
    state: EncodeState,
    width: u16,
    height: u16,
    /// Red and green of the pixel being read
    pixel: [u8; 3],
    /// Pixels seen in the current row
    column: usize,
    /// Completed rows
    line: u16,
    /// Runs of the current row
    runs: Vec<Run>,
}

impl RleEncoder {
    pub fn new() -> Self {
        Self {
            state: EncodeState::Width1,
            width: 0,
            height: 0,
            pixel: [0; 3],
            column: 0,
            line: 0,
            runs: Vec::new(),
        }
    }

    fn header_complete(&mut self, output: &mut Vec<u8>) {
        debug!(width = self.width, height = self.height, "rle encoder header");
        if self.height == 0 {
            self.state = EncodeState::Done;
        } else if self.width == 0 {
            // Every row is complete before any pixel arrives
            for _ in 0..self.height {
                output.extend_from_slice(&0u16.to_le_bytes());
            }
            self.line = self.height;
            self.state = EncodeState::Done;
        } else {
            self.state = EncodeState::PixelRed;
        }
    }

    fn push_pixel(&mut self, color: [u8; 3], output: &mut Vec<u8>) {
        match self.runs.last_mut() {
            Some(run) if run.color == color && run.length < MAX_RUN_LENGTH => run.length += 1,
            _ => self.runs.push(Run { length: 1, color }),
        }

        self.column += 1;
        if self.column == self.width as usize {
            self.emit_row(output);
        }
    }

    fn emit_row(&mut self, output: &mut Vec<u8>) {
        trace!(row = self.line, runs = self.runs.len(), "rle row sealed");
        output.extend_from_slice(&(self.runs.len() as u16).to_le_bytes());
        for run in self.runs.drain(..) {
            output.push(run.length);
            output.extend_from_slice(&run.color);
        }

        self.column = 0;
        self.line += 1;
        self.state = if self.line == self.height {
            EncodeState::Done
        } else {
            EncodeState::PixelRed
        };
    }
}

impl Default for RleEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Filter for RleEncoder {
    fn name(&self) -> &str {
        "rle-encode"
    }

    fn apply(&mut self, input: &[u8], output: &mut Vec<u8>, is_final: bool) -> Result<()> {
        for (i, &byte) in input.iter().enumerate() {
            match self.state {
                EncodeState::Width1 => {
                    output.push(byte);
                    self.width = byte as u16;
                    self.state = EncodeState::Width2;
                }
                EncodeState::Width2 => {
                    output.push(byte);
                    self.width |= (byte as u16) << 8;
                    self.state = EncodeState::Height1;
                }
                EncodeState::Height1 => {
                    output.push(byte);
                    self.height = byte as u16;
                    self.state = EncodeState::Height2;
                }
                EncodeState::Height2 => {
                    output.push(byte);
                    self.height |= (byte as u16) << 8;
                    self.header_complete(output);
                }
                EncodeState::PixelRed => {
                    self.pixel[0] = byte;
                    self.state = EncodeState::PixelGreen;
                }
                EncodeState::PixelGreen => {
                    self.pixel[1] = byte;
                    self.state = EncodeState::PixelBlue;
                }
                EncodeState::PixelBlue => {
                    self.pixel[2] = byte;
                    self.state = EncodeState::PixelRed;
                    self.push_pixel(self.pixel, output);
                }
                EncodeState::Done => {
                    return Err(RleError::TrailingData {
                        extra: input.len() - i,
                        height: self.height,
                    }
                    .into());
                }
            }
        }

        if is_final && !matches!(self.state, EncodeState::Width1 | EncodeState::Done) {
            return Err(RleError::Truncated {
                rows: self.line,
                height: self.height,
            }
            .into());
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    Width1,
    Width2,
    Height1,
    Height2,
    Count1,
    Count2,
    Length,
    Red,
    Green,
    Blue,
    Done,
}

/// Incremental run-length decoder.
///
/// Each run is expanded as soon as its last byte arrives, so residue is at
/// most one partial run header.
#[derive(Debug)]
pub struct RleDecoder {
    state: DecodeState,
    width: u16,
    height: u16,
    /// Runs left in the current row
    runs_left: u16,
    run_length: u8,
    color: [u8; 3],
    column: usize,
    line: u16,
}

impl RleDecoder {
    pub fn new() -> Self {
        Self {
            state: DecodeState::Width1,
            width: 0,
            height: 0,
            runs_left: 0,
            run_length: 0,
            color: [0; 3],
            column: 0,
            line: 0,
        }
    }

    fn end_row(&mut self) -> Result<()> {
        if self.column != self.width as usize {
            return Err(RleError::RowUnderflow {
                row: self.line,
                covered: self.column,
                width: self.width,
            }
            .into());
        }

        self.column = 0;
        self.line += 1;
        self.state = if self.line == self.height {
            DecodeState::Done
        } else {
            DecodeState::Count1
        };
        Ok(())
    }

    fn start_run(&mut self, length: u8) -> Result<()> {
        if length == 0 {
            return Err(RleError::InvalidRunLength { row: self.line }.into());
        }

        let end = self.column + length as usize;
        if end > self.width as usize {
            return Err(RleError::RowOverflow {
                row: self.line,
                end,
                width: self.width,
            }
            .into());
        }

        self.run_length = length;
        Ok(())
    }

    fn finish_run(&mut self, output: &mut Vec<u8>) -> Result<()> {
        for _ in 0..self.run_length {
            output.extend_from_slice(&self.color);
        }
        self.column += self.run_length as usize;
        self.runs_left -= 1;

        if self.runs_left == 0 {
            self.end_row()
        } else {
            self.state = DecodeState::Length;
            Ok(())
        }
    }
}

impl Default for RleDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Filter for RleDecoder {
    fn name(&self) -> &str {
        "rle-decode"
    }

    fn apply(&mut self, input: &[u8], output: &mut Vec<u8>, is_final: bool) -> Result<()> {
        for (i, &byte) in input.iter().enumerate() {
            match self.state {
                DecodeState::Width1 => {
                    output.push(byte);
                    self.width = byte as u16;
                    self.state = DecodeState::Width2;
                }
                DecodeState::Width2 => {
                    output.push(byte);
                    self.width |= (byte as u16) << 8;
                    self.state = DecodeState::Height1;
                }
                DecodeState::Height1 => {
                    output.push(byte);
                    self.height = byte as u16;
                    self.state = DecodeState::Height2;
                }
                DecodeState::Height2 => {
                    output.push(byte);
                    self.height |= (byte as u16) << 8;
                    debug!(width = self.width, height = self.height, "rle decoder header");
                    self.state = if self.height == 0 {
                        DecodeState::Done
                    } else {
                        DecodeState::Count1
                    };
                }
                DecodeState::Count1 => {
                    self.runs_left = byte as u16;
                    self.state = DecodeState::Count2;
                }
                DecodeState::Count2 => {
                    self.runs_left |= (byte as u16) << 8;
                    if self.runs_left == 0 {
                        self.end_row()?;
                    } else {
                        self.state = DecodeState::Length;
                    }
                }
                DecodeState::Length => {
                    self.start_run(byte)?;
                    self.state = DecodeState::Red;
                }
                DecodeState::Red => {
                    self.color[0] = byte;
                    self.state = DecodeState::Green;
                }
                DecodeState::Green => {
                    self.color[1] = byte;
                    self.state = DecodeState::Blue;
                }
                DecodeState::Blue => {
                    self.color[2] = byte;
                    self.finish_run(output)?;
                }
                DecodeState::Done => {
                    return Err(RleError::TrailingData {
                        extra: input.len() - i,
                        height: self.height,
                    }
                    .into());
                }
            }
        }

        if is_final && !matches!(self.state, DecodeState::Width1 | DecodeState::Done) {
            return Err(RleError::Truncated {
                rows: self.line,
                height: self.height,
            }
            .into());
        }

        Ok(())
    }
}

/// Parse the runs of an encoded buffer row by row.
///
/// Returns the header and each row's runs; used to inspect encoder output.
pub fn parse_runs(data: &[u8]) -> Result<(u16, u16, Vec<Vec<Run>>)> {
    let truncated = |rows: usize, height: u16| RleError::Truncated {
        rows: rows as u16,
        height,
    };
    if data.len() < 4 {
        return Err(truncated(0, 0).into());
    }
    let width = u16::from_le_bytes([data[0], data[1]]);
    let height = u16::from_le_bytes([data[2], data[3]]);

    let mut rows = Vec::with_capacity(height as usize);
    let mut pos = 4;
    for _ in 0..height {
        let count = data
            .get(pos..pos + 2)
            .map(|b| u16::from_le_bytes([b[0], b[1]]))
            .ok_or_else(|| truncated(rows.len(), height))?;
        pos += 2;

        let mut runs = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let quad = data
                .get(pos..pos + 4)
                .ok_or_else(|| truncated(rows.len(), height))?;
            runs.push(Run {
                length: quad[0],
                color: [quad[1], quad[2], quad[3]],
            });
            pos += 4;
        }
        rows.push(runs);
    }

    if pos != data.len() {
        return Err(RleError::TrailingData {
            extra: data.len() - pos,
            height,
        }
        .into());
    }

    Ok((width, height, rows))
}
