//! Error types for the bitconvert system.
//!
//! All operations return structured errors rather than panicking.
//! A codec error aborts the current transcode and surfaces to the driver;
//! nothing is retried or recovered locally.

use thiserror::Error;

/// Top-level error type for all operations in the system.
///
/// Each variant corresponds to a specific failure domain:
/// - Bit I/O: alignment violations and reads past the end of a source
/// - Huffman: malformed code tables or payloads
/// - RLE: rows that do not add up to the declared width, bad run lengths
/// - Pipeline: misuse of a filter chain or an unknown format selector
/// - I/O: file system operations
#[derive(Debug, Error)]
pub enum Error {
    /// Bit I/O operation failed (e.g., aligned write with pending bits)
    #[error("bit I/O error: {0}")]
    BitIo(#[from] BitIoError),

    /// Huffman codec error (e.g., invalid code table, truncated payload)
    #[error("huffman codec error: {0}")]
    Huffman(#[from] HuffmanError),

    /// Run-length codec error (e.g., row exceeding declared width)
    #[error("rle codec error: {0}")]
    Rle(#[from] RleError),

    /// Filter chain error
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Coarse classification of an [`Error`].
///
/// This is what a driver reports; the detailed variant carries the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Aligned write attempted with unflushed pending bits
    Alignment,
    /// Bit read past the available source
    EndOfStream,
    /// Malformed encoded data
    Format,
    /// File open/read/write failure
    Io,
    /// Invalid configuration or usage
    Config,
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::BitIo(BitIoError::Alignment { .. }) => ErrorKind::Alignment,
            Error::BitIo(BitIoError::UnexpectedEof) => ErrorKind::EndOfStream,
            Error::BitIo(BitIoError::InvalidBitCount(_)) => ErrorKind::Config,
            Error::Huffman(_) | Error::Rle(_) => ErrorKind::Format,
            Error::Io(_) => ErrorKind::Io,
            Error::Pipeline(_) | Error::Config(_) => ErrorKind::Config,
        }
    }
}

/// Bit-level I/O errors.
#[derive(Debug, Error)]
pub enum BitIoError {
    /// Aligned access attempted while the cursor is inside a byte
    #[error("aligned access with {pending} pending bits")]
    Alignment { pending: u8 },

    /// Attempted to read past the end of the source
    #[error("unexpected end of bit stream")]
    UnexpectedEof,

    /// Invalid bit count (more than 64 bits in one call)
    #[error("invalid bit count: {0}")]
    InvalidBitCount(usize),
}

/// Huffman codec errors.
#[derive(Debug, Error)]
pub enum HuffmanError {
    /// Code length in the table exceeds the deepest possible tree
    #[error("symbol {symbol}: code length {length} exceeds maximum {max}")]
    CodeLengthTooLong { symbol: u8, length: u16, max: u16 },

    /// Two codes in the table collide (one is a prefix of the other)
    #[error("symbol {symbol}: code collides with another code")]
    AmbiguousCode { symbol: u8 },

    /// Payload walks into a path that no code occupies
    #[error("invalid huffman code at bit position {position}")]
    InvalidCode { position: usize },

    /// Table declares no codes but the unit claims a non-zero length
    #[error("empty code table for {length} encoded bytes")]
    EmptyCodeTable { length: u64 },

    /// Unit ended before its header, table or payload was complete
    #[error("truncated unit: decoded {decoded} of {expected} bytes")]
    Truncated { expected: u64, decoded: u64 },
}

/// Run-length codec errors.
#[derive(Debug, Error)]
pub enum RleError {
    /// A run extends a row past the declared width
    #[error("row {row}: run ends at column {end}, width is {width}")]
    RowOverflow { row: u16, end: usize, width: u16 },

    /// The runs of a row sum to less than the declared width
    #[error("row {row}: runs cover {covered} columns, width is {width}")]
    RowUnderflow { row: u16, covered: usize, width: u16 },

    /// Run length of zero
    #[error("row {row}: invalid run length 0")]
    InvalidRunLength { row: u16 },

    /// Stream ended before the declared image was complete
    #[error("truncated image: {rows} of {height} rows complete")]
    Truncated { rows: u16, height: u16 },

    /// Bytes found after the last declared row
    #[error("{extra} trailing bytes after {height} rows")]
    TrailingData { extra: usize, height: u16 },
}

/// Filter chain errors.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Chain was applied again after its final chunk
    #[error("filter chain already finished")]
    Finished,

    /// Format selector string not recognised
    #[error("unknown format: {0:?}")]
    UnknownFormat(String),

    /// Format recognised but not handled by the filter chain
    #[error("format {0:?} is not supported by the filter chain")]
    UnsupportedFormat(String),
}

/// Type alias for Result with our Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let err: Error = BitIoError::Alignment { pending: 3 }.into();
        assert_eq!(err.kind(), ErrorKind::Alignment);

        let err: Error = BitIoError::UnexpectedEof.into();
        assert_eq!(err.kind(), ErrorKind::EndOfStream);

        let err: Error = RleError::InvalidRunLength { row: 0 }.into();
        assert_eq!(err.kind(), ErrorKind::Format);

        let err: Error = HuffmanError::InvalidCode { position: 9 }.into();
        assert_eq!(err.kind(), ErrorKind::Format);

        let err: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_display() {
        let err: Error = RleError::RowOverflow {
            row: 2,
            end: 12,
            width: 10,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "rle codec error: row 2: run ends at column 12, width is 10"
        );
    }
}
