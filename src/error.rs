//! Error types for eapack

use std::io;
use thiserror::Error;

/// Main error type for compression and decompression operations
#[derive(Debug, Error)]
pub enum CompressionError {
    /// IO error occurred on the underlying stream
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The 4-byte magic tag does not name a known format
    #[error("Invalid magic tag: {0:02X?}")]
    InvalidMagic([u8; 4]),

    /// Malformed codec or stream header
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// Malformed compressed payload
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Source ran out in the middle of a command or symbol
    #[error("Unexpected end of data: {0}")]
    UnexpectedEof(String),

    /// Two length fields disagree, or the payload decoded to the wrong size
    #[error("Size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// Declared size is larger than the configured limit
    #[error("Capacity exceeded: {requested} bytes requested, limit is {limit}")]
    CapacityExceeded { limit: usize, requested: usize },

    /// Error while compressing
    #[error("Compression error: {0}")]
    Compression(String),

    /// Error while decompressing
    #[error("Decompression error: {0}")]
    Decompression(String),

    /// Format is reserved but not implemented
    #[error("Not implemented: {0}")]
    NotImplemented(String),
}

/// Result type alias for eapack operations
pub type Result<T> = std::result::Result<T, CompressionError>;

impl CompressionError {
    /// Shorthand for a truncation error.
    pub fn eof(context: impl Into<String>) -> Self {
        CompressionError::UnexpectedEof(context.into())
    }

    /// Shorthand for a payload format error.
    pub fn format(context: impl Into<String>) -> Self {
        CompressionError::InvalidFormat(context.into())
    }
}

impl From<CompressionError> for io::Error {
    fn from(err: CompressionError) -> Self {
        match err {
            CompressionError::Io(e) => e,
            CompressionError::UnexpectedEof(_) => {
                io::Error::new(io::ErrorKind::UnexpectedEof, err)
            }
            CompressionError::NotImplemented(_) => {
                io::Error::new(io::ErrorKind::Unsupported, err)
            }
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
