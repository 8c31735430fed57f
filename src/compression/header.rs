//! Stream header: 4-byte magic tag followed by the uncompressed length.
//!
//! ```text
//! offset  size  field
//! 0       4     magic ("EAR\0", "NOX\0", "ZL1\0".."ZL9\0", "EAB\0", "EAH\0")
//! 4       4     uncompressed length, u32 little-endian
//! 8       ..    codec payload
//! ```

use super::CompressionType;
use crate::error::{CompressionError, Result};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

/// Size of the stream header in bytes.
pub const HEADER_LEN: usize = 8;

/// Magic tags.
pub mod magic {
    /// RefPack payload.
    pub const REFPACK: [u8; 4] = *b"EAR\0";
    /// LZHL payload.
    pub const LZHL: [u8; 4] = *b"NOX\0";
    /// Binary tree payload (reserved).
    pub const BINARY_TREE: [u8; 4] = *b"EAB\0";
    /// Huffman with run-length payload (reserved).
    pub const HUFFMAN_RUN_LENGTH: [u8; 4] = *b"EAH\0";

    /// zlib tag for `level`; the level is stored as an ASCII digit.
    pub const fn zlib(level: u8) -> [u8; 4] {
        [b'Z', b'L', b'0' + level, 0]
    }
}

/// Parsed stream header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamHeader {
    pub compression: CompressionType,
    pub uncompressed_size: u32,
}

impl StreamHeader {
    /// Header for `size` bytes of `compression` data.
    pub fn new(compression: CompressionType, size: usize) -> Result<Self> {
        if compression.magic().is_none() {
            return Err(CompressionError::InvalidHeader(
                "raw data has no stream header".into(),
            ));
        }
        let uncompressed_size = u32::try_from(size).map_err(|_| {
            CompressionError::Compression(format!(
                "{size} bytes does not fit the 32-bit length field"
            ))
        })?;
        Ok(Self {
            compression,
            uncompressed_size,
        })
    }

    /// Read a header from the front of `reader`.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut tag = [0u8; 4];
        reader.read_exact(&mut tag).map_err(truncated)?;
        let compression =
            CompressionType::from_magic(&tag).ok_or(CompressionError::InvalidMagic(tag))?;
        let uncompressed_size = reader.read_u32::<LittleEndian>().map_err(truncated)?;
        Ok(Self {
            compression,
            uncompressed_size,
        })
    }

    /// Parse a header from the start of `data`.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut cursor = io::Cursor::new(data);
        Self::read(&mut cursor)
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        let tag = self
            .compression
            .magic()
            .ok_or_else(|| CompressionError::InvalidHeader("raw data has no stream header".into()))?;
        writer.write_all(&tag)?;
        writer.write_u32::<LittleEndian>(self.uncompressed_size)?;
        Ok(())
    }
}

fn truncated(err: io::Error) -> CompressionError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        CompressionError::eof("stream header")
    } else {
        CompressionError::Io(err)
    }
}

/// Identify the format of `data` from its first four bytes.
///
/// Anything shorter than a tag, or carrying an unknown tag, is reported as
/// [`CompressionType::None`].
pub fn detect_compression_type(data: &[u8]) -> CompressionType {
    data.get(..4)
        .and_then(|tag| <&[u8; 4]>::try_from(tag).ok())
        .and_then(CompressionType::from_magic)
        .unwrap_or(CompressionType::None)
}
