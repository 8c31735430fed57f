//! Codecs and the compression-type dispatch.
//!
//! Three payload formats are implemented:
//! - **RefPack** (`EAR\0`): byte-oriented LZ77 with tiered match commands
//! - **LZHL** (`NOX\0`): LZ77 with adaptive Huffman coding
//! - **zlib** (`ZL1\0`..`ZL9\0`): RFC 1950 via `flate2`
//!
//! `EAB\0` and `EAH\0` are recognised but not implemented.

pub mod header;
pub mod lzhl;
pub mod refpack;
pub mod zlib;

pub use header::{detect_compression_type, StreamHeader, HEADER_LEN};
pub use lzhl::{LzhlCompressor, LzhlDecompressor};
pub use refpack::{RefPackCompressor, RefPackDecompressor, RefPackOptions};
pub use zlib::{ZlibCompressor, ZlibDecompressor};

use crate::error::{CompressionError, Result};

use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Trait for compressing data.
pub trait Compressor {
    /// Compress the whole of `source` into a codec payload (no stream header).
    fn compress(&self, source: &[u8]) -> Result<Vec<u8>>;
}

/// Trait for decompressing data.
pub trait Decompressor {
    /// Decompress a codec payload that must expand to `decompressed_size` bytes.
    fn decompress(&self, source: &[u8], decompressed_size: usize) -> Result<Vec<u8>>;
}

// ---------------------------------------------------------------------------
// CompressionType
// ---------------------------------------------------------------------------

/// Payload format named by a stream's magic tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompressionType {
    /// Raw bytes, no header.
    #[default]
    None,
    /// RefPack (`EAR\0`).
    RefPack,
    /// LZHL (`NOX\0`).
    Lzhl,
    /// zlib at level 1–9 (`ZL1\0`..`ZL9\0`).
    ZLib(u8),
    /// Binary tree coding (`EAB\0`), reserved.
    BinaryTree,
    /// Huffman with run-length (`EAH\0`), reserved.
    HuffmanRunLength,
}

impl CompressionType {
    /// zlib at `level`, validated to 1–9.
    pub fn zlib(level: u8) -> Result<Self> {
        if (1..=9).contains(&level) {
            Ok(CompressionType::ZLib(level))
        } else {
            Err(CompressionError::InvalidHeader(format!(
                "zlib level {level} is outside 1-9"
            )))
        }
    }

    /// The 4-byte tag, or `None` for raw data and out-of-range zlib levels.
    pub fn magic(&self) -> Option<[u8; 4]> {
        use header::magic;
        match *self {
            CompressionType::None => None,
            CompressionType::RefPack => Some(magic::REFPACK),
            CompressionType::Lzhl => Some(magic::LZHL),
            CompressionType::ZLib(level @ 1..=9) => Some(magic::zlib(level)),
            CompressionType::ZLib(_) => None,
            CompressionType::BinaryTree => Some(magic::BINARY_TREE),
            CompressionType::HuffmanRunLength => Some(magic::HUFFMAN_RUN_LENGTH),
        }
    }

    /// Map a tag back to its format.
    pub fn from_magic(tag: &[u8; 4]) -> Option<Self> {
        use header::magic;
        match *tag {
            magic::REFPACK => Some(CompressionType::RefPack),
            magic::LZHL => Some(CompressionType::Lzhl),
            magic::BINARY_TREE => Some(CompressionType::BinaryTree),
            magic::HUFFMAN_RUN_LENGTH => Some(CompressionType::HuffmanRunLength),
            [b'Z', b'L', digit @ b'1'..=b'9', 0] => Some(CompressionType::ZLib(digit - b'0')),
            _ => None,
        }
    }

    /// Whether payloads of this type can be produced and consumed.
    pub fn is_implemented(&self) -> bool {
        !matches!(
            self,
            CompressionType::BinaryTree | CompressionType::HuffmanRunLength
        )
    }

    /// Check that payloads of this type can be produced: the zlib level
    /// must be 1–9 and the format must not be reserved.
    pub fn validate(&self) -> Result<()> {
        if let CompressionType::ZLib(level) = *self {
            CompressionType::zlib(level)?;
        }
        if self.is_implemented() {
            Ok(())
        } else {
            Err(CompressionError::NotImplemented(format!("{self} compression")))
        }
    }
}

impl fmt::Display for CompressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressionType::None => write!(f, "none"),
            CompressionType::RefPack => write!(f, "refpack"),
            CompressionType::Lzhl => write!(f, "lzhl"),
            CompressionType::ZLib(level) => write!(f, "zlib{level}"),
            CompressionType::BinaryTree => write!(f, "btree"),
            CompressionType::HuffmanRunLength => write!(f, "huffman"),
        }
    }
}

impl FromStr for CompressionType {
    type Err = CompressionError;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_ascii_lowercase();
        match name.as_str() {
            "none" | "raw" => Ok(CompressionType::None),
            "refpack" | "ear" => Ok(CompressionType::RefPack),
            "lzhl" | "nox" => Ok(CompressionType::Lzhl),
            "zlib" => Ok(CompressionType::ZLib(6)),
            "btree" | "eab" => Ok(CompressionType::BinaryTree),
            "huffman" | "eah" => Ok(CompressionType::HuffmanRunLength),
            other => match other.strip_prefix("zlib").map(str::parse::<u8>) {
                Some(Ok(level)) => CompressionType::zlib(level),
                _ => Err(CompressionError::InvalidHeader(format!(
                    "unknown compression type '{s}'"
                ))),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Settings shared by the one-shot helpers and [`CompressionStream`](crate::io::CompressionStream).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfiguration {
    /// Largest uncompressed size a header may declare before decoding is
    /// refused.
    ///
    /// Default: 256 MiB.
    pub max_uncompressed_size: usize,

    /// RefPack compressor tunables.
    pub refpack: RefPackOptions,
}

/// Headroom over twice the uncompressed size allowed for a payload.
const PAYLOAD_SLACK: usize = 4096;

impl StreamConfiguration {
    /// Most payload bytes read for a stream declaring `size` bytes.
    ///
    /// Every implemented codec stays under twice its input plus a small
    /// constant; bytes past the limit are left unread.
    pub fn payload_limit(&self, size: usize) -> usize {
        size.min(self.max_uncompressed_size)
            .saturating_mul(2)
            .saturating_add(PAYLOAD_SLACK)
    }
}

impl Default for StreamConfiguration {
    fn default() -> Self {
        Self {
            max_uncompressed_size: 256 * 1024 * 1024,
            refpack: RefPackOptions::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Payload dispatch
// ---------------------------------------------------------------------------

/// Compress `data` into a bare payload of the given type.
pub fn compress_payload(
    data: &[u8],
    compression: CompressionType,
    config: &StreamConfiguration,
) -> Result<Vec<u8>> {
    compression.validate()?;
    match compression {
        CompressionType::None => Ok(data.to_vec()),
        CompressionType::RefPack => RefPackCompressor::new(config.refpack).compress(data),
        CompressionType::Lzhl => LzhlCompressor.compress(data),
        CompressionType::ZLib(level) => ZlibCompressor::new(level).compress(data),
        CompressionType::BinaryTree | CompressionType::HuffmanRunLength => {
            unreachable!("reserved formats are rejected above")
        }
    }
}

/// Decompress a bare payload that must expand to `size` bytes.
pub fn decompress_payload(
    payload: &[u8],
    compression: CompressionType,
    size: usize,
    config: &StreamConfiguration,
) -> Result<Vec<u8>> {
    compression.validate()?;
    if size > config.max_uncompressed_size {
        return Err(CompressionError::CapacityExceeded {
            limit: config.max_uncompressed_size,
            requested: size,
        });
    }

    match compression {
        CompressionType::None => Ok(payload.to_vec()),
        CompressionType::RefPack => {
            let inner = refpack::declared_size(payload)?;
            if inner != size {
                return Err(CompressionError::SizeMismatch {
                    expected: size,
                    actual: inner,
                });
            }
            RefPackDecompressor.decompress(payload, size)
        }
        CompressionType::Lzhl => LzhlDecompressor.decompress(payload, size),
        CompressionType::ZLib(_) => ZlibDecompressor.decompress(payload, size),
        CompressionType::BinaryTree | CompressionType::HuffmanRunLength => {
            unreachable!("reserved formats are rejected above")
        }
    }
}

// ---------------------------------------------------------------------------
// One-shot helpers
// ---------------------------------------------------------------------------

/// Compress `data` and prepend the stream header.
///
/// [`CompressionType::None`] returns the data unchanged, without a header.
pub fn compress(data: &[u8], compression: CompressionType) -> Result<Vec<u8>> {
    compress_with(data, compression, &StreamConfiguration::default())
}

/// [`compress`] with explicit settings.
pub fn compress_with(
    data: &[u8],
    compression: CompressionType,
    config: &StreamConfiguration,
) -> Result<Vec<u8>> {
    let payload = compress_payload(data, compression, config)?;
    if compression == CompressionType::None {
        return Ok(payload);
    }

    let header = StreamHeader::new(compression, data.len())?;
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    header.write(&mut out)?;
    out.extend_from_slice(&payload);
    debug!(
        %compression,
        input = data.len(),
        output = out.len(),
        "compressed stream"
    );
    Ok(out)
}

/// Decompress a headed stream.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    decompress_with(data, &StreamConfiguration::default())
}

/// [`decompress`] with explicit settings.
pub fn decompress_with(data: &[u8], config: &StreamConfiguration) -> Result<Vec<u8>> {
    let header = StreamHeader::parse(data)?;
    decompress_payload(
        &data[HEADER_LEN..],
        header.compression,
        header.uncompressed_size as usize,
        config,
    )
}

/// Decompress `data` if it starts with a known tag; otherwise return it as is.
pub fn decompress_if_needed(data: &[u8]) -> Result<Vec<u8>> {
    match detect_compression_type(data) {
        CompressionType::None => Ok(data.to_vec()),
        _ => decompress(data),
    }
}
