//! # eapack
//!
//! A pure Rust library for the compression formats found in legacy game
//! asset archives.
//!
//! ## Features
//!
//! - RefPack (`EAR\0`) compression and decompression
//! - LZHL (`NOX\0`) LZ77 + adaptive Huffman compression and decompression
//! - zlib (`ZL1\0`..`ZL9\0`) via `flate2`
//! - Magic-tag detection and a sequential `Read`/`Write` stream wrapper
//!
//! ## Quick Start
//!
//! ```rust
//! use eapack::{compress, decompress, detect_compression_type, CompressionType};
//!
//! let data = b"the quick brown fox jumps over the quick brown fox".to_vec();
//! let packed = compress(&data, CompressionType::RefPack)?;
//! assert_eq!(detect_compression_type(&packed), CompressionType::RefPack);
//! assert_eq!(decompress(&packed)?, data);
//! # Ok::<(), eapack::CompressionError>(())
//! ```
//!
//! ## Architecture
//!
//! - [`compression::Compressor`] / [`compression::Decompressor`] - payload codecs
//! - [`CompressionType`] - closed set of formats named by magic tags
//! - [`io::CompressionStream`] - header-aware stream wrapper
//! - [`window::BitWindow`] - circular history used by the LZ decoders

#![allow(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod compression;
pub mod error;
pub mod io;
pub mod window;

// Re-export commonly used types
pub use error::{CompressionError, Result};

pub use compression::{
    compress, compress_with, decompress, decompress_if_needed, decompress_with,
    detect_compression_type, CompressionType, StreamConfiguration, StreamHeader,
};

pub use compression::lzhl::{HuffmanStats, HuffmanTable, LzhlCompressor, LzhlDecompressor};
pub use compression::refpack::{RefPackCompressor, RefPackDecompressor, RefPackOptions};
pub use compression::zlib::{ZlibCompressor, ZlibDecompressor};

pub use io::{BitReader, BitWriter, CompressionStream};
pub use window::BitWindow;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_detect_after_compress() {
        let data = vec![0x42u8; 300];
        for ty in [CompressionType::RefPack, CompressionType::Lzhl, CompressionType::ZLib(1)] {
            let packed = compress(&data, ty).unwrap();
            assert_eq!(detect_compression_type(&packed), ty);
        }
    }
}
