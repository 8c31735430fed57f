//! zlib pass-through backed by `flate2`.

use crate::error::{CompressionError, Result};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};
use tracing::debug;

/// zlib compressor at a fixed level (1–9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZlibCompressor {
    level: u8,
}

impl ZlibCompressor {
    /// # Panics
    ///
    /// Panics if `level` is outside 1–9.
    pub fn new(level: u8) -> Self {
        assert!((1..=9).contains(&level), "zlib level {level} out of range");
        Self { level }
    }

    pub fn level(&self) -> u8 {
        self.level
    }
}

impl super::Compressor for ZlibCompressor {
    fn compress(&self, source: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(
            Vec::with_capacity(source.len() / 2 + 16),
            Compression::new(self.level as u32),
        );
        encoder
            .write_all(source)
            .map_err(|e| CompressionError::Compression(format!("zlib: {e}")))?;
        let out = encoder
            .finish()
            .map_err(|e| CompressionError::Compression(format!("zlib: {e}")))?;
        debug!(level = self.level, input = source.len(), output = out.len(), "zlib compressed");
        Ok(out)
    }
}

/// zlib decompressor; the level is irrelevant when inflating.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZlibDecompressor;

impl super::Decompressor for ZlibDecompressor {
    fn decompress(&self, source: &[u8], decompressed_size: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(decompressed_size);
        // One extra byte lets an oversized stream show up as a mismatch.
        let mut decoder = ZlibDecoder::new(source).take(decompressed_size as u64 + 1);
        decoder
            .read_to_end(&mut out)
            .map_err(|e| CompressionError::Decompression(format!("zlib: {e}")))?;

        if out.len() != decompressed_size {
            return Err(CompressionError::SizeMismatch {
                expected: decompressed_size,
                actual: out.len(),
            });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::{Compressor, Decompressor};

    #[test]
    fn test_roundtrip_every_level() {
        let data = b"zlib zlib zlib zlib zlib".repeat(20);
        for level in 1..=9 {
            let compressed = ZlibCompressor::new(level).compress(&data).unwrap();
            let restored = ZlibDecompressor.decompress(&compressed, data.len()).unwrap();
            assert_eq!(restored, data);
        }
    }

    #[test]
    fn test_size_mismatch() {
        let compressed = ZlibCompressor::new(6).compress(b"twelve bytes").unwrap();
        assert!(matches!(
            ZlibDecompressor.decompress(&compressed, 5),
            Err(CompressionError::SizeMismatch { expected: 5, actual: 6 })
        ));
        assert!(matches!(
            ZlibDecompressor.decompress(&compressed, 20),
            Err(CompressionError::SizeMismatch { expected: 20, actual: 12 })
        ));
    }

    #[test]
    fn test_corrupt_stream() {
        assert!(ZlibDecompressor.decompress(&[0xDE, 0xAD, 0xBE, 0xEF], 4).is_err());
    }

    #[test]
    #[should_panic]
    fn test_level_zero_rejected() {
        let _ = ZlibCompressor::new(0);
    }
}
