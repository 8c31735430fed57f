//! MSB-first bit reader.
//!
//! Bits are unpacked from a 32-bit accumulator, most significant bit first.
//! The accumulator is refilled one byte (8 bits) at a time whenever a
//! request needs more bits than it holds.

use crate::error::{CompressionError, Result};

/// Reads variable-width bit fields from a byte slice.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    position: usize,
    bits: u32,
    count: u32,
}

impl<'a> BitReader<'a> {
    /// Largest field `get_bits` accepts.
    pub const MAX_BITS: u32 = 16;

    /// Create a reader over `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            position: 0,
            bits: 0,
            count: 0,
        }
    }

    /// Read an `n`-bit field (0 ≤ n ≤ 16). Reading 0 bits consumes nothing.
    ///
    /// Running out of input is an error; missing bits are never zero-filled.
    pub fn get_bits(&mut self, n: u32) -> Result<u32> {
        assert!(n <= Self::MAX_BITS, "bit field of {n} bits is too wide");
        if n == 0 {
            return Ok(0);
        }

        while self.count < n {
            let byte = *self.data.get(self.position).ok_or_else(|| {
                CompressionError::eof(format!(
                    "needed {} bits at byte {}, only {} buffered",
                    n, self.position, self.count
                ))
            })?;
            self.position += 1;
            self.bits |= (byte as u32) << (24 - self.count);
            self.count += 8;
        }

        let value = self.bits >> (32 - n);
        self.bits <<= n;
        self.count -= n;
        Ok(value)
    }

    /// Read a single bit.
    #[inline]
    pub fn get_bit(&mut self) -> Result<bool> {
        Ok(self.get_bits(1)? != 0)
    }

    /// Number of source bytes pulled into the accumulator so far.
    pub fn bytes_consumed(&self) -> usize {
        self.position
    }

    /// Bits still available, buffered or unread.
    pub fn remaining_bits(&self) -> usize {
        (self.data.len() - self.position) * 8 + self.count as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_msb_first() {
        let mut reader = BitReader::new(&[0b1011_0010, 0xFF]);
        assert_eq!(reader.get_bits(1).unwrap(), 1);
        assert_eq!(reader.get_bits(3).unwrap(), 0b011);
        assert_eq!(reader.get_bits(4).unwrap(), 0b0010);
        assert_eq!(reader.get_bits(8).unwrap(), 0xFF);
    }

    #[test]
    fn test_wide_field_spans_bytes() {
        let mut reader = BitReader::new(&[0x12, 0x34, 0x56]);
        assert_eq!(reader.get_bits(4).unwrap(), 0x1);
        assert_eq!(reader.get_bits(16).unwrap(), 0x2345);
        assert_eq!(reader.get_bits(4).unwrap(), 0x6);
        assert_eq!(reader.remaining_bits(), 0);
    }

    #[test]
    fn test_zero_width_read_is_noop() {
        let mut reader = BitReader::new(&[]);
        assert_eq!(reader.get_bits(0).unwrap(), 0);
        assert_eq!(reader.bytes_consumed(), 0);
    }

    #[test]
    fn test_exhaustion_is_error() {
        let mut reader = BitReader::new(&[0xAB]);
        assert_eq!(reader.get_bits(6).unwrap(), 0b101010);
        let err = reader.get_bits(3).unwrap_err();
        assert!(matches!(err, CompressionError::UnexpectedEof(_)));
    }
}
