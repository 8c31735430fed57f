//! MSB-first bit writer.
//!
//! Fields are packed into a 32-bit accumulator from the top down. Whenever
//! 16 or more bits are pending, the top two bytes are flushed to the output.

/// Packs variable-width bit fields into a byte vector.
#[derive(Debug, Default, Clone)]
pub struct BitWriter {
    out: Vec<u8>,
    bits: u32,
    count: u32,
}

impl BitWriter {
    /// Largest field `put_bits` accepts.
    pub const MAX_BITS: u32 = 16;

    pub fn new() -> Self {
        Self::default()
    }

    /// Create a writer whose output buffer starts with `capacity` bytes reserved.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            out: Vec::with_capacity(capacity),
            bits: 0,
            count: 0,
        }
    }

    /// Write the low `n` bits of `value` (0 ≤ n ≤ 16). Writing 0 bits is a no-op.
    #[inline]
    pub fn put_bits(&mut self, n: u32, value: u32) {
        assert!(n <= Self::MAX_BITS, "bit field of {n} bits is too wide");
        if n == 0 {
            return;
        }
        let value = value & ((1u32 << n) - 1);

        self.bits |= value << (32 - self.count - n);
        self.count += n;

        if self.count >= 16 {
            self.out.push((self.bits >> 24) as u8);
            self.out.push((self.bits >> 16) as u8);
            self.bits <<= 16;
            self.count -= 16;
        }
    }

    /// Write a single bit.
    #[inline]
    pub fn put_bit(&mut self, bit: bool) {
        self.put_bits(1, bit as u32);
    }

    /// Bits written so far, flushed or pending.
    pub fn bit_len(&self) -> usize {
        self.out.len() * 8 + self.count as usize
    }

    /// Flush pending bits (zero-padded to a byte boundary) and return the output.
    pub fn finish(mut self) -> Vec<u8> {
        while self.count > 0 {
            self.out.push((self.bits >> 24) as u8);
            self.bits <<= 8;
            self.count = self.count.saturating_sub(8);
        }
        self.out
    }
}
