//! LZHL: LZ77 with adaptive Huffman coding.
//!
//! The payload is a bit-packed stream of symbols from a 274-entry alphabet
//! (see [`huffman`]). Literals are coded one symbol per byte; matches are a
//! length-class symbol plus extra bits, followed by a 3-bit displacement
//! class and raw displacement bits. Code tables adapt to the data: every
//! [`HUFF_RECALC_LENGTH`] symbols the encoder emits a rebuild marker and the
//! new group widths, and both sides rebuild from their running counters.
//!
//! The payload carries no length field; the stream header supplies the
//! uncompressed size and the stream ends with an explicit end symbol.

pub mod decoder;
pub mod encoder;
pub mod huffman;

pub use decoder::LzhlDecompressor;
pub use encoder::LzhlCompressor;
pub use huffman::{HuffmanStats, HuffmanTable};

/// log2 of the history window.
pub const BUFFER_BITS: u32 = 16;

/// History window size.
pub const BUFFER_SIZE: usize = 1 << BUFFER_BITS;

/// Shortest match worth coding.
pub const MIN_MATCH: usize = 4;

/// Bytes hashed by the match finder.
pub const MATCH: usize = 5;

/// log2 of the match finder table size.
pub const TABLE_BITS: u32 = 15;

/// Match finder table size.
pub const TABLE_SIZE: usize = 1 << TABLE_BITS;

/// Pending literal count that forces a flush.
pub const MAX_RAW: usize = 64;

/// Largest `length - MIN_MATCH` a match can carry.
pub const MAX_MATCH_OVER: usize = 517;

/// Symbols between table rebuilds.
pub const HUFF_RECALC_LENGTH: u32 = 4096;

/// First match-length symbol.
pub(crate) const MATCH_SYMBOL_BASE: u16 = 256;

/// Number of match lengths coded directly by their symbol.
pub(crate) const DIRECT_MATCH_SYMBOLS: usize = 8;

/// `(extra bits, base)` for the extended match-length symbols 264..=271.
pub(crate) const MATCH_OVER_TABLE: [(u32, usize); 8] = [
    (1, 8),
    (2, 10),
    (3, 14),
    (4, 22),
    (5, 38),
    (6, 70),
    (7, 134),
    (8, 262),
];

/// Low displacement bits shared by every displacement class.
pub(crate) const DISP_LOW_BITS: u32 = BUFFER_BITS - 7;

/// `(extra bits, base)` for the eight displacement classes. The coded
/// value is `(base << DISP_LOW_BITS) + raw`, with `extra + DISP_LOW_BITS`
/// raw bits.
pub(crate) const DISP_TABLE: [(u32, usize); 8] = [
    (0, 0),
    (0, 1),
    (1, 2),
    (2, 4),
    (3, 8),
    (4, 16),
    (5, 32),
    (6, 64),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_over_table_is_contiguous() {
        let mut next = DIRECT_MATCH_SYMBOLS;
        for &(extra, base) in &MATCH_OVER_TABLE {
            assert_eq!(base, next);
            next = base + (1 << extra);
        }
        assert_eq!(next - 1, MAX_MATCH_OVER);
    }

    #[test]
    fn test_disp_table_covers_window() {
        let mut next = 0;
        for &(extra, base) in &DISP_TABLE {
            assert_eq!(base << DISP_LOW_BITS, next);
            next = (base << DISP_LOW_BITS) + (1 << (extra + DISP_LOW_BITS));
        }
        assert_eq!(next, BUFFER_SIZE);
    }
}
