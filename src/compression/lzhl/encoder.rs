//! LZHL compressor.

use super::huffman::{HuffmanStats, HuffmanTable, END_SYMBOL, NUM_GROUPS, REBUILD_SYMBOL};
use super::{
    BUFFER_SIZE, DIRECT_MATCH_SYMBOLS, DISP_LOW_BITS, DISP_TABLE, HUFF_RECALC_LENGTH, MATCH,
    MATCH_OVER_TABLE, MATCH_SYMBOL_BASE, MAX_MATCH_OVER, MAX_RAW, MIN_MATCH, TABLE_BITS,
    TABLE_SIZE,
};
use crate::error::{CompressionError, Result};
use crate::io::BitWriter;

use tracing::{debug, trace};

const EMPTY_SLOT: u32 = u32::MAX;

/// Compressor for the LZHL format.
#[derive(Debug, Default, Clone, Copy)]
pub struct LzhlCompressor;

impl crate::compression::Compressor for LzhlCompressor {
    fn compress(&self, source: &[u8]) -> Result<Vec<u8>> {
        LzhlEncoder::new().compress(source)
    }
}

fn check_addressable(len: usize) -> Result<()> {
    if len as u64 > u32::MAX as u64 {
        return Err(CompressionError::Compression(format!(
            "{len} bytes exceeds the LZHL position range"
        ))).unwrap();
    }
    Ok(())
}

/// Hash the `MATCH` bytes starting at `pos` into a table index.
#[inline]
fn hash_at(data: &[u8], pos: usize) -> usize {
    let mut hash: u32 = 0;
    for &b in &data[pos..pos + MATCH] {
        hash = (hash ^ b as u32).wrapping_mul(0x343FD).wrapping_add(0x269EC3);
    }
    (hash >> (32 - TABLE_BITS)) as usize
}

/// Length of the common prefix of `data[a..]` and `data[b..]`, at most `limit`.
#[inline]
fn match_length(data: &[u8], a: usize, b: usize, limit: usize) -> usize {
    data[a..a + limit]
        .iter()
        .zip(&data[b..b + limit])
        .take_while(|(x, y)| x == y)
        .count()
}

// ---------------------------------------------------------------------------
// Symbol encoder
// ---------------------------------------------------------------------------

/// Adaptive Huffman symbol writer.
#[derive(Debug)]
pub struct SymbolEncoder {
    stats: HuffmanStats,
    table: HuffmanTable,
    until_rebuild: u32,
    rebuilds: usize,
    writer: BitWriter,
}

impl Default for SymbolEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolEncoder {
    pub fn new() -> Self {
        Self {
            stats: HuffmanStats::new(),
            table: HuffmanTable::initial(),
            until_rebuild: HUFF_RECALC_LENGTH,
            rebuilds: 0,
            writer: BitWriter::new(),
        }
    }

    /// Number of table rebuilds emitted so far.
    pub fn rebuilds(&self) -> usize {
        self.rebuilds
    }

    /// Current code table.
    pub fn table(&self) -> &HuffmanTable {
        &self.table
    }

    /// Emit `symbol`, rebuilding the table first when its countdown expires.
    pub fn put(&mut self, symbol: u16) {
        self.until_rebuild -= 1;
        if self.until_rebuild == 0 {
            self.rebuild_table();
        }
        self.emit(symbol);
    }

    /// Write raw bits after a symbol.
    #[inline]
    pub fn put_bits(&mut self, n: u32, value: u32) {
        self.writer.put_bits(n, value);
    }

    fn emit(&mut self, symbol: u16) {
        self.stats.record(symbol);
        let (len, code) = self.table.encode(symbol);
        self.writer.put_bits(len, code);
    }

    /// Announce a rebuild with the outgoing table, then send the new
    /// group widths as unary deltas.
    fn rebuild_table(&mut self) {
        self.emit(REBUILD_SYMBOL);

        let snapshot = self.stats.snapshot_and_decay();
        self.table = HuffmanTable::rebuild(&snapshot);
        self.until_rebuild = HUFF_RECALC_LENGTH;
        self.rebuilds += 1;

        let mut last = 0u8;
        for group in 0..NUM_GROUPS {
            let bits = self.table.group_bits()[group];
            let delta = (bits - last) as u32;
            self.writer.put_bits(delta + 1, 1);
            last = bits;
        }
        trace!(
            rebuild = self.rebuilds,
            groups = ?self.table.group_bits(),
            "rebuilt LZHL code table"
        );
    }

    /// Emit the end-of-stream symbol and return the packed bytes.
    pub fn finish(mut self) -> Vec<u8> {
        self.put(END_SYMBOL);
        self.writer.finish()
    }
}

// ---------------------------------------------------------------------------
// Match finder + encoder session
// ---------------------------------------------------------------------------

/// One LZHL compression session: match table plus symbol encoder.
#[derive(Debug)]
pub struct LzhlEncoder {
    table: Box<[u32]>,
    symbols: SymbolEncoder,
}

impl Default for LzhlEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl LzhlEncoder {
    pub fn new() -> Self {
        Self {
            table: vec![EMPTY_SLOT; TABLE_SIZE].into_boxed_slice(),
            symbols: SymbolEncoder::new(),
        }
    }

    /// Compress `source` and terminate the stream.
    ///
    /// Inputs longer than `u32::MAX` bytes are rejected: the match table
    /// stores positions as `u32`.
    pub fn compress(mut self, source: &[u8]) -> Result<Vec<u8>> {
        check_addressable(source.len())?;
        self.encode(source);
        let rebuilds = self.symbols.rebuilds();
        let out = self.symbols.finish();
        debug!(
            input = source.len(),
            output = out.len(),
            rebuilds,
            "LZHL compressed"
        );
        Ok(out)
    }

    /// Run the match finder over `source`, emitting literals and matches.
    fn encode(&mut self, source: &[u8]) {
        let len = source.len();
        let mut pos = 0usize;
        let mut raw_start = 0usize;

        while len - pos >= MATCH {
            let slot = hash_at(source, pos);
            let candidate = self.table[slot];
            self.table[slot] = pos as u32;

            let mut found = 0usize;
            let mut distance = 0usize;
            if candidate != EMPTY_SLOT {
                distance = pos - candidate as usize;
                if distance < BUFFER_SIZE {
                    let limit = distance.min(len - pos).min(MIN_MATCH + MAX_MATCH_OVER);
                    found = match_length(source, candidate as usize, pos, limit);
                }
            }

            if found >= MIN_MATCH {
                self.put_raw(&source[raw_start..pos]);
                self.put_match(found - MIN_MATCH, distance - found);

                for covered in pos + 1..pos + found {
                    if len - covered < MATCH {
                        break;
                    }
                    self.table[hash_at(source, covered)] = covered as u32;
                }
                pos += found;
                raw_start = pos;
            } else {
                pos += 1;
                if pos - raw_start >= MAX_RAW {
                    self.put_raw(&source[raw_start..pos]);
                    raw_start = pos;
                }
            }
        }

        self.put_raw(&source[raw_start..]);
    }

    fn put_raw(&mut self, literals: &[u8]) {
        for &b in literals {
            self.symbols.put(b as u16);
        }
    }

    /// Code a match as a length symbol (+ extra bits) and a displacement.
    ///
    /// `displacement` is the gap between the end of the referenced bytes
    /// and the current position, i.e. `distance - length`.
    fn put_match(&mut self, match_over: usize, displacement: usize) {
        assert!(match_over <= MAX_MATCH_OVER, "match too long: {match_over}");
        assert!(displacement < BUFFER_SIZE, "displacement too far: {displacement}");

        if match_over < DIRECT_MATCH_SYMBOLS {
            self.symbols.put(MATCH_SYMBOL_BASE + match_over as u16);
        } else {
            let class = MATCH_OVER_TABLE
                .iter()
                .rposition(|&(_, base)| base <= match_over)
                .unwrap_or(0);
            let (extra, base) = MATCH_OVER_TABLE[class];
            self.symbols
                .put(MATCH_SYMBOL_BASE + (DIRECT_MATCH_SYMBOLS + class) as u16);
            self.symbols.put_bits(extra, (match_over - base) as u32);
        }

        let class = DISP_TABLE
            .iter()
            .rposition(|&(_, base)| (base << DISP_LOW_BITS) <= displacement)
            .unwrap_or(0);
        let (extra, base) = DISP_TABLE[class];
        let raw = (displacement - (base << DISP_LOW_BITS)) as u32;
        let raw_bits = extra + DISP_LOW_BITS;
        self.symbols.put_bits(3, class as u32);
        if raw_bits > 8 {
            self.symbols.put_bits(raw_bits - 8, raw >> 8);
            self.symbols.put_bits(8, raw & 0xFF);
        } else {
            self.symbols.put_bits(raw_bits, raw);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::lzhl::decoder::decompress;

    fn roundtrip(data: &[u8]) -> Vec<u8> {
        let compressed = LzhlEncoder::new().compress(data).unwrap();
        decompress(&compressed, data.len()).unwrap()
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_position_range_limit() {
        assert!(check_addressable(u32::MAX as usize).is_ok());
        assert!(matches!(
            check_addressable(u32::MAX as usize + 1),
            Err(CompressionError::Compression(_))
        ));
    }

    #[test]
    fn test_empty_input_is_end_symbol_only() {
        let compressed = LzhlEncoder::new().compress(&[]).unwrap();
        // END_SYMBOL is rank 273 in the initial table: group 15, 5-bit index 29.
        assert_eq!(compressed, vec![0b1111_1110, 0b1000_0000]);
        assert_eq!(roundtrip(&[]), Vec::<u8>::new());
    }

    #[test]
    fn test_short_inputs() {
        for n in 0..=MATCH + 2 {
            let data: Vec<u8> = (0..n as u8).collect();
            assert_eq!(roundtrip(&data), data);
        }
    }

    #[test]
    fn test_repeated_text_uses_matches() {
        let data = b"the quick brown fox jumps over the lazy dog. ".repeat(40);
        let compressed = LzhlEncoder::new().compress(&data).unwrap();
        assert!(compressed.len() < data.len() / 4);
        assert_eq!(roundtrip(&data), data);
    }

    #[test]
    fn test_long_run_hits_max_match() {
        let data = vec![0x5Au8; 3000];
        assert_eq!(roundtrip(&data), data);
    }

    #[test]
    fn test_5000_bytes_trigger_rebuild() {
        let mut state = 0x9E37_79B9u32;
        let data: Vec<u8> = (0..5000)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state >> 24) as u8
            })
            .collect();
        let mut session = LzhlEncoder::new();
        session.encode(&data);
        assert!(session.symbols.rebuilds() >= 1);
        assert_eq!(roundtrip(&data), data);
    }

    #[test]
    fn test_match_lengths_across_classes() {
        let mut data = Vec::new();
        let block: Vec<u8> = (0..=255u8).collect();
        for extra in [0usize, 3, 7, 8, 9, 13, 37, 38, 100, 261, 262, 400, 517, 600] {
            data.extend_from_slice(&block);
            data.extend_from_slice(&block[..(MIN_MATCH + extra).min(256)]);
            data.extend(std::iter::repeat(0xEEu8).take(MIN_MATCH + extra));
        }
        assert_eq!(roundtrip(&data), data);
    }

    #[test]
    fn test_far_displacements() {
        let mut data: Vec<u8> = (0..70_000u32).map(|i| (i % 251) as u8 ^ (i / 251) as u8).collect();
        let tail = data[1000..1400].to_vec();
        data.extend_from_slice(&tail);
        assert_eq!(roundtrip(&data), data);
    }

    #[test]
    fn test_hash_depends_on_all_match_bytes() {
        let a = b"abcdeX";
        let b = b"abcdfX";
        assert_ne!(hash_at(a, 0), hash_at(b, 0));
        assert!(hash_at(a, 0) < TABLE_SIZE);
    }
}
