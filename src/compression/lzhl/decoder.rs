//! LZHL decompressor.

use super::huffman::{
    rank_symbols, HuffmanStats, HuffmanTable, END_SYMBOL, GROUP_SELECTOR_BITS, MAX_GROUP_BITS,
    NUM_GROUPS, REBUILD_SYMBOL,
};
use super::{
    BUFFER_SIZE, DIRECT_MATCH_SYMBOLS, DISP_LOW_BITS, DISP_TABLE, MATCH_OVER_TABLE,
    MATCH_SYMBOL_BASE, MIN_MATCH,
};
use crate::error::{CompressionError, Result};
use crate::io::BitReader;
use crate::window::BitWindow;

use tracing::{debug, trace};

/// Decompressor for the LZHL format.
#[derive(Debug, Default, Clone, Copy)]
pub struct LzhlDecompressor;

impl crate::compression::Decompressor for LzhlDecompressor {
    fn decompress(&self, source: &[u8], decompressed_size: usize) -> Result<Vec<u8>> {
        decompress(source, decompressed_size)
    }
}

/// Decompress an LZHL payload that must expand to exactly `decompressed_size` bytes.
pub fn decompress(source: &[u8], decompressed_size: usize) -> Result<Vec<u8>> {
    let mut session = LzhlDecoder::new();
    let out = session.decode(source, decompressed_size)?;
    debug!(
        input = source.len(),
        output = out.len(),
        rebuilds = session.rebuilds(),
        "LZHL decompressed"
    );
    Ok(out)
}

/// One LZHL decompression session: counters, code table and history.
#[derive(Debug)]
pub struct LzhlDecoder {
    stats: HuffmanStats,
    table: HuffmanTable,
    window: BitWindow,
    rebuilds: usize,
}

impl Default for LzhlDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl LzhlDecoder {
    pub fn new() -> Self {
        Self {
            stats: HuffmanStats::new(),
            table: HuffmanTable::initial(),
            window: BitWindow::new(BUFFER_SIZE),
            rebuilds: 0,
        }
    }

    /// Number of table rebuilds seen so far.
    pub fn rebuilds(&self) -> usize {
        self.rebuilds
    }

    /// Decode symbols until the end marker.
    ///
    /// Fails if the output would exceed `expected` bytes, if the stream ends
    /// before the end marker, or if it ends short of `expected` bytes.
    pub fn decode(&mut self, source: &[u8], expected: usize) -> Result<Vec<u8>> {
        let mut reader = BitReader::new(source);
        let mut out = Vec::with_capacity(expected);

        loop {
            let symbol = self.next_symbol(&mut reader)?;
            self.stats.record(symbol);

            match symbol {
                0..=255 => {
                    if out.len() >= expected {
                        return Err(overrun(expected, out.len() + 1));
                    }
                    self.window.push(symbol as u8);
                    out.push(symbol as u8);
                }
                REBUILD_SYMBOL => self.rebuild_table(&mut reader)?,
                END_SYMBOL => break,
                _ => {
                    let match_over = read_match_over(symbol, &mut reader)?;
                    let displacement = read_displacement(&mut reader)?;
                    let length = match_over + MIN_MATCH;
                    let distance = displacement + length;

                    if out.len() + length > expected {
                        return Err(overrun(expected, out.len() + length));
                    }
                    self.window.copy_match(distance, length, &mut out)?;
                }
            }
        }

        if out.len() != expected {
            return Err(CompressionError::SizeMismatch {
                expected,
                actual: out.len(),
            });
        }
        Ok(out)
    }

    fn next_symbol(&self, reader: &mut BitReader<'_>) -> Result<u16> {
        let group = reader.get_bits(GROUP_SELECTOR_BITS)? as usize;
        let bits = self.table.group_bits()[group] as u32;
        let index = reader.get_bits(bits)?;
        self.table.decode(group, index).ok_or_else(|| {
            CompressionError::format(format!(
                "symbol index {index} in group {group} is past the alphabet"
            ))
        })
    }

    /// Rank the current counters, halve them, and read the new group widths.
    fn rebuild_table(&mut self, reader: &mut BitReader<'_>) -> Result<()> {
        let snapshot = self.stats.snapshot_and_decay();
        let order = rank_symbols(&snapshot);

        let mut group_bits = [0u8; NUM_GROUPS];
        let mut last = 0u8;
        for slot in group_bits.iter_mut() {
            while !reader.get_bit()? {
                last += 1;
                if last > MAX_GROUP_BITS {
                    return Err(CompressionError::format(format!(
                        "group width exceeds {MAX_GROUP_BITS} bits"
                    )));
                }
            }
            *slot = last;
        }

        self.table = HuffmanTable::from_parts(order, group_bits);
        self.rebuilds += 1;
        trace!(rebuild = self.rebuilds, groups = ?group_bits, "rebuilt LZHL code table");
        Ok(())
    }
}

fn overrun(expected: usize, requested: usize) -> CompressionError {
    CompressionError::format(format!(
        "decoded data overruns declared size ({requested} > {expected})"
    ))
}

fn read_match_over(symbol: u16, reader: &mut BitReader<'_>) -> Result<usize> {
    let class = (symbol - MATCH_SYMBOL_BASE) as usize;
    if class < DIRECT_MATCH_SYMBOLS {
        return Ok(class);
    }
    let (extra, base) = MATCH_OVER_TABLE[class - DIRECT_MATCH_SYMBOLS];
    Ok(base + reader.get_bits(extra)? as usize)
}

fn read_displacement(reader: &mut BitReader<'_>) -> Result<usize> {
    let class = reader.get_bits(3)? as usize;
    let (extra, base) = DISP_TABLE[class];
    let mut raw_bits = extra + DISP_LOW_BITS;

    let mut raw = 0usize;
    if raw_bits > 8 {
        raw_bits -= 8;
        raw = (reader.get_bits(8)? as usize) << raw_bits;
    }
    raw |= reader.get_bits(raw_bits)? as usize;
    Ok((base << DISP_LOW_BITS) + raw)
}
