//! RefPack compression and decompression.
//!
//! RefPack is a byte-oriented LZ77 variant. A payload starts with a 2-byte
//! big-endian type field (`0x10FB`, optionally flagged) and the
//! uncompressed size, followed by a stream of commands:
//!
//! | First byte  | Size | Literals   | Length    | Distance       |
//! |-------------|------|------------|-----------|----------------|
//! | `0x00–0x7F` | 2    | 0–3        | 3–10      | 1–1024         |
//! | `0x80–0xBF` | 3    | 0–3        | 4–67      | 1–16384        |
//! | `0xC0–0xDF` | 4    | 0–3        | 5–1028    | 1–131071       |
//! | `0xE0–0xFB` | 1    | 4–112      | –         | –              |
//! | `0xFC–0xFF` | 1    | 0–3, ends  | –         | –              |
//!
//! Literals carried by a match command are copied before the match.

use crate::error::{CompressionError, Result};
use crate::window::BitWindow;

use bitflags::bitflags;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;
use tracing::debug;

/// Signature bits of the type field.
pub const SIGNATURE: u16 = 0x10FB;

/// Bits of the type field compared against [`SIGNATURE`].
pub const SIGNATURE_MASK: u16 = 0x3EFF;

/// History reachable by a very-int command.
pub const WINDOW_SIZE: usize = 1 << 17;

/// Farthest distance the compressor emits.
pub const MAX_DISTANCE: usize = 0x1FFFF;

/// Longest match any command can carry.
pub const MAX_MATCH: usize = 1028;

/// Longest literal-only run.
pub const MAX_LITERAL_RUN: usize = 112;

/// Largest size representable with a 3-byte length field.
const MAX_SHORT_SIZE: usize = 0xFF_FFFF;

const HASH_SIZE: usize = 1 << 16;
const LINK_MASK: usize = WINDOW_SIZE - 1;
const NO_POSITION: u32 = u32::MAX;

bitflags! {
    /// Flags carried in the type field alongside the signature.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct RefPackFlags: u16 {
        /// Size fields are 4 bytes instead of 3.
        const LARGE_SIZES = 0x8000;
        /// A compressed-size field precedes the uncompressed size.
        const COMPRESSED_SIZE = 0x0100;
    }
}

/// Tunables for the RefPack compressor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefPackOptions {
    /// Maximum hash-chain candidates probed per position.
    ///
    /// Default: 4096.
    pub max_chain_depth: usize,
}

impl Default for RefPackOptions {
    fn default() -> Self {
        Self {
            max_chain_depth: 4096,
        }
    }
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// Parsed RefPack payload header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefPackHeader {
    pub flags: RefPackFlags,
    /// Compressed size, when the payload carries one.
    pub compressed_size: Option<usize>,
    pub uncompressed_size: usize,
    /// Bytes taken by the header.
    pub header_len: usize,
}

impl RefPackHeader {
    /// Parse the header at the start of `source`.
    pub fn parse(source: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(source);
        let eof = |_| CompressionError::eof("RefPack header");

        let type_field = cursor.read_u16::<BigEndian>().map_err(eof)?;
        if type_field & SIGNATURE_MASK != SIGNATURE {
            return Err(CompressionError::InvalidHeader(format!(
                "RefPack type field {type_field:#06X} lacks the {SIGNATURE:#06X} signature"
            )));
        }
        let flags = RefPackFlags::from_bits_truncate(type_field);

        let read_size = |cursor: &mut Cursor<&[u8]>| -> Result<usize> {
            let value = if flags.contains(RefPackFlags::LARGE_SIZES) {
                cursor.read_u32::<BigEndian>()
            } else {
                cursor.read_u24::<BigEndian>()
            };
            value.map(|v| v as usize).map_err(eof)
        };

        let compressed_size = if flags.contains(RefPackFlags::COMPRESSED_SIZE) {
            Some(read_size(&mut cursor)?)
        } else {
            None
        };
        let uncompressed_size = read_size(&mut cursor)?;

        Ok(Self {
            flags,
            compressed_size,
            uncompressed_size,
            header_len: cursor.position() as usize,
        })
    }

    /// Append the header for a payload of `uncompressed_size` bytes.
    pub fn write(uncompressed_size: usize, out: &mut Vec<u8>) -> Result<()> {
        if uncompressed_size > MAX_SHORT_SIZE {
            let size = u32::try_from(uncompressed_size).map_err(|_| {
                CompressionError::Compression(format!(
                    "{uncompressed_size} bytes exceeds the RefPack size field"
                ))
            })?;
            out.write_u16::<BigEndian>(SIGNATURE | RefPackFlags::LARGE_SIZES.bits())?;
            out.write_u32::<BigEndian>(size)?;
        } else {
            out.write_u16::<BigEndian>(SIGNATURE)?;
            out.write_u24::<BigEndian>(uncompressed_size as u32)?;
        }
        Ok(())
    }
}

/// Whether `source` starts with a RefPack header.
pub fn is_refpack(source: &[u8]) -> bool {
    RefPackHeader::parse(source).is_ok()
}

/// The uncompressed size recorded in a RefPack header.
pub fn declared_size(source: &[u8]) -> Result<usize> {
    Ok(RefPackHeader::parse(source)?.uncompressed_size)
}

// ---------------------------------------------------------------------------
// Decompressor
// ---------------------------------------------------------------------------

/// Decompressor for RefPack payloads.
#[derive(Debug, Default, Clone, Copy)]
pub struct RefPackDecompressor;

impl super::Decompressor for RefPackDecompressor {
    fn decompress(&self, source: &[u8], decompressed_size: usize) -> Result<Vec<u8>> {
        let out = decompress(source)?;
        if out.len() != decompressed_size {
            return Err(CompressionError::SizeMismatch {
                expected: decompressed_size,
                actual: out.len(),
            });
        }
        Ok(out)
    }
}

/// Decompress a RefPack payload, header included.
pub fn decompress(source: &[u8]) -> Result<Vec<u8>> {
    let header = RefPackHeader::parse(source)?;
    let mut decoder = RefPackDecoder {
        source,
        pos: header.header_len,
        expected: header.uncompressed_size,
        out: Vec::with_capacity(header.uncompressed_size.min(source.len().saturating_mul(64))),
        window: BitWindow::new(WINDOW_SIZE),
    };
    decoder.run()?;
    debug!(
        input = source.len(),
        output = decoder.out.len(),
        "RefPack decompressed"
    );
    Ok(decoder.out)
}

struct RefPackDecoder<'a> {
    source: &'a [u8],
    pos: usize,
    expected: usize,
    out: Vec<u8>,
    window: BitWindow,
}

impl RefPackDecoder<'_> {
    fn run(&mut self) -> Result<()> {
        loop {
            let b0 = self.read_byte()?;
            match b0 {
                0x00..=0x7F => {
                    let b1 = self.read_byte()? as usize;
                    let literals = (b0 & 0x03) as usize;
                    let length = ((b0 & 0x1C) >> 2) as usize + 3;
                    let distance = (((b0 & 0x60) as usize) << 3) + b1 + 1;
                    self.copy_literals(literals)?;
                    self.copy_match(distance, length)?;
                }
                0x80..=0xBF => {
                    let b1 = self.read_byte()? as usize;
                    let b2 = self.read_byte()? as usize;
                    let literals = b1 >> 6;
                    let length = (b0 & 0x3F) as usize + 4;
                    let distance = ((b1 & 0x3F) << 8) + b2 + 1;
                    self.copy_literals(literals)?;
                    self.copy_match(distance, length)?;
                }
                0xC0..=0xDF => {
                    let b1 = self.read_byte()? as usize;
                    let b2 = self.read_byte()? as usize;
                    let b3 = self.read_byte()? as usize;
                    let literals = (b0 & 0x03) as usize;
                    let length = (((b0 & 0x0C) as usize) << 6) + b3 + 5;
                    let distance = (((b0 & 0x10) as usize) << 12) + (b1 << 8) + b2 + 1;
                    self.copy_literals(literals)?;
                    self.copy_match(distance, length)?;
                }
                0xE0..=0xFB => {
                    let literals = (((b0 & 0x1F) as usize) << 2) + 4;
                    self.copy_literals(literals)?;
                }
                0xFC..=0xFF => {
                    self.copy_literals((b0 & 0x03) as usize)?;
                    break;
                }
            }
        }

        if self.out.len() != self.expected {
            return Err(CompressionError::SizeMismatch {
                expected: self.expected,
                actual: self.out.len(),
            });
        }
        Ok(())
    }

    fn read_byte(&mut self) -> Result<u8> {
        let b = *self
            .source
            .get(self.pos)
            .ok_or_else(|| CompressionError::eof(format!("RefPack command at byte {}", self.pos)))?;
        self.pos += 1;
        Ok(b)
    }

    fn check_room(&self, count: usize) -> Result<()> {
        if self.out.len() + count > self.expected {
            return Err(CompressionError::format(format!(
                "RefPack data overruns declared size ({} > {})",
                self.out.len() + count,
                self.expected
            )));
        }
        Ok(())
    }

    fn copy_literals(&mut self, count: usize) -> Result<()> {
        if count == 0 {
            return Ok(());
        }
        let end = self.pos + count;
        let literals = self.source.get(self.pos..end).ok_or_else(|| {
            CompressionError::eof(format!("{count} RefPack literals at byte {}", self.pos))
        })?;
        self.check_room(count)?;
        self.window.extend_from_slice(literals);
        self.out.extend_from_slice(literals);
        self.pos = end;
        Ok(())
    }

    fn copy_match(&mut self, distance: usize, length: usize) -> Result<()> {
        self.check_room(length)?;
        self.window.copy_match(distance, length, &mut self.out)
    }
}

// ---------------------------------------------------------------------------
// Compressor
// ---------------------------------------------------------------------------

/// Compressor for RefPack payloads.
#[derive(Debug, Default, Clone, Copy)]
pub struct RefPackCompressor {
    pub options: RefPackOptions,
}

impl RefPackCompressor {
    pub fn new(options: RefPackOptions) -> Self {
        Self { options }
    }
}

impl super::Compressor for RefPackCompressor {
    fn compress(&self, source: &[u8]) -> Result<Vec<u8>> {
        RefPackEncoder::new(self.options).compress(source)
    }
}

/// Compress `source` with default options.
pub fn compress(source: &[u8]) -> Result<Vec<u8>> {
    RefPackEncoder::new(RefPackOptions::default()).compress(source)
}

/// Bytes a match command of this shape costs.
#[inline]
fn command_cost(distance: usize, length: usize) -> usize {
    let offset = distance - 1;
    if offset < 1024 && length <= 10 {
        2
    } else if offset < 16384 && length <= 67 {
        3
    } else {
        4
    }
}

#[inline]
fn hash3(data: &[u8], pos: usize) -> usize {
    let b0 = data[pos] as usize;
    let b1 = data[pos + 1] as usize;
    let b2 = data[pos + 2] as usize;
    ((b0 << 8) | b2) ^ (b1 << 4)
}

/// One RefPack compression session: hash heads and chain links.
pub struct RefPackEncoder {
    options: RefPackOptions,
    head: Vec<u32>,
    links: Vec<u32>,
}

impl RefPackEncoder {
    pub fn new(options: RefPackOptions) -> Self {
        Self {
            options,
            head: vec![NO_POSITION; HASH_SIZE],
            links: vec![NO_POSITION; WINDOW_SIZE],
        }
    }

    /// Compress `source`, header included.
    pub fn compress(mut self, source: &[u8]) -> Result<Vec<u8>> {
        let len = source.len();
        let mut out = Vec::with_capacity(len / 2 + 16);
        RefPackHeader::write(len, &mut out)?;

        let mut pos = 0usize;
        let mut run_start = 0usize;

        while pos + 3 <= len {
            let Some((distance, length)) = self.find_match(source, pos) else {
                self.insert(source, pos);
                pos += 1;
                continue;
            };

            let run = flush_literal_runs(source, run_start, pos, &mut out);
            write_match(distance, length, run.len(), &mut out);
            out.extend_from_slice(run);

            let end = pos + length;
            for covered in pos..end.min(len - 2) {
                self.insert(source, covered);
            }
            pos = end;
            run_start = pos;
        }

        let tail = flush_literal_runs(source, run_start, len, &mut out);
        out.push(0xFC + tail.len() as u8);
        out.extend_from_slice(tail);

        debug!(input = len, output = out.len(), "RefPack compressed");
        Ok(out)
    }

    fn insert(&mut self, data: &[u8], pos: usize) {
        let hash = hash3(data, pos);
        self.links[pos & LINK_MASK] = self.head[hash];
        self.head[hash] = pos as u32;
    }

    /// Best `(distance, length)` at `pos` by `length - cost`, if it pays.
    fn find_match(&self, data: &[u8], pos: usize) -> Option<(usize, usize)> {
        let max_len = (data.len() - pos).min(MAX_MATCH);
        let mut best_len = 0usize;
        let mut best_distance = 0usize;
        let mut best_score = 0isize;

        let mut candidate = self.head[hash3(data, pos)];
        let mut depth = 0usize;
        while candidate != NO_POSITION {
            let cand = candidate as usize;
            let distance = pos - cand;
            if distance > MAX_DISTANCE || depth >= self.options.max_chain_depth {
                break;
            }
            depth += 1;

            if best_len == 0 || data[cand + best_len] == data[pos + best_len] {
                let length = data[cand..cand + max_len]
                    .iter()
                    .zip(&data[pos..pos + max_len])
                    .take_while(|(a, b)| a == b)
                    .count();
                let cost = command_cost(distance, length);
                let score = length as isize - cost as isize;
                if length > cost && score > best_score {
                    best_len = length;
                    best_distance = distance;
                    best_score = score;
                    if length == max_len {
                        break;
                    }
                }
            }

            candidate = self.links[cand & LINK_MASK];
        }

        (best_len > 0).then_some((best_distance, best_len))
    }
}

/// Emit literal-only runs for `data[start..end]` in multiples of four, and
/// return the 0–3 leftover bytes.
fn flush_literal_runs<'a>(data: &'a [u8], mut start: usize, end: usize, out: &mut Vec<u8>) -> &'a [u8] {
    while end - start > 3 {
        let chunk = ((end - start) & !3).min(MAX_LITERAL_RUN);
        out.push(0xE0 + ((chunk >> 2) - 1) as u8);
        out.extend_from_slice(&data[start..start + chunk]);
        start += chunk;
    }
    &data[start..end]
}

/// Emit the cheapest command shape for a match with `literals` (0–3) leading bytes.
fn write_match(distance: usize, length: usize, literals: usize, out: &mut Vec<u8>) {
    debug_assert!(literals <= 3);
    debug_assert!((1..=MAX_DISTANCE).contains(&distance));
    let offset = distance - 1;
    let run = literals as u8;

    match command_cost(distance, length) {
        2 => {
            out.push((((offset >> 8) << 5) | ((length - 3) << 2)) as u8 | run);
            out.push(offset as u8);
        }
        3 => {
            out.push(0x80 | (length - 4) as u8);
            out.push((run << 6) | (offset >> 8) as u8);
            out.push(offset as u8);
        }
        _ => {
            out.push(0xC0 | (((offset >> 16) << 4) | (((length - 5) >> 8) << 2)) as u8 | run);
            out.push((offset >> 8) as u8);
            out.push(offset as u8);
            out.push((length - 5) as u8);
        }
    }
}
