//! Shared test utilities for eapack integration tests.
//!
//! Sample data generators and a RefPack command scanner that all test
//! crates import via `mod common;`.

#![allow(dead_code)]

// ===========================================================================
// Sample data
// ===========================================================================

const WORDS: &[&str] = &[
    "tiberium", "harvester", "refinery", "barracks", "construction", "yard", "power", "plant",
    "nod", "gdi", "obelisk", "of", "light", "the", "a", "and", "mammoth", "tank", "orca",
];

/// Repetitive word soup of exactly `len` bytes, the shape of game text assets.
pub fn text_corpus(len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(len + 16);
    let mut state = 0x2545_F491u32;
    while out.len() < len {
        state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        let word = WORDS[(state >> 16) as usize % WORDS.len()];
        out.extend_from_slice(word.as_bytes());
        out.push(if (state >> 8) % 11 == 0 { b'\n' } else { b' ' });
    }
    out.truncate(len);
    out
}

/// Deterministic noise; compresses poorly.
pub fn pseudo_random(len: usize, seed: u32) -> Vec<u8> {
    let mut state = seed | 1;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 24) as u8
        })
        .collect()
}

/// Text, noise and long runs interleaved in 4 KiB blocks.
pub fn mixed(len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(len);
    let mut block = 0u32;
    while out.len() < len {
        let take = (len - out.len()).min(4096);
        match block % 3 {
            0 => out.extend(text_corpus(take)),
            1 => out.extend(pseudo_random(take, block)),
            _ => out.extend(std::iter::repeat(block as u8).take(take)),
        }
        block += 1;
    }
    out
}

/// Inputs every codec must survive.
pub fn edge_cases() -> Vec<Vec<u8>> {
    vec![
        Vec::new(),
        vec![0],
        b"ab".to_vec(),
        b"abc".to_vec(),
        b"abcd".to_vec(),
        b"AAAAAAAAAAAAA".to_vec(),
        vec![0xFF; 2000],
        (0..=255u8).collect(),
        text_corpus(777),
        pseudo_random(3000, 7),
    ]
}

// ===========================================================================
// RefPack command scanner
// ===========================================================================

/// One decoded RefPack command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefPackCommand {
    Copy {
        literals: usize,
        length: usize,
        distance: usize,
    },
    Literals(usize),
    End(usize),
}

/// Walk the commands of a RefPack payload without decoding them.
pub fn refpack_commands(payload: &[u8]) -> Vec<RefPackCommand> {
    let large = payload[0] & 0x80 != 0;
    let with_compressed = payload[0] & 0x01 != 0;
    let field = if large { 4 } else { 3 };
    let mut pos = 2 + field + if with_compressed { field } else { 0 };

    let mut commands = Vec::new();
    loop {
        let b0 = payload[pos];
        let command = match b0 {
            0x00..=0x7F => {
                let b1 = payload[pos + 1] as usize;
                pos += 2;
                RefPackCommand::Copy {
                    literals: (b0 & 0x03) as usize,
                    length: ((b0 & 0x1C) >> 2) as usize + 3,
                    distance: (((b0 & 0x60) as usize) << 3) + b1 + 1,
                }
            }
            0x80..=0xBF => {
                let b1 = payload[pos + 1] as usize;
                let b2 = payload[pos + 2] as usize;
                pos += 3;
                RefPackCommand::Copy {
                    literals: b1 >> 6,
                    length: (b0 & 0x3F) as usize + 4,
                    distance: ((b1 & 0x3F) << 8) + b2 + 1,
                }
            }
            0xC0..=0xDF => {
                let b1 = payload[pos + 1] as usize;
                let b2 = payload[pos + 2] as usize;
                let b3 = payload[pos + 3] as usize;
                pos += 4;
                RefPackCommand::Copy {
                    literals: (b0 & 0x03) as usize,
                    length: (((b0 & 0x0C) as usize) << 6) + b3 + 5,
                    distance: (((b0 & 0x10) as usize) << 12) + (b1 << 8) + b2 + 1,
                }
            }
            0xE0..=0xFB => {
                pos += 1;
                RefPackCommand::Literals((((b0 & 0x1F) as usize) << 2) + 4)
            }
            0xFC..=0xFF => RefPackCommand::End((b0 & 0x03) as usize),
        };

        match command {
            RefPackCommand::Copy { literals, .. } => pos += literals,
            RefPackCommand::Literals(count) => pos += count,
            RefPackCommand::End(_) => {
                commands.push(command);
                return commands;
            }
        }
        commands.push(command);
    }
}
