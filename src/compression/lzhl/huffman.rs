//! Adaptive Huffman statistics for the LZHL symbol alphabet.
//!
//! Both directions keep a 16-bit counter per symbol. Every
//! [`HUFF_RECALC_LENGTH`](super::HUFF_RECALC_LENGTH) symbols the counters
//! are snapshotted, halved, and turned into a new code table with
//! [`HuffmanTable::rebuild`].
//!
//! A table is made of 16 groups. Every code is a 4-bit group index followed
//! by `group_bits[group]` bits selecting a symbol inside the group, so a
//! symbol's code length is `group_bits + 4`. Symbols are ranked by
//! (frequency desc, symbol index desc) and laid out over the groups in
//! order; group lengths never decrease, so frequent symbols get short codes.

/// Number of symbols in the alphabet: 256 literals, 16 match-length
/// classes, the table-rebuild marker and the end-of-stream marker.
pub const NUM_SYMBOLS: usize = 256 + 16 + 2;

/// Pseudo-symbol announcing a table rebuild.
pub const REBUILD_SYMBOL: u16 = (NUM_SYMBOLS - 2) as u16;

/// Pseudo-symbol terminating the stream.
pub const END_SYMBOL: u16 = (NUM_SYMBOLS - 1) as u16;

/// Number of code groups.
pub const NUM_GROUPS: usize = 16;

/// Width of the group selector that prefixes every code.
pub const GROUP_SELECTOR_BITS: u32 = 4;

/// Largest in-group index width.
pub const MAX_GROUP_BITS: u8 = 8;

/// Group widths in effect before the first rebuild (276 slots).
pub const INITIAL_GROUP_BITS: [u8; NUM_GROUPS] = [2, 3, 3, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 5, 5, 5];

/// Symbols ranked first in the initial table: the 16 match-length symbols,
/// then the most common literal bytes. The remaining literals follow in
/// index order; the rebuild and end markers take the last two ranks.
pub const INITIAL_LEADING_SYMBOLS: [u16; 20] = [
    256, 257, 258, 259, 260, 261, 262, 263, 264, 265, 266, 267, 268, 269, 270, 271, 0, 32, 48, 255,
];

// ---------------------------------------------------------------------------
// Frequency counters
// ---------------------------------------------------------------------------

/// Running per-symbol frequency counters.
#[derive(Debug, Clone)]
pub struct HuffmanStats {
    counts: [u16; NUM_SYMBOLS],
}

impl Default for HuffmanStats {
    fn default() -> Self {
        Self::new()
    }
}

impl HuffmanStats {
    pub fn new() -> Self {
        Self {
            counts: [0; NUM_SYMBOLS],
        }
    }

    /// Count one occurrence of `symbol`.
    #[inline]
    pub fn record(&mut self, symbol: u16) {
        let slot = &mut self.counts[symbol as usize];
        *slot = slot.saturating_add(1);
    }

    /// Current counters.
    pub fn counts(&self) -> &[u16; NUM_SYMBOLS] {
        &self.counts
    }

    /// Return the current counters, then halve them in place.
    pub fn snapshot_and_decay(&mut self) -> [u16; NUM_SYMBOLS] {
        let snapshot = self.counts;
        for count in self.counts.iter_mut() {
            *count >>= 1;
        }
        snapshot
    }
}

// ---------------------------------------------------------------------------
// Code table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct SymbolCode {
    /// Code length including the group selector; 0 when unreachable.
    len: u8,
    code: u16,
}

/// A canonical group/length code table.
#[derive(Debug, Clone)]
pub struct HuffmanTable {
    group_bits: [u8; NUM_GROUPS],
    group_start: [usize; NUM_GROUPS],
    /// Rank → symbol.
    order: [u16; NUM_SYMBOLS],
    /// Symbol → code.
    codes: [SymbolCode; NUM_SYMBOLS],
}

impl HuffmanTable {
    /// The table both sides use before the first rebuild.
    pub fn initial() -> Self {
        let mut order = [0u16; NUM_SYMBOLS];
        order[..INITIAL_LEADING_SYMBOLS.len()].copy_from_slice(&INITIAL_LEADING_SYMBOLS);
        let literals = (0..256u16).filter(|s| !INITIAL_LEADING_SYMBOLS.contains(s));
        for (slot, symbol) in order[INITIAL_LEADING_SYMBOLS.len()..].iter_mut().zip(literals) {
            *slot = symbol;
        }
        order[NUM_SYMBOLS - 2] = REBUILD_SYMBOL;
        order[NUM_SYMBOLS - 1] = END_SYMBOL;

        let table = Self::from_parts(order, INITIAL_GROUP_BITS);
        debug_assert!(table.is_complete());
        table
    }

    /// Build a new table from a frequency snapshot.
    ///
    /// Pure function of `frequencies`: the decoder reproduces the same
    /// ranking from its own counters and only receives the group widths.
    pub fn rebuild(frequencies: &[u16; NUM_SYMBOLS]) -> Self {
        let order = rank_symbols(frequencies);
        let ranked: Vec<u32> = order
            .iter()
            .map(|&s| frequencies[s as usize] as u32)
            .collect();
        let group_bits = choose_group_bits(&ranked);

        let table = Self::from_parts(order, group_bits);
        assert!(
            table.is_complete(),
            "rebuilt table leaves symbols without a code: {:?}",
            group_bits
        );
        table
    }

    /// Assemble a table from a symbol ranking and 16 group widths.
    ///
    /// # Panics
    ///
    /// Panics if the widths decrease or exceed [`MAX_GROUP_BITS`]; callers
    /// holding untrusted widths validate them first.
    pub fn from_parts(order: [u16; NUM_SYMBOLS], group_bits: [u8; NUM_GROUPS]) -> Self {
        let mut last = 0u8;
        for &bits in &group_bits {
            assert!(
                bits >= last && bits <= MAX_GROUP_BITS,
                "invalid group widths {:?}",
                group_bits
            );
            last = bits;
        }

        let mut group_start = [0usize; NUM_GROUPS];
        let mut codes = [SymbolCode::default(); NUM_SYMBOLS];
        let mut pos = 0usize;
        for (group, &bits) in group_bits.iter().enumerate() {
            group_start[group] = pos;
            let items = 1usize << bits;
            let available = items.min(NUM_SYMBOLS.saturating_sub(pos));
            for k in 0..available {
                let symbol = order[pos + k] as usize;
                codes[symbol] = SymbolCode {
                    len: bits + GROUP_SELECTOR_BITS as u8,
                    code: ((group << bits) | k) as u16,
                };
            }
            pos += items;
        }

        Self {
            group_bits,
            group_start,
            order,
            codes,
        }
    }

    /// In-group index widths, non-decreasing.
    pub fn group_bits(&self) -> &[u8; NUM_GROUPS] {
        &self.group_bits
    }

    /// Whether every symbol has a code.
    pub fn is_complete(&self) -> bool {
        self.codes.iter().all(|c| c.len != 0)
    }

    /// `(length, code)` for `symbol`.
    ///
    /// # Panics
    ///
    /// Panics if the symbol has no code in this table.
    #[inline]
    pub fn encode(&self, symbol: u16) -> (u32, u32) {
        let entry = self.codes[symbol as usize];
        assert!(entry.len != 0, "symbol {symbol} has no code");
        (entry.len as u32, entry.code as u32)
    }

    /// Resolve `(group, index)` to a symbol, or `None` past the alphabet.
    #[inline]
    pub fn decode(&self, group: usize, index: u32) -> Option<u16> {
        let pos = self.group_start[group] + index as usize;
        self.order.get(pos).copied()
    }
}

/// Rank symbols by (frequency desc, symbol index desc).
pub fn rank_symbols(frequencies: &[u16; NUM_SYMBOLS]) -> [u16; NUM_SYMBOLS] {
    let mut order = [0u16; NUM_SYMBOLS];
    for (i, slot) in order.iter_mut().enumerate() {
        *slot = i as u16;
    }
    order.sort_by(|&a, &b| {
        frequencies[b as usize]
            .cmp(&frequencies[a as usize])
            .then(b.cmp(&a))
    });
    order
}

/// Pick the 16 group widths for ranked frequencies.
///
/// Groups 0–13 are grown greedily: each doubles in size while its share
/// stays under the average of what is left, then keeps whichever of the
/// last two sizes lands closer to that average. Groups 14 and 15 split the
/// tail at the point that minimises the total bits spent on it.
fn choose_group_bits(ranked: &[u32]) -> [u8; NUM_GROUPS] {
    let n = ranked.len() as i64;
    let freq = |i: i64| ranked[i as usize] as i64;
    let total: i64 = ranked.iter().map(|&f| f as i64).sum();

    let mut groups = [0u8; NUM_GROUPS];
    let mut pos: i64 = 0;
    let mut assigned: i64 = 0;

    for group in 0..NUM_GROUPS - 2 {
        let average = (total - assigned) / (NUM_GROUPS - group) as i64;
        let mut i: i64 = 0;
        let mut taken: i64 = 0;
        let mut candidate: i64 = 0;
        let mut bits: i64 = 0;

        loop {
            let mut items: i64 = 1 << bits;
            let mut over = false;
            if pos + items > n {
                items = n - pos;
                over = true;
            }

            while i < items {
                candidate += freq(pos + i);
                i += 1;
            }

            if over || bits >= MAX_GROUP_BITS as i64 || candidate > average {
                if bits == 0 || (taken - average).abs() > (candidate - average).abs() {
                    taken = candidate;
                } else {
                    bits -= 1;
                }
                insert_group(&mut groups, group, bits as u8);
                assigned += taken;
                pos += 1 << bits;
                break;
            }

            taken = candidate;
            bits += 1;
        }
    }

    let left: i64 = (pos.max(0)..n).map(freq).sum();
    let mut best = i64::MAX;
    let mut best_bits: u8 = 0;
    let mut best_bits_tail: u8 = 0;
    let mut i: i64 = 0;
    let mut head: i64 = 0;
    let mut bits: i64 = 0;

    loop {
        let items: i64 = 1 << bits;
        if pos + items > n {
            break;
        }
        while i < items {
            head += freq(pos + i);
            i += 1;
        }

        let tail_items = n - (pos + i);
        let mut tail_bits: i64 = 0;
        while (1i64 << tail_bits) < tail_items {
            tail_bits += 1;
        }

        if bits <= MAX_GROUP_BITS as i64 && tail_bits <= MAX_GROUP_BITS as i64 {
            let cost = head * bits + (left - head) * tail_bits;
            if cost < best {
                best = cost;
                best_bits = bits as u8;
                best_bits_tail = tail_bits as u8;
            } else {
                break;
            }
        }
        bits += 1;
    }

    insert_group(&mut groups, NUM_GROUPS - 2, best_bits);
    insert_group(&mut groups, NUM_GROUPS - 1, best_bits_tail);
    groups
}

/// Insert `bits` into the sorted prefix `groups[..=group]`.
fn insert_group(groups: &mut [u8; NUM_GROUPS], group: usize, bits: u8) {
    let mut j = group;
    while j > 0 && bits < groups[j - 1] {
        groups[j] = groups[j - 1];
        j -= 1;
    }
    groups[j] = bits;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn assert_canonical(table: &HuffmanTable) {
        let bits = table.group_bits();
        assert!(bits.windows(2).all(|w| w[0] <= w[1]), "{bits:?}");
        assert!(bits.iter().all(|&b| b <= MAX_GROUP_BITS));

        let mut seen = HashSet::new();
        for symbol in 0..NUM_SYMBOLS as u16 {
            let (len, code) = table.encode(symbol);
            assert!((4..=12).contains(&len));
            assert!(seen.insert((len, code)), "code collision for {symbol}");

            let group_width = len - GROUP_SELECTOR_BITS;
            let group = (code >> group_width) as usize;
            let index = code & ((1 << group_width) - 1);
            assert_eq!(bits[group] as u32, group_width);
            assert_eq!(table.decode(group, index), Some(symbol));
        }
    }

    #[test]
    fn test_initial_table_is_canonical() {
        let table = HuffmanTable::initial();
        assert_eq!(table.group_bits(), &INITIAL_GROUP_BITS);
        assert_canonical(&table);
        // Match symbols lead: 256..=259 in the 2-bit group, 260..=267 next.
        assert_eq!(table.encode(256), (6, 0b00_00));
        assert_eq!(table.encode(259), (6, 0b00_11));
        assert_eq!(table.encode(260), (7, 0b0001_000));
        assert_eq!(table.encode(271), (7, 0b0010_011));
        // Then the common bytes 0, 32, 48, 255 close group 2.
        assert_eq!(table.encode(0), (7, 0b0010_100));
        assert_eq!(table.encode(32), (7, 0b0010_101));
        assert_eq!(table.encode(48), (7, 0b0010_110));
        assert_eq!(table.encode(255), (7, 0b0010_111));
        // Remaining literals in index order from group 3.
        assert_eq!(table.encode(1), (8, 0b0011_0000));
        assert_eq!(table.encode(2), (8, 0b0011_0001));
        assert_eq!(table.encode(REBUILD_SYMBOL), (9, (15 << 5) | 28));
        assert_eq!(table.encode(END_SYMBOL), (9, (15 << 5) | 29));
        assert_eq!(table.decode(0, 0), Some(256));
    }

    #[test]
    fn test_rank_prefers_frequency_then_higher_index() {
        let mut freq = [0u16; NUM_SYMBOLS];
        freq[10] = 5;
        freq[20] = 5;
        freq[3] = 9;
        let order = rank_symbols(&freq);
        assert_eq!(&order[..3], &[3, 20, 10]);
        assert_eq!(order[3], END_SYMBOL);
        assert_eq!(order[NUM_SYMBOLS - 1], 0);
    }

    #[test]
    fn test_rebuild_all_zero() {
        let table = HuffmanTable::rebuild(&[0; NUM_SYMBOLS]);
        assert_canonical(&table);
    }

    #[test]
    fn test_rebuild_uniform() {
        let table = HuffmanTable::rebuild(&[100; NUM_SYMBOLS]);
        assert_canonical(&table);
    }

    #[test]
    fn test_rebuild_skewed_gives_short_codes_to_frequent_symbols() {
        let mut freq = [1u16; NUM_SYMBOLS];
        freq[b'e' as usize] = 4000;
        freq[b't' as usize] = 2000;
        freq[END_SYMBOL as usize] = 0;
        let table = HuffmanTable::rebuild(&freq);
        assert_canonical(&table);

        let (len_e, _) = table.encode(b'e' as u16);
        let (len_t, _) = table.encode(b't' as u16);
        let (len_rare, _) = table.encode(b'q' as u16);
        assert_eq!(len_e, 4);
        assert!(len_e <= len_t);
        assert!(len_t < len_rare);
    }

    #[test]
    fn test_rebuild_single_symbol() {
        let mut freq = [0u16; NUM_SYMBOLS];
        freq[65] = u16::MAX;
        let table = HuffmanTable::rebuild(&freq);
        assert_canonical(&table);
        assert_eq!(table.encode(65), (4, 0));
    }

    #[test]
    fn test_rebuild_geometric_distribution() {
        let mut freq = [0u16; NUM_SYMBOLS];
        for (i, f) in freq.iter_mut().enumerate() {
            *f = (8192u32 >> (i / 16)).max(1) as u16;
        }
        assert_canonical(&HuffmanTable::rebuild(&freq));
    }

    #[test]
    fn test_stats_decay_halves() {
        let mut stats = HuffmanStats::new();
        for _ in 0..5 {
            stats.record(7);
        }
        stats.record(END_SYMBOL);
        let snapshot = stats.snapshot_and_decay();
        assert_eq!(snapshot[7], 5);
        assert_eq!(snapshot[END_SYMBOL as usize], 1);
        assert_eq!(stats.counts()[7], 2);
        assert_eq!(stats.counts()[END_SYMBOL as usize], 0);
    }

    #[test]
    fn test_stats_saturate() {
        let mut stats = HuffmanStats::new();
        for _ in 0..70_000u32 {
            stats.record(1);
        }
        assert_eq!(stats.counts()[1], u16::MAX);
    }

    #[test]
    fn test_decode_past_alphabet() {
        let table = HuffmanTable::initial();
        // Group 15 holds ranks 244..276; ranks 274 and 275 are empty.
        assert_eq!(table.decode(15, 29), Some(273));
        assert_eq!(table.decode(15, 30), None);
        assert_eq!(table.decode(15, 31), None);
    }

    #[test]
    #[should_panic]
    fn test_from_parts_rejects_decreasing_widths() {
        let order = rank_symbols(&[0; NUM_SYMBOLS]);
        let mut bits = INITIAL_GROUP_BITS;
        bits[3] = 1;
        let _ = HuffmanTable::from_parts(order, bits);
    }
}
