use super::tokens::{
    Token, BASE_MATCH_LENGTH, BASE_MATCH_OFFSET, MAX_MATCH_LENGTH, MAX_MATCH_OFFSET,
};
use super::MAX_STORE_BLOCK_SIZE;

const TABLE_BITS: u32 = 14;
const TABLE_SIZE: usize = 1 << TABLE_BITS;
const TABLE_MASK: u32 = TABLE_SIZE as u32 - 1;
const TABLE_SHIFT: u32 = 32 - TABLE_BITS;

/// `cur` is rebased once it passes this, well before it could overflow.
const BUFFER_RESET: i32 = i32::MAX - 2 * MAX_STORE_BLOCK_SIZE as i32;

/// Bytes kept free at the end of a block so that every probe can load a
/// full 8 bytes.
const INPUT_MARGIN: usize = 16 - 1;

/// Blocks shorter than this are not worth searching at all.
const MIN_NON_LITERAL_BLOCK_SIZE: usize = 1 + 1 + INPUT_MARGIN;

#[inline]
fn load32(b: &[u8], i: i32) -> u32 {
    let i = i as usize;
    u32::from_le_bytes([b[i], b[i + 1], b[i + 2], b[i + 3]])
}

#[inline]
fn load64(b: &[u8], i: i32) -> u64 {
    let i = i as usize;
    u64::from_le_bytes([
        b[i],
        b[i + 1],
        b[i + 2],
        b[i + 3],
        b[i + 4],
        b[i + 5],
        b[i + 6],
        b[i + 7],
    ])
}

/// Multiplicative hash of a 4-byte probe. The multiply must be unsigned
/// and wrapping; signed arithmetic corrupts the table index.
#[inline]
fn hash(u: u32) -> u32 {
    u.wrapping_mul(0x1e35a7bd) >> TABLE_SHIFT
}

#[derive(Clone, Copy, Default)]
struct TableEntry {
    val: u32,
    /// Position in the logical byte stream, absolute against `cur`.
    offset: i32,
}

/// Greedy LZ77 match-finder over 64 KiB blocks.
///
/// Probes a direct-mapped hash table of 4-byte values, skipping ahead
/// faster the longer it goes without a match. The previous block is
/// retained so matches may reach back across one block boundary. Output is
/// a [`Token`] stream for the block writer.
pub struct MatchFinder {
    table: Box<[TableEntry]>,
    /// Bytes of the previous block; empty when there is no usable history.
    prev: Vec<u8>,
    /// Absolute offset of the start of the current block.
    cur: i32,
}

impl MatchFinder {
    pub fn new() -> Self {
        Self {
            table: vec![TableEntry::default(); TABLE_SIZE].into_boxed_slice(),
            prev: Vec::with_capacity(MAX_STORE_BLOCK_SIZE),
            cur: MAX_STORE_BLOCK_SIZE as i32,
        }
    }

    /// Tokenize one block of at most 65535 bytes, appending to `dst`.
    pub fn encode(&mut self, dst: &mut Vec<Token>, src: &[u8]) {
        debug_assert!(src.len() <= MAX_STORE_BLOCK_SIZE);
        if self.cur >= BUFFER_RESET {
            self.shift_offsets();
        }

        if src.len() < MIN_NON_LITERAL_BLOCK_SIZE {
            self.cur += MAX_STORE_BLOCK_SIZE as i32;
            self.prev.clear();
            emit_literals(dst, src);
            return;
        }

        // Positions past s_limit are never probed; the margin guarantees
        // room for the 8-byte look-ahead load.
        let s_limit = (src.len() - INPUT_MARGIN) as i32;
        let mut next_emit: i32 = 0;
        let mut s: i32 = 0;
        let mut cv = load32(src, s);
        let mut next_hash = hash(cv);

        'block: loop {
            // Probe for a match, advancing one byte per probe for the
            // first 32 probes, then two bytes, and so on.
            let mut skip: i32 = 32;
            let mut next_s = s;
            let mut candidate;
            loop {
                s = next_s;
                let bytes_between_hash_lookups = skip >> 5;
                next_s = s + bytes_between_hash_lookups;
                skip += bytes_between_hash_lookups;
                if next_s > s_limit {
                    break 'block;
                }
                candidate = self.table[(next_hash & TABLE_MASK) as usize];
                let now = load32(src, next_s);
                self.table[(next_hash & TABLE_MASK) as usize] =
                    TableEntry { val: cv, offset: s + self.cur };
                next_hash = hash(now);
                let offset = s - (candidate.offset - self.cur);
                if offset > MAX_MATCH_OFFSET as i32 || cv != candidate.val {
                    cv = now;
                    continue;
                }
                break;
            }

            // A 4-byte match starts at s; emit the literals leading up
            // to it.
            emit_literals(dst, &src[next_emit as usize..s as usize]);

            loop {
                let base = s;

                // The first four bytes already matched; extend.
                s += 4;
                let t = candidate.offset - self.cur + 4;
                let l = self.match_len(s, t, src);
                dst.push(Token::from_xpair(
                    (s + l - base) as u32 - BASE_MATCH_LENGTH,
                    (s - t) as u32 - BASE_MATCH_OFFSET,
                ));
                s += l;
                next_emit = s;
                if s >= s_limit {
                    break 'block;
                }

                // Before probing afresh, index s-1 and s; when s itself
                // starts another match we can emit it immediately. One
                // 64-bit load feeds both hashes.
                let x = load64(src, s - 1);
                let prev_hash = hash(x as u32);
                self.table[(prev_hash & TABLE_MASK) as usize] =
                    TableEntry { val: x as u32, offset: self.cur + s - 1 };
                let x = x >> 8;
                let curr_hash = hash(x as u32);
                candidate = self.table[(curr_hash & TABLE_MASK) as usize];
                self.table[(curr_hash & TABLE_MASK) as usize] =
                    TableEntry { val: x as u32, offset: self.cur + s };

                let offset = s - (candidate.offset - self.cur);
                if offset > MAX_MATCH_OFFSET as i32 || x as u32 != candidate.val {
                    cv = (x >> 8) as u32;
                    next_hash = hash(cv);
                    s += 1;
                    break;
                }
            }
        }

        if (next_emit as usize) < src.len() {
            emit_literals(dst, &src[next_emit as usize..]);
        }
        self.cur += src.len() as i32;
        self.prev.clear();
        self.prev.extend_from_slice(src);
    }

    /// Length of the match continuing at `src[s..]` against position `t`,
    /// which is negative when the match starts in the previous block.
    /// The four bytes before both positions have already matched; the
    /// returned extension keeps the total within 258 bytes and in bounds.
    fn match_len(&self, s: i32, t: i32, src: &[u8]) -> i32 {
        let s1 = (s as usize + MAX_MATCH_LENGTH as usize - 4).min(src.len());
        let s = s as usize;

        if t >= 0 {
            let a = &src[s..s1];
            let b = &src[t as usize..t as usize + a.len()];
            return match a.iter().zip(b).position(|(x, y)| x != y) {
                Some(i) => i as i32,
                None => a.len() as i32,
            };
        }

        // The match starts in the previous block.
        let tp = self.prev.len() as i32 + t;
        if tp < 0 {
            return 0;
        }
        let a = &src[s..s1];
        let b = &self.prev[tp as usize..];
        let n = a.len().min(b.len());
        if let Some(i) = a[..n].iter().zip(&b[..n]).position(|(x, y)| x != y) {
            return i as i32;
        }
        if s + n == s1 {
            return n as i32;
        }

        // The previous block matched entirely; continue from the start of
        // the current one.
        let a = &src[s + n..s1];
        let b = &src[..a.len()];
        match a.iter().zip(b).position(|(x, y)| x != y) {
            Some(i) => (n + i) as i32,
            None => (n + a.len()) as i32,
        }
    }

    /// Forget all history. Table entries are invalidated by distance
    /// rather than cleared.
    pub fn reset(&mut self) {
        self.prev.clear();
        self.cur += MAX_MATCH_OFFSET as i32;
        if self.cur >= BUFFER_RESET {
            self.shift_offsets();
        }
    }

    /// Rebase all table offsets so `cur` can restart at the smallest
    /// value that still fails the distance check for dead entries.
    fn shift_offsets(&mut self) {
        if self.prev.is_empty() {
            self.table.fill(TableEntry::default());
            self.cur = MAX_MATCH_OFFSET as i32 + 1;
            return;
        }
        for entry in self.table.iter_mut() {
            entry.offset = (entry.offset - self.cur + MAX_MATCH_OFFSET as i32 + 1).max(0);
        }
        self.cur = MAX_MATCH_OFFSET as i32 + 1;
    }
}

impl Default for MatchFinder {
    fn default() -> Self {
        Self::new()
    }
}

fn emit_literals(dst: &mut Vec<Token>, src: &[u8]) {
    dst.extend(src.iter().map(|&b| Token::literal(b)));
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Re-expand a token stream, appending to `out` so history spans
    /// blocks the way a real decoder's window does.
    fn expand(tokens: &[Token], out: &mut Vec<u8>) {
        for &t in tokens {
            if t.is_literal() {
                out.push(t.literal_value() as u8);
            } else {
                let dist = t.distance() as usize;
                let len = t.match_len() as usize;
                assert!((3..=258).contains(&len));
                assert!(dist >= 1 && dist <= out.len(), "distance {} exceeds history", dist);
                for _ in 0..len {
                    out.push(out[out.len() - dist]);
                }
            }
        }
    }

    fn xorshift(state: &mut u64) -> u64 {
        *state ^= *state << 13;
        *state ^= *state >> 7;
        *state ^= *state << 17;
        *state
    }

    fn check_round_trip(blocks: &[&[u8]]) {
        let mut finder = MatchFinder::new();
        let mut out = Vec::new();
        for block in blocks {
            let mut tokens = Vec::new();
            finder.encode(&mut tokens, block);
            expand(&tokens, &mut out);
        }
        let joined: Vec<u8> = blocks.concat();
        assert_eq!(out, joined);
    }

    #[test]
    fn test_short_input_is_all_literals() {
        let mut finder = MatchFinder::new();
        let mut tokens = Vec::new();
        finder.encode(&mut tokens, b"0123456789abcdef"); // 16 < 17
        assert_eq!(tokens.len(), 16);
        assert!(tokens.iter().all(|t| t.is_literal()));
    }

    #[test]
    fn test_repetitive_data_produces_matches() {
        let data: Vec<u8> = b"ABCDABCDABCDABCD".iter().cycle().take(4096).copied().collect();
        let mut finder = MatchFinder::new();
        let mut tokens = Vec::new();
        finder.encode(&mut tokens, &data);
        assert!(tokens.iter().any(|t| !t.is_literal()));
        // Heavy repetition should shrink the token count well below the
        // input length.
        assert!(tokens.len() < data.len() / 8);
        let mut out = Vec::new();
        expand(&tokens, &mut out);
        assert_eq!(out, data);
    }

    #[test]
    fn test_random_data_round_trips() {
        let mut state = 0x9E3779B97F4A7C15u64;
        let data: Vec<u8> = (0..10_000).map(|_| (xorshift(&mut state) & 0xFF) as u8).collect();
        check_round_trip(&[&data]);
    }

    #[test]
    fn test_mixed_data_round_trips() {
        let mut state = 0xD1B54A32D192ED03u64;
        let mut data = Vec::new();
        while data.len() < 50_000 {
            if xorshift(&mut state) % 3 == 0 {
                data.extend_from_slice(b"the quick brown fox jumps over the lazy dog ");
            } else {
                let n = 20 + (xorshift(&mut state) % 200) as usize;
                for _ in 0..n {
                    data.push((xorshift(&mut state) & 0xFF) as u8);
                }
            }
        }
        check_round_trip(&[&data]);
    }

    #[test]
    fn test_cross_block_matches_round_trip() {
        // Identical consecutive blocks force references into `prev`.
        let block: Vec<u8> =
            b"GATTACA-GATTACA-".iter().cycle().take(30_000).copied().collect();
        check_round_trip(&[&block, &block, &block]);
    }

    #[test]
    fn test_match_bounds() {
        let data = vec![0u8; MAX_STORE_BLOCK_SIZE];
        let mut finder = MatchFinder::new();
        let mut tokens = Vec::new();
        finder.encode(&mut tokens, &data);
        for t in tokens.iter().filter(|t| !t.is_literal()) {
            assert!((3..=258).contains(&t.match_len()));
            assert!((1..=32768).contains(&t.distance()));
        }
        let mut out = Vec::new();
        expand(&tokens, &mut out);
        assert_eq!(out, data);
    }

    #[test]
    fn test_reset_forgets_history() {
        let data: Vec<u8> = b"ABCDABCDABCDABCD".iter().cycle().take(8192).copied().collect();
        let mut finder = MatchFinder::new();
        let mut first = Vec::new();
        finder.encode(&mut first, &data);

        // After reset the finder must behave like a fresh one.
        finder.reset();
        let mut after_reset = Vec::new();
        finder.encode(&mut after_reset, &data);
        let mut fresh_tokens = Vec::new();
        MatchFinder::new().encode(&mut fresh_tokens, &data);
        assert_eq!(after_reset, fresh_tokens);

        let mut out = Vec::new();
        expand(&after_reset, &mut out);
        assert_eq!(out, data);
    }

    #[test]
    fn test_offsets_survive_rebase() {
        // Push `cur` to the rebase threshold with real history in place;
        // the next encode must rebase and still match across the boundary.
        let data: Vec<u8> = b"wrap-around-".iter().cycle().take(20_000).copied().collect();
        let mut finder = MatchFinder::new();
        finder.cur = BUFFER_RESET - 1;
        let mut out = Vec::new();

        let mut tokens = Vec::new();
        finder.encode(&mut tokens, &data);
        expand(&tokens, &mut out);

        let mut tokens = Vec::new();
        finder.encode(&mut tokens, &data);
        assert!(finder.cur < BUFFER_RESET);
        assert!(tokens.iter().any(|t| !t.is_literal()));
        expand(&tokens, &mut out);

        assert_eq!(out, [&data[..], &data[..]].concat());
    }

    #[test]
    fn test_rebase_without_history_clears_table() {
        let mut finder = MatchFinder::new();
        finder.cur = BUFFER_RESET;
        finder.reset();
        assert_eq!(finder.cur, MAX_MATCH_OFFSET as i32 + 1);
        assert!(finder.table.iter().all(|e| e.offset == 0 && e.val == 0));
    }
}
