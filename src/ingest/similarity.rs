//! Ratcliff/Obershelp string similarity.
//!
//! `ratio = 2 * M / (|a| + |b|)` where `M` is the number of characters in
//! the matching blocks found by taking the longest common block, then
//! recursing on the pieces to its left and right.

use std::collections::HashMap;

/// Case-folded ratio of two strings, in `[0, 1]`.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a = fold(a);
    let b = fold(b);
    char_ratio(&a, &b)
}

pub fn fold(text: &str) -> Vec<char> {
    text.to_lowercase().chars().collect()
}

pub fn char_ratio(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_chars(a, b) as f64 / total as f64
}

/// Upper bound on [`char_ratio`] from character multiset overlap; cheap
/// enough to run before the exact computation.
pub fn quick_ratio(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let mut available: HashMap<char, usize> = HashMap::new();
    for ch in b {
        *available.entry(*ch).or_insert(0) += 1;
    }
    let mut overlap = 0usize;
    for ch in a {
        if let Some(n) = available.get_mut(ch)
            && *n > 0
        {
            *n -= 1;
            overlap += 1;
        }
    }
    2.0 * overlap as f64 / total as f64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Block {
    a: usize,
    b: usize,
    len: usize,
}

fn index_positions(b: &[char]) -> HashMap<char, Vec<usize>> {
    let mut positions: HashMap<char, Vec<usize>> = HashMap::new();
    for (j, ch) in b.iter().enumerate() {
        positions.entry(*ch).or_default().push(j);
    }
    positions
}

/// Longest block with `a[alo..ahi]` and `b[blo..bhi]`; ties go to the
/// earliest start in `a`, then in `b`.
fn longest_block(
    a: &[char],
    positions: &HashMap<char, Vec<usize>>,
    (alo, ahi): (usize, usize),
    (blo, bhi): (usize, usize),
) -> Block {
    let mut best = Block {
        a: alo,
        b: blo,
        len: 0,
    };
    let mut run_at: HashMap<usize, usize> = HashMap::new();
    for (i, ch) in a.iter().enumerate().take(ahi).skip(alo) {
        let mut next_run: HashMap<usize, usize> = HashMap::new();
        if let Some(js) = positions.get(ch) {
            for &j in js {
                if j < blo {
                    continue;
                }
                if j >= bhi {
                    break;
                }
                let k = j
                    .checked_sub(1)
                    .and_then(|prev| run_at.get(&prev))
                    .copied()
                    .unwrap_or(0)
                    + 1;
                next_run.insert(j, k);
                if k > best.len {
                    best = Block {
                        a: i + 1 - k,
                        b: j + 1 - k,
                        len: k,
                    };
                }
            }
        }
        run_at = next_run;
    }
    best
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let positions = index_positions(b);
    let mut pending = vec![((0, a.len()), (0, b.len()))];
    let mut matched = 0usize;
    while let Some(((alo, ahi), (blo, bhi))) = pending.pop() {
        let block = longest_block(a, &positions, (alo, ahi), (blo, bhi));
        if block.len == 0 {
            continue;
        }
        matched += block.len;
        if alo < block.a && blo < block.b {
            pending.push(((alo, block.a), (blo, block.b)));
        }
        let (a_end, b_end) = (block.a + block.len, block.b + block.len);
        if a_end < ahi && b_end < bhi {
            pending.push(((a_end, ahi), (b_end, bhi)));
        }
    }
    matched
}
