//! Character-level similarity ratio based on longest matching blocks.
//!
//! `ratio = 2 * M / T` where `M` is the number of characters covered by the
//! matching blocks found by recursively taking the longest common substring
//! (Ratcliff/Obershelp) and `T` is the combined length of both strings.

use std::collections::HashMap;

/// Sequences at least this long drop "popular" characters from the index.
const AUTOJUNK_MIN_LEN: usize = 200;

/// Similarity in `[0, 1]`. Either side empty yields `0.0`.
pub fn ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let matches = BlockMatcher::new(&a, &b).matching_characters();
    2.0 * matches as f64 / (a.len() + b.len()) as f64
}

struct BlockMatcher<'a> {
    a: &'a [char],
    b: &'a [char],
    b2j: HashMap<char, Vec<usize>>,
}

impl<'a> BlockMatcher<'a> {
    fn new(a: &'a [char], b: &'a [char]) -> Self {
        let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
        for (j, c) in b.iter().enumerate() {
            b2j.entry(*c).or_default().push(j);
        }

        let n = b.len();
        if n >= AUTOJUNK_MIN_LEN {
            let popular = n / 100 + 1;
            b2j.retain(|_, idxs| idxs.len() <= popular);
        }

        Self { a, b, b2j }
    }

    /// Longest block `(i, j, size)` with `a[i..i+size] == b[j..j+size]`
    /// inside the given window. Ties go to the earliest `i`, then `j`.
    fn longest_match(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> (usize, usize, usize) {
        let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
        let mut j2len: HashMap<usize, usize> = HashMap::new();

        for i in alo..ahi {
            let mut next: HashMap<usize, usize> = HashMap::new();
            if let Some(positions) = self.b2j.get(&self.a[i]) {
                for &j in positions {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let k = j
                        .checked_sub(1)
                        .and_then(|prev| j2len.get(&prev))
                        .copied()
                        .unwrap_or(0)
                        + 1;
                    next.insert(j, k);
                    if k > best_size {
                        best_i = i + 1 - k;
                        best_j = j + 1 - k;
                        best_size = k;
                    }
                }
            }
            j2len = next;
        }

        // Popular characters were left out of the index; grow the block over them.
        while best_i > alo && best_j > blo && self.a[best_i - 1] == self.b[best_j - 1] {
            best_i -= 1;
            best_j -= 1;
            best_size += 1;
        }
        while best_i + best_size < ahi
            && best_j + best_size < bhi
            && self.a[best_i + best_size] == self.b[best_j + best_size]
        {
            best_size += 1;
        }

        (best_i, best_j, best_size)
    }

    fn matching_characters(&self) -> usize {
        let mut total = 0;
        let mut queue = vec![(0, self.a.len(), 0, self.b.len())];

        while let Some((alo, ahi, blo, bhi)) = queue.pop() {
            let (i, j, k) = self.longest_match(alo, ahi, blo, bhi);
            if k == 0 {
                continue;
            }
            total += k;
            if alo < i && blo < j {
                queue.push((alo, i, blo, j));
            }
            if i + k < ahi && j + k < bhi {
                queue.push((i + k, ahi, j + k, bhi));
            }
        }

        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_identical() {
        assert!(approx(ratio("the beat", "the beat"), 1.0));
    }

    #[test]
    fn test_empty_is_zero() {
        assert_eq!(ratio("", "abc"), 0.0);
        assert_eq!(ratio("abc", ""), 0.0);
        assert_eq!(ratio("", ""), 0.0);
    }

    #[test]
    fn test_known_values() {
        assert!(approx(ratio("abcd", "bcde"), 0.75));
        assert!(approx(ratio("kitten", "sitting"), 8.0 / 13.0));
        assert!(approx(ratio("song x", "song y"), 10.0 / 12.0));
        assert!(approx(ratio("hello world", "world hello"), 10.0 / 22.0));
        assert!(approx(ratio("coreradio", "absence of you single"), 0.2));
        assert!(approx(ratio("absence of you", "different song"), 8.0 / 28.0));
    }

    #[test]
    fn test_disjoint() {
        assert_eq!(ratio("abc", "xyz"), 0.0);
    }

    #[test]
    fn test_long_sequences_stay_in_range() {
        let a = "a".repeat(300) + "xyz";
        let b = "a".repeat(250) + "xyz";
        let r = ratio(&a, &b);
        assert!(r > 0.0 && r <= 1.0);
    }
}
