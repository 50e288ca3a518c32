//! Natural-order string comparison
//!
//! Chromosome and site identifiers mix text with numbers (`Chr2`, `Chr10`,
//! `scaffold_7`). Natural order compares the text runs lexicographically and
//! the digit runs numerically, so `Chr2 < Chr10`.

use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Chunk<'a> {
    /// Digit run with leading zeros removed
    Number(&'a str),
    Text(&'a str),
}

impl<'a> Ord for Chunk<'a> {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            // Longer digit runs (without leading zeros) are larger numbers.
            (Chunk::Number(a), Chunk::Number(b)) => a.len().cmp(&b.len()).then_with(|| a.cmp(b)),
            (Chunk::Text(a), Chunk::Text(b)) => a.cmp(b),
            (Chunk::Number(_), Chunk::Text(_)) => Ordering::Less,
            (Chunk::Text(_), Chunk::Number(_)) => Ordering::Greater,
        }
    }
}

impl<'a> PartialOrd for Chunk<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn chunks(s: &str) -> impl Iterator<Item = Chunk<'_>> {
    let bytes = s.as_bytes();
    let mut pos = 0;

    std::iter::from_fn(move || {
        if pos >= bytes.len() {
            return None;
        }
        let start = pos;
        let digits = bytes[pos].is_ascii_digit();
        while pos < bytes.len() && bytes[pos].is_ascii_digit() == digits {
            pos += 1;
        }
        let run = &s[start..pos];
        if digits {
            let trimmed = run.trim_start_matches('0');
            Some(Chunk::Number(if trimmed.is_empty() { "0" } else { trimmed }))
        } else {
            Some(Chunk::Text(run))
        }
    })
}

/// Compare two strings in natural order.
///
/// Strings that are equal chunk by chunk (e.g. `Chr01` and `Chr1`) fall back to
/// plain byte order so the ordering stays total.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    chunks(a).cmp(chunks(b)).then_with(|| a.cmp(b))
}

/// Sort strings in place in natural order
pub fn natural_sort<S: AsRef<str>>(items: &mut [S]) {
    items.sort_by(|a, b| natural_cmp(a.as_ref(), b.as_ref()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_chromosome_order() {
        let mut chroms = vec!["Chr10", "Chr2", "Chr1"];
        natural_sort(&mut chroms);
        assert_eq!(chroms, vec!["Chr1", "Chr2", "Chr10"]);
    }

    #[test]
    fn test_mixed_identifiers() {
        let mut ids = vec!["scaffold_10", "Chr2", "scaffold_9", "Chr02", "ChrUn", "Chr10"];
        natural_sort(&mut ids);
        assert_eq!(ids, vec!["Chr02", "Chr2", "Chr10", "ChrUn", "scaffold_9", "scaffold_10"]);
    }

    #[test]
    fn test_multiple_numeric_runs() {
        assert_eq!(natural_cmp("Chr1:200", "Chr1:1000"), Ordering::Less);
        assert_eq!(natural_cmp("Chr1:200", "Chr1:200"), Ordering::Equal);
        assert_eq!(natural_cmp("", "Chr1"), Ordering::Less);
    }

    #[test]
    fn test_large_numbers_do_not_overflow() {
        assert_eq!(
            natural_cmp("site99999999999999999999999", "site100000000000000000000000"),
            Ordering::Less
        );
    }

    proptest! {
        #[test]
        fn prop_numeric_suffix_sorts_numerically(a in 0u32..100000, b in 0u32..100000) {
            let left = format!("Chr{}", a);
            let right = format!("Chr{}", b);
            prop_assert_eq!(natural_cmp(&left, &right), a.cmp(&b));
        }
    }
}
