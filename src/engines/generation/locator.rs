//! Node lookup directly on tree strings.
//!
//! Every function is a single forward scan over the string; no tree is built.
//! Returned spans are only meaningful for the exact string they came from.

use crate::engines::generation::grammar::Threshold;
use crate::utils::random::coin;
use rand::Rng;

/// Half-open byte range `[start, end)` covering a leaf or a whole
/// parenthesised subtree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeSpan {
    pub start: usize,
    pub end: usize,
}

impl NodeSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn slice<'a>(&self, s: &'a str) -> &'a str {
        &s[self.start..self.end]
    }

    /// New string with this span of `s` replaced by `replacement`
    pub fn splice(&self, s: &str, replacement: &str) -> String {
        let mut out = String::with_capacity(s.len() - self.len() + replacement.len());
        out.push_str(&s[..self.start]);
        out.push_str(replacement);
        out.push_str(&s[self.end..]);
        out
    }
}

/// Leaf literals in order of appearance. Digits of threshold tokens are skipped.
pub fn leaf_spans(s: &str) -> LeafSpans<'_> {
    LeafSpans {
        bytes: s.as_bytes(),
        pos: 0,
    }
}

pub struct LeafSpans<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Iterator for LeafSpans<'_> {
    type Item = NodeSpan;

    fn next(&mut self) -> Option<NodeSpan> {
        while self.pos < self.bytes.len() {
            if !self.bytes[self.pos].is_ascii_digit() {
                self.pos += 1;
                continue;
            }

            let start = self.pos;
            while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_digit() {
                self.pos += 1;
            }

            let part_of_token = start > 0 && matches!(self.bytes[start - 1], b'.' | b'_');
            if !part_of_token {
                return Some(NodeSpan::new(start, self.pos));
            }
        }
        None
    }
}

pub fn leaf_count(s: &str) -> usize {
    leaf_spans(s).count()
}

/// Number of `(`, i.e. of combination nodes
pub fn subtree_count(s: &str) -> usize {
    s.bytes().filter(|&b| b == b'(').count()
}

pub fn random_leaf<R: Rng + ?Sized>(s: &str, rng: &mut R) -> Option<NodeSpan> {
    let n = leaf_count(s);
    if n == 0 {
        return None;
    }
    leaf_spans(s).nth(rng.gen_range(0..n))
}

/// Uniform pick among the `(` of `s`. The first one is skipped unless
/// `include_root`, so that the whole tree is not selected.
pub fn random_subtree<R: Rng + ?Sized>(
    s: &str,
    include_root: bool,
    rng: &mut R,
) -> Option<NodeSpan> {
    let n = subtree_count(s);
    let first = if include_root { 0 } else { 1 };
    if n <= first {
        return None;
    }

    let r = rng.gen_range(first..n);
    let open = s
        .bytes()
        .enumerate()
        .filter(|&(_, b)| b == b'(')
        .nth(r)
        .map(|(i, _)| i)?;

    subtree_at(s, open)
}

/// Span of the group opened at `open`, up to its matching `)`
pub fn subtree_at(s: &str, open: usize) -> Option<NodeSpan> {
    let bytes = s.as_bytes();
    if bytes.get(open) != Some(&b'(') {
        return None;
    }

    let mut nested = 0usize;
    for (i, &b) in bytes.iter().enumerate().skip(open + 1) {
        match b {
            b'(' => nested += 1,
            b')' if nested == 0 => return Some(NodeSpan::new(open, i + 1)),
            b')' => nested -= 1,
            _ => {}
        }
    }
    None
}

/// `(` minus `)` strictly before `offset`
pub fn node_depth(s: &str, offset: usize) -> usize {
    let depth = s.as_bytes()[..offset.min(s.len())]
        .iter()
        .fold(0isize, |depth, &b| match b {
            b'(' => depth + 1,
            b')' => depth - 1,
            _ => depth,
        });
    depth.max(0) as usize
}

/// Deepest nesting reached anywhere in `s`
pub fn max_tree_depth(s: &str) -> usize {
    let mut current = 0usize;
    let mut max = 0usize;
    for b in s.bytes() {
        match b {
            b'(' => {
                current += 1;
                max = max.max(current);
            }
            b')' => current = current.saturating_sub(1),
            _ => {}
        }
    }
    max
}

/// Target of a mutation or crossover: a leaf or a non-root subtree, chosen by
/// a coin flip. Trees of depth 1 or less only offer leaves.
pub fn select_node<R: Rng + ?Sized>(s: &str, rng: &mut R) -> Option<NodeSpan> {
    let choose_leaf = coin(rng);
    if choose_leaf || max_tree_depth(s) <= 1 {
        random_leaf(s, rng)
    } else {
        random_subtree(s, false, rng).or_else(|| random_leaf(s, rng))
    }
}

/// Sorted distinct leaf indices
pub fn distinct_leaves(s: &str) -> Vec<usize> {
    let mut leaves: Vec<usize> = leaf_spans(s)
        .filter_map(|span| span.slice(s).parse().ok())
        .collect();
    leaves.sort_unstable();
    leaves.dedup();
    leaves
}

/// Spans of all `v.NN` threshold tokens
pub fn threshold_spans(s: &str) -> Vec<NodeSpan> {
    s.bytes()
        .enumerate()
        .filter(|&(i, b)| {
            b == b'v'
                && s
                    .get(i..i + Threshold::TOKEN_LEN)
                    .and_then(Threshold::parse)
                    .is_some()
        })
        .map(|(i, _)| NodeSpan::new(i, i + Threshold::TOKEN_LEN))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn token_leaf_count(s: &str) -> usize {
        s.split(|c: char| c == ' ' || c == '(' || c == ')' || c == ';')
            .filter(|t| !t.is_empty() && t.bytes().all(|b| b.is_ascii_digit()))
            .count()
    }

    #[test]
    fn test_counts() {
        let s = "((0 11) 2 (v.75 3 4));";
        assert_eq!(leaf_count(s), 5);
        assert_eq!(leaf_count(s), token_leaf_count(s));
        assert_eq!(subtree_count(s), 3);
        assert_eq!(
            leaf_spans(s).map(|sp| sp.slice(s)).collect::<Vec<_>>(),
            vec!["0", "11", "2", "3", "4"]
        );
    }

    #[test]
    fn test_depths() {
        let s = "((0 1) 2);";
        assert_eq!(max_tree_depth(s), 2);
        assert_eq!(max_tree_depth("(0 1);"), 1);
        assert_eq!(max_tree_depth("4;"), 0);
        assert_eq!(node_depth(s, 0), 0);
        assert_eq!(node_depth(s, 1), 1);
        assert_eq!(node_depth(s, 2), 2);
        assert_eq!(node_depth(s, 7), 1);
    }

    #[test]
    fn test_subtree_at() {
        let s = "((0 1) (2 (3 4)));";
        assert_eq!(subtree_at(s, 0), Some(NodeSpan::new(0, 17)));
        assert_eq!(subtree_at(s, 7).map(|sp| sp.slice(s)), Some("(2 (3 4))"));
        assert_eq!(subtree_at(s, 2), None);
        assert_eq!(subtree_at("((0 1);", 0), None);
    }

    #[test]
    fn test_random_subtree_skips_root() {
        let mut rng = StdRng::seed_from_u64(11);
        assert_eq!(random_subtree("(0 1);", false, &mut rng), None);
        assert_eq!(
            random_subtree("(0 1);", true, &mut rng),
            Some(NodeSpan::new(0, 5))
        );

        let s = "((0 1) (2 3));";
        for _ in 0..100 {
            let span = random_subtree(s, false, &mut rng).unwrap();
            assert_ne!(span.start, 0);
            assert!(span.slice(s) == "(0 1)" || span.slice(s) == "(2 3)");
        }
    }

    #[test]
    fn test_random_leaf_covers_all() {
        let mut rng = StdRng::seed_from_u64(5);
        let s = "(v.50 7 (8 9));";
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            seen.insert(random_leaf(s, &mut rng).unwrap().slice(s).to_string());
        }
        assert_eq!(seen.len(), 3);
        assert!(!seen.contains("50"));
        assert_eq!(random_leaf("();", &mut rng), None);
    }

    #[test]
    fn test_select_node_forces_leaf_on_flat_tree() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..50 {
            let span = select_node("(0 1 2);", &mut rng).unwrap();
            assert_eq!(span.len(), 1);
        }
    }

    #[test]
    fn test_splice_and_helpers() {
        let s = "((0 1) 2);";
        let span = NodeSpan::new(1, 6);
        assert_eq!(span.splice(s, "5"), "(5 2);");
        assert_eq!(distinct_leaves("((3 1) 3 (v.20 0 1));"), vec![0, 1, 3]);
        assert_eq!(
            threshold_spans("(v.20 (v.05 1 2) 3);"),
            vec![NodeSpan::new(1, 5), NodeSpan::new(7, 11)]
        );
    }
}
