//! Tokens of the tree-string encoding and whole-string checks.
//!
//! ```text
//! individual := node ";"
//! node       := leaf | combiner
//! leaf       := digit+
//! combiner   := "(" [threshold " "] node (" " node)+ ")"
//! threshold  := "v." digit digit
//! ```

use crate::config::TreeConfig;
use crate::engines::generation::ast::{NodeKind, Tree};
use crate::error::{EnsembleGpError, Result};
use std::fmt;

/// End of every individual
pub const TERMINATOR: char = ';';
/// Start symbol, only present while a tree is being created
pub const START_SYMBOL: char = 'S';
/// Pending child, only present while a tree is being created
pub const PENDING_CHILD: char = 'C';
pub const THRESHOLD_PREFIX: &str = "v.";

/// Decision threshold of a combination node, stored in hundredths (`0.00..=0.99`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Threshold(u8);

impl Threshold {
    /// Length of a `v.NN` token
    pub const TOKEN_LEN: usize = 4;

    /// Round to two digits; values that would round up to 1.00 stay at 0.99
    pub fn from_value(value: f64) -> Self {
        let hundredths = (value * 100.0).round().clamp(0.0, 99.0);
        Self(hundredths as u8)
    }

    pub fn from_hundredths(hundredths: u8) -> Self {
        Self(hundredths.min(99))
    }

    pub fn hundredths(self) -> u8 {
        self.0
    }

    pub fn value(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Parse a full `v.NN` token
    pub fn parse(token: &str) -> Option<Self> {
        let digits = token.strip_prefix(THRESHOLD_PREFIX)?;
        let bytes = digits.as_bytes();
        if bytes.len() != 2 || !bytes.iter().all(u8::is_ascii_digit) {
            return None;
        }
        Some(Self((bytes[0] - b'0') * 10 + (bytes[1] - b'0')))
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:02}", THRESHOLD_PREFIX, self.0)
    }
}

/// A node string made only of digits
pub fn is_leaf(node: &str) -> bool {
    !node.is_empty() && node.bytes().all(|b| b.is_ascii_digit())
}

/// A node string wrapped in parentheses, optionally followed by the terminator
pub fn is_node(node: &str) -> bool {
    let body = node.strip_suffix(TERMINATOR).unwrap_or(node);
    body.len() >= 2 && body.starts_with('(') && body.ends_with(')')
}

/// Feasibility check by textual reduction.
///
/// Every group holding only leaves (at least two, with an optional threshold
/// token) is replaced by `0`; this repeats until nothing changes. The tree is
/// feasible iff the string ends up as `0;`.
pub fn check_ind(tree: &str) -> bool {
    if !tree.ends_with(TERMINATOR) || !is_node(tree) {
        return false;
    }
    let mut current = tree.to_string();
    loop {
        let reduced = collapse_flat_groups(&current);
        if reduced == current {
            break;
        }
        current = reduced;
    }
    current == "0;"
}

/// [`check_ind`] as an error
pub fn ensure_feasible(tree: &str) -> Result<()> {
    if check_ind(tree) {
        Ok(())
    } else {
        Err(EnsembleGpError::InfeasibleIndividual(tree.to_string()))
    }
}

fn collapse_flat_groups(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(open) = rest.find('(') {
        let after = &rest[open + 1..];
        match after.find(|c: char| c == '(' || c == ')') {
            Some(close) if after.as_bytes()[close] == b')' && is_flat_group(&after[..close]) => {
                out.push_str(&rest[..open]);
                out.push('0');
                rest = &after[close + 1..];
            }
            _ => {
                out.push_str(&rest[..=open]);
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

fn is_flat_group(content: &str) -> bool {
    let mut leaves = 0;
    for (i, token) in content.split(' ').enumerate() {
        if i == 0 && Threshold::parse(token).is_some() {
            continue;
        }
        if !is_leaf(token) {
            return false;
        }
        leaves += 1;
    }
    leaves >= 2
}

/// Parse `tree` and check it against the configured bounds: depth, leaf
/// range and children per node.
pub fn validate(tree: &str, config: &TreeConfig) -> Result<Tree> {
    let parsed = Tree::parse(tree)?;

    if parsed.depth() > config.max_depth {
        return Err(EnsembleGpError::StructuralViolation(format!(
            "Tree depth {} exceeds maximum {} in '{}'",
            parsed.depth(),
            config.max_depth,
            tree
        )));
    }

    for node in parsed.nodes() {
        match &node.kind {
            NodeKind::Leaf(index) if *index >= config.n_max => {
                return Err(EnsembleGpError::StructuralViolation(format!(
                    "Leaf {} at offset {} is outside the pool of {} classifiers",
                    index, node.span.start, config.n_max
                )));
            }
            NodeKind::Combiner { children, .. }
                if children.len() < config.min_children || children.len() > config.max_children =>
            {
                return Err(EnsembleGpError::StructuralViolation(format!(
                    "Node at offset {} has {} children, expected {}..={}",
                    node.span.start,
                    children.len(),
                    config.min_children,
                    config.max_children
                )));
            }
            _ => {}
        }
    }

    Ok(parsed)
}
