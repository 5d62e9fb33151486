use crate::config::{ConfigSection, TreeConfig};
use crate::engines::generation::grammar::{Threshold, PENDING_CHILD, START_SYMBOL, TERMINATOR};
use crate::error::Result;
use crate::utils::random::{coin, folded_gaussian_threshold};
use rand::Rng;

/// Grows random tree strings from the start symbol.
///
/// The string starts as `S;` and is rewritten in place: `S` and every pending
/// child `C` are expanded while a cursor walks forward, counting parentheses
/// to know the current depth. A `C` reached at the depth limit always becomes
/// a leaf, which is what keeps the result within `max_depth`.
pub struct TreeCreator {
    config: TreeConfig,
}

impl TreeCreator {
    /// Fails with `Configuration` when `config` does not validate
    pub fn new(config: TreeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// New tree bounded by the configured `max_depth`
    pub fn create<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        self.create_with_depth(self.config.max_depth, rng)
    }

    /// New tree whose depth is at most `max_depth` (at least 1: the root is
    /// always a combination node)
    pub fn create_with_depth<R: Rng + ?Sized>(&self, max_depth: usize, rng: &mut R) -> String {
        let mut tree = format!("{}{}", START_SYMBOL, TERMINATOR);
        let mut pos = 0;
        let mut depth = 0;

        while let Some(c) = tree[pos..].chars().next() {
            if c == TERMINATOR {
                break;
            }
            match c {
                START_SYMBOL => {
                    let node = self.combination_node(rng);
                    tree.replace_range(pos..pos + 1, &node);
                }
                PENDING_CHILD => {
                    let replacement = if depth < max_depth && coin(rng) {
                        self.combination_node(rng)
                    } else {
                        self.random_leaf(rng)
                    };
                    tree.replace_range(pos..pos + 1, &replacement);
                }
                '(' => {
                    depth += 1;
                    pos += 1;
                }
                ')' => {
                    depth -= 1;
                    pos += 1;
                }
                _ => pos += c.len_utf8(),
            }
        }

        log::trace!("Created tree {} (max depth {})", tree, max_depth);
        tree
    }

    /// Random leaf literal in `[0, n_max)`
    pub fn random_leaf<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        rng.gen_range(0..self.config.n_max).to_string()
    }

    /// Random threshold token drawn from the folded Gaussian
    pub fn random_threshold<R: Rng + ?Sized>(&self, rng: &mut R) -> Threshold {
        Threshold::from_value(folded_gaussian_threshold(rng, self.config.gaussian_stdv))
    }

    /// `([v.NN ]C C ... C)` with a child count in `[min_children, max_children]`
    fn combination_node<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        let n = rng.gen_range(self.config.min_children..=self.config.max_children);

        let mut node = String::with_capacity(2 * n + Threshold::TOKEN_LEN + 2);
        node.push('(');
        if self.config.weighted {
            node.push_str(&self.random_threshold(rng).to_string());
            node.push(' ');
        }
        for i in 0..n {
            if i > 0 {
                node.push(' ');
            }
            node.push(PENDING_CHILD);
        }
        node.push(')');
        node
    }
}
