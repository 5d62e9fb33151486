use crate::config::TreeConfig;
use crate::engines::generation::creator::TreeCreator;
use crate::engines::generation::grammar::TERMINATOR;
use crate::engines::generation::locator::{node_depth, select_node, threshold_spans, NodeSpan};
use crate::error::{EnsembleGpError, Result};
use crate::utils::random::coin;
use rand::seq::index;
use rand::Rng;

/// Remaining depth budget below a node starting at `offset`
pub(crate) fn allowed_depth(tree: &str, offset: usize, max_depth: usize) -> Result<usize> {
    let depth = node_depth(tree, offset);
    max_depth
        .checked_sub(depth)
        .ok_or(EnsembleGpError::AllowedDepthNegative { depth, max_depth })
}

pub(crate) fn select_target<R: Rng + ?Sized>(tree: &str, rng: &mut R) -> Result<NodeSpan> {
    select_node(tree, rng).ok_or_else(|| {
        EnsembleGpError::StructuralViolation(format!("No leaf to select in '{}'", tree))
    })
}

pub struct MutationEngine {
    creator: TreeCreator,
}

impl MutationEngine {
    pub fn new(config: TreeConfig) -> Result<Self> {
        Ok(Self {
            creator: TreeCreator::new(config)?,
        })
    }

    fn config(&self) -> &TreeConfig {
        self.creator.config()
    }

    /// Mutated copy of `tree`.
    ///
    /// Weighted trees flip a coin between resampling thresholds and replacing
    /// a subtree; unweighted trees always replace a subtree.
    pub fn mutate<R: Rng + ?Sized>(&self, tree: &str, rng: &mut R) -> Result<String> {
        if self.config().weighted && coin(rng) {
            self.mutate_thresholds(tree, rng)
        } else {
            self.mutate_subtree(tree, rng)
        }
    }

    /// Replace a random leaf or non-root subtree by a fresh leaf or a fresh
    /// subtree that fits the remaining depth budget
    pub fn mutate_subtree<R: Rng + ?Sized>(&self, tree: &str, rng: &mut R) -> Result<String> {
        let target = select_target(tree, rng)?;
        let allowed = allowed_depth(tree, target.start, self.config().max_depth)?;

        let replace_by_leaf = coin(rng);
        let replacement = if allowed == 0 || replace_by_leaf {
            self.creator.random_leaf(rng)
        } else {
            let mut subtree = self.creator.create_with_depth(allowed, rng);
            if subtree.ends_with(TERMINATOR) {
                subtree.pop();
            }
            subtree
        };

        log::debug!(
            "Mutating '{}' -> '{}' (allowed depth {})",
            target.slice(tree),
            replacement,
            allowed
        );
        Ok(target.splice(tree, &replacement))
    }

    /// Resample a share of the threshold tokens, keeping the topology.
    ///
    /// With `n` tokens and ratio `r`, one token is changed when `n * r <= 1`,
    /// otherwise a uniform count in `[1, round(n * r))`. Trees without
    /// thresholds get a subtree mutation instead.
    pub fn mutate_thresholds<R: Rng + ?Sized>(&self, tree: &str, rng: &mut R) -> Result<String> {
        let spans = threshold_spans(tree);
        if spans.is_empty() {
            return self.mutate_subtree(tree, rng);
        }

        let n = spans.len();
        let expected = n as f64 * self.config().threshold_mutation_ratio;
        let upper = expected.round() as usize;
        let n_mutations = if expected <= 1.0 || upper <= 1 {
            1
        } else {
            rng.gen_range(1..upper.min(n + 1))
        };

        let mut mutated = tree.to_string();
        for i in index::sample(rng, n, n_mutations).into_iter() {
            let span = spans[i];
            let token = self.creator.random_threshold(rng).to_string();
            // Tokens have a fixed width, so the other spans stay valid
            mutated.replace_range(span.start..span.end, &token);
        }

        log::debug!("Resampled {} of {} thresholds", n_mutations, n);
        Ok(mutated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::generation::grammar::{check_ind, validate};
    use crate::engines::generation::locator::max_tree_depth;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn config() -> TreeConfig {
        TreeConfig {
            n_max: 8,
            max_depth: 3,
            min_children: 2,
            max_children: 4,
            ..TreeConfig::default()
        }
    }

    #[test]
    fn test_mutation_keeps_grammar() {
        let config = config();
        let creator = TreeCreator::new(config.clone()).unwrap();
        let engine = MutationEngine::new(config.clone()).unwrap();

        for seed in 0..300 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut tree = creator.create(&mut rng);
            for _ in 0..5 {
                let mutated = engine.mutate(&tree, &mut rng).unwrap();
                assert!(validate(&mutated, &config).is_ok(), "{} -> {}", tree, mutated);
                assert!(check_ind(&mutated), "{}", mutated);
                tree = mutated;
            }
        }
    }

    #[test]
    fn test_input_is_untouched() {
        let engine = MutationEngine::new(config()).unwrap();
        let tree = String::from("((0 1) (2 3) 4);");
        let before = tree.clone();
        let mut rng = StdRng::seed_from_u64(2);
        let _ = engine.mutate(&tree, &mut rng).unwrap();
        assert_eq!(tree, before);
    }

    #[test]
    fn test_flat_tree_at_max_depth_mutates_leaves_only() {
        let config = TreeConfig {
            max_depth: 1,
            ..config()
        };
        let engine = MutationEngine::new(config.clone()).unwrap();
        let mut rng = StdRng::seed_from_u64(8);
        for _ in 0..100 {
            let mutated = engine.mutate("(0 1 2);", &mut rng).unwrap();
            assert_eq!(max_tree_depth(&mutated), 1);
            assert!(validate(&mutated, &config).is_ok());
        }
    }

    #[test]
    fn test_too_deep_tree_is_a_defect() {
        let config = TreeConfig {
            max_depth: 1,
            ..config()
        };
        let engine = MutationEngine::new(config).unwrap();
        let mut rng = StdRng::seed_from_u64(0);

        let errors = (0..50)
            .filter_map(|_| engine.mutate("((((0 1) 2) 3) 4);", &mut rng).err())
            .filter(|e| matches!(e, EnsembleGpError::AllowedDepthNegative { .. }))
            .count();
        assert!(errors > 0);
    }

    #[test]
    fn test_threshold_mutation_keeps_topology() {
        let config = TreeConfig {
            weighted: true,
            gaussian_stdv: 0.3,
            threshold_mutation_ratio: 1.0,
            ..config()
        };
        let engine = MutationEngine::new(config.clone()).unwrap();
        let mut rng = StdRng::seed_from_u64(12);
        let tree = "(v.50 (v.50 0 1) (v.50 2 3) 4);";

        let mut changed = false;
        for _ in 0..20 {
            let mutated = engine.mutate_thresholds(tree, &mut rng).unwrap();
            assert_eq!(mutated.len(), tree.len());
            let strip = |s: &str| s.replace(|c: char| c.is_ascii_digit(), "#");
            let a = validate(tree, &config).unwrap();
            let b = validate(&mutated, &config).unwrap();
            assert_eq!(a.leaves().collect::<Vec<_>>(), b.leaves().collect::<Vec<_>>());
            assert_eq!(strip(tree), strip(&mutated));
            changed |= mutated != tree;
        }
        assert!(changed);
    }

    #[test]
    fn test_threshold_mutation_without_thresholds() {
        let engine = MutationEngine::new(config()).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let mutated = engine.mutate_thresholds("((0 1) 2);", &mut rng).unwrap();
        assert!(validate(&mutated, &config()).is_ok());
    }

    #[test]
    fn test_empty_pool_is_a_configuration_error() {
        let config = TreeConfig {
            n_max: 0,
            ..config()
        };
        assert!(matches!(
            MutationEngine::new(config),
            Err(EnsembleGpError::Configuration(_))
        ));
    }

    #[test]
    fn test_allowed_depth() {
        assert_eq!(allowed_depth("((0 1) 2);", 1, 3).unwrap(), 2);
        assert!(matches!(
            allowed_depth("((0 1) 2);", 2, 1),
            Err(EnsembleGpError::AllowedDepthNegative { depth: 2, max_depth: 1 })
        ));
    }
}
