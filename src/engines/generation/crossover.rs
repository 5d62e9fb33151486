use crate::config::{ConfigSection, TreeConfig};
use crate::engines::generation::grammar::TERMINATOR;
use crate::engines::generation::locator::{max_tree_depth, random_leaf, random_subtree};
use crate::engines::generation::mutation::{allowed_depth, select_target};
use crate::error::{EnsembleGpError, Result};
use crate::utils::random::coin;
use rand::Rng;

/// Subtree crossover on tree strings.
///
/// Each child keeps the skeleton of one parent and receives a fragment of the
/// other that fits the depth left at the splice point.
pub struct CrossoverEngine {
    config: TreeConfig,
}

impl CrossoverEngine {
    pub fn new(config: TreeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// `(a with a fragment of b, b with a fragment of a)`
    pub fn cross<R: Rng + ?Sized>(&self, a: &str, b: &str, rng: &mut R) -> Result<(String, String)> {
        let ab = self.splice_one(a, b, rng)?;
        let ba = self.splice_one(b, a, rng)?;
        Ok((ab, ba))
    }

    /// Replace a random leaf or non-root subtree of `recipient` by a fragment
    /// of `donor` no deeper than the recipient allows at that position
    pub fn splice_one<R: Rng + ?Sized>(
        &self,
        recipient: &str,
        donor: &str,
        rng: &mut R,
    ) -> Result<String> {
        let target = select_target(recipient, rng)?;
        let allowed = allowed_depth(recipient, target.start, self.config.max_depth)?;

        let fragment = if allowed == 0 || coin(rng) {
            donor_leaf(donor, rng)?
        } else {
            donor_subtree(donor, allowed, rng)?
        };

        log::debug!(
            "Crossover replaces '{}' with '{}' (allowed depth {})",
            target.slice(recipient),
            fragment,
            allowed
        );
        Ok(target.splice(recipient, fragment))
    }
}

fn donor_leaf<'a, R: Rng + ?Sized>(donor: &'a str, rng: &mut R) -> Result<&'a str> {
    random_leaf(donor, rng)
        .map(|span| span.slice(donor))
        .ok_or_else(|| EnsembleGpError::StructuralViolation(format!("Donor '{}' has no leaves", donor)))
}

/// Narrow down inside `donor` until a subtree of depth `<= allowed` is found.
///
/// Each round picks a subtree of the current candidate (the candidate itself
/// included); a subtree that is still too deep becomes the next candidate.
fn donor_subtree<'a, R: Rng + ?Sized>(
    donor: &'a str,
    allowed: usize,
    rng: &mut R,
) -> Result<&'a str> {
    let mut candidate = donor.strip_suffix(TERMINATOR).unwrap_or(donor);
    loop {
        let Some(span) = random_subtree(candidate, true, rng) else {
            return donor_leaf(candidate, rng);
        };
        let fragment = span.slice(candidate);
        if max_tree_depth(fragment) <= allowed {
            return Ok(fragment);
        }
        candidate = fragment;
    }
}
