use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

/// Fair coin
pub fn coin<R: Rng + ?Sized>(rng: &mut R) -> bool {
    rng.gen_bool(0.5)
}

/// Gaussian sample centred on 0.5, folded back into `[0, 1]`.
///
/// With `stdv == 0` this is always 0.5.
pub fn folded_gaussian_threshold<R: Rng + ?Sized>(rng: &mut R, stdv: f64) -> f64 {
    if stdv <= 0.0 {
        return 0.5;
    }
    let x = match Normal::new(0.5, stdv) {
        Ok(normal) => normal.sample(rng),
        Err(_) => return 0.5,
    };
    fold_unit(x)
}

/// Reflect a value at 0 and 1 until it lies in `[0, 1]`
pub fn fold_unit(x: f64) -> f64 {
    if !x.is_finite() {
        return 0.5;
    }
    let r = x.abs() % 2.0;
    if r > 1.0 {
        2.0 - r
    } else {
        r
    }
}

/// Independent generator for one slot of a parallel job, stable across
/// thread schedules
pub fn slot_rng(seed: u64, index: usize) -> StdRng {
    StdRng::seed_from_u64(seed ^ (index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}
