pub mod random;

pub use random::{coin, folded_gaussian_threshold};
