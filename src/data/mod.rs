pub mod cache;

pub use cache::ReductionCache;
