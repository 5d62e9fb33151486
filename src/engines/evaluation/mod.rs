pub mod pool;
pub mod population;
pub mod reducer;

pub use pool::{avg_votes, PredictionPool};
pub use population::PopulationEvaluator;
pub use reducer::{PredictionSource, TreeReducer};
