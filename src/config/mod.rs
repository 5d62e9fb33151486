pub mod traits;
pub mod tree;
pub mod reduction;
pub mod manager;

pub use manager::{AppConfig, ConfigManager};
pub use reduction::ReductionConfig;
pub use traits::ConfigSection;
pub use tree::TreeConfig;
