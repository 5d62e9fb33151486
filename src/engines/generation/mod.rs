pub mod ast;
pub mod creator;
pub mod crossover;
pub mod grammar;
pub mod locator;
pub mod mutation;

pub use ast::{Node, NodeId, NodeKind, Tree};
pub use creator::TreeCreator;
pub use crossover::CrossoverEngine;
pub use grammar::{check_ind, ensure_feasible, validate, Threshold};
pub use locator::NodeSpan;
pub use mutation::MutationEngine;
