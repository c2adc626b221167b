pub mod error;
pub mod evaluator;
pub mod reachability;
pub mod types;
