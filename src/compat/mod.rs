//! Breaking change detection between two specifications
//!
//! Rules are plain functions in a static table. Each compares the old and the
//! new [`Specification`](crate::canonical::Specification) and returns its own
//! set of changes; the engine merges and orders them.

pub mod categories;
pub mod constraint;
pub mod engine;
pub mod handlers;
pub mod path_rules;
pub mod request_rules;
pub mod response_rules;
pub mod rule_registry;
pub mod skipper;
pub mod types;

pub use categories::BreakingCategory;
pub use engine::{BreakChecker, BreakingResult};
pub use skipper::PathSkipper;
pub use types::{BreakingChange, ConstraintChange, ConstraintValue, RuleCode};
