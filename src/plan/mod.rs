//! Plan Module
//!
//! YAML plans describing nested sequential/concurrent groups of demo
//! actions, and the builder that turns them into steps.
//!
//! # Components
//!
//! - [`model`]: Plan, Node and group structures
//! - [`parser`]: YAML loading
//! - [`validator`]: checks serde cannot express
//! - [`builder`]: plan tree to step tree

pub mod builder;
pub mod model;
pub mod parser;
pub mod validator;

pub use builder::{build_plan, Action};
pub use model::{Node, Plan, SequentialGroup};
pub use parser::{load_plan, parse_plan, plan_to_yaml, PlanError};
pub use validator::{validate_plan, ValidationError};
