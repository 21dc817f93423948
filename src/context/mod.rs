//! Execution Context Module
//!
//! Cancellation-bearing scopes threaded through every step.
//!
//! - [`scope`]: the [`Context`] tree, deadlines and cancel hooks

pub mod scope;

pub use scope::{CancelHook, Context, ContextError};
