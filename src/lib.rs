//! Stepflow - Step Execution Engine
//!
//! A small engine for running units of work ("steps") one after another or
//! all at once, with a single terminal error, panic containment and
//! cooperative cancellation.
//!
//! # Architecture
//!
//! The library is organized into five modules:
//!
//! - [`context`]: Cancelable execution scopes with deadlines
//! - [`execution`]: The `Step` trait and the sequential/concurrent groups
//! - [`error`]: The error returned by every `exec` call
//! - [`plan`]: YAML plans of nested groups, built into step trees
//! - [`monitoring`]: Caller-side execution timeline
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use stepflow::{exec, step_fn, Concurrent, Context, Error, Sequential, SharedStep};
//!
//! let fetch: SharedStep = Arc::new(Sequential::new(vec![
//!     step_fn(|_| Ok(())),
//!     step_fn(|ctx| match ctx.wait_timeout(Duration::from_millis(10)) {
//!         Some(err) => Err(err.into()),
//!         None => Ok(()),
//!     }),
//! ]));
//!
//! let group = Concurrent::new(vec![fetch, step_fn(|_| Err(Error::msg("cache offline")))]);
//!
//! let err = exec(&Context::background(), &group).unwrap_err();
//! assert_eq!(err.to_string(), "cache offline");
//! ```

pub mod context;
pub mod error;
pub mod execution;
pub mod monitoring;
pub mod plan;

// Re-export commonly used types
pub use context::{Context, ContextError};
pub use error::{Error, Result};
pub use execution::{
    exec, exec_con, exec_seq, step_fn, Concurrent, Sequential, SharedStep, Step, StepFn,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "Stepflow";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_version() {
        assert!(!VERSION.is_empty());
        assert!(VERSION.contains('.'));
    }

    #[test]
    fn test_app_name() {
        assert_eq!(APP_NAME, "Stepflow");
    }

    #[test]
    fn test_reexported_entry_points() {
        let ctx = Context::background();
        assert!(exec_seq(&ctx, vec![step_fn(|_| Ok(()))]).is_ok());
        assert!(exec_con(&ctx, vec![step_fn(|_| Ok(()))]).is_ok());
    }
}
