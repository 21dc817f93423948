//! Step Capability
//!
//! Anything that can run to completion (or fail) given a [`Context`] is a
//! [`Step`]. Plain closures become steps through [`StepFn`], so callers
//! rarely need a type of their own.

use std::fmt;
use std::sync::Arc;

use crate::context::Context;
use crate::error::Result;

/// A unit of work.
///
/// Implementations must be `Send + Sync` because a [`Concurrent`] group
/// hands each step to its own thread.
///
/// [`Concurrent`]: super::Concurrent
pub trait Step: Send + Sync {
    /// Runs the step. The context is advisory; a step that never looks at
    /// it simply runs to completion.
    fn exec(&self, ctx: &Context) -> Result<()>;
}

/// Shared handle to a step, as held by groups.
pub type SharedStep = Arc<dyn Step>;

/// Adapter turning a closure into a [`Step`].
#[derive(Clone)]
pub struct StepFn<F>(pub F);

impl<F> Step for StepFn<F>
where
    F: Fn(&Context) -> Result<()> + Send + Sync,
{
    fn exec(&self, ctx: &Context) -> Result<()> {
        (self.0)(ctx)
    }
}

impl<F> fmt::Debug for StepFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StepFn")
    }
}

/// Wraps a closure as a shared step.
///
/// # Example
///
/// ```
/// use stepflow::{exec, step_fn, Context};
///
/// let add = step_fn(|_ctx: &Context| {
///     assert_eq!(5 + 10, 15);
///     Ok(())
/// });
///
/// assert!(exec(&Context::background(), &*add).is_ok());
/// ```
pub fn step_fn<F>(f: F) -> SharedStep
where
    F: Fn(&Context) -> Result<()> + Send + Sync + 'static,
{
    Arc::new(StepFn(f))
}

impl<S: Step + ?Sized> Step for Arc<S> {
    fn exec(&self, ctx: &Context) -> Result<()> {
        (**self).exec(ctx)
    }
}

impl<S: Step + ?Sized> Step for Box<S> {
    fn exec(&self, ctx: &Context) -> Result<()> {
        (**self).exec(ctx)
    }
}
