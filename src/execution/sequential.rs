//! Sequential Groups
//!
//! Runs steps one after another on the calling thread, stopping at the
//! first failure or as soon as an optional stop predicate reports done.

use std::fmt;

use log::debug;

use crate::context::Context;
use crate::error::Result;

use super::step::{SharedStep, Step};

type DonePredicate = Box<dyn Fn() -> bool + Send + Sync>;

/// An ordered group of steps.
///
/// The stop predicate is checked before every step; once it returns true
/// the group succeeds without running anything further. A failing step
/// ends the group and its error is returned unchanged.
///
/// # Example
///
/// ```
/// use stepflow::{exec, step_fn, Context, Error, Sequential};
///
/// let group = Sequential::new(vec![
///     step_fn(|_| Ok(())),
///     step_fn(|_| Err(Error::msg("failed execute request"))),
///     step_fn(|_| unreachable!()),
/// ]);
///
/// let err = exec(&Context::background(), &group).unwrap_err();
/// assert_eq!(err.to_string(), "failed execute request");
/// ```
#[derive(Default)]
pub struct Sequential {
    steps: Vec<SharedStep>,
    done: Option<DonePredicate>,
}

impl Sequential {
    /// Creates a group running `steps` in the given order.
    pub fn new(steps: impl IntoIterator<Item = SharedStep>) -> Self {
        Self {
            steps: steps.into_iter().collect(),
            done: None,
        }
    }

    /// Sets the stop predicate.
    pub fn with_done<F>(mut self, done: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.done = Some(Box::new(done));
        self
    }

    /// Appends a step to the end of the group.
    pub fn push(&mut self, step: SharedStep) {
        self.steps.push(step);
    }

    /// Returns the number of steps in the group.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if the group has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    fn is_done(&self) -> bool {
        self.done.as_ref().is_some_and(|done| done())
    }
}

impl Step for Sequential {
    fn exec(&self, ctx: &Context) -> Result<()> {
        for (index, step) in self.steps.iter().enumerate() {
            if self.is_done() {
                debug!(
                    "Sequential group stopped before step {} of {}",
                    index + 1,
                    self.steps.len()
                );
                return Ok(());
            }

            if let Err(err) = step.exec(ctx) {
                debug!("Sequential step {} failed: {}", index + 1, err);
                return Err(err);
            }
        }
        Ok(())
    }
}

impl FromIterator<SharedStep> for Sequential {
    fn from_iter<I: IntoIterator<Item = SharedStep>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl fmt::Debug for Sequential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequential")
            .field("steps", &self.steps.len())
            .field("has_done", &self.done.is_some())
            .finish()
    }
}
