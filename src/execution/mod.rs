//! Step Execution Module
//!
//! Provides the execution engine: the [`Step`] capability, sequential and
//! concurrent groups, and the uniform [`exec`] entry point that lets groups
//! nest inside each other.
//!
//! # Architecture
//!
//! - [`step`]: the `Step` trait and closure adapter
//! - [`sequential`]: in-order execution with a stop predicate
//! - [`concurrent`]: fan-out with first-failure cancellation
//! - `guard`: panic-to-error conversion for concurrent workers

pub mod concurrent;
mod guard;
pub mod sequential;
pub mod step;

pub use concurrent::Concurrent;
pub use sequential::Sequential;
pub use step::{step_fn, SharedStep, Step, StepFn};

use crate::context::Context;
use crate::error::Result;

/// Executes a single step, group or nested tree of groups.
pub fn exec<S: Step + ?Sized>(ctx: &Context, step: &S) -> Result<()> {
    step.exec(ctx)
}

/// Runs `steps` one after another, stopping at the first failure.
///
/// # Example
///
/// ```
/// use stepflow::{exec_seq, step_fn, Context, Error};
///
/// let steps = (1..=10).map(|n| {
///     step_fn(move |_| {
///         if n % 2 == 0 {
///             return Err(Error::msg(format!("step {} failed", n)));
///         }
///         Ok(())
///     })
/// });
///
/// let err = exec_seq(&Context::background(), steps).unwrap_err();
/// assert_eq!(err.to_string(), "step 2 failed");
/// ```
pub fn exec_seq(ctx: &Context, steps: impl IntoIterator<Item = SharedStep>) -> Result<()> {
    exec(ctx, &Sequential::new(steps))
}

/// Runs `steps` in parallel, returning the first failure observed.
pub fn exec_con(ctx: &Context, steps: impl IntoIterator<Item = SharedStep>) -> Result<()> {
    exec(ctx, &Concurrent::new(steps))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::{Arc, Mutex};

    struct Adder {
        a: i32,
        b: i32,
        result: Arc<Mutex<i32>>,
    }

    impl Step for Adder {
        fn exec(&self, _ctx: &Context) -> Result<()> {
            *self.result.lock().unwrap() = self.a + self.b;
            Ok(())
        }
    }

    fn printing_steps(order: &Arc<Mutex<Vec<usize>>>) -> Vec<SharedStep> {
        (1..=10)
            .map(|n| {
                let order = Arc::clone(order);
                step_fn(move |_| {
                    println!("Requested number is {}", n);
                    order.lock().unwrap().push(n);
                    Ok(())
                })
            })
            .collect()
    }

    #[test]
    fn test_exec_custom_step() {
        let result = Arc::new(Mutex::new(0));
        let step = Adder {
            a: 5,
            b: 10,
            result: Arc::clone(&result),
        };

        assert!(exec(&Context::background(), &step).is_ok());
        assert_eq!(*result.lock().unwrap(), 15);
    }

    #[test]
    fn test_exec_failing_closure() {
        let step = step_fn(|_| Err(Error::msg("failed to add number")));
        assert!(exec(&Context::background(), &*step).is_err());
    }

    #[test]
    fn test_exec_seq_prints_in_order() {
        let order = Arc::new(Mutex::new(Vec::new()));

        assert!(exec_seq(&Context::background(), printing_steps(&order)).is_ok());
        assert_eq!(*order.lock().unwrap(), (1..=10).collect::<Vec<_>>());
    }

    #[test]
    fn test_exec_con_runs_everything() {
        let order = Arc::new(Mutex::new(Vec::new()));

        assert!(exec_con(&Context::background(), printing_steps(&order)).is_ok());

        let mut seen = order.lock().unwrap().clone();
        seen.sort_unstable();
        assert_eq!(seen, (1..=10).collect::<Vec<_>>());
    }

    #[test]
    fn test_even_failures() {
        let steps = || -> Vec<SharedStep> {
            (1..=10)
                .map(|n| {
                    step_fn(move |_| {
                        if n % 2 == 0 {
                            return Err(Error::msg(format!("step {} failed", n)));
                        }
                        Ok(())
                    })
                })
                .collect()
        };

        assert!(exec_con(&Context::background(), steps()).is_err());

        let err = exec_seq(&Context::background(), steps()).unwrap_err();
        assert_eq!(err.to_string(), "step 2 failed");
    }

    #[test]
    fn test_exec_seq_empty() {
        assert!(exec_seq(&Context::background(), Vec::new()).is_ok());
        assert!(exec_con(&Context::background(), Vec::new()).is_ok());
    }
}
