//! Concurrent Groups
//!
//! Fans a set of steps out to one thread each and reports the first
//! failure observed.
//!
//! # Protocol
//!
//! 1. Every step receives a child of the caller's context.
//! 2. Workers publish failures into a single-slot channel with `try_send`;
//!    once the slot holds a signal later ones are dropped, so no worker
//!    ever blocks on reporting.
//! 3. A supervisor joins all workers and then publishes `Finished`.
//! 4. Cancellation of the caller's context publishes `Canceled` through a
//!    hook on the child context.
//! 5. The caller returns on the first signal and cancels the child context,
//!    telling siblings that are still running to wind down.

use std::fmt;
use std::sync::mpsc::{self, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread;

use log::{debug, warn};

use crate::context::{Context, ContextError};
use crate::error::{Error, Result};

use super::guard::run_guarded;
use super::step::{SharedStep, Step};

/// First thing the waiting caller hears about.
#[derive(Debug)]
enum Signal {
    Failed { index: usize, error: Error },
    Finished,
    Canceled(ContextError),
}

/// A group of steps executed in parallel.
///
/// Only the first observed failure is returned; when several steps fail
/// at once the others are discarded. Use [`Concurrent::exec_all`] to keep
/// every failure instead.
///
/// Steps that share caller state must synchronize it themselves.
///
/// # Example
///
/// ```
/// use std::sync::{Arc, Mutex};
/// use stepflow::{exec, step_fn, Concurrent, Context};
///
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let group: Concurrent = (1..=10)
///     .map(|n| {
///         let seen = Arc::clone(&seen);
///         step_fn(move |_| {
///             seen.lock().unwrap().push(n);
///             Ok(())
///         })
///     })
///     .collect();
///
/// exec(&Context::background(), &group).unwrap();
/// assert_eq!(seen.lock().unwrap().len(), 10);
/// ```
#[derive(Default)]
pub struct Concurrent {
    steps: Vec<SharedStep>,
}

impl Concurrent {
    /// Creates a group from `steps`.
    pub fn new(steps: impl IntoIterator<Item = SharedStep>) -> Self {
        Self {
            steps: steps.into_iter().collect(),
        }
    }

    /// Adds a step to the group.
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

    /// Runs every step to completion and returns all failures.
    ///
    /// Unlike [`Step::exec`], a failure does not cancel siblings. Each
    /// failure is paired with the index of the step that produced it, in
    /// ascending index order. Panics are captured as [`Error::Panic`].
    pub fn exec_all(&self, ctx: &Context) -> Vec<(usize, Error)> {
        if self.steps.is_empty() {
            return Vec::new();
        }

        let scope = ctx.with_cancel();
        let workers: Vec<_> = self
            .steps
            .iter()
            .map(|step| {
                let step = Arc::clone(step);
                let scope = scope.clone();
                thread::spawn(move || run_guarded(|| step.exec(&scope)))
            })
            .collect();

        let failures = workers
            .into_iter()
            .enumerate()
            .filter_map(|(index, worker)| match worker.join() {
                Ok(Ok(())) => None,
                Ok(Err(error)) => Some((index, error)),
                Err(_) => Some((
                    index,
                    Error::Panic {
                        message: "worker thread panicked outside the step guard".to_string(),
                        trace: String::new(),
                    },
                )),
            })
            .collect::<Vec<_>>();

        scope.cancel();
        debug!(
            "Concurrent group finished: {} of {} steps failed",
            failures.len(),
            self.steps.len()
        );
        failures
    }
}

impl Step for Concurrent {
    fn exec(&self, ctx: &Context) -> Result<()> {
        if self.steps.is_empty() {
            return Ok(());
        }

        let scope = ctx.with_cancel();
        let (tx, rx) = mpsc::sync_channel::<Signal>(1);

        let cancel_hook = scope.on_cancel({
            let tx = tx.clone();
            move |err| publish(&tx, Signal::Canceled(err))
        });

        debug!("Dispatching {} steps concurrently", self.steps.len());

        let mut workers = Vec::with_capacity(self.steps.len());
        for (index, step) in self.steps.iter().enumerate() {
            let step = Arc::clone(step);
            let scope = scope.clone();
            let tx = tx.clone();

            workers.push(thread::spawn(move || {
                if let Err(error) = run_guarded(|| step.exec(&scope)) {
                    debug!("Concurrent step {} failed: {}", index, error);
                    publish(&tx, Signal::Failed { index, error });
                }
            }));
        }

        // The supervisor holds the last group-side handles on the steps, so
        // a step is released only after the group has fully wound down.
        let held = self.steps.clone();
        thread::spawn(move || {
            for worker in workers {
                if worker.join().is_err() {
                    warn!("Concurrent worker exited abnormally");
                }
            }
            publish(&tx, Signal::Finished);
            drop(held);
        });

        // Finished is always published before the supervisor's sender drops.
        let signal = rx.recv().unwrap_or(Signal::Finished);

        drop(cancel_hook);
        scope.cancel();

        match signal {
            Signal::Failed { index, error } => {
                debug!("Concurrent group failed at step {}", index);
                Err(error)
            }
            Signal::Finished => Ok(()),
            Signal::Canceled(err) => Err(err.into()),
        }
    }
}

/// Offers a signal to the waiting caller without blocking. If another
/// signal already claimed the slot this one is dropped.
fn publish(tx: &SyncSender<Signal>, signal: Signal) {
    if let Err(TrySendError::Full(dropped) | TrySendError::Disconnected(dropped)) =
        tx.try_send(signal)
    {
        debug!("Dropping concurrent signal {:?}: result already decided", dropped);
    }
}

impl FromIterator<SharedStep> for Concurrent {
    fn from_iter<I: IntoIterator<Item = SharedStep>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl fmt::Debug for Concurrent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Concurrent")
            .field("steps", &self.steps.len())
            .finish()
    }
}
