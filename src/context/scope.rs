//! Cancellation Scopes
//!
//! A [`Context`] is a clonable handle to one execution scope. Scopes form a
//! tree: ending a scope ends every scope derived from it, while ending a
//! child never touches its parent.
//!
//! Cancellation is advisory. A step learns about it only by polling
//! [`Context::is_done`] or blocking in [`Context::wait_timeout`].

use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, Weak};
use std::thread;
use std::time::{Duration, Instant};

use log::debug;
use thiserror::Error;

/// Why a scope ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    /// `cancel()` was called on the scope or one of its ancestors.
    #[error("context canceled")]
    Canceled,
    /// The scope's deadline passed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Work to run when a scope ends.
enum Hook {
    Callback(Box<dyn FnOnce(ContextError) + Send>),
    /// A derived scope, held weakly so dropping it releases it.
    Child(Weak<Inner>),
}

impl Hook {
    fn fire(self, err: ContextError) {
        match self {
            Hook::Callback(f) => f(err),
            Hook::Child(child) => {
                if let Some(child) = child.upgrade() {
                    child.end(err);
                }
            }
        }
    }

    /// A child whose every handle is gone can never be observed again.
    fn is_stale(&self) -> bool {
        matches!(self, Hook::Child(child) if child.strong_count() == 0)
    }
}

struct State {
    err: Option<ContextError>,
    hooks: Vec<(u64, Hook)>,
    next_hook_id: u64,
    /// Registration inside the parent, removed once this scope ends.
    parent_link: Option<(Weak<Inner>, u64)>,
}

struct Inner {
    state: Mutex<State>,
    ended: Condvar,
    deadline: Option<Instant>,
}

impl Inner {
    fn new(deadline: Option<Instant>) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(State {
                err: None,
                hooks: Vec::new(),
                next_hook_id: 0,
                parent_link: None,
            }),
            ended: Condvar::new(),
            deadline,
        })
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // Hooks run outside the lock, so a poisoned guard still holds
        // consistent state.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Ends the scope. Only the first call has any effect.
    fn end(&self, err: ContextError) {
        let (hooks, parent_link) = {
            let mut state = self.lock();
            if state.err.is_some() {
                return;
            }
            state.err = Some(err);
            self.ended.notify_all();
            (
                std::mem::take(&mut state.hooks),
                state.parent_link.take(),
            )
        };

        for (_, hook) in hooks {
            hook.fire(err);
        }

        if let Some((parent, id)) = parent_link {
            if let Some(parent) = parent.upgrade() {
                parent.remove_hook(id);
            }
        }
    }

    /// Registers a hook, or runs it immediately if the scope already ended.
    ///
    /// Registration also drops hooks of children that were never ended but
    /// are no longer referenced, so a long-lived scope stays bounded.
    fn add_hook(&self, hook: Hook) -> Option<u64> {
        let ended = {
            let mut state = self.lock();
            match state.err {
                Some(err) => err,
                None => {
                    state.hooks.retain(|(_, hook)| !hook.is_stale());
                    let id = state.next_hook_id;
                    state.next_hook_id += 1;
                    state.hooks.push((id, hook));
                    return Some(id);
                }
            }
        };

        hook.fire(ended);
        None
    }

    fn remove_hook(&self, id: u64) {
        self.lock().hooks.retain(|(hook_id, _)| *hook_id != id);
    }
}

/// A cancelable execution scope.
///
/// Cloning a `Context` yields another handle to the same scope.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use stepflow::{Context, ContextError};
///
/// let root = Context::background();
/// let child = root.with_timeout(Duration::from_secs(30));
///
/// root.cancel();
/// assert_eq!(child.err(), Some(ContextError::Canceled));
/// ```
#[derive(Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

impl Context {
    /// Creates a root scope. It ends only when [`Context::cancel`] is called.
    pub fn background() -> Self {
        Self {
            inner: Inner::new(None),
        }
    }

    /// Derives a child scope that ends with this one or when canceled.
    pub fn with_cancel(&self) -> Self {
        self.derive(self.deadline())
    }

    /// Derives a child scope that also ends at `deadline`.
    ///
    /// A deadline later than the parent's is clamped to the parent's.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline() {
            Some(parent) if parent <= deadline => parent,
            _ => deadline,
        };
        self.derive(Some(deadline))
    }

    /// Derives a child scope that ends after `timeout`.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    fn derive(&self, deadline: Option<Instant>) -> Self {
        let child = Self {
            inner: Inner::new(deadline),
        };

        let hook_id = self
            .inner
            .add_hook(Hook::Child(Arc::downgrade(&child.inner)));

        if let Some(id) = hook_id {
            let mut state = child.inner.lock();
            if state.err.is_none() {
                state.parent_link = Some((Arc::downgrade(&self.inner), id));
            }
        }

        match deadline {
            Some(deadline) if deadline <= Instant::now() => {
                child.inner.end(ContextError::DeadlineExceeded);
            }
            // A deadline inherited from the parent is enforced by the parent.
            Some(deadline) if Some(deadline) != self.deadline() => {
                child.spawn_deadline_timer();
            }
            _ => {}
        }

        child
    }

    fn spawn_deadline_timer(&self) {
        let Some(deadline) = self.inner.deadline else {
            return;
        };
        let inner = Arc::clone(&self.inner);

        thread::spawn(move || {
            let mut state = inner.lock();
            loop {
                if state.err.is_some() {
                    return;
                }
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                state = inner
                    .ended
                    .wait_timeout(state, deadline - now)
                    .unwrap_or_else(PoisonError::into_inner)
                    .0;
            }
            drop(state);

            debug!("Context deadline exceeded");
            inner.end(ContextError::DeadlineExceeded);
        });
    }

    /// Ends this scope and every scope derived from it.
    pub fn cancel(&self) {
        self.inner.end(ContextError::Canceled);
    }

    /// Returns the termination error once the scope has ended.
    pub fn err(&self) -> Option<ContextError> {
        self.inner.lock().err
    }

    /// Returns true once the scope has ended.
    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// Returns the instant at which this scope ends on its own, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Blocks until the scope ends.
    pub fn wait(&self) -> ContextError {
        let mut state = self.inner.lock();
        loop {
            if let Some(err) = state.err {
                return err;
            }
            state = self
                .inner
                .ended
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Blocks for at most `timeout`.
    ///
    /// Returns the termination error if the scope ended in time, `None`
    /// if the full timeout elapsed first. Steps use this as a
    /// cancellation-aware sleep.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<ContextError> {
        let until = Instant::now() + timeout;
        let mut state = self.inner.lock();
        loop {
            if let Some(err) = state.err {
                return Some(err);
            }
            let now = Instant::now();
            if now >= until {
                return None;
            }
            state = self
                .inner
                .ended
                .wait_timeout(state, until - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Runs `f` once when the scope ends.
    ///
    /// If the scope has already ended, `f` runs before this returns.
    /// Dropping the returned hook before then deregisters `f`. The callback
    /// runs on whichever thread ends the scope and must not block.
    pub fn on_cancel<F>(&self, f: F) -> CancelHook
    where
        F: FnOnce(ContextError) + Send + 'static,
    {
        let id = self.inner.add_hook(Hook::Callback(Box::new(f)));
        CancelHook {
            scope: Arc::downgrade(&self.inner),
            id,
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("err", &self.err())
            .field("deadline", &self.inner.deadline)
            .finish()
    }
}

/// Registration returned by [`Context::on_cancel`].
#[must_use = "dropping a CancelHook deregisters the callback"]
pub struct CancelHook {
    scope: Weak<Inner>,
    id: Option<u64>,
}

impl Drop for CancelHook {
    fn drop(&mut self) {
        if let (Some(id), Some(scope)) = (self.id, self.scope.upgrade()) {
            scope.remove_hook(id);
        }
    }
}
