//! Panic Guard
//!
//! Converts a panic inside a step body into [`Error::Panic`], so a crashing
//! step is reported like any other failure instead of taking its worker
//! thread (and the result it owes) down with it.
//!
//! The stack trace has to be taken while the panicking frames still exist,
//! which is only the case inside the panic hook. A chained hook is
//! installed on first use; on threads running a guarded body it stashes
//! the panic site and trace for [`run_guarded`] to pick up after unwinding.
//! Any previously installed hook keeps running.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

use log::warn;

use crate::error::{Error, Result};

static INSTALL_HOOK: Once = Once::new();

thread_local! {
    /// Number of guarded bodies running on this thread.
    static GUARD_DEPTH: Cell<usize> = const { Cell::new(0) };
    /// Trace recorded by the hook for the innermost guard to collect.
    static CAPTURED: RefCell<Option<String>> = const { RefCell::new(None) };
}

fn install_hook() {
    INSTALL_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if GUARD_DEPTH.with(Cell::get) > 0 {
                let location = info
                    .location()
                    .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
                    .unwrap_or_else(|| "unknown location".to_string());
                let trace = format!(
                    "panicked at {}\n{}",
                    location,
                    Backtrace::force_capture()
                );
                CAPTURED.with(|captured| *captured.borrow_mut() = Some(trace));
            }
            previous(info);
        }));
    });
}

/// Runs `body`, catching any panic it raises.
pub(crate) fn run_guarded<F>(body: F) -> Result<()>
where
    F: FnOnce() -> Result<()>,
{
    install_hook();

    GUARD_DEPTH.with(|depth| depth.set(depth.get() + 1));
    // Caller-owned state touched by a panicking step is the caller's to
    // reconcile; the engine itself holds nothing across this call.
    let outcome = panic::catch_unwind(AssertUnwindSafe(body));
    GUARD_DEPTH.with(|depth| depth.set(depth.get() - 1));

    match outcome {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!("Step panicked: {}", message);

            // Only missing if another hook replaced ours after install.
            let trace = CAPTURED
                .with(|captured| captured.borrow_mut().take())
                .unwrap_or_else(|| Backtrace::force_capture().to_string());

            Err(Error::Panic { message, trace })
        }
    }
}

/// Extracts the human-readable message from a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
