//! Execution Errors
//!
//! A single error type is returned from every `exec` call, whatever the
//! shape of the step tree underneath it:
//!
//! - [`Error::Step`]: a failure returned by a step body
//! - [`Error::Panic`]: a panic captured inside a concurrently executed step
//! - [`Error::Context`]: the governing context ended before any step failed

use std::error::Error as StdError;

use thiserror::Error;

use crate::context::ContextError;

/// Boxed error type accepted from step bodies.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Terminal failure of an `exec` call.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned by the step itself.
    #[error(transparent)]
    Step(BoxError),

    /// The step panicked; the panic was converted into an error.
    #[error("step panicked: {message}\nstack trace:\n{trace}")]
    Panic { message: String, trace: String },

    /// The governing context was canceled or its deadline passed.
    #[error(transparent)]
    Context(#[from] ContextError),
}

impl Error {
    /// Wraps any error as a step failure.
    pub fn new(err: impl Into<BoxError>) -> Self {
        Self::Step(err.into())
    }

    /// Creates a step failure from a plain message.
    ///
    /// ```
    /// let err = stepflow::Error::msg("failed to add number");
    /// assert_eq!(err.to_string(), "failed to add number");
    /// ```
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Step(message.into().into())
    }

    /// Returns true if this error was converted from a panic.
    pub fn is_panic(&self) -> bool {
        matches!(self, Self::Panic { .. })
    }

    /// Returns the context termination error, if that is what this is.
    pub fn context_error(&self) -> Option<ContextError> {
        match self {
            Self::Context(err) => Some(*err),
            _ => None,
        }
    }

    /// Attempts to view a step failure as a concrete error type.
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        match self {
            Self::Step(inner) => inner.downcast_ref::<E>(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_msg_displays_verbatim() {
        let err = Error::msg("flaky errors");
        assert_eq!(err.to_string(), "flaky errors");
        assert!(!err.is_panic());
        assert!(err.context_error().is_none());
    }

    #[test]
    fn test_new_keeps_concrete_type() {
        let err = Error::new(io::Error::new(io::ErrorKind::NotFound, "missing input"));

        let io_err = err.downcast_ref::<io::Error>().expect("should downcast");
        assert_eq!(io_err.kind(), io::ErrorKind::NotFound);
        assert_eq!(err.to_string(), "missing input");
    }

    #[test]
    fn test_context_conversion() {
        let err: Error = ContextError::DeadlineExceeded.into();
        assert_eq!(err.context_error(), Some(ContextError::DeadlineExceeded));
        assert_eq!(err.to_string(), "context deadline exceeded");
    }

    #[test]
    fn test_panic_display_contains_message_and_trace() {
        let err = Error::Panic {
            message: "index out of bounds".to_string(),
            trace: "frame 0".to_string(),
        };

        assert!(err.is_panic());
        let text = err.to_string();
        assert!(text.contains("index out of bounds"));
        assert!(text.contains("frame 0"));
    }

    #[test]
    fn test_downcast_on_non_step_variant() {
        let err = Error::Context(ContextError::Canceled);
        assert!(err.downcast_ref::<io::Error>().is_none());
    }
}
