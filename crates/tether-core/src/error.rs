//! Error types for the binding layer.
//!
//! ## Error Hierarchy
//!
//! ```text
//! BindError            - a dispatch entry point failed (surfaces as one script error message)
//! ├── HostException    - text raised by invoked host code
//! HostException        - returned by host callables, field and property accessors
//! ConstraintViolation  - a generic instantiation broke a type constraint
//! ScriptError          - raised by the interpreter's own control flow
//! ```
//!
//! Every [`BindError`] renders to the exact message script code observes, so
//! the `Display` output is part of the contract.

use thiserror::Error;

/// Classification of dispatch failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The named member does not exist.
    InvalidMember,
    /// The key has the wrong shape or is out of bounds.
    InvalidKey,
    /// No viable overload, or a value could not be coerced.
    InvalidArgs,
    /// The member kind does not support the action.
    UnsupportedOperation,
    /// Generic instantiation failed a type constraint.
    ConstraintViolation,
    /// Invoked host code raised.
    HostInvocationFailure,
    /// Any other host-side fault.
    UnexpectedHostFailure,
}

/// Failure of a dispatch entry point.
///
/// Action strings read as the continuation of "attempt to ", e.g.
/// `BindError::UnsupportedOperation("set event")`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    /// `action` is `"index"` or `"set"`.
    #[error("attempt to {0} invalid member")]
    InvalidMember(&'static str),

    #[error("attempt to {0}")]
    InvalidKey(&'static str),

    #[error("attempt to {0}")]
    InvalidArgs(&'static str),

    #[error("attempt to {0}")]
    UnsupportedOperation(&'static str),

    #[error("attempt to {0} threw: type constraints")]
    ConstraintViolation(&'static str),

    /// The host failure text is preserved verbatim.
    #[error("attempt to {action} threw:\n{source}")]
    HostInvocation {
        action: &'static str,
        source: HostException,
    },

    #[error("unhandled host failure:\n{0}")]
    UnexpectedHostFailure(String),
}

impl BindError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BindError::InvalidMember(_) => ErrorKind::InvalidMember,
            BindError::InvalidKey(_) => ErrorKind::InvalidKey,
            BindError::InvalidArgs(_) => ErrorKind::InvalidArgs,
            BindError::UnsupportedOperation(_) => ErrorKind::UnsupportedOperation,
            BindError::ConstraintViolation(_) => ErrorKind::ConstraintViolation,
            BindError::HostInvocation { .. } => ErrorKind::HostInvocationFailure,
            BindError::UnexpectedHostFailure(_) => ErrorKind::UnexpectedHostFailure,
        }
    }

    /// Wrap a host failure raised while performing `action`.
    pub fn host(action: &'static str, source: HostException) -> Self {
        BindError::HostInvocation { action, source }
    }
}

/// A failure raised by host code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HostException {
    pub message: String,
}

impl HostException {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<ScriptError> for HostException {
    fn from(error: ScriptError) -> Self {
        HostException::new(error.to_string())
    }
}

/// A generic type argument did not satisfy its constraint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ConstraintViolation {
    pub message: String,
}

impl ConstraintViolation {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// An error raised through the interpreter's own control flow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    /// `error(message)` from script code or a helper routine.
    #[error("{0}")]
    Raised(String),

    /// The value does not support the operation.
    #[error("attempt to {operation} a {type_name} value")]
    Unsupported {
        operation: &'static str,
        type_name: &'static str,
    },

    #[error("stack overflow")]
    StackOverflow,
}
