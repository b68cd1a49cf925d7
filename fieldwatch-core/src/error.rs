//! Error types for fieldwatch.
//!
//! Every failure is reported synchronously at the call that caused it and
//! leaves registries untouched:
//!
//! - [`WatchError::InvalidArgument`] - empty field names and similar caller bugs
//! - [`WatchError::InvalidAccessorExpression`] - a field accessor that does not name one field
//! - [`WatchError::UnsupportedTargetKind`] - a listener cannot be bound to the callback's receiver
//! - [`WatchError::UnsupportedCallbackTarget`] - the checked subscribe path refused the receiver
//! - [`WatchError::RegistryClosed`] - the registry was torn down

use thiserror::Error;

/// Result alias used throughout fieldwatch.
pub type Result<T, E = WatchError> = std::result::Result<T, E>;

/// Top-level error type for all fieldwatch operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WatchError {
    /// An argument passed to a registry-level call was invalid.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The accessor expression does not resolve to a single readable field.
    #[error("invalid accessor expression `{expression}`: {reason}")]
    InvalidAccessorExpression {
        /// The expression as written by the caller.
        expression: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A bound listener was requested for a receiver that cannot be weakly referenced.
    #[error("unsupported target kind: {0}")]
    UnsupportedTargetKind(String),

    /// The safety-checked subscribe path refused the callback's receiver.
    #[error("unsupported callback target: {0}")]
    UnsupportedCallbackTarget(String),

    /// The registry has been torn down and accepts no new listeners.
    #[error("subscription registry has been torn down")]
    RegistryClosed,
}

impl WatchError {
    pub(crate) fn accessor(expression: impl Into<String>, reason: impl Into<String>) -> Self {
        WatchError::InvalidAccessorExpression {
            expression: expression.into(),
            reason: reason.into(),
        }
    }
}
