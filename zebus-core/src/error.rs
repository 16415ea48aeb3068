//! Zebus Core Error Types
//!
//! Error handling for dispatch, pipe, and invoker-loading operations.

use thiserror::Error;

/// Errors raised while dispatching a message to local handlers.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// A handler raised while processing a message.
    #[error("handler error: {0}")]
    Handler(String),

    /// An async handler returned a null/absent deferred result.
    #[error("dispatch failed because handler did not start its task")]
    AsyncNotStarted,

    /// A pipe's before/after/on-error hook raised.
    #[error("pipe error: {0}")]
    Pipe(String),

    /// A handler type was rejected by the invoker loader's filters.
    #[error("handler type rejected: {0}")]
    HandlerRejected(String),

    /// A handler declared async but its entry point does not return a
    /// deferred result ("wrong async handler").
    #[error("wrong async handler: {0}")]
    WrongAsyncHandler(String),
}

/// Result type alias for zebus-core operations.
pub type Result<T> = std::result::Result<T, DispatchError>;

impl DispatchError {
    /// Build a handler error from any displayable cause.
    pub fn handler(msg: impl Into<String>) -> Self {
        Self::Handler(msg.into())
    }

    /// Build a pipe error from any displayable cause.
    pub fn pipe(msg: impl Into<String>) -> Self {
        Self::Pipe(msg.into())
    }

    /// Whether this error still counts the dispatch as handled
    /// (spec: async-not-started "counts as handled").
    #[must_use]
    pub const fn counts_as_handled(&self) -> bool {
        matches!(self, Self::Handler(_) | Self::AsyncNotStarted | Self::Pipe(_))
    }
}
