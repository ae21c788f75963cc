//! Error types used by debouncers, notifiers and trackers.
//!
//! This module defines three error enums:
//!
//! - [`DebounceError`]: outcome of a debounced call that did not produce a value.
//! - [`NotifierError`]: waiter rejection and listener failures routed to `on_error`.
//! - [`ConfigError`]: invalid options, raised synchronously at build time.
//!
//! All of them provide helper methods (`as_label`, `as_message`) for logging.
//! Errors returned or panics raised by *tracked* functions never pass through
//! these types: the tracker hands them back to the caller unchanged.

use std::any::Any;

use thiserror::Error;

/// # Errors produced by a debounced call.
///
/// Every caller collapsed into one execution observes the same value, so the
/// type is `Clone`.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DebounceError {
    /// The pending period was cancelled with `cancel(false)` before it executed.
    #[error("debounced call cancelled")]
    Cancelled,

    /// The wrapped function panicked while executing.
    #[error("debounced function panicked: {message}")]
    Panicked {
        /// Panic payload rendered as text.
        message: String,
    },
}

impl DebounceError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use callvisor::DebounceError;
    ///
    /// assert_eq!(DebounceError::Cancelled.as_label(), "debounce_cancelled");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            DebounceError::Cancelled => "debounce_cancelled",
            DebounceError::Panicked { .. } => "debounce_panicked",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            DebounceError::Cancelled => "cancelled".to_string(),
            DebounceError::Panicked { message } => format!("panicked: {message}"),
        }
    }
}

/// # Errors produced by an event notifier.
///
/// `Closed` is what a pending [`wait_for_event`](crate::EventNotifier::wait_for_event)
/// resolves to when the notifier is closed. The listener variants are only ever
/// handed to `on_error` handlers; they never reach the caller of `notify`.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifierError {
    /// The notifier was closed while the waiter was pending.
    #[error("event notifier closed")]
    Closed,

    /// A listener returned an error (sync) or its future resolved to an error (async).
    #[error("listener failed: {message}")]
    ListenerFailed {
        /// The listener error rendered with `Display`.
        message: String,
    },

    /// A listener panicked.
    #[error("listener panicked: {message}")]
    ListenerPanicked {
        /// Panic payload rendered as text.
        message: String,
    },
}

impl NotifierError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use callvisor::NotifierError;
    ///
    /// assert_eq!(NotifierError::Closed.as_label(), "notifier_closed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            NotifierError::Closed => "notifier_closed",
            NotifierError::ListenerFailed { .. } => "listener_failed",
            NotifierError::ListenerPanicked { .. } => "listener_panicked",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            NotifierError::Closed => "closed".to_string(),
            NotifierError::ListenerFailed { message } => format!("error: {message}"),
            NotifierError::ListenerPanicked { message } => format!("panic: {message}"),
        }
    }

    /// Indicates whether this error came from a listener rather than the notifier itself.
    pub fn is_listener_error(&self) -> bool {
        matches!(
            self,
            NotifierError::ListenerFailed { .. } | NotifierError::ListenerPanicked { .. }
        )
    }
}

/// # Invalid configuration.
///
/// Returned synchronously by builders; nothing is deferred to call time.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Requested tracker id length is outside `1..=max`.
    #[error("invalid tracker id length {length}; expected 1..={max}")]
    InvalidIdLength {
        /// The configured length.
        length: usize,
        /// The largest accepted length.
        max: usize,
    },
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::InvalidIdLength { .. } => "config_invalid_id_length",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ConfigError::InvalidIdLength { length, max } => {
                format!("id length {length} out of range 1..={max}")
            }
        }
    }
}

/// Renders a panic payload (as returned by `catch_unwind`) as text.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
