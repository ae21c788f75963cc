//! # Debounce options.
//!
//! [`DebounceOptions`] controls how calls are coalesced:
//! - [`DebounceOptions::delay`] quiet period that must elapse before execution;
//! - [`DebounceOptions::leading`] run the first call of a quiet period immediately;
//! - [`DebounceOptions::wait_for_previous`] never overlap two executions;
//! - [`DebounceOptions::accumulator`] fold the arguments of collapsed calls.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use callvisor::DebounceOptions;
//!
//! let opts = DebounceOptions::new(Duration::from_millis(50))
//!     .with_leading(true)
//!     .with_accumulator(|prev: Option<u32>, next: u32| prev.unwrap_or(0) + next);
//!
//! assert!(opts.leading);
//! assert!(opts.accumulator.is_some());
//! assert!(!opts.wait_for_previous);
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Folds the arguments of the current call into the value accumulated so far.
///
/// Receives `None` for the first call of a period.
pub type Accumulator<A> = Arc<dyn Fn(Option<A>, A) -> A + Send + Sync>;

/// Options of a [`Debounced`](crate::Debounced) function.
pub struct DebounceOptions<A> {
    /// Quiet period after the last call before the wrapped function runs.
    ///
    /// `Duration::ZERO` still defers to the next timer tick.
    pub delay: Duration,
    /// Execute the first call of a quiet period immediately.
    pub leading: bool,
    /// Re-debounce instead of executing while a previous execution is still running.
    pub wait_for_previous: bool,
    /// Optional argument folding across collapsed calls.
    pub accumulator: Option<Accumulator<A>>,
}

impl<A> DebounceOptions<A> {
    /// Creates options with the given delay and every flag off.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            leading: false,
            wait_for_previous: false,
            accumulator: None,
        }
    }

    /// Sets leading-edge execution.
    #[inline]
    pub fn with_leading(mut self, leading: bool) -> Self {
        self.leading = leading;
        self
    }

    /// Sets serialization of executions.
    #[inline]
    pub fn with_wait_for_previous(mut self, wait: bool) -> Self {
        self.wait_for_previous = wait;
        self
    }

    /// Attaches an argument accumulator.
    #[inline]
    pub fn with_accumulator<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<A>, A) -> A + Send + Sync + 'static,
    {
        self.accumulator = Some(Arc::new(f));
        self
    }

    /// Folds `next` into `prev` with the accumulator, or keeps only `next` without one.
    pub(crate) fn fold(&self, prev: Option<A>, next: A) -> A {
        match &self.accumulator {
            Some(acc) => acc(prev, next),
            None => next,
        }
    }
}

impl<A> Clone for DebounceOptions<A> {
    fn clone(&self) -> Self {
        Self {
            delay: self.delay,
            leading: self.leading,
            wait_for_previous: self.wait_for_previous,
            accumulator: self.accumulator.clone(),
        }
    }
}

impl<A> fmt::Debug for DebounceOptions<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebounceOptions")
            .field("delay", &self.delay)
            .field("leading", &self.leading)
            .field("wait_for_previous", &self.wait_for_previous)
            .field("accumulator", &self.accumulator.is_some())
            .finish()
    }
}
