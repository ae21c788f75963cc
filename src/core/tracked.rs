//! # Tracked function handles.
//!
//! [`Tracked`] pairs a function with the trackers it is bound to. Calling it
//! through one of the `call*` methods runs the function and publishes lifecycle
//! records on every bound tracker.
//!
//! | method           | function returns        | completes on         | errors on                  |
//! |------------------|-------------------------|----------------------|----------------------------|
//! | `call`           | `R`                     | return               | panic                      |
//! | `try_call`       | `Result<T, E>`          | `Ok`                 | `Err`, panic               |
//! | `call_async`     | `impl Future<Output=R>` | resolution           | panic, drop before ready   |
//! | `try_call_async` | `impl Future<Output=Result<T, E>>` | `Ok`      | `Err`, panic, drop         |
//!
//! ## Rules
//! - The function's return value, error and panic reach the caller unchanged.
//! - Bindings are ordered outermost first; started records follow that order and
//!   terminal records the reverse.
//! - A handle with no bindings (tracker closed, or method not selected) calls
//!   straight through.

use std::fmt::{self, Debug, Display};
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::core::frame::{AsResult, AsValue, Classify, Frame, Settlement, settle_all};
use crate::core::future::TrackedFuture;
use crate::core::tracker::{Instrumented, TrackerInner, TrackerMarker};
use crate::error::panic_message;
use crate::invocation::Tag;

/// One tracker a function is bound to.
#[derive(Clone)]
pub(crate) struct Binding {
    pub(crate) tracker: Arc<TrackerInner>,
    pub(crate) operation: Arc<str>,
    pub(crate) tags: Arc<[Tag]>,
}

/// Handle to a function instrumented by one or more trackers.
///
/// Cloning is cheap and keeps identity: [`Tracked::ptr_eq`] holds between clones.
pub struct Tracked<F> {
    f: Arc<F>,
    bindings: Arc<[Binding]>,
}

impl<F> Clone for Tracked<F> {
    fn clone(&self) -> Self {
        Self {
            f: Arc::clone(&self.f),
            bindings: Arc::clone(&self.bindings),
        }
    }
}

impl<F> Tracked<F> {
    /// Handle that calls straight through.
    pub(crate) fn bare(f: F) -> Self {
        Self {
            f: Arc::new(f),
            bindings: Arc::from(Vec::new()),
        }
    }

    pub(crate) fn bound(f: F, binding: Binding) -> Self {
        Self {
            f: Arc::new(f),
            bindings: Arc::from(vec![binding]),
        }
    }

    /// Same function with `binding` as the new outermost tracker.
    pub(crate) fn wrapped(&self, binding: Binding) -> Self {
        let mut bindings = Vec::with_capacity(self.bindings.len() + 1);
        bindings.push(binding);
        bindings.extend(self.bindings.iter().cloned());
        Self {
            f: Arc::clone(&self.f),
            bindings: bindings.into(),
        }
    }

    pub(crate) fn is_bound_to(&self, tracker: &TrackerInner) -> bool {
        self.bindings
            .iter()
            .any(|b| b.tracker.marker == tracker.marker)
    }

    /// `true` if both handles are the same instrumentation of the same function.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.f, &other.f) && Arc::ptr_eq(&self.bindings, &other.bindings)
    }

    /// Operation name of the outermost binding.
    pub fn operation(&self) -> Option<&str> {
        self.bindings.first().map(|b| b.operation.as_ref())
    }

    /// Tags of the outermost binding.
    pub fn tags(&self) -> &[Tag] {
        self.bindings.first().map(|b| b.tags.as_ref()).unwrap_or(&[])
    }

    /// The wrapped function, uninstrumented.
    pub fn inner(&self) -> &F {
        &self.f
    }

    /// Calls a function whose every return counts as a completion.
    pub fn call<A, R>(&self, args: A) -> R
    where
        F: Fn(A) -> R,
        A: Debug,
        R: Debug,
    {
        self.invoke::<A, R, AsValue>(args)
    }

    /// Calls a fallible function; `Err` is recorded as an error and returned as is.
    pub fn try_call<A, T, E>(&self, args: A) -> Result<T, E>
    where
        F: Fn(A) -> Result<T, E>,
        A: Debug,
        T: Debug,
        E: Display,
    {
        self.invoke::<A, Result<T, E>, AsResult>(args)
    }

    /// Calls an async function; the invocation settles when the future does.
    pub fn call_async<A, Fut>(&self, args: A) -> TrackedFuture<Fut, AsValue>
    where
        F: Fn(A) -> Fut,
        A: Debug,
        Fut: Future,
        Fut::Output: Debug,
    {
        self.start(args)
    }

    /// Calls an async fallible function; a future resolving to `Err` is recorded as an error.
    pub fn try_call_async<A, Fut, T, E>(&self, args: A) -> TrackedFuture<Fut, AsResult>
    where
        F: Fn(A) -> Fut,
        A: Debug,
        Fut: Future<Output = Result<T, E>>,
        T: Debug,
        E: Display,
    {
        self.start(args)
    }

    fn invoke<A, R, S>(&self, args: A) -> R
    where
        F: Fn(A) -> R,
        A: Debug,
        S: Classify<R>,
    {
        if self.bindings.is_empty() {
            return (self.f)(args);
        }
        let frames = Frame::begin_all(&self.bindings, &args);
        match panic::catch_unwind(AssertUnwindSafe(|| (self.f)(args))) {
            Ok(output) => {
                settle_all(frames, &S::classify(&output), false);
                output
            }
            Err(payload) => {
                let settlement = Settlement::Errored(panic_message(payload.as_ref()));
                settle_all(frames, &settlement, false);
                panic::resume_unwind(payload)
            }
        }
    }

    fn start<A, Fut, S>(&self, args: A) -> TrackedFuture<Fut, S>
    where
        F: Fn(A) -> Fut,
        A: Debug,
        Fut: Future,
    {
        let mut frames = Frame::begin_all(&self.bindings, &args);
        let created = panic::catch_unwind(AssertUnwindSafe(|| (self.f)(args)));
        // The caller's context must look as before the call; the future pushes
        // its keys again inside its own branch.
        for frame in frames.iter_mut().rev() {
            frame.pop();
        }
        match created {
            Ok(fut) => TrackedFuture::new(fut, frames),
            Err(payload) => {
                let settlement = Settlement::Errored(panic_message(payload.as_ref()));
                settle_all(frames, &settlement, false);
                panic::resume_unwind(payload)
            }
        }
    }
}

impl<F> Instrumented for Tracked<F> {
    fn markers(&self) -> Vec<TrackerMarker> {
        self.bindings.iter().map(|b| b.tracker.marker).collect()
    }
}

impl<F> fmt::Debug for Tracked<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let operations: Vec<&str> = self.bindings.iter().map(|b| b.operation.as_ref()).collect();
        f.debug_struct("Tracked")
            .field("operations", &operations)
            .finish_non_exhaustive()
    }
}
