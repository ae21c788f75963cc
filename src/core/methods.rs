//! # Method instrumentation.
//!
//! [`MethodTracker`] instruments the methods of one owner (a service, a client,
//! any value with behavior) under operation names of the form
//! `"{owner}.{method}"`. An optional selection limits which methods are
//! instrumented; the others get pass-through handles.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use callvisor::{InvocationTracker, Tracked};
//!
//! type Method<A, R> = Tracked<Box<dyn Fn(A) -> R + Send + Sync>>;
//!
//! struct Counter {
//!     incr: Method<u32, u32>,
//!     get: Method<(), u32>,
//! }
//!
//! impl Counter {
//!     fn new(tracker: &InvocationTracker) -> Self {
//!         let value = Arc::new(AtomicU32::new(0));
//!         let methods = tracker.track_methods("Counter").only(["incr"]);
//!
//!         let v = Arc::clone(&value);
//!         let incr: Box<dyn Fn(u32) -> u32 + Send + Sync> =
//!             Box::new(move |by| v.fetch_add(by, Ordering::SeqCst) + by);
//!         let get: Box<dyn Fn(()) -> u32 + Send + Sync> =
//!             Box::new(move |()| value.load(Ordering::SeqCst));
//!
//!         Self {
//!             incr: methods.method("incr", incr),
//!             get: methods.method("get", get),
//!         }
//!     }
//! }
//!
//! let tracker = InvocationTracker::new();
//! let counter = Counter::new(&tracker);
//! assert_eq!(counter.incr.call(2), 2);
//! assert_eq!(counter.get.call(()), 2);
//! assert_eq!(counter.incr.operation(), Some("Counter.incr"));
//! assert_eq!(counter.get.operation(), None);
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::core::config::TrackOptions;
use crate::core::tracked::Tracked;
use crate::core::tracker::InvocationTracker;

/// Instruments the methods of one owner.
#[derive(Debug, Clone)]
pub struct MethodTracker {
    tracker: InvocationTracker,
    owner: Arc<str>,
    only: Option<BTreeSet<String>>,
    options: TrackOptions,
}

impl MethodTracker {
    pub(crate) fn new(tracker: InvocationTracker, owner: Arc<str>) -> Self {
        Self {
            tracker,
            owner,
            only: None,
            options: TrackOptions::default(),
        }
    }

    /// Limits instrumentation to the named methods.
    pub fn only<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.only = Some(methods.into_iter().map(Into::into).collect());
        self
    }

    /// Adds a tag to every method instrumented through this value.
    pub fn with_tag(mut self, name: &str, value: &str) -> Self {
        self.options = self.options.with_tag(name, value);
        self
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn is_selected(&self, method: &str) -> bool {
        self.only
            .as_ref()
            .is_none_or(|selected| selected.contains(method))
    }

    /// Instruments `f` as `"{owner}.{name}"`, or passes it through when not selected.
    pub fn method<F>(&self, name: &str, f: F) -> Tracked<F> {
        if !self.is_selected(name) {
            return Tracked::bare(f);
        }
        self.tracker
            .track_with(format!("{}.{name}", self.owner), f, self.options.clone())
    }
}
