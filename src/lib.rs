//! # callvisor
//!
//! **Callvisor** observes and shapes function calls in async Rust.
//!
//! It provides three building blocks and an instrumentation layer on top of them:
//! a debounce combinator, lazy event notifiers, invocation stacks that survive
//! `.await`, and an invocation tracker that publishes the lifecycle of every
//! instrumented call with its parent, duration, arguments and result.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │  Tracked<F>  │   │  Tracked<F>  │   │ MethodTracker│
//!     │  (fn "load") │   │  (fn "save") │   │ ("Repo.*")   │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  InvocationTracker                                                │
//! │  - key counter            ("{tracker_id}:{operation}:{index}")    │
//! │  - InvocationStack        (parent correlation, per async branch)  │
//! │  - Clock / Logger         (durations, diagnostics)                │
//! │  - EventNotifier x4       (invoked / started / completed / errored)│
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        ▼                  ▼                  ▼               ▼
//!   on_invoked()       on_started()      on_completed()   on_errored()
//!        │
//!        ├──► listeners (sync / async), wait_for_event()
//!        └──► SubscriberSet ──► per-subscriber queues ──► Subscribe::on_invocation
//! ```
//!
//! ### Lifecycle of one call
//! ```text
//! tracked.call(args) / call_async(args)
//!   ├─► key = next index, parent = stack.peek(), stack.push(key)
//!   ├─► publish Started (only if someone observes)
//!   ├─► f(args)
//!   │     ├─ sync:  return ─► Completed │ Err / panic ─► Errored
//!   │     └─ async: TrackedFuture runs in its own context branch
//!   │               ready ─► Completed │ Err / panic / dropped ─► Errored
//!   └─► stack.pop(), publish terminal record with duration
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                                  |
//! |-------------------|---------------------------------------------------------------|-----------------------------------------------------|
//! | **Debounce**      | Collapse bursts of calls into one delayed execution.          | [`debounce`], [`Debounced`], [`DebounceOptions`]    |
//! | **Notifier**      | Lazy fan-out, one-shot waiters, change hooks.                 | [`EventNotifier`], [`Subscription`], [`WaitForEvent`] |
//! | **Stacks**        | Parent correlation that follows async branches.               | [`InvocationStack`], [`ContextLocalStack`], [`PlainStack`] |
//! | **Tracking**      | Instrument functions and methods, publish lifecycle records.  | [`InvocationTracker`], [`Tracked`], [`MethodTracker`] |
//! | **Subscriber API**| Feed records to slow consumers without blocking calls.        | [`Subscribe`], [`SubscriberSet`]                    |
//! | **Errors**        | Typed errors for debounce, notifiers and configuration.       | [`DebounceError`], [`NotifierError`], [`ConfigError`] |
//! | **Configuration** | Tracker settings and pluggable logger / clock / stack.        | [`TrackerConfig`], [`TrackerBuilder`]               |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] subscriber _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use callvisor::{InvocationTracker, StageKind, TrackerConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let tracker = InvocationTracker::builder(TrackerConfig::default().with_tag("svc", "demo"))
//!         .build()?;
//!
//!     // Build subscribers (optional)
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn callvisor::Subscribe>> = vec![Arc::new(callvisor::LogWriter::new())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn callvisor::Subscribe>> = Vec::new();
//!     let set = callvisor::SubscriberSet::new(subs);
//!     set.attach(&tracker);
//!
//!     let fetch = tracker.track("fetch", |id: u32| async move {
//!         tokio::time::sleep(Duration::from_millis(5)).await;
//!         format!("item-{id}")
//!     });
//!     let load = {
//!         let fetch = fetch.clone();
//!         tracker.track("load", move |id: u32| {
//!             let fetch = fetch.clone();
//!             async move { fetch.call_async(id).await }
//!         })
//!     };
//!
//!     let done = tracker.on_completed().wait_for_event();
//!     assert_eq!(load.call_async(7).await, "item-7");
//!
//!     // the first completion is the inner call, linked to its parent
//!     let first = done.await?;
//!     assert_eq!(first.key.operation(), "fetch");
//!     assert_eq!(first.stage.kind(), StageKind::Completed);
//!     assert!(first.parent_id().is_some_and(|p| p.ends_with(":load:0")));
//!
//!     set.shutdown().await;
//!     tracker.close();
//!     Ok(())
//! }
//! ```
mod core;
mod debounce;
mod error;
mod events;
mod invocation;
mod logger;
mod stack;
mod subscribers;

// ---- Public re-exports ----

pub use core::{
    AsResult, AsValue, Classify, Clock, DROPPED_BEFORE_COMPLETION, Instrumented,
    InvocationTracker, MAX_ID_LENGTH, MethodTracker, MonotonicClock, Settlement, Stringify,
    TrackOptions, Tracked, TrackedBy, TrackedFuture, TrackerBuilder, TrackerConfig, TrackerMarker,
};
pub use debounce::{Accumulator, DebounceOptions, Debounced, DebouncedCall, debounce};
pub use error::{ConfigError, DebounceError, NotifierError};
pub use events::{
    ChangeEvent, ChangeReason, EventNotifier, NotifierBuilder, NotifierConfig, Subscription,
    WaitForEvent,
};
pub use invocation::{Invocation, InvocationKey, Stage, StageKind, Tag, merge_tags};
pub use logger::{BoxError, LOG_TARGET, Logger, MAX_RENDERED_LEN, NoopLogger, TracingLogger, stringify};
pub use stack::{
    Context, ContextLocal, ContextLocalStack, InvocationStack, PlainStack, Scoped, StackKind,
    scope,
};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
