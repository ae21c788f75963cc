//! # InvocationTracker: instrumentation and lifecycle channels.
//!
//! The tracker hands out [`Tracked`] handles and publishes one record per
//! lifecycle step of every call made through them.
//!
//! ```text
//! tracker.track("load", f) ──► Tracked { f, [binding(tracker, "load", tags)] }
//!
//! tracked.call(args)
//!   ├─► on_invoked + on_started    Invocation { Started }
//!   ├─► f(args)
//!   └─► on_invoked + on_completed  Invocation { Completed { duration, result } }
//!       or on_invoked + on_errored Invocation { Errored { duration, error } }
//! ```
//!
//! ## Rules
//! - Keys are unique per tracker: `"{tracker_id}:{operation}:{index}"`, with one
//!   counter shared by all operations.
//! - The parent of a call is whatever the stack shows when it begins.
//! - `close` is idempotent; afterwards nothing is published and new `track`
//!   calls return pass-through handles.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tracing::Level;

use crate::core::builder::TrackerBuilder;
use crate::core::clock::Clock;
use crate::core::config::{TrackOptions, TrackerConfig};
use crate::core::methods::MethodTracker;
use crate::core::tracked::{Binding, Tracked};
use crate::events::EventNotifier;
use crate::invocation::{Invocation, InvocationKey, Stage, StageKind, merge_tags};
use crate::logger::Logger;
use crate::stack::InvocationStack;

static NEXT_MARKER: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a tracker instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrackerMarker(u64);

impl TrackerMarker {
    pub(crate) fn next() -> Self {
        Self(NEXT_MARKER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Values that may carry tracker instrumentation.
pub trait Instrumented {
    /// Trackers the value is bound to, outermost first.
    fn markers(&self) -> Vec<TrackerMarker>;
}

/// Answer of [`InvocationTracker::is_tracked`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackedBy {
    /// Bound to the asking tracker (possibly among others).
    This,
    /// Bound to other trackers only.
    Other,
}

/// The four lifecycle channels.
pub(crate) struct Channels {
    pub(crate) invoked: EventNotifier<Invocation>,
    pub(crate) started: EventNotifier<Invocation>,
    pub(crate) completed: EventNotifier<Invocation>,
    pub(crate) errored: EventNotifier<Invocation>,
}

impl Channels {
    pub(crate) fn new() -> Self {
        Self {
            invoked: EventNotifier::new(),
            started: EventNotifier::new(),
            completed: EventNotifier::new(),
            errored: EventNotifier::new(),
        }
    }

    fn for_kind(&self, kind: StageKind) -> &EventNotifier<Invocation> {
        match kind {
            StageKind::Started => &self.started,
            StageKind::Completed => &self.completed,
            StageKind::Errored => &self.errored,
        }
    }

    /// Someone receives records of `kind`.
    pub(crate) fn observed(&self, kind: StageKind) -> bool {
        self.invoked.is_active() || self.for_kind(kind).is_active()
    }

    pub(crate) fn any_active(&self) -> bool {
        self.invoked.is_active()
            || self.started.is_active()
            || self.completed.is_active()
            || self.errored.is_active()
    }

    /// `on_invoked` first, then the stage-specific channel.
    pub(crate) fn publish(&self, record: Invocation) {
        let specific = self.for_kind(record.stage.kind());
        self.invoked.notify(record.clone());
        specific.notify(record);
    }

    fn close(&self) {
        self.invoked.close();
        self.started.close();
        self.completed.close();
        self.errored.close();
    }
}

pub(crate) struct TrackerInner {
    pub(crate) id: Arc<str>,
    pub(crate) marker: TrackerMarker,
    pub(crate) cfg: TrackerConfig,
    pub(crate) stack: Arc<dyn InvocationStack>,
    pub(crate) logger: Arc<dyn Logger>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) channels: Channels,
    counter: AtomicU64,
    closed: AtomicBool,
}

impl TrackerInner {
    pub(crate) fn new(
        id: Arc<str>,
        cfg: TrackerConfig,
        stack: Arc<dyn InvocationStack>,
        logger: Arc<dyn Logger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            id,
            marker: TrackerMarker::next(),
            cfg,
            stack,
            logger,
            clock,
            channels: Channels::new(),
            counter: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    #[inline]
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn next_key(&self, operation: &Arc<str>) -> InvocationKey {
        let index = self.counter.fetch_add(1, Ordering::Relaxed);
        InvocationKey::new(Arc::clone(&self.id), Arc::clone(operation), index)
    }

    /// Runs `f` against the logger. A panicking logger counts as silent.
    pub(crate) fn with_logger<R: Default>(&self, f: impl FnOnce(&dyn Logger) -> R) -> R {
        panic::catch_unwind(AssertUnwindSafe(|| f(&*self.logger))).unwrap_or_default()
    }

    pub(crate) fn trace_enabled(&self) -> bool {
        self.with_logger(|logger| logger.enabled(Level::TRACE))
    }

    pub(crate) fn trace(&self, record: &Invocation) {
        if !self.trace_enabled() {
            return;
        }
        let message = match &record.stage {
            Stage::Started => format!(
                "invocation {} started (parent: {})",
                record.key,
                record.parent_id().unwrap_or("-")
            ),
            Stage::Completed { duration, .. } => {
                format!("invocation {} completed in {duration:?}", record.key)
            }
            Stage::Errored {
                duration, error, ..
            } => format!("invocation {} errored in {duration:?}: {error}", record.key),
        };
        self.with_logger(|logger| logger.trace(&message));
    }
}

/// Instruments functions and publishes their lifecycle.
///
/// Cloning yields another handle to the same tracker.
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use parking_lot::Mutex;
/// use callvisor::{InvocationTracker, StageKind};
///
/// let tracker = InvocationTracker::new();
/// let stages = Arc::new(Mutex::new(Vec::new()));
/// let sink = Arc::clone(&stages);
/// tracker.on_invoked().on_event(move |rec| sink.lock().push(rec.stage.kind()));
///
/// let add = tracker.track("add", |(a, b): (i32, i32)| a + b);
/// assert_eq!(add.call((2, 3)), 5);
///
/// assert_eq!(*stages.lock(), [StageKind::Started, StageKind::Completed]);
/// ```
#[derive(Clone)]
pub struct InvocationTracker {
    inner: Arc<TrackerInner>,
}

impl InvocationTracker {
    /// Tracker with default settings, tracing logger and monotonic clock.
    pub fn new() -> Self {
        TrackerBuilder::new(TrackerConfig::default()).assemble()
    }

    pub fn builder(cfg: TrackerConfig) -> TrackerBuilder {
        TrackerBuilder::new(cfg)
    }

    pub(crate) fn from_inner(inner: TrackerInner) -> Self {
        inner.with_logger(|logger| logger.debug(&format!("tracker {} created", inner.id)));
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.inner.cfg
    }

    /// Every lifecycle record.
    pub fn on_invoked(&self) -> &EventNotifier<Invocation> {
        &self.inner.channels.invoked
    }

    pub fn on_started(&self) -> &EventNotifier<Invocation> {
        &self.inner.channels.started
    }

    pub fn on_completed(&self) -> &EventNotifier<Invocation> {
        &self.inner.channels.completed
    }

    pub fn on_errored(&self) -> &EventNotifier<Invocation> {
        &self.inner.channels.errored
    }

    /// Instruments `f` under the operation name `operation`.
    pub fn track<F>(&self, operation: impl Into<Arc<str>>, f: F) -> Tracked<F> {
        self.track_with(operation, f, TrackOptions::default())
    }

    /// Like [`track`](Self::track), with per-operation tags.
    pub fn track_with<F>(
        &self,
        operation: impl Into<Arc<str>>,
        f: F,
        options: TrackOptions,
    ) -> Tracked<F> {
        if self.is_closed() {
            return Tracked::bare(f);
        }
        Tracked::bound(f, self.binding(operation.into(), &options))
    }

    /// Adds this tracker to an already tracked function.
    ///
    /// Returns `tracked` itself when it is already bound to this tracker, so
    /// tracking twice never doubles the records. Otherwise this tracker becomes
    /// the outermost binding.
    pub fn retrack<F>(&self, operation: impl Into<Arc<str>>, tracked: &Tracked<F>) -> Tracked<F> {
        if self.is_closed() || tracked.is_bound_to(&self.inner) {
            return tracked.clone();
        }
        tracked.wrapped(self.binding(operation.into(), &TrackOptions::default()))
    }

    fn binding(&self, operation: Arc<str>, options: &TrackOptions) -> Binding {
        let tags = merge_tags([self.inner.cfg.tags.as_slice(), options.tags.as_slice()]);
        Binding {
            tracker: Arc::clone(&self.inner),
            operation,
            tags,
        }
    }

    /// Starts instrumenting the methods of `owner`; see [`MethodTracker`].
    pub fn track_methods(&self, owner: impl Into<Arc<str>>) -> MethodTracker {
        MethodTracker::new(self.clone(), owner.into())
    }

    /// Whether `value` is instrumented, and by whom.
    pub fn is_tracked(&self, value: &dyn Instrumented) -> Option<TrackedBy> {
        let markers = value.markers();
        if markers.contains(&self.inner.marker) {
            Some(TrackedBy::This)
        } else if markers.is_empty() {
            None
        } else {
            Some(TrackedBy::Other)
        }
    }

    /// Number of keys assigned so far.
    pub fn invocation_count(&self) -> u64 {
        self.inner.counter.load(Ordering::Relaxed)
    }

    /// Closes the channels, the stack and the logger. Idempotent.
    ///
    /// Pending `wait_for_event` futures resolve to `NotifierError::Closed`.
    /// The logger is told last; its errors and panics are ignored.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let inner = &self.inner;
        inner.channels.close();
        let stack = Arc::clone(&inner.stack);
        let _ = panic::catch_unwind(AssertUnwindSafe(|| stack.close()));

        inner.with_logger(|logger| logger.debug(&format!("tracker {} closed", inner.id)));
        let _ = inner.with_logger(|logger| logger.close().is_ok());
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

impl Default for InvocationTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for InvocationTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationTracker")
            .field("id", &self.inner.id)
            .field("closed", &self.is_closed())
            .field("invocations", &self.invocation_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::{StepClock, collect};
    use crate::error::{ConfigError, NotifierError};
    use crate::invocation::Tag;
    use crate::logger::testing::MemoryLogger;
    use crate::stack::StackKind;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::time;

    fn tracker_with(stack: StackKind) -> InvocationTracker {
        InvocationTracker::builder(TrackerConfig {
            stack,
            ..TrackerConfig::default()
        })
        .with_clock(Arc::new(StepClock::new(Duration::from_millis(5))))
        .build()
        .expect("valid config")
    }

    #[test]
    fn test_sync_completion_records() {
        let tracker = tracker_with(StackKind::Plain);
        let all = collect(tracker.on_invoked());
        let completed = collect(tracker.on_completed());

        let add = tracker.track("add", |(a, b): (i32, i32)| a + b);
        assert_eq!(add.call((2, 3)), 5);

        let all = all.lock();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].stage, Stage::Started);
        assert_eq!(all[0].args.as_deref(), Some("(2, 3)"));
        assert_eq!(all[0].key.id(), format!("{}:add:0", tracker.id()));
        assert_eq!(
            all[1].stage,
            Stage::Completed {
                duration: Duration::from_millis(5),
                promise_like: false,
                result: Some("5".into()),
            }
        );
        assert_eq!(all[1].key, all[0].key);
        assert_eq!(completed.lock().len(), 1);
    }

    #[test]
    fn test_err_is_recorded_and_returned() {
        let tracker = tracker_with(StackKind::Plain);
        let errored = collect(tracker.on_errored());
        let completed = collect(tracker.on_completed());

        let parse = tracker.track("parse", |s: &str| s.parse::<u8>());
        let err = parse.try_call("x").unwrap_err();
        assert_eq!(err.to_string(), "invalid digit found in string");
        assert_eq!(parse.try_call("7"), Ok(7));

        let errored = errored.lock();
        assert_eq!(errored.len(), 1);
        match &errored[0].stage {
            Stage::Errored {
                promise_like,
                error,
                ..
            } => {
                assert!(!promise_like);
                assert_eq!(error.as_ref(), "invalid digit found in string");
            }
            other => panic!("unexpected stage {other:?}"),
        }
        assert_eq!(completed.lock().len(), 1);
    }

    #[test]
    fn test_panic_is_recorded_and_propagated() {
        let tracker = tracker_with(StackKind::Plain);
        let errored = collect(tracker.on_errored());

        let boom = tracker.track("boom", |_: ()| -> u8 { panic!("kaput") });
        let caught = panic::catch_unwind(AssertUnwindSafe(|| boom.call(())));
        assert!(caught.is_err());

        let errored = errored.lock();
        assert_eq!(errored.len(), 1);
        assert!(matches!(&errored[0].stage, Stage::Errored { error, .. } if error.as_ref() == "kaput"));
    }

    #[test]
    fn test_nested_sync_calls_link_parent() {
        let tracker = tracker_with(StackKind::Plain);
        let started = collect(tracker.on_started());

        let inner = tracker.track("inner", |x: u32| x + 1);
        let outer = {
            let inner = inner.clone();
            tracker.track("outer", move |x: u32| inner.call(x) * 2)
        };
        assert_eq!(outer.call(1), 4);
        assert_eq!(inner.call(0), 1);

        let started = started.lock();
        assert_eq!(started.len(), 3);
        assert_eq!(started[0].key.operation(), "outer");
        assert_eq!(started[0].parent_key, None);
        assert_eq!(started[1].key.operation(), "inner");
        assert_eq!(started[1].parent_key.as_ref(), Some(&started[0].key));
        assert_eq!(started[2].parent_key, None);
        assert_eq!(started[2].key.index(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_async_completion_is_promise_like() {
        let tracker = InvocationTracker::new();
        let completed = collect(tracker.on_completed());

        let slow = tracker.track("slow", |x: u64| async move {
            time::sleep(Duration::from_millis(50)).await;
            x * 10
        });
        assert_eq!(slow.call_async(4).await, 40);

        let completed = completed.lock();
        assert_eq!(
            completed[0].stage,
            Stage::Completed {
                duration: Duration::from_millis(50),
                promise_like: true,
                result: Some("40".into()),
            }
        );
    }

    #[tokio::test]
    async fn test_async_err_is_recorded() {
        let tracker = InvocationTracker::new();
        let errored = collect(tracker.on_errored());

        let fetch = tracker.track("fetch", |id: u32| async move {
            if id == 0 {
                Err(format!("no record {id}"))
            } else {
                Ok(id)
            }
        });
        assert_eq!(fetch.try_call_async(0).await, Err("no record 0".to_string()));

        let errored = errored.lock();
        assert_eq!(errored[0].stage.promise_like(), Some(true));
        assert!(matches!(&errored[0].stage, Stage::Errored { error, .. } if error.as_ref() == "no record 0"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_async_calls_keep_their_parent() {
        let tracker = InvocationTracker::new();
        let started = collect(tracker.on_started());

        let inner = tracker.track("inner", |x: u32| async move { x });
        let outer = tracker.track("outer", move |(x, delay): (u32, u64)| {
            let inner = inner.clone();
            async move {
                time::sleep(Duration::from_millis(delay)).await;
                inner.call_async(x).await
            }
        });

        let (a, b) = tokio::join!(outer.call_async((1, 30)), outer.call_async((2, 10)));
        assert_eq!((a, b), (1, 2));

        let started = started.lock();
        let outer_keys: Vec<_> = started
            .iter()
            .filter(|r| r.key.operation() == "outer")
            .map(|r| r.key.clone())
            .collect();
        let inner_recs: Vec<_> = started
            .iter()
            .filter(|r| r.key.operation() == "inner")
            .collect();
        assert_eq!(outer_keys.len(), 2);
        assert_eq!(inner_recs.len(), 2);
        assert!(started.iter().filter(|r| r.key.operation() == "outer").all(|r| r.parent_key.is_none()));

        // second outer call (shorter delay) starts its inner call first
        assert_eq!(inner_recs[0].parent_key.as_ref(), Some(&outer_keys[1]));
        assert_eq!(inner_recs[1].parent_key.as_ref(), Some(&outer_keys[0]));
        assert_eq!(inner_recs[0].args.as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_spawned_futures_keep_their_parent() {
        let tracker = InvocationTracker::new();
        let started = collect(tracker.on_started());

        let leaf = tracker.track("leaf", |_: ()| async {});
        let root = tracker.track("root", move |_: ()| {
            let leaf = leaf.clone();
            async move {
                tokio::task::yield_now().await;
                leaf.call_async(()).await
            }
        });

        let handles: Vec<_> = (0..4).map(|_| tokio::spawn(root.call_async(()))).collect();
        for handle in handles {
            handle.await.expect("task");
        }

        let started = started.lock();
        let roots: Vec<_> = started.iter().filter(|r| r.key.operation() == "root").collect();
        for leaf in started.iter().filter(|r| r.key.operation() == "leaf") {
            let parent = leaf.parent_key.as_ref().expect("leaf has a parent");
            assert!(roots.iter().any(|r| &r.key == parent));
        }
        let mut parents: Vec<_> = started
            .iter()
            .filter_map(|r| r.parent_key.as_ref().map(|k| k.id().to_string()))
            .collect();
        parents.sort();
        parents.dedup();
        assert_eq!(parents.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_future_is_recorded_as_error() {
        let tracker = InvocationTracker::new();
        let errored = collect(tracker.on_errored());

        let never = tracker.track("never", |_: ()| std::future::pending::<()>());
        let timed = time::timeout(Duration::from_millis(10), never.call_async(())).await;
        assert!(timed.is_err());

        let errored = errored.lock();
        assert_eq!(errored.len(), 1);
        assert_eq!(
            errored[0].stage,
            Stage::Errored {
                duration: Duration::from_millis(10),
                promise_like: true,
                error: "dropped before completion".into(),
            }
        );
    }

    #[test]
    fn test_retrack_is_idempotent_and_nests() {
        let first = tracker_with(StackKind::Plain);
        let second = tracker_with(StackKind::Plain);
        let first_events = collect(first.on_invoked());
        let second_events = collect(second.on_invoked());

        let f = first.track("double", |x: i32| x * 2);
        let again = first.retrack("double", &f);
        assert!(again.ptr_eq(&f));

        let both = second.retrack("outer_double", &f);
        assert!(!both.ptr_eq(&f));
        assert_eq!(both.operation(), Some("outer_double"));
        assert!(second.retrack("x", &both).ptr_eq(&both));

        assert_eq!(both.call(4), 8);
        assert_eq!(first_events.lock().len(), 2);
        assert_eq!(second_events.lock().len(), 2);

        assert_eq!(first.is_tracked(&both), Some(TrackedBy::This));
        assert_eq!(second.is_tracked(&f), Some(TrackedBy::Other));
        assert_eq!(second.is_tracked(&both), Some(TrackedBy::This));
    }

    #[test]
    fn test_is_tracked_on_untracked_handle() {
        let tracker = tracker_with(StackKind::Plain);
        tracker.close();
        let passthrough = tracker.track("noop", |x: u8| x);
        assert_eq!(tracker.is_tracked(&passthrough), None);
    }

    #[test]
    fn test_tags_are_merged_sorted_and_fixed() {
        let tracker = InvocationTracker::builder(
            TrackerConfig::default()
                .with_tag("team", "core")
                .with_tag("env", "prod"),
        )
        .build()
        .expect("valid config");
        let all = collect(tracker.on_invoked());

        let op = tracker.track_with(
            "op",
            |_: ()| (),
            TrackOptions::new().with_tag("env", "prod").with_tag("kind", "read"),
        );
        op.call(());

        let all = all.lock();
        let expected = [
            Tag::new("env", "prod"),
            Tag::new("kind", "read"),
            Tag::new("team", "core"),
        ];
        assert_eq!(all[0].tags.as_ref(), &expected);
        assert_eq!(all[1].tags.as_ref(), &expected);
        assert_eq!(op.tags(), &expected);
    }

    static RENDERED: AtomicUsize = AtomicUsize::new(0);

    fn counting_stringify(value: &dyn fmt::Debug) -> String {
        RENDERED.fetch_add(1, Ordering::SeqCst);
        format!("{value:?}")
    }

    #[test]
    fn test_nothing_is_rendered_without_observers() {
        let tracker = InvocationTracker::builder(TrackerConfig {
            stringify: counting_stringify,
            ..TrackerConfig::default()
        })
        .with_logger(Arc::new(crate::logger::NoopLogger))
        .build()
        .expect("valid config");

        let echo = tracker.track("echo", |s: String| s);
        echo.call("quiet".to_string());
        assert_eq!(RENDERED.load(Ordering::SeqCst), 0);

        let _all = collect(tracker.on_invoked());
        echo.call("loud".to_string());
        assert_eq!(RENDERED.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_capture_switches() {
        let tracker = InvocationTracker::builder(TrackerConfig {
            capture_args: false,
            capture_results: false,
            ..TrackerConfig::default()
        })
        .build()
        .expect("valid config");
        let all = collect(tracker.on_invoked());

        tracker.track("id", |x: u8| x).call(1);
        let all = all.lock();
        assert_eq!(all[0].args, None);
        assert!(matches!(all[1].stage, Stage::Completed { result: None, .. }));
    }

    #[test]
    fn test_keys_share_one_counter() {
        let tracker = tracker_with(StackKind::Plain);
        let started = collect(tracker.on_started());
        let a = tracker.track("a", |_: ()| ());
        let b = tracker.track("b", |_: ()| ());
        a.call(());
        b.call(());
        a.call(());

        let ids: Vec<String> = started.lock().iter().map(|r| r.key.id().to_string()).collect();
        let id = tracker.id();
        assert_eq!(ids, [format!("{id}:a:0"), format!("{id}:b:1"), format!("{id}:a:2")]);
        assert_eq!(tracker.invocation_count(), 3);
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_stops_tracking() {
        let logger = Arc::new(MemoryLogger {
            fail_close: true,
            ..MemoryLogger::default()
        });
        let tracker = InvocationTracker::builder(TrackerConfig::default())
            .with_logger(logger.clone())
            .build()
            .expect("valid config");
        let all = collect(tracker.on_invoked());
        let waiter = tracker.on_completed().wait_for_event();
        let op = tracker.track("op", |x: u8| x);

        tracker.close();
        tracker.close();
        assert!(tracker.is_closed());
        assert_eq!(waiter.await.unwrap_err(), NotifierError::Closed);
        assert_eq!(logger.closes.load(Ordering::SeqCst), 1);

        assert_eq!(op.call(1), 1);
        let late = tracker.track("late", |x: u8| x);
        assert_eq!(late.call(2), 2);
        assert_eq!(tracker.is_tracked(&late), None);
        assert!(all.lock().is_empty());
        assert_eq!(tracker.invocation_count(), 0);
    }

    #[test]
    fn test_panicking_logger_close_is_swallowed() {
        let logger = Arc::new(MemoryLogger {
            panic_on_close: true,
            ..MemoryLogger::default()
        });
        let tracker = InvocationTracker::builder(TrackerConfig::default())
            .with_logger(logger.clone())
            .build()
            .expect("valid config");
        tracker.close();
        assert_eq!(logger.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panicking_logger_does_not_interrupt_close() {
        let logger = Arc::new(MemoryLogger {
            panic_on_log: true,
            ..MemoryLogger::default()
        });
        let tracker = InvocationTracker::builder(TrackerConfig::default())
            .with_logger(logger.clone())
            .build()
            .expect("valid config");
        let waiter = tracker.on_completed().wait_for_event();
        assert!(tracker.on_completed().is_active());

        tracker.close();
        assert!(tracker.is_closed());
        assert!(!tracker.on_completed().is_active());
        assert_eq!(waiter.await.unwrap_err(), NotifierError::Closed);
        assert_eq!(logger.closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panicking_logger_keeps_stack_balanced() {
        let logger = Arc::new(MemoryLogger {
            panic_on_log: true,
            ..MemoryLogger::default()
        });
        let tracker = InvocationTracker::builder(TrackerConfig {
            stack: StackKind::Plain,
            ..TrackerConfig::default()
        })
        .with_logger(logger)
        .build()
        .expect("valid config");
        let started = collect(tracker.on_started());
        let op = tracker.track("op", |x: u8| x);

        assert_eq!(op.call(1), 1);
        assert_eq!(op.call(2), 2);

        let parents: Vec<Option<String>> = started
            .lock()
            .iter()
            .map(|r| r.parent_id().map(str::to_string))
            .collect();
        assert_eq!(parents, [None, None]);
    }

    #[test]
    fn test_dropped_trackers_release_context_slots() {
        let before = crate::stack::Context::current().len();
        for i in 0..200u8 {
            let tracker = InvocationTracker::new();
            assert_eq!(tracker.track("op", |x: u8| x).call(i), i);
        }
        assert_eq!(crate::stack::Context::current().len(), before);
    }

    #[test]
    fn test_lifecycle_is_traced_through_logger() {
        let logger = Arc::new(MemoryLogger::default());
        let tracker = InvocationTracker::builder(TrackerConfig::default())
            .with_logger(logger.clone())
            .build()
            .expect("valid config");
        tracker.track("op", |x: u8| x).call(1);

        let lines = logger.lines.lock();
        let traces: Vec<&str> = lines
            .iter()
            .filter(|(level, _)| *level == Level::TRACE)
            .map(|(_, m)| m.as_str())
            .collect();
        assert_eq!(traces.len(), 2);
        assert!(traces[0].contains("started (parent: -)"));
        assert!(traces[1].contains("completed in"));
    }

    #[test]
    fn test_invalid_id_length_is_rejected() {
        let err = InvocationTracker::builder(TrackerConfig {
            id_length: 0,
            ..TrackerConfig::default()
        })
        .build()
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidIdLength { length: 0, .. }));

        let tracker = InvocationTracker::builder(TrackerConfig {
            id_length: 20,
            ..TrackerConfig::default()
        })
        .build()
        .expect("valid config");
        assert_eq!(tracker.id().len(), 20);
        assert!(tracker.id().chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
