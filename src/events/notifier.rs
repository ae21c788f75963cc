//! # EventNotifier: lazy fan-out with a shared one-shot waiter.
//!
//! An [`EventNotifier`] keeps an ordered list of listeners, a list of error
//! handlers and at most one pending waiter. `notify` delivers one value to all
//! of them; nothing is computed when nobody observes.
//!
//! ## Rules
//! - Listeners run in registration order; a failing or panicking listener never
//!   stops the others. Its error goes to the most recently registered error
//!   handler still subscribed (and is dropped when there is none).
//! - Listeners added during a pass are not called by that pass; listeners closed
//!   during a pass are skipped if the pass has not reached them yet.
//! - All `wait_for_event` calls made before the next delivery share one future.
//! - `close` resets the notifier: listeners are discarded, the waiter resolves to
//!   [`NotifierError::Closed`], and the notifier stays usable.
//! - Async listeners are spawned on the current Tokio runtime.

use std::fmt::{self, Display};
use std::future::Future;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::future::{self, BoxFuture, Shared};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::oneshot;

use crate::debounce::{DebounceOptions, Debounced, debounce};
use crate::error::{NotifierError, panic_message};
use crate::events::builder::{ChangeHook, NotifierBuilder, NotifierConfig};
use crate::events::subscription::{Detach, Slot, Subscription};
use crate::events::{ChangeEvent, ChangeReason};

type SyncListener<T> = dyn Fn(&T) -> Result<(), NotifierError> + Send + Sync;
type AsyncListener<T> = dyn Fn(T) -> BoxFuture<'static, Result<(), NotifierError>> + Send + Sync;
type ErrorHandler = dyn Fn(&NotifierError) + Send + Sync;

enum Callback<T> {
    Sync(Arc<SyncListener<T>>),
    Async(Arc<AsyncListener<T>>),
}

impl<T> Clone for Callback<T> {
    fn clone(&self) -> Self {
        match self {
            Callback::Sync(f) => Callback::Sync(Arc::clone(f)),
            Callback::Async(f) => Callback::Async(Arc::clone(f)),
        }
    }
}

struct Listener<T> {
    id: u64,
    active: Arc<AtomicBool>,
    callback: Callback<T>,
}

impl<T> Clone for Listener<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            active: Arc::clone(&self.active),
            callback: self.callback.clone(),
        }
    }
}

struct Handler {
    id: u64,
    active: Arc<AtomicBool>,
    handler: Arc<ErrorHandler>,
}

/// Value of one notification, possibly not computed yet.
pub(crate) enum Payload<T> {
    Ready(T),
    Lazy(Box<dyn FnOnce() -> T + Send>),
}

impl<T> Payload<T> {
    fn resolve(self) -> T {
        match self {
            Payload::Ready(value) => value,
            Payload::Lazy(thunk) => thunk(),
        }
    }
}

/// Future returned by [`EventNotifier::wait_for_event`].
///
/// Resolves with the next delivered value, or [`NotifierError::Closed`].
pub struct WaitForEvent<T> {
    inner: Shared<BoxFuture<'static, Result<T, NotifierError>>>,
}

impl<T: Clone> WaitForEvent<T> {
    /// Returns `true` if both handles await the same delivery.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.inner.ptr_eq(&other.inner)
    }
}

impl<T: Clone> Clone for WaitForEvent<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone> Future for WaitForEvent<T> {
    type Output = Result<T, NotifierError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.inner).poll(cx)
    }
}

struct Waiter<T> {
    tx: oneshot::Sender<Result<T, NotifierError>>,
    fut: WaitForEvent<T>,
}

struct State<T> {
    listeners: Vec<Listener<T>>,
    handlers: Vec<Handler>,
    waiter: Option<Waiter<T>>,
}

impl<T> State<T> {
    fn is_active(&self) -> bool {
        !self.listeners.is_empty() || self.waiter.is_some()
    }
}

struct Inner<T> {
    state: Mutex<State<T>>,
    next_id: AtomicU64,
    on_change: Option<ChangeHook>,
    debounced: Option<Debounced<Payload<T>, ()>>,
}

impl<T> Inner<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// One notification pass.
    fn deliver(self: &Arc<Self>, payload: Payload<T>) {
        let listeners = {
            let st = self.state.lock();
            if !st.is_active() {
                return;
            }
            st.listeners.clone()
        };

        // a panicking thunk leaves the waiter pending
        let value = payload.resolve();
        let waiter = self.state.lock().waiter.take();
        for listener in &listeners {
            if !listener.active.load(Ordering::Acquire) {
                continue;
            }
            match &listener.callback {
                Callback::Sync(f) => {
                    match panic::catch_unwind(AssertUnwindSafe(|| f(&value))) {
                        Ok(Ok(())) => {}
                        Ok(Err(err)) => self.route_error(err),
                        Err(p) => self.route_error(NotifierError::ListenerPanicked {
                            message: panic_message(p.as_ref()),
                        }),
                    }
                }
                Callback::Async(f) => self.spawn_listener(f, value.clone()),
            }
        }

        if let Some(waiter) = waiter {
            let _ = waiter.tx.send(Ok(value));
            self.changed(ChangeReason::WaiterResolved);
        }
    }

    fn spawn_listener(self: &Arc<Self>, f: &Arc<AsyncListener<T>>, value: T) {
        let Ok(handle) = Handle::try_current() else {
            self.route_error(NotifierError::ListenerFailed {
                message: "async listener requires a tokio runtime".to_string(),
            });
            return;
        };
        let fut = match panic::catch_unwind(AssertUnwindSafe(|| f(value))) {
            Ok(fut) => fut,
            Err(p) => {
                self.route_error(NotifierError::ListenerPanicked {
                    message: panic_message(p.as_ref()),
                });
                return;
            }
        };
        let me = Arc::clone(self);
        handle.spawn(async move {
            match AssertUnwindSafe(fut).catch_unwind().await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => me.route_error(err),
                Err(p) => me.route_error(NotifierError::ListenerPanicked {
                    message: panic_message(p.as_ref()),
                }),
            }
        });
    }

    /// Hands a listener failure to the most recent active error handler.
    fn route_error(&self, err: NotifierError) {
        let handler = {
            let st = self.state.lock();
            st.handlers
                .iter()
                .rev()
                .find(|h| h.active.load(Ordering::Acquire))
                .map(|h| Arc::clone(&h.handler))
        };
        match handler {
            Some(handler) => {
                let _ = panic::catch_unwind(AssertUnwindSafe(|| handler(&err)));
            }
            None => tracing::debug!(error = %err, label = err.as_label(), "listener error dropped"),
        }
    }

    fn changed(&self, reason: ChangeReason) {
        let Some(hook) = &self.on_change else {
            return;
        };
        let active = self.state.lock().is_active();
        let _ = panic::catch_unwind(AssertUnwindSafe(|| hook(ChangeEvent { reason, active })));
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

impl<T> Detach for Inner<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn detach(&self, id: u64, slot: Slot) {
        let removed = {
            let mut st = self.state.lock();
            match slot {
                Slot::Listener => {
                    let before = st.listeners.len();
                    st.listeners.retain(|l| l.id != id);
                    st.listeners.len() != before
                }
                Slot::ErrorHandler => {
                    st.handlers.retain(|h| h.id != id);
                    false
                }
            }
        };
        if removed {
            self.changed(ChangeReason::ListenerRemoved);
        }
    }
}

/// Connection from a source notifier to one derived with [`EventNotifier::map`].
///
/// Owned by the derived notifier's change hook.
struct MapLink<T, U> {
    source: Weak<Inner<T>>,
    target: OnceLock<Weak<Inner<U>>>,
    map: Arc<dyn Fn(&T) -> U + Send + Sync>,
    open: Arc<AtomicBool>,
    feed: Mutex<Option<Subscription>>,
}

impl<T, U> MapLink<T, U>
where
    T: Clone + Send + Sync + 'static,
    U: Clone + Send + Sync + 'static,
{
    /// Attaches the feed while the derived notifier is observed, detaches it otherwise.
    fn sync(&self) {
        let mut feed = self.feed.lock();
        let target = self.target.get().cloned();
        let observed = self.open.load(Ordering::Acquire)
            && target
                .as_ref()
                .and_then(Weak::upgrade)
                .is_some_and(|t| t.state.lock().is_active());

        if !observed {
            if let Some(sub) = feed.take() {
                sub.close();
            }
            return;
        }
        if feed.is_some() {
            return;
        }
        let (Some(source), Some(target)) = (self.source.upgrade(), target) else {
            return;
        };
        let map = Arc::clone(&self.map);
        let source = EventNotifier { inner: source };
        *feed = Some(source.on_event(move |value| {
            if let Some(inner) = target.upgrade() {
                EventNotifier { inner }.notify(map(value));
            }
        }));
    }
}

impl<T, U> Detach for MapLink<T, U>
where
    T: Clone + Send + Sync + 'static,
    U: Clone + Send + Sync + 'static,
{
    fn detach(&self, _id: u64, _slot: Slot) {
        self.sync();
    }
}

impl<T, U> Drop for MapLink<T, U> {
    fn drop(&mut self) {
        if let Some(sub) = self.feed.get_mut().take() {
            sub.close();
        }
    }
}

/// Publish/subscribe channel for values of type `T`.
///
/// Cloning yields another handle to the same notifier.
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use parking_lot::Mutex;
/// use callvisor::EventNotifier;
///
/// let notifier = EventNotifier::<String>::new();
/// let seen = Arc::new(Mutex::new(Vec::new()));
///
/// // No observers yet: the thunk is never evaluated.
/// notifier.notify_with(|| unreachable!());
///
/// let sink = Arc::clone(&seen);
/// let sub = notifier.on_event(move |v: &String| sink.lock().push(v.clone()));
/// notifier.notify_with(|| "ready".to_string());
/// sub.close();
/// notifier.notify("ignored".to_string());
///
/// assert_eq!(*seen.lock(), ["ready"]);
/// ```
pub struct EventNotifier<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for EventNotifier<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> EventNotifier<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates a notifier without debounce or change hook.
    pub fn new() -> Self {
        Self::from_parts(NotifierConfig::default(), None)
    }

    pub fn builder() -> NotifierBuilder<T> {
        NotifierBuilder::new(NotifierConfig::default())
    }

    pub(crate) fn from_parts(cfg: NotifierConfig, on_change: Option<ChangeHook>) -> Self {
        let inner = Arc::new_cyclic(|weak: &Weak<Inner<T>>| {
            let debounced = cfg.debounce_delay().map(|delay| {
                let weak = weak.clone();
                debounce(
                    move |payload: Payload<T>| {
                        if let Some(inner) = weak.upgrade() {
                            inner.deliver(payload);
                        }
                        future::ready(())
                    },
                    DebounceOptions::new(delay),
                )
            });
            Inner {
                state: Mutex::new(State {
                    listeners: Vec::new(),
                    handlers: Vec::new(),
                    waiter: None,
                }),
                next_id: AtomicU64::new(0),
                on_change,
                debounced,
            }
        });
        Self { inner }
    }

    /// Registers a listener that cannot fail (panics are still caught).
    pub fn on_event<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.register(Callback::Sync(Arc::new(move |value: &T| {
            listener(value);
            Ok(())
        })))
    }

    /// Registers a fallible listener; errors go to the error handler.
    pub fn try_on_event<F, E>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) -> Result<(), E> + Send + Sync + 'static,
        E: Display,
    {
        self.register(Callback::Sync(Arc::new(move |value: &T| {
            listener(value).map_err(|e| NotifierError::ListenerFailed {
                message: e.to_string(),
            })
        })))
    }

    /// Registers an async listener. Each delivery spawns the returned future;
    /// the pass does not wait for it.
    pub fn on_event_async<F, Fut, E>(&self, listener: F) -> Subscription
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Display,
    {
        self.register(Callback::Async(Arc::new(move |value: T| {
            let fut = listener(value);
            async move {
                fut.await.map_err(|e| NotifierError::ListenerFailed {
                    message: e.to_string(),
                })
            }
            .boxed()
        })))
    }

    /// Registers an error handler. Only the most recent active handler is called.
    pub fn on_error<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&NotifierError) + Send + Sync + 'static,
    {
        let id = self.inner.next_id();
        let active = Arc::new(AtomicBool::new(true));
        self.inner.state.lock().handlers.push(Handler {
            id,
            active: Arc::clone(&active),
            handler: Arc::new(handler),
        });
        Subscription::new(id, Slot::ErrorHandler, active, self.owner())
    }

    fn register(&self, callback: Callback<T>) -> Subscription {
        let id = self.inner.next_id();
        let active = Arc::new(AtomicBool::new(true));
        self.inner.state.lock().listeners.push(Listener {
            id,
            active: Arc::clone(&active),
            callback,
        });
        self.inner.changed(ChangeReason::ListenerAdded);
        Subscription::new(id, Slot::Listener, active, self.owner())
    }

    fn owner(&self) -> Weak<dyn Detach> {
        let weak: Weak<Inner<T>> = Arc::downgrade(&self.inner);
        weak
    }

    /// Delivers `value` to all observers.
    pub fn notify(&self, value: T) {
        self.dispatch(Payload::Ready(value));
    }

    /// Delivers the value computed by `thunk`.
    ///
    /// The thunk runs at most once, and only if at least one listener or a
    /// waiter exists at delivery time.
    pub fn notify_with<F>(&self, thunk: F)
    where
        F: FnOnce() -> T + Send + 'static,
    {
        self.dispatch(Payload::Lazy(Box::new(thunk)));
    }

    fn dispatch(&self, payload: Payload<T>) {
        match &self.inner.debounced {
            Some(debounced) => {
                let _ = debounced.call(payload);
            }
            None => self.inner.deliver(payload),
        }
    }

    /// Returns a future resolving with the next delivered value.
    ///
    /// Repeated calls before that delivery return the same future.
    pub fn wait_for_event(&self) -> WaitForEvent<T> {
        let fut = {
            let mut st = self.inner.state.lock();
            if let Some(waiter) = &st.waiter {
                return waiter.fut.clone();
            }
            let (tx, rx) = oneshot::channel();
            let fut = WaitForEvent {
                inner: async move { rx.await.unwrap_or(Err(NotifierError::Closed)) }
                    .boxed()
                    .shared(),
            };
            st.waiter = Some(Waiter {
                tx,
                fut: fut.clone(),
            });
            fut
        };
        self.inner.changed(ChangeReason::WaiterAdded);
        fut
    }

    /// Resets the notifier.
    ///
    /// Listeners are discarded, a pending waiter resolves to
    /// [`NotifierError::Closed`] and a pending debounced notification is dropped.
    /// Error handlers stay registered. The notifier can be used again afterwards.
    pub fn close(&self) {
        if let Some(debounced) = &self.inner.debounced {
            debounced.cancel(true);
        }
        let (listeners, waiter) = {
            let mut st = self.inner.state.lock();
            (mem::take(&mut st.listeners), st.waiter.take())
        };
        for listener in &listeners {
            listener.active.store(false, Ordering::Release);
        }
        if let Some(waiter) = waiter {
            let _ = waiter.tx.send(Err(NotifierError::Closed));
        }
        self.inner.changed(ChangeReason::Closed);
    }

    /// `true` while at least one listener or a pending waiter exists.
    pub fn is_active(&self) -> bool {
        self.inner.state.lock().is_active()
    }

    pub fn listener_count(&self) -> usize {
        self.inner.state.lock().listeners.len()
    }

    /// Creates a notifier fed with `f(value)` for every delivery on this one.
    ///
    /// The derived notifier listens on this one only while it has observers
    /// itself, so neither `f` nor a lazy payload of this notifier runs for an
    /// unobserved derived notifier. Closing the returned subscription
    /// disconnects the two for good.
    pub fn map<U, F>(&self, f: F) -> (EventNotifier<U>, Subscription)
    where
        U: Clone + Send + Sync + 'static,
        F: Fn(&T) -> U + Send + Sync + 'static,
    {
        let open = Arc::new(AtomicBool::new(true));
        let link = Arc::new(MapLink {
            source: Arc::downgrade(&self.inner),
            target: OnceLock::new(),
            map: Arc::new(f),
            open: Arc::clone(&open),
            feed: Mutex::new(None),
        });

        let hook_link = Arc::clone(&link);
        let derived = EventNotifier::<U>::builder()
            .on_change(move |_| hook_link.sync())
            .build();
        let _ = link.target.set(Arc::downgrade(&derived.inner));

        let weak: Weak<MapLink<T, U>> = Arc::downgrade(&link);
        let owner: Weak<dyn Detach> = weak;
        (derived, Subscription::new(0, Slot::Listener, open, owner))
    }
}

impl<T> Default for EventNotifier<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for EventNotifier<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let st = self.inner.state.lock();
        f.debug_struct("EventNotifier")
            .field("listeners", &st.listeners.len())
            .field("error_handlers", &st.handlers.len())
            .field("waiting", &st.waiter.is_some())
            .field("debounced", &self.inner.debounced.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::time;

    fn log() -> Arc<Mutex<Vec<String>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    #[test]
    fn test_lazy_payload_skipped_without_observers() {
        let n = EventNotifier::<u32>::new();
        let evaluated = Arc::new(AtomicUsize::new(0));

        let e = Arc::clone(&evaluated);
        n.notify_with(move || {
            e.fetch_add(1, Ordering::SeqCst);
            1
        });
        assert_eq!(evaluated.load(Ordering::SeqCst), 0);

        let seen = log();
        let s = Arc::clone(&seen);
        let _sub = n.on_event(move |v| s.lock().push(v.to_string()));
        let e = Arc::clone(&evaluated);
        n.notify_with(move || {
            e.fetch_add(1, Ordering::SeqCst);
            7
        });
        assert_eq!(evaluated.load(Ordering::SeqCst), 1);
        assert_eq!(*seen.lock(), ["7"]);
    }

    #[test]
    fn test_failing_listener_does_not_stop_others() {
        let n = EventNotifier::<u32>::new();
        let seen = log();
        let errors = log();

        let s1 = Arc::clone(&seen);
        n.on_event(move |v| s1.lock().push(format!("l1:{v}")));
        n.try_on_event(|_| Err::<(), _>("l2 failed"));
        let s3 = Arc::clone(&seen);
        n.on_event(move |v| s3.lock().push(format!("l3:{v}")));
        let e = Arc::clone(&errors);
        n.on_error(move |err| e.lock().push(err.to_string()));

        n.notify(4);
        assert_eq!(*seen.lock(), ["l1:4", "l3:4"]);
        assert_eq!(*errors.lock(), ["listener failed: l2 failed"]);
    }

    #[test]
    fn test_panics_go_to_latest_error_handler() {
        let n = EventNotifier::<u32>::new();
        let first = log();
        let latest = log();
        let after = Arc::new(AtomicUsize::new(0));

        let f = Arc::clone(&first);
        n.on_error(move |e| f.lock().push(e.as_label().to_string()));
        let l = Arc::clone(&latest);
        let latest_sub = n.on_error(move |e| l.lock().push(e.as_label().to_string()));
        n.on_event(|_| panic!("listener exploded"));
        let a = Arc::clone(&after);
        n.on_event(move |_| {
            a.fetch_add(1, Ordering::SeqCst);
        });

        n.notify(1);
        assert!(first.lock().is_empty());
        assert_eq!(*latest.lock(), ["listener_panicked"]);
        assert_eq!(after.load(Ordering::SeqCst), 1);

        latest_sub.close();
        n.notify(2);
        assert_eq!(*first.lock(), ["listener_panicked"]);
    }

    #[test]
    fn test_panicking_error_handler_is_ignored() {
        let n = EventNotifier::<u32>::new();
        let delivered = Arc::new(AtomicUsize::new(0));
        n.on_error(|_| panic!("handler exploded"));
        n.try_on_event(|_| Err::<(), _>("nope"));
        let d = Arc::clone(&delivered);
        n.on_event(move |_| {
            d.fetch_add(1, Ordering::SeqCst);
        });

        n.notify(1);
        assert_eq!(delivered.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_changes_during_a_pass() {
        let n = EventNotifier::<u32>::new();
        let seen = log();
        let second: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let (n1, s1, sec) = (n.clone(), Arc::clone(&seen), Arc::clone(&second));
        n.on_event(move |v| {
            s1.lock().push(format!("first:{v}"));
            if let Some(sub) = sec.lock().take() {
                sub.close();
            }
            let s = Arc::clone(&s1);
            n1.on_event(move |v| s.lock().push(format!("added:{v}")));
        });
        let s2 = Arc::clone(&seen);
        *second.lock() = Some(n.on_event(move |v| s2.lock().push(format!("second:{v}"))));

        n.notify(1);
        assert_eq!(*seen.lock(), ["first:1"]);

        n.notify(2);
        assert_eq!(*seen.lock(), ["first:1", "first:2", "added:2"]);
    }

    #[tokio::test]
    async fn test_wait_for_event_is_shared_until_resolved() {
        let n = EventNotifier::<u32>::new();
        let a = n.wait_for_event();
        let b = n.wait_for_event();
        assert!(a.ptr_eq(&b));
        assert!(n.is_active());

        n.notify(9);
        assert_eq!(a.clone().await, Ok(9));
        assert_eq!(b.await, Ok(9));
        assert!(!n.is_active());

        let c = n.wait_for_event();
        assert!(!c.ptr_eq(&a));
        n.notify(10);
        assert_eq!(c.await, Ok(10));
    }

    #[tokio::test]
    async fn test_close_rejects_waiter_and_resets() {
        let n = EventNotifier::<u32>::new();
        let seen = log();
        let s = Arc::clone(&seen);
        let sub = n.on_event(move |v| s.lock().push(v.to_string()));
        let waiter = n.wait_for_event();

        n.close();
        assert_eq!(waiter.await, Err(NotifierError::Closed));
        assert!(sub.is_closed());
        assert_eq!(n.listener_count(), 0);
        n.notify(1);
        assert!(seen.lock().is_empty());

        let s = Arc::clone(&seen);
        n.on_event(move |v| s.lock().push(v.to_string()));
        n.notify(2);
        assert_eq!(*seen.lock(), ["2"]);
    }

    #[tokio::test]
    async fn test_change_hook_reports_each_change() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let e = Arc::clone(&events);
        let n = EventNotifier::<u32>::builder()
            .on_change(move |ev| e.lock().push((ev.reason, ev.active)))
            .build();

        let sub = n.on_event(|_| {});
        let waiter = n.wait_for_event();
        n.notify(1);
        assert_eq!(waiter.await, Ok(1));
        sub.close();
        sub.close();
        n.close();

        assert_eq!(
            *events.lock(),
            [
                (ChangeReason::ListenerAdded, true),
                (ChangeReason::WaiterAdded, true),
                (ChangeReason::WaiterResolved, true),
                (ChangeReason::ListenerRemoved, false),
                (ChangeReason::Closed, false),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounced_burst_delivers_last_value() {
        let n = EventNotifier::<u32>::builder()
            .debounce(Duration::from_millis(20))
            .build();
        let seen = log();
        let s = Arc::clone(&seen);
        n.on_event(move |v| s.lock().push(v.to_string()));
        let waiter = n.wait_for_event();

        n.notify(1);
        n.notify(2);
        n.notify(3);
        assert!(seen.lock().is_empty());

        assert_eq!(waiter.await, Ok(3));
        assert_eq!(*seen.lock(), ["3"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_drops_pending_debounced_notification() {
        let n = EventNotifier::<u32>::builder()
            .debounce(Duration::from_millis(20))
            .build();
        let waiter = n.wait_for_event();
        n.notify(1);
        n.close();
        assert_eq!(waiter.await, Err(NotifierError::Closed));

        let delivered = Arc::new(AtomicUsize::new(0));
        let d = Arc::clone(&delivered);
        n.on_event(move |_| {
            d.fetch_add(1, Ordering::SeqCst);
        });
        time::sleep(Duration::from_millis(100)).await;
        assert_eq!(delivered.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_async_listener_error_is_routed() {
        let n = EventNotifier::<u32>::new();
        let (tx, rx) = oneshot::channel::<String>();
        let tx = Mutex::new(Some(tx));
        n.on_error(move |e| {
            if let Some(tx) = tx.lock().take() {
                let _ = tx.send(e.to_string());
            }
        });
        n.on_event_async(|v: u32| async move {
            if v > 1 {
                Err(format!("too big: {v}"))
            } else {
                Ok(())
            }
        });

        n.notify(5);
        let msg = time::timeout(Duration::from_secs(1), rx)
            .await
            .expect("error routed")
            .expect("sender kept");
        assert_eq!(msg, "listener failed: too big: 5");
    }

    #[tokio::test]
    async fn test_panicking_thunk_keeps_waiter_pending() {
        let n = EventNotifier::<u32>::new();
        let waiter = n.wait_for_event();

        let n1 = n.clone();
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            n1.notify_with(|| panic!("payload exploded"));
        }));
        assert!(result.is_err());
        assert!(n.is_active());

        n.notify(3);
        assert_eq!(waiter.await, Ok(3));
    }

    #[test]
    fn test_map_attaches_only_while_derived_is_observed() {
        let n = EventNotifier::<u32>::new();
        let mapped = Arc::new(AtomicUsize::new(0));
        let m = Arc::clone(&mapped);
        let (doubled, feed) = n.map(move |v| {
            m.fetch_add(1, Ordering::SeqCst);
            v * 2
        });
        assert!(!n.is_active());

        let evaluated = Arc::new(AtomicUsize::new(0));
        let e = Arc::clone(&evaluated);
        n.notify_with(move || {
            e.fetch_add(1, Ordering::SeqCst);
            1
        });
        assert_eq!(evaluated.load(Ordering::SeqCst), 0);

        let seen = log();
        let s = Arc::clone(&seen);
        let sub = doubled.on_event(move |v: &u32| s.lock().push(v.to_string()));
        assert_eq!(n.listener_count(), 1);
        n.notify(4);

        sub.close();
        assert!(!n.is_active());
        n.notify(5);
        assert_eq!(*seen.lock(), ["8"]);
        assert_eq!(mapped.load(Ordering::SeqCst), 1);

        let _again = doubled.on_event(|_| {});
        assert_eq!(n.listener_count(), 1);
        feed.close();
        assert!(!n.is_active());
        assert!(feed.is_closed());
    }

    #[test]
    fn test_map_feeds_derived_notifier() {
        let n = EventNotifier::<u32>::new();
        let (doubled, feed) = n.map(|v| v * 2);
        let seen = log();
        let s = Arc::clone(&seen);
        doubled.on_event(move |v: &u32| s.lock().push(v.to_string()));

        n.notify(21);
        feed.close();
        n.notify(1);
        assert_eq!(*seen.lock(), ["42"]);
    }
}
