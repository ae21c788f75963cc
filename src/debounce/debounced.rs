//! # Debounced function.
//!
//! [`Debounced`] wraps an async function so that rapid repeated calls collapse
//! into one delayed execution. Every call returns a [`DebouncedCall`]; all calls
//! collapsed into the same period share the same underlying future and settle
//! together.
//!
//! ## Period lifecycle
//! ```text
//! idle ──call──► pending(args, timer) ──call──► pending(args', timer reset)
//!                     │                               │
//!                     ├── timer fires ───────────────►├──► execute(args) ──► idle
//!                     ├── flush() ───────────────────►┘
//!                     └── cancel(silent) ─────────────────► idle (callers rejected / left pending)
//!
//! leading = true:
//! idle ──call──► execute now ──► absorbing(timer) ──call──► absorbing(timer reset)
//!                                     └── timer fires ──► idle (or trailing run of folded args)
//! ```
//!
//! ## Rules
//! - The wrapped function is never called while the internal lock is held.
//! - A caller's future settles exactly once, except after `cancel(true)` where it
//!   stays pending forever.
//! - Each execution runs on its own spawned task; `wait_for_previous` keeps them
//!   from overlapping.

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::future::{self, BoxFuture, Shared};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::debounce::options::DebounceOptions;
use crate::error::{DebounceError, panic_message};

type Outcome<R> = Result<R, DebounceError>;
type BoxedFn<A, R> = Box<dyn Fn(A) -> BoxFuture<'static, R> + Send + Sync>;

/// Future returned by [`Debounced::call`].
///
/// Cheap to clone; every clone resolves to the same outcome.
pub struct DebouncedCall<R> {
    inner: Shared<BoxFuture<'static, Outcome<R>>>,
}

impl<R: Clone> DebouncedCall<R> {
    /// Returns `true` if both handles await the same execution.
    ///
    /// Only meaningful before either handle has resolved.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.inner.ptr_eq(&other.inner)
    }
}

impl<R: Clone> Clone for DebouncedCall<R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<R: Clone> Future for DebouncedCall<R> {
    type Output = Outcome<R>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.inner).poll(cx)
    }
}

/// Calls collapsed into one eventual execution.
struct Group<A, R> {
    /// Folded arguments waiting for the trailing edge.
    args: Option<A>,
    /// Settles `call`; taken by the execution or by `cancel`.
    tx: Option<oneshot::Sender<Outcome<R>>>,
    call: DebouncedCall<R>,
    timer: CancellationToken,
    generation: u64,
    /// The leading edge already executed in this period.
    leading: bool,
}

struct State<A, R> {
    group: Option<Group<A, R>>,
    running: usize,
    generation: u64,
}

struct Inner<A, R> {
    f: BoxedFn<A, R>,
    options: DebounceOptions<A>,
    state: Mutex<State<A, R>>,
}

/// Debounced wrapper around an async function.
///
/// Cloning yields another handle to the same debouncer.
pub struct Debounced<A, R> {
    inner: Arc<Inner<A, R>>,
}

impl<A, R> Clone for Debounced<A, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Wraps `f` so that calls within `options.delay` of each other collapse into one execution.
///
/// # Example
/// ```rust
/// use std::time::Duration;
/// use callvisor::{DebounceOptions, debounce};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let save = debounce(
///         |text: String| async move { text.len() },
///         DebounceOptions::new(Duration::from_millis(20)),
///     );
///
///     let first = save.call("a".to_string());
///     let last = save.call("abc".to_string());
///
///     assert_eq!(first.await, Ok(3));
///     assert_eq!(last.await, Ok(3));
/// }
/// ```
pub fn debounce<A, R, F, Fut>(f: F, options: DebounceOptions<A>) -> Debounced<A, R>
where
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    A: Send + 'static,
    R: Clone + Send + Sync + 'static,
{
    let f: BoxedFn<A, R> = Box::new(move |args| f(args).boxed());
    Debounced {
        inner: Arc::new(Inner {
            f,
            options,
            state: Mutex::new(State {
                group: None,
                running: 0,
                generation: 0,
            }),
        }),
    }
}

fn channel<R>() -> (oneshot::Sender<Outcome<R>>, DebouncedCall<R>)
where
    R: Clone + Send + Sync + 'static,
{
    let (tx, rx) = oneshot::channel();
    let fut = async move {
        match rx.await {
            Ok(outcome) => outcome,
            // Sender dropped without a value: the period was cancelled silently.
            Err(_) => future::pending().await,
        }
    };
    (
        tx,
        DebouncedCall {
            inner: fut.boxed().shared(),
        },
    )
}

impl<A, R> Debounced<A, R>
where
    A: Send + 'static,
    R: Clone + Send + Sync + 'static,
{
    /// Schedules a call and returns the future shared by every call of this period.
    ///
    /// With `leading` set and no period pending, the wrapped function is invoked
    /// before this method returns.
    pub fn call(&self, args: A) -> DebouncedCall<R> {
        let opts = &self.inner.options;
        let mut st = self.inner.state.lock();

        if let Some(group) = st.group.as_mut() {
            if !group.leading || opts.accumulator.is_some() {
                group.args = Some(opts.fold(group.args.take(), args));
            }
            let call = group.call.clone();
            self.arm(&mut st);
            return call;
        }

        let (tx, call) = channel();
        let run_now = opts.leading && !(opts.wait_for_previous && st.running > 0);
        if run_now {
            st.group = Some(Group {
                args: None,
                tx: None,
                call: call.clone(),
                timer: CancellationToken::new(),
                generation: 0,
                leading: true,
            });
            self.arm(&mut st);
            st.running += 1;
            drop(st);
            self.execute(args, Some(tx));
        } else {
            st.group = Some(Group {
                args: Some(opts.fold(None, args)),
                tx: Some(tx),
                call: call.clone(),
                timer: CancellationToken::new(),
                generation: 0,
                leading: false,
            });
            self.arm(&mut st);
        }
        call
    }

    /// Drops the pending period.
    ///
    /// - `silent = false`: callers of the period resolve to [`DebounceError::Cancelled`].
    /// - `silent = true`: callers are left pending forever.
    ///
    /// The wrapped function is not called for the cancelled period. Executions
    /// already running are not affected.
    pub fn cancel(&self, silent: bool) {
        let group = self.inner.state.lock().group.take();
        let Some(group) = group else {
            return;
        };
        group.timer.cancel();
        if let Some(tx) = group.tx {
            if !silent {
                let _ = tx.send(Err(DebounceError::Cancelled));
            }
        }
    }

    /// Executes the pending trailing call now.
    ///
    /// Returns the future of that execution: the one the pending callers are
    /// awaiting, or a fresh one for the folded trailing call of a leading
    /// period. `None` when nothing is waiting for the trailing edge.
    pub fn flush(&self) -> Option<DebouncedCall<R>> {
        let mut st = self.inner.state.lock();
        if !st.group.as_ref().is_some_and(|g| g.args.is_some()) {
            return None;
        }
        let group = st.group.take()?;
        group.timer.cancel();
        let args = group.args?;
        st.running += 1;
        drop(st);

        let (tx, call) = match group.tx {
            Some(tx) => (tx, group.call),
            None => channel(),
        };
        self.execute(args, Some(tx));
        Some(call)
    }

    /// Returns `true` while a period is open (timer armed).
    pub fn is_pending(&self) -> bool {
        self.inner.state.lock().group.is_some()
    }

    /// (Re)arms the period timer; a previous timer of the same period is cancelled.
    fn arm(&self, st: &mut State<A, R>) {
        st.generation += 1;
        let generation = st.generation;
        let token = CancellationToken::new();
        if let Some(group) = st.group.as_mut() {
            group.timer.cancel();
            group.timer = token.clone();
            group.generation = generation;
        }

        let me = self.clone();
        let delay = self.inner.options.delay;
        tokio::spawn(async move {
            tokio::select! {
                _ = time::sleep(delay) => me.fire(generation),
                _ = token.cancelled() => {}
            }
        });
    }

    /// Trailing edge of a period.
    fn fire(&self, generation: u64) {
        let mut st = self.inner.state.lock();
        let has_args = match st.group.as_ref() {
            Some(g) if g.generation == generation => g.args.is_some(),
            _ => return,
        };
        if has_args && self.inner.options.wait_for_previous && st.running > 0 {
            self.arm(&mut st);
            return;
        }
        let Some(group) = st.group.take() else {
            return;
        };
        let Some(args) = group.args else {
            return;
        };
        st.running += 1;
        drop(st);

        self.execute(args, group.tx);
    }

    /// Invokes the wrapped function and drives it on a spawned task.
    ///
    /// The caller has already counted this execution in `running`.
    fn execute(&self, args: A, tx: Option<oneshot::Sender<Outcome<R>>>) {
        let inner = Arc::clone(&self.inner);
        let started = panic::catch_unwind(AssertUnwindSafe(|| (inner.f)(args)))
            .map_err(|p| panic_message(p.as_ref()));

        tokio::spawn(async move {
            let outcome = match started {
                Ok(fut) => AssertUnwindSafe(fut)
                    .catch_unwind()
                    .await
                    .map_err(|p| DebounceError::Panicked {
                        message: panic_message(p.as_ref()),
                    }),
                Err(message) => Err(DebounceError::Panicked { message }),
            };
            {
                let mut st = inner.state.lock();
                st.running = st.running.saturating_sub(1);
            }
            if let Some(tx) = tx {
                let _ = tx.send(outcome);
            }
        });
    }
}
