//! # Asynchronous execution context.
//!
//! A [`Context`] is an immutable map of slots installed per thread. Futures
//! wrapped with [`scope`] capture the context current at their creation and
//! re-install it around every poll, so values written by one logical branch
//! never leak into a concurrent one.
//!
//! ```text
//!  caller ctx {stack: [a]}
//!     ├── scope(fut1) ─ poll ─► installs {stack: [a]} ─ fut1 sets [a, b] ─► kept in fut1
//!     └── scope(fut2) ─ poll ─► installs {stack: [a]} ─ fut2 sets [a, c] ─► kept in fut2
//!  after each poll the caller's {stack: [a]} is restored
//! ```
//!
//! ## Rules
//! - Writes are copy-on-write: a branch never mutates a map another branch can see.
//! - A [`ContextLocal`] reads `None` once disabled, and writes to it are ignored.
//! - Dropping a [`ContextLocal`] removes its value from the current thread's context.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::task::Poll;

type Slots = HashMap<u64, Arc<dyn Any + Send + Sync>>;

static NEXT_SLOT: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CURRENT: RefCell<Context> = RefCell::new(Context::default());
}

/// Snapshot of context-local values.
#[derive(Clone, Default)]
pub struct Context {
    slots: Arc<Slots>,
}

impl Context {
    /// Returns the context installed on this thread.
    pub fn current() -> Self {
        CURRENT.with(|c| c.borrow().clone())
    }

    /// Runs `f` with this context installed; writes made by `f` are discarded.
    pub fn run<R>(&self, f: impl FnOnce() -> R) -> R {
        let mut ctx = self.clone();
        let _installed = Installed::new(&mut ctx);
        f()
    }

    /// Number of slots holding a value.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn replace(next: Context) -> Context {
        // The slot is gone during thread teardown; nothing is installed then.
        CURRENT.try_with(|c| c.replace(next)).unwrap_or_default()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("slots", &self.slots.len())
            .finish()
    }
}

/// Installs a context for the guard's lifetime.
///
/// On drop, the context as left by the guarded code is written back into the
/// borrowed slot and the previous thread context is restored.
pub(crate) struct Installed<'a> {
    ctx: &'a mut Context,
    prev: Option<Context>,
}

impl<'a> Installed<'a> {
    pub(crate) fn new(ctx: &'a mut Context) -> Self {
        let prev = Context::replace(ctx.clone());
        Self {
            ctx,
            prev: Some(prev),
        }
    }
}

impl Drop for Installed<'_> {
    fn drop(&mut self) {
        if let Some(prev) = self.prev.take() {
            *self.ctx = Context::replace(prev);
        }
    }
}

/// A typed slot living in the current [`Context`].
pub struct ContextLocal<T> {
    slot: u64,
    enabled: AtomicBool,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ContextLocal<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            slot: NEXT_SLOT.fetch_add(1, Ordering::Relaxed),
            enabled: AtomicBool::new(true),
            _marker: PhantomData,
        }
    }

    /// Value visible in the current context.
    pub fn get(&self) -> Option<T> {
        if !self.is_enabled() {
            return None;
        }
        CURRENT.with(|c| {
            c.borrow()
                .slots
                .get(&self.slot)
                .and_then(|v| v.downcast_ref::<T>())
                .cloned()
        })
    }

    /// Replaces the value for the current context (and contexts derived from it later).
    pub fn set(&self, value: T) {
        if !self.is_enabled() {
            return;
        }
        CURRENT.with(|c| {
            let mut ctx = c.borrow_mut();
            Arc::make_mut(&mut ctx.slots).insert(self.slot, Arc::new(value));
        });
    }

    /// Removes the value from the current context.
    pub fn clear(&self) {
        clear_slot(self.slot);
    }

    /// Permanently disables the slot and clears it from the current context.
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Release);
        self.clear();
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }
}

fn clear_slot(slot: u64) {
    let _ = CURRENT.try_with(|c| {
        let mut ctx = c.borrow_mut();
        if ctx.slots.contains_key(&slot) {
            Arc::make_mut(&mut ctx.slots).remove(&slot);
        }
    });
}

/// Slot ids are never reused, so a dropped local frees its entry on this thread.
impl<T> Drop for ContextLocal<T> {
    fn drop(&mut self) {
        clear_slot(self.slot);
    }
}

impl<T> Default for ContextLocal<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ContextLocal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextLocal")
            .field("slot", &self.slot)
            .field("enabled", &self.enabled.load(Ordering::Relaxed))
            .finish()
    }
}

/// Future running inside its own branch of the context.
pub struct Scoped<F> {
    ctx: Context,
    fut: Pin<Box<F>>,
}

/// Binds `fut` to a branch of the current context.
///
/// # Example
/// ```rust
/// use callvisor::{ContextLocal, scope};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let local = ContextLocal::<u32>::new();
///     local.set(1);
///
///     let inner = scope(async {
///         local.set(2);
///         tokio::task::yield_now().await;
///         local.get()
///     })
///     .await;
///
///     assert_eq!(inner, Some(2));
///     assert_eq!(local.get(), Some(1));
/// }
/// ```
pub fn scope<F: Future>(fut: F) -> Scoped<F> {
    Scoped {
        ctx: Context::current(),
        fut: Box::pin(fut),
    }
}

impl<F: Future> Future for Scoped<F> {
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut std::task::Context<'_>) -> Poll<F::Output> {
        let this = self.get_mut();
        let _installed = Installed::new(&mut this.ctx);
        this.fut.as_mut().poll(cx)
    }
}
