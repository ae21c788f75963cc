//! Invocation stacks.
//!
//! A stack records which invocation is currently running so that nested calls
//! can name their parent. Two strategies are provided:
//!
//! - [`PlainStack`]: one shared LIFO. Correct for strictly nested synchronous
//!   calls; concurrent async calls interleave on it.
//! - [`ContextLocalStack`]: one LIFO per logical execution branch, carried in the
//!   async [`Context`]. Concurrent futures each see their own ancestry.
//!
//! Custom strategies implement [`InvocationStack`].

mod context;
mod context_local;
mod plain;

use std::sync::Arc;

use crate::invocation::InvocationKey;

pub(crate) use context::Installed;
pub use context::{Context, ContextLocal, Scoped, scope};
pub use context_local::ContextLocalStack;
pub use plain::PlainStack;

/// Stack of invocation keys used for parent correlation.
///
/// Implementations must be safe to share between threads; after `close`,
/// `push` is ignored and `peek`/`pop` return `None`.
pub trait InvocationStack: Send + Sync + 'static {
    fn push(&self, key: InvocationKey);

    /// Top of the stack without removing it.
    fn peek(&self) -> Option<InvocationKey>;

    /// Removes and returns the top of the stack.
    fn pop(&self) -> Option<InvocationKey>;

    fn close(&self);
}

/// Built-in stack selection for [`TrackerConfig`](crate::TrackerConfig).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StackKind {
    /// Per-branch stack carried in the async context.
    #[default]
    ContextLocal,
    /// Single shared stack.
    Plain,
}

impl StackKind {
    /// Creates a fresh stack of this kind.
    pub fn build(self) -> Arc<dyn InvocationStack> {
        match self {
            StackKind::ContextLocal => Arc::new(ContextLocalStack::new()),
            StackKind::Plain => Arc::new(PlainStack::new()),
        }
    }
}
