use std::sync::Arc;

use crate::invocation::InvocationKey;
use crate::stack::{ContextLocal, InvocationStack};

/// Invocation stack stored in the async [`Context`](crate::Context).
///
/// Every push or pop installs a new immutable sequence into the current
/// context, so sequences already captured by other branches stay untouched.
#[derive(Debug, Default)]
pub struct ContextLocalStack {
    local: ContextLocal<Arc<[InvocationKey]>>,
}

impl ContextLocalStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys visible from the current context, bottom first.
    pub fn snapshot(&self) -> Arc<[InvocationKey]> {
        self.local.get().unwrap_or_else(|| Arc::from(Vec::new()))
    }
}

impl InvocationStack for ContextLocalStack {
    fn push(&self, key: InvocationKey) {
        if !self.local.is_enabled() {
            return;
        }
        let current = self.snapshot();
        let mut next = Vec::with_capacity(current.len() + 1);
        next.extend(current.iter().cloned());
        next.push(key);
        self.local.set(next.into());
    }

    fn peek(&self) -> Option<InvocationKey> {
        self.local.get()?.last().cloned()
    }

    fn pop(&self) -> Option<InvocationKey> {
        let current = self.local.get()?;
        let (top, rest) = current.split_last()?;
        if rest.is_empty() {
            self.local.clear();
        } else {
            self.local.set(Arc::from(rest));
        }
        Some(top.clone())
    }

    fn close(&self) {
        self.local.disable();
    }
}
