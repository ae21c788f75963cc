use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::invocation::InvocationKey;
use crate::stack::InvocationStack;

/// Shared LIFO of invocation keys.
#[derive(Debug, Default)]
pub struct PlainStack {
    keys: Mutex<Vec<InvocationKey>>,
    closed: AtomicBool,
}

impl PlainStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently on the stack.
    pub fn depth(&self) -> usize {
        self.keys.lock().len()
    }
}

impl InvocationStack for PlainStack {
    fn push(&self, key: InvocationKey) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        self.keys.lock().push(key);
    }

    fn peek(&self) -> Option<InvocationKey> {
        self.keys.lock().last().cloned()
    }

    fn pop(&self) -> Option<InvocationKey> {
        self.keys.lock().pop()
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.keys.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(i: u64) -> InvocationKey {
        InvocationKey::new("t", "op", i)
    }

    #[test]
    fn test_lifo_order() {
        let stack = PlainStack::new();
        assert_eq!(stack.peek(), None);
        assert_eq!(stack.pop(), None);

        stack.push(key(1));
        stack.push(key(2));
        assert_eq!(stack.peek(), Some(key(2)));
        assert_eq!(stack.pop(), Some(key(2)));
        assert_eq!(stack.pop(), Some(key(1)));
        assert_eq!(stack.pop(), None);
    }

    #[test]
    fn test_close_discards_and_ignores_pushes() {
        let stack = PlainStack::new();
        stack.push(key(1));
        stack.close();
        assert_eq!(stack.depth(), 0);
        stack.push(key(2));
        assert_eq!(stack.peek(), None);
    }
}
