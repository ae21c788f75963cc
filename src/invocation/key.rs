use std::fmt;
use std::sync::Arc;

/// Identity of a single tracked call.
///
/// The `id` is derived from the other three fields and therefore stable for the
/// whole lifetime of the invocation. `index` comes from a per-tracker counter
/// shared by all operations of that tracker.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct InvocationKey {
    id: Arc<str>,
    tracker_id: Arc<str>,
    operation: Arc<str>,
    index: u64,
}

impl InvocationKey {
    /// Builds a key; `id` becomes `"{tracker_id}:{operation}:{index}"`.
    pub fn new(tracker_id: impl Into<Arc<str>>, operation: impl Into<Arc<str>>, index: u64) -> Self {
        let tracker_id = tracker_id.into();
        let operation = operation.into();
        let id: Arc<str> = format!("{tracker_id}:{operation}:{index}").into();
        Self {
            id,
            tracker_id,
            operation,
            index,
        }
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn tracker_id(&self) -> &str {
        &self.tracker_id
    }

    #[inline]
    pub fn operation(&self) -> &str {
        &self.operation
    }

    #[inline]
    pub fn index(&self) -> u64 {
        self.index
    }
}

impl fmt::Display for InvocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_is_derived_from_parts() {
        let key = InvocationKey::new("t1", "load", 7);
        assert_eq!(key.id(), "t1:load:7");
        assert_eq!(key.tracker_id(), "t1");
        assert_eq!(key.operation(), "load");
        assert_eq!(key.index(), 7);
        assert_eq!(key.to_string(), "t1:load:7");
    }

    #[test]
    fn test_equal_parts_give_equal_keys() {
        assert_eq!(InvocationKey::new("a", "op", 1), InvocationKey::new("a", "op", 1));
        assert_ne!(InvocationKey::new("a", "op", 1), InvocationKey::new("a", "op", 2));
    }
}
