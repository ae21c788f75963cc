use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Key/value metadata attached to invocations.
///
/// Ordering is by `name`, then `value`; merged tag lists are sorted with it.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag {
    pub name: Arc<str>,
    pub value: Arc<str>,
}

impl Tag {
    pub fn new(name: impl Into<Arc<str>>, value: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl<N, V> From<(N, V)> for Tag
where
    N: Into<Arc<str>>,
    V: Into<Arc<str>>,
{
    fn from((name, value): (N, V)) -> Self {
        Tag::new(name, value)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// Merges tag sources into one sorted sequence.
///
/// Identical `name=value` pairs collapse; the same name with different values
/// is kept once per value.
///
/// # Example
/// ```rust
/// use callvisor::{Tag, merge_tags};
///
/// let tracker = [Tag::new("team", "core"), Tag::new("env", "prod")];
/// let call = [Tag::new("env", "prod"), Tag::new("env", "canary")];
/// let merged = merge_tags([&tracker[..], &call[..]]);
///
/// let rendered: Vec<String> = merged.iter().map(ToString::to_string).collect();
/// assert_eq!(rendered, ["env=canary", "env=prod", "team=core"]);
/// ```
pub fn merge_tags<'a, I>(sources: I) -> Arc<[Tag]>
where
    I: IntoIterator<Item = &'a [Tag]>,
{
    let set: BTreeSet<&Tag> = sources.into_iter().flatten().collect();
    set.into_iter().cloned().collect()
}
