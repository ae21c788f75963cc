//! # Invocation lifecycle records.
//!
//! The [`Stage`] enum classifies a record:
//! - **Started**: published once when the call begins
//! - **Completed**: the call returned a value (or its future resolved)
//! - **Errored**: the call returned `Err`, panicked, or its future was dropped unfinished
//!
//! Terminal stages carry the `duration` from just before the wrapped call to
//! settlement and `promise_like`, which is `true` when the call produced a future.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use callvisor::{Invocation, InvocationKey, Stage, StageKind, Tag};
//!
//! let tags: Vec<Tag> = Vec::new();
//! let started = Invocation::started(InvocationKey::new("t", "load", 0), None, None, tags.into());
//! assert_eq!(started.stage.kind(), StageKind::Started);
//!
//! let done = started.settled(Stage::Completed {
//!     duration: Duration::from_millis(3),
//!     promise_like: false,
//!     result: None,
//! });
//! assert!(done.is_terminal());
//! assert_eq!(done.key, started.key);
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::invocation::{InvocationKey, Tag};

/// Classification of a record without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Started,
    Completed,
    Errored,
}

impl StageKind {
    /// Short stable name (for logs).
    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::Started => "started",
            StageKind::Completed => "completed",
            StageKind::Errored => "errored",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle stage of an invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    /// The wrapped function is about to run.
    Started,

    /// The wrapped function produced a value.
    Completed {
        /// Monotonic time between the call and its settlement.
        duration: Duration,
        /// The call produced a future.
        promise_like: bool,
        /// Rendered result, when result capture is enabled.
        result: Option<Arc<str>>,
    },

    /// The wrapped function failed.
    Errored {
        /// Monotonic time between the call and its settlement.
        duration: Duration,
        /// The call produced a future.
        promise_like: bool,
        /// Rendered error or panic message.
        error: Arc<str>,
    },
}

impl Stage {
    pub fn kind(&self) -> StageKind {
        match self {
            Stage::Started => StageKind::Started,
            Stage::Completed { .. } => StageKind::Completed,
            Stage::Errored { .. } => StageKind::Errored,
        }
    }

    /// Duration of a terminal stage; `None` for `Started`.
    pub fn duration(&self) -> Option<Duration> {
        match self {
            Stage::Started => None,
            Stage::Completed { duration, .. } | Stage::Errored { duration, .. } => Some(*duration),
        }
    }

    /// Whether the settled call produced a future; `None` for `Started`.
    pub fn promise_like(&self) -> Option<bool> {
        match self {
            Stage::Started => None,
            Stage::Completed { promise_like, .. } | Stage::Errored { promise_like, .. } => {
                Some(*promise_like)
            }
        }
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Stage::Started)
    }
}

/// One lifecycle record of a tracked call.
///
/// - `key`: identity of this call
/// - `parent_key`: the call that was on top of the stack when this one began
/// - `args`: rendered arguments, when argument capture is enabled
/// - `tags`: merged tracker and track-level tags (same for every record of the call)
#[derive(Debug, Clone)]
pub struct Invocation {
    pub key: InvocationKey,
    pub parent_key: Option<InvocationKey>,
    pub args: Option<Arc<str>>,
    pub tags: Arc<[Tag]>,
    pub stage: Stage,
}

impl Invocation {
    /// Creates the `Started` record of a call.
    pub fn started(
        key: InvocationKey,
        parent_key: Option<InvocationKey>,
        args: Option<Arc<str>>,
        tags: Arc<[Tag]>,
    ) -> Self {
        Self {
            key,
            parent_key,
            args,
            tags,
            stage: Stage::Started,
        }
    }

    /// Returns a copy of this record with another stage.
    pub fn settled(&self, stage: Stage) -> Self {
        Self {
            key: self.key.clone(),
            parent_key: self.parent_key.clone(),
            args: self.args.clone(),
            tags: Arc::clone(&self.tags),
            stage,
        }
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.stage.is_terminal()
    }

    /// Id of the parent invocation, if any.
    #[inline]
    pub fn parent_id(&self) -> Option<&str> {
        self.parent_key.as_ref().map(InvocationKey::id)
    }
}
