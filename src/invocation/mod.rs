//! Invocation data model: keys, tags and lifecycle records.
//!
//! This module groups the values the tracker publishes. Everything here is
//! immutable once built and cheap to clone (`Arc`-backed strings).
//!
//! ## Contents
//! - [`InvocationKey`] unique identity of one call (`tracker_id:operation:index`)
//! - [`Tag`] key/value metadata, merged with [`merge_tags`]
//! - [`Invocation`], [`Stage`], [`StageKind`] lifecycle records
//!
//! ## Record flow
//! ```text
//! call ──► Invocation { stage: Started }                         (exactly one)
//!      └─► Invocation { stage: Completed { duration, result } }   ┐
//!          Invocation { stage: Errored { duration, error } }      ┘ (exactly one of)
//! ```

mod key;
mod record;
mod tag;

pub use key::InvocationKey;
pub use record::{Invocation, Stage, StageKind};
pub use tag::{Tag, merge_tags};
