//! # Tracker configuration.
//!
//! Provides [`TrackerConfig`], the settings of one [`InvocationTracker`](crate::InvocationTracker),
//! and [`TrackOptions`], the per-operation settings passed to `track_with`.
//!
//! Config is validated once, by `TrackerBuilder::build`:
//! - `id_length` must be within `1..=MAX_ID_LENGTH`, otherwise [`ConfigError::InvalidIdLength`]
//!
//! ## Capture switches
//! - `capture_args = false` → records carry `args: None`
//! - `capture_results = false` → completed records carry `result: None`
//!
//! Rendering only happens when some lifecycle channel has observers.

use std::fmt;
use std::fmt::Debug;

use crate::error::ConfigError;
use crate::invocation::Tag;
use crate::logger::stringify;
use crate::stack::StackKind;

/// Longest accepted tracker id.
pub const MAX_ID_LENGTH: usize = 64;

/// Renderer for captured arguments and results.
pub type Stringify = fn(&dyn Debug) -> String;

/// Settings of an invocation tracker.
///
/// ## Field semantics
/// - `id_length`: length of the random alphanumeric tracker id
/// - `stack`: built-in stack used for parent correlation (ignored when a custom stack is set)
/// - `capture_args`, `capture_results`: render arguments / results into records
/// - `tags`: attached to every invocation of this tracker
/// - `stringify`: renderer used for arguments and results
#[derive(Clone)]
pub struct TrackerConfig {
    pub id_length: usize,
    pub stack: StackKind,
    pub capture_args: bool,
    pub capture_results: bool,
    pub tags: Vec<Tag>,
    pub stringify: Stringify,
}

impl TrackerConfig {
    /// Checks the settings that can be invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.id_length == 0 || self.id_length > MAX_ID_LENGTH {
            return Err(ConfigError::InvalidIdLength {
                length: self.id_length,
                max: MAX_ID_LENGTH,
            });
        }
        Ok(())
    }

    /// Adds a tracker-level tag.
    pub fn with_tag(mut self, name: &str, value: &str) -> Self {
        self.tags.push(Tag::new(name, value));
        self
    }
}

impl Default for TrackerConfig {
    /// - `id_length = 8`
    /// - `stack = StackKind::ContextLocal`
    /// - `capture_args = true`, `capture_results = true`
    /// - no tags, `stringify` = truncated `Debug` output
    fn default() -> Self {
        Self {
            id_length: 8,
            stack: StackKind::default(),
            capture_args: true,
            capture_results: true,
            tags: Vec::new(),
            stringify,
        }
    }
}

impl fmt::Debug for TrackerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackerConfig")
            .field("id_length", &self.id_length)
            .field("stack", &self.stack)
            .field("capture_args", &self.capture_args)
            .field("capture_results", &self.capture_results)
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}

/// Per-operation settings for `track_with`.
#[derive(Clone, Debug, Default)]
pub struct TrackOptions {
    /// Merged with the tracker's tags; fixed for every invocation of the operation.
    pub tags: Vec<Tag>,
}

impl TrackOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tag(mut self, name: &str, value: &str) -> Self {
        self.tags.push(Tag::new(name, value));
        self
    }
}
