//! # LogWriter: simple record printer
//!
//! A minimal subscriber that writes incoming [`Invocation`] records as `tracing`
//! events (target `callvisor::log`). Use it for tests or demos.
//!
//! ## Example output
//! ```text
//! INFO callvisor::log: [started] key=a1B2c3D4:load:0 parent=- args=Some("42")
//! INFO callvisor::log: [completed] key=a1B2c3D4:load:0 duration=12ms promise_like=true
//! WARN callvisor::log: [errored] key=a1B2c3D4:save:1 duration=3ms error=disk full
//! ```

use async_trait::async_trait;

use crate::invocation::{Invocation, Stage};
use crate::subscribers::Subscribe;

/// Record writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_invocation(&self, rec: &Invocation) {
        let key = rec.key.id();
        match &rec.stage {
            Stage::Started => {
                tracing::info!(
                    target: "callvisor::log",
                    "[started] key={key} parent={} args={:?}",
                    rec.parent_id().unwrap_or("-"),
                    rec.args.as_deref()
                );
            }
            Stage::Completed {
                duration,
                promise_like,
                ..
            } => {
                tracing::info!(
                    target: "callvisor::log",
                    "[completed] key={key} duration={duration:?} promise_like={promise_like}"
                );
            }
            Stage::Errored {
                duration, error, ..
            } => {
                tracing::warn!(
                    target: "callvisor::log",
                    "[errored] key={key} duration={duration:?} error={error}"
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
