//! # One tracker's view of one call.
//!
//! A [`Frame`] is created per tracker binding when a tracked function is called.
//! It owns the invocation key, keeps the stack balanced and publishes the
//! lifecycle records.
//!
//! ```text
//! begin:  key ─► parent = stack.peek() ─► stack.push(key) ─► publish Started ─► start timer
//! settle: stop timer ─► stack.pop() ─► publish Completed | Errored
//! ```
//!
//! ## Rules
//! - Records are only built when the tracker has observers (or trace logging is on).
//! - A frame settles exactly once; `settle` consumes it.
//! - A frame of a tracker closed in the meantime settles silently.

use std::fmt::{Debug, Display};
use std::sync::Arc;
use std::time::Duration;

use crate::core::tracked::Binding;
use crate::core::tracker::TrackerInner;
use crate::invocation::{Invocation, Stage, StageKind};

/// How a call ended, as seen by the tracker.
#[derive(Debug)]
pub enum Settlement<'a> {
    /// The call produced a value.
    Completed(&'a dyn Debug),
    /// The call failed; the message is the rendered error or panic payload.
    Errored(String),
}

impl Settlement<'_> {
    pub fn kind(&self) -> StageKind {
        match self {
            Settlement::Completed(_) => StageKind::Completed,
            Settlement::Errored(_) => StageKind::Errored,
        }
    }
}

/// Decides whether an output counts as a completion or an error.
pub trait Classify<O> {
    fn classify(output: &O) -> Settlement<'_>;
}

/// Every output is a completion.
#[derive(Debug, Clone, Copy)]
pub struct AsValue;

/// `Ok` completes, `Err` errors.
#[derive(Debug, Clone, Copy)]
pub struct AsResult;

impl<O: Debug> Classify<O> for AsValue {
    fn classify(output: &O) -> Settlement<'_> {
        Settlement::Completed(output)
    }
}

impl<T: Debug, E: Display> Classify<Result<T, E>> for AsResult {
    fn classify(output: &Result<T, E>) -> Settlement<'_> {
        match output {
            Ok(value) => Settlement::Completed(value),
            Err(err) => Settlement::Errored(err.to_string()),
        }
    }
}

pub(crate) struct Frame {
    tracker: Arc<TrackerInner>,
    record: Invocation,
    started_at: Duration,
    pushed: bool,
}

impl Frame {
    /// Begins one frame per binding, outermost first. Closed trackers are skipped.
    pub(crate) fn begin_all(bindings: &[Binding], args: &dyn Debug) -> Vec<Frame> {
        bindings
            .iter()
            .filter_map(|binding| Frame::begin(binding, args))
            .collect()
    }

    fn begin(binding: &Binding, args: &dyn Debug) -> Option<Frame> {
        let tracker = Arc::clone(&binding.tracker);
        if tracker.is_closed() {
            return None;
        }
        let key = tracker.next_key(&binding.operation);
        let parent = tracker.stack.peek();
        let args = (tracker.cfg.capture_args && tracker.channels.any_active())
            .then(|| Arc::from((tracker.cfg.stringify)(args)));
        let record = Invocation::started(key, parent, args, Arc::clone(&binding.tags));

        // push only once the record exists; rendering `args` may panic
        tracker.stack.push(record.key.clone());
        tracker.trace(&record);
        if tracker.channels.observed(StageKind::Started) {
            tracker.channels.publish(record.clone());
        }

        let started_at = tracker.clock.now();
        Some(Frame {
            tracker,
            record,
            started_at,
            pushed: true,
        })
    }

    /// Pushes the key again (first poll of a future).
    pub(crate) fn push(&mut self) {
        if !self.pushed {
            self.tracker.stack.push(self.record.key.clone());
            self.pushed = true;
        }
    }

    pub(crate) fn pop(&mut self) {
        if self.pushed {
            self.pushed = false;
            self.tracker.stack.pop();
        }
    }

    pub(crate) fn settle(mut self, settlement: &Settlement<'_>, promise_like: bool) {
        let duration = self.tracker.clock.now().saturating_sub(self.started_at);
        self.pop();

        let tracker = &self.tracker;
        if tracker.is_closed() {
            return;
        }
        let observed = tracker.channels.observed(settlement.kind());
        if !observed && !tracker.trace_enabled() {
            return;
        }

        let stage = match settlement {
            Settlement::Completed(value) => Stage::Completed {
                duration,
                promise_like,
                result: tracker
                    .cfg
                    .capture_results
                    .then(|| Arc::from((tracker.cfg.stringify)(*value))),
            },
            Settlement::Errored(message) => Stage::Errored {
                duration,
                promise_like,
                error: Arc::from(message.as_str()),
            },
        };
        let record = self.record.settled(stage);
        tracker.trace(&record);
        if observed {
            tracker.channels.publish(record);
        }
    }
}

/// Settles frames innermost first.
pub(crate) fn settle_all(frames: Vec<Frame>, settlement: &Settlement<'_>, promise_like: bool) {
    for frame in frames.into_iter().rev() {
        frame.settle(settlement, promise_like);
    }
}
