//! Tracker core: instrumentation, call frames and lifecycle publishing.
//!
//! The public API from this module is [`InvocationTracker`] (with its
//! [`TrackerBuilder`] and [`TrackerConfig`]), the [`Tracked`] handles it returns
//! and [`MethodTracker`].
//!
//! Internal modules:
//! - [`tracker`]: tracker state, lifecycle channels, `track`/`retrack`/`close`;
//! - [`tracked`]: function handles and the sync call paths;
//! - [`future`]: the async call path (`TrackedFuture`);
//! - [`frame`]: one tracker's view of one call (keys, stack, records);
//! - [`methods`]: owner-scoped method instrumentation;
//! - [`clock`]: time source for durations.
//!
//! ```text
//!  Tracked::call*(args)
//!        │ for each binding (outermost first)
//!        ▼
//!  Frame::begin ── key, parent = stack.peek(), stack.push ──► Channels::publish(Started)
//!        │
//!        ▼  f(args)  ─── sync: return / Err / panic
//!        │            └─ async: TrackedFuture polls inside its own Context branch
//!        ▼ for each binding (innermost first)
//!  Frame::settle ── duration, stack.pop ──► Channels::publish(Completed | Errored)
//! ```

mod builder;
mod clock;
mod config;
mod frame;
mod future;
mod methods;
mod tracked;
mod tracker;

pub use builder::TrackerBuilder;
pub use clock::{Clock, MonotonicClock};
pub use config::{MAX_ID_LENGTH, Stringify, TrackOptions, TrackerConfig};
pub use frame::{AsResult, AsValue, Classify, Settlement};
pub use future::{DROPPED_BEFORE_COMPLETION, TrackedFuture};
pub use methods::MethodTracker;
pub use tracked::Tracked;
pub use tracker::{Instrumented, InvocationTracker, TrackedBy, TrackerMarker};

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;
    use std::time::Duration;

    use parking_lot::Mutex;

    use crate::core::Clock;
    use crate::events::EventNotifier;
    use crate::invocation::Invocation;

    /// Advances by a fixed step on every reading.
    pub(crate) struct StepClock {
        step: Duration,
        now: Mutex<Duration>,
    }

    impl StepClock {
        pub(crate) fn new(step: Duration) -> Self {
            Self {
                step,
                now: Mutex::new(Duration::ZERO),
            }
        }
    }

    impl Clock for StepClock {
        fn now(&self) -> Duration {
            let mut now = self.now.lock();
            *now += self.step;
            *now
        }
    }

    /// Records everything delivered on `notifier`.
    pub(crate) fn collect(notifier: &EventNotifier<Invocation>) -> Arc<Mutex<Vec<Invocation>>> {
        let out = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&out);
        notifier.on_event(move |rec: &Invocation| sink.lock().push(rec.clone()));
        out
    }
}
