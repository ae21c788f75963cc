//! # SubscriberSet: non-blocking fan-out over multiple subscribers
//!
//! [`SubscriberSet`] distributes each [`Invocation`] record to multiple
//! subscribers **without awaiting** their processing.
//!
//! ## What it guarantees
//! - `emit(&Invocation)` returns immediately.
//! - Per-subscriber FIFO (queue order).
//! - Panics inside subscribers are caught and logged (isolation).
//!
//! ## What it does **not** guarantee
//! - No global ordering across different subscribers.
//! - No retries on per-subscriber queue overflow (records are dropped for that
//!   subscriber and counted in [`SubscriberSet::dropped`]).
//!
//! ## Diagram
//! ```text
//!    emit(&Invocation)
//!        │                        (Arc-clone per subscriber)
//!        ├────────────────► [queue S1] ─► worker S1 ─► on_invocation()
//!        ├────────────────► [queue S2] ─► worker S2 ─► on_invocation()
//!        └────────────────► [queue SN] ─► worker SN ─► on_invocation()
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::core::InvocationTracker;
use crate::error::panic_message;
use crate::events::Subscription;
use crate::invocation::Invocation;

use super::Subscribe;

/// Per-subscriber channel with metadata
struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Invocation>>,
}

struct Fanout {
    channels: Vec<SubscriberChannel>,
    dropped: AtomicU64,
}

impl Fanout {
    fn emit(&self, record: &Invocation) {
        let rec = Arc::new(record.clone());
        for channel in &self.channels {
            let reason = match channel.sender.try_send(Arc::clone(&rec)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "queue full",
                Err(mpsc::error::TrySendError::Closed(_)) => "worker closed",
            };
            self.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                subscriber = channel.name,
                invocation = %rec.key,
                reason,
                "subscriber dropped record"
            );
        }
    }
}

/// Composite fan-out with per-subscriber bounded queues and worker tasks.
pub struct SubscriberSet {
    fanout: Arc<Fanout>,
    workers: Vec<JoinHandle<()>>,
    attached: Mutex<Vec<Subscription>>,
}

impl SubscriberSet {
    /// Creates a new set and spawns one worker per subscriber.
    ///
    /// Must be called inside a Tokio runtime.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>) -> Self {
        let mut channels = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let cap = sub.queue_capacity().max(1);
            let name = sub.name();
            let (tx, mut rx) = mpsc::channel::<Arc<Invocation>>(cap);

            let handle = tokio::spawn(async move {
                while let Some(rec) = rx.recv().await {
                    let fut = sub.on_invocation(rec.as_ref());
                    if let Err(p) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                        tracing::warn!(
                            subscriber = sub.name(),
                            invocation = %rec.key,
                            panic = %panic_message(p.as_ref()),
                            "subscriber panicked"
                        );
                    }
                }
            });

            channels.push(SubscriberChannel { name, sender: tx });
            workers.push(handle);
        }

        Self {
            fanout: Arc::new(Fanout {
                channels,
                dropped: AtomicU64::new(0),
            }),
            workers,
            attached: Mutex::new(Vec::new()),
        }
    }

    /// Fan-out one record to all subscribers (non-blocking).
    ///
    /// If a subscriber's queue is **full** or **closed**, the record is dropped for it
    /// and a warning is logged with the subscriber's name.
    pub fn emit(&self, record: &Invocation) {
        self.fanout.emit(record);
    }

    /// Feeds every record of `tracker` into this set until [`shutdown`](Self::shutdown).
    pub fn attach(&self, tracker: &InvocationTracker) {
        let fanout = Arc::clone(&self.fanout);
        let sub = tracker
            .on_invoked()
            .on_event(move |rec: &Invocation| fanout.emit(rec));
        self.attached.lock().push(sub);
    }

    /// Graceful shutdown: detach from trackers, close all queues and await worker completion.
    ///
    /// Records already queued are still delivered.
    pub async fn shutdown(self) {
        for sub in self.attached.into_inner() {
            sub.close();
        }
        drop(self.fanout);
        for h in self.workers {
            let _ = h.await;
        }
    }

    /// Records dropped so far because a queue was full or closed.
    pub fn dropped(&self) -> u64 {
        self.fanout.dropped.load(Ordering::Relaxed)
    }

    /// True if there are no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fanout.channels.is_empty()
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fanout.channels.len()
    }
}
