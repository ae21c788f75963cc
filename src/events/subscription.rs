use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// What a subscription detaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Slot {
    Listener,
    ErrorHandler,
}

/// Type-erased owner a subscription detaches from.
pub(crate) trait Detach: Send + Sync {
    fn detach(&self, id: u64, slot: Slot);
}

/// Handle returned by listener and error-handler registration.
///
/// Dropping the handle does **not** unsubscribe; call [`Subscription::close`].
pub struct Subscription {
    id: u64,
    slot: Slot,
    active: Arc<AtomicBool>,
    owner: Weak<dyn Detach>,
}

impl Subscription {
    pub(crate) fn new(id: u64, slot: Slot, active: Arc<AtomicBool>, owner: Weak<dyn Detach>) -> Self {
        Self {
            id,
            slot,
            active,
            owner,
        }
    }

    /// Stops delivery to this registration. Idempotent.
    ///
    /// A notification pass already in progress skips the registration if it has
    /// not reached it yet.
    pub fn close(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(owner) = self.owner.upgrade() {
            owner.detach(self.id, self.slot);
        }
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        !self.active.load(Ordering::Acquire)
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("slot", &self.slot)
            .field("closed", &self.is_closed())
            .finish()
    }
}
