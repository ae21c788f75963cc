/// Why the observer set of a notifier changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeReason {
    ListenerAdded,
    ListenerRemoved,
    WaiterAdded,
    WaiterResolved,
    Closed,
}

impl ChangeReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeReason::ListenerAdded => "listener_added",
            ChangeReason::ListenerRemoved => "listener_removed",
            ChangeReason::WaiterAdded => "waiter_added",
            ChangeReason::WaiterResolved => "waiter_resolved",
            ChangeReason::Closed => "closed",
        }
    }
}

/// Passed to the change hook after every observer-set change.
///
/// `active` reflects the state after the change: at least one listener or a
/// pending waiter exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    pub reason: ChangeReason,
    pub active: bool,
}
