//! Event notifiers: listener registry, one-shot waiters and change hooks.
//!
//! This module groups the publish/subscribe primitive used by the tracker for
//! its lifecycle channels. It is generic and usable on its own.
//!
//! ## Contents
//! - [`EventNotifier`] fan-out to listeners plus a shared [`WaitForEvent`] future
//! - [`NotifierBuilder`], [`NotifierConfig`] optional debounce and change hook
//! - [`Subscription`] handle that detaches a listener or error handler
//! - [`ChangeEvent`], [`ChangeReason`] observer-set change notifications
//!
//! ## Delivery
//! ```text
//! notify(v) ──(debounce?)──► deliver:
//!     snapshot listeners + take waiter
//!     no observers? ──► drop payload (lazy payloads are never evaluated)
//!     evaluate payload once
//!     for each listener in registration order (skipping closed ones):
//!         call ──error/panic──► most recent error handler
//!     resolve waiter
//! ```

mod builder;
mod change;
mod notifier;
mod subscription;

pub use builder::{NotifierBuilder, NotifierConfig};
pub use change::{ChangeEvent, ChangeReason};
pub use notifier::{EventNotifier, WaitForEvent};
pub use subscription::Subscription;
