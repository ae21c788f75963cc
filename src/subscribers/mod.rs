//! # Invocation subscribers.
//!
//! This module provides the [`Subscribe`] trait and [`SubscriberSet`], an
//! asynchronous fan-out that feeds tracker records to slow consumers (exporters,
//! audit logs, metrics) without blocking the tracked calls.
//!
//! ## Architecture
//! ```text
//! Record flow:
//!   Tracked::call ── publish ──► tracker.on_invoked() ──► SubscriberSet (attached listener)
//!                                                              │
//!                                                              ├──► [queue S1] ─► S1::on_invocation
//!                                                              ├──► [queue S2] ─► S2::on_invocation
//!                                                              └──► [queue SN] ─► SN::on_invocation
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use callvisor::{Invocation, StageKind, Subscribe};
//! use async_trait::async_trait;
//!
//! struct SlowCalls;
//!
//! #[async_trait]
//! impl Subscribe for SlowCalls {
//!     async fn on_invocation(&self, record: &Invocation) {
//!         if record.stage.kind() == StageKind::Completed {
//!             // export record.stage.duration() ...
//!         }
//!     }
//! }
//! ```

#[cfg(feature = "logging")]
mod embedded;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
