//! Call coalescing.
//!
//! This module groups the debounce combinator: rapid repeated calls collapse into
//! a single delayed execution whose outcome every collapsed caller shares.
//!
//! ## Contents
//! - [`DebounceOptions`] delay / leading edge / serialization / argument folding
//! - [`Debounced`] the wrapped function (`call`, `cancel`, `flush`)
//! - [`DebouncedCall`] shared future returned to every caller of one period
//!
//! ## Quick wiring
//! ```text
//! call(a1) ─┐
//! call(a2) ─┼─► [pending group: args, timer, shared result] ──(delay elapsed)──► f(args)
//! call(a3) ─┘                                                                    │
//!    ▲                                                                           ▼
//!    └──────────────────── all three resolve with the same outcome ◄──── spawned driver
//! ```
//!
//! Timers are Tokio tasks, so `call`, `flush` and the leading edge must run
//! inside a Tokio runtime.

mod debounced;
mod options;

pub use debounced::{Debounced, DebouncedCall, debounce};
pub use options::{Accumulator, DebounceOptions};
