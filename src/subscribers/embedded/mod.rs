//! # Built-in subscribers
//!
//! Small, self-contained implementations useful for demos and debugging.
//!
//! - [`LogWriter`]: writes records through `tracing` in a human-readable form.

mod log;

pub use log::LogWriter;
