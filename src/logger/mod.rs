//! Diagnostic output of the tracker.
//!
//! The tracker writes its own diagnostics (lifecycle traces, close notices)
//! through the [`Logger`] trait. The default [`TracingLogger`] forwards to
//! `tracing` under the `callvisor` target; [`NoopLogger`] discards everything.
//!
//! [`stringify`] is the default renderer for captured arguments and results.

mod render;

use std::error::Error;

use tracing::Level;

pub use render::{MAX_RENDERED_LEN, stringify};

/// Boxed error returned by [`Logger::close`].
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Log target used by [`TracingLogger`].
pub const LOG_TARGET: &str = "callvisor";

/// Sink for tracker diagnostics.
pub trait Logger: Send + Sync + 'static {
    fn log(&self, level: Level, message: &str);

    /// Whether messages at `level` are recorded; callers skip formatting otherwise.
    fn enabled(&self, _level: Level) -> bool {
        true
    }

    fn trace(&self, message: &str) {
        self.log(Level::TRACE, message);
    }

    fn debug(&self, message: &str) {
        self.log(Level::DEBUG, message);
    }

    fn info(&self, message: &str) {
        self.log(Level::INFO, message);
    }

    fn error(&self, message: &str) {
        self.log(Level::ERROR, message);
    }

    /// Releases the logger. Called once when the tracker closes; failures are ignored there.
    fn close(&self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Forwards to the `tracing` macros.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, level: Level, message: &str) {
        if level == Level::ERROR {
            tracing::error!(target: LOG_TARGET, "{message}");
        } else if level == Level::WARN {
            tracing::warn!(target: LOG_TARGET, "{message}");
        } else if level == Level::INFO {
            tracing::info!(target: LOG_TARGET, "{message}");
        } else if level == Level::DEBUG {
            tracing::debug!(target: LOG_TARGET, "{message}");
        } else {
            tracing::trace!(target: LOG_TARGET, "{message}");
        }
    }

    fn enabled(&self, level: Level) -> bool {
        if level == Level::ERROR {
            tracing::enabled!(target: LOG_TARGET, Level::ERROR)
        } else if level == Level::WARN {
            tracing::enabled!(target: LOG_TARGET, Level::WARN)
        } else if level == Level::INFO {
            tracing::enabled!(target: LOG_TARGET, Level::INFO)
        } else if level == Level::DEBUG {
            tracing::enabled!(target: LOG_TARGET, Level::DEBUG)
        } else {
            tracing::enabled!(target: LOG_TARGET, Level::TRACE)
        }
    }
}

/// Discards all output.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn log(&self, _level: Level, _message: &str) {}

    fn enabled(&self, _level: Level) -> bool {
        false
    }
}


#[cfg(test)]
mod tests {
    use super::testing::MemoryLogger;
    use super::*;

    #[test]
    fn test_level_helpers_forward_to_log() {
        let logger = MemoryLogger::default();
        logger.trace("a");
        logger.debug("b");
        logger.info("c");
        logger.error("d");
        let levels: Vec<Level> = logger.lines.lock().iter().map(|(l, _)| *l).collect();
        assert_eq!(levels, [Level::TRACE, Level::DEBUG, Level::INFO, Level::ERROR]);
    }

    #[test]
    fn test_noop_logger_is_disabled() {
        let logger = NoopLogger;
        assert!(!logger.enabled(Level::ERROR));
        assert!(logger.close().is_ok());
    }

    #[test]
    fn test_tracing_logger_without_subscriber() {
        let logger = TracingLogger;
        logger.info("nobody listens");
        assert!(!logger.enabled(Level::TRACE));
    }
}
