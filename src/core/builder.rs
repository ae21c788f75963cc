use std::fmt;
use std::sync::Arc;

use rand::Rng;
use rand::distr::Alphanumeric;

use crate::core::clock::{Clock, MonotonicClock};
use crate::core::config::TrackerConfig;
use crate::core::tracker::{InvocationTracker, TrackerInner};
use crate::error::ConfigError;
use crate::logger::{Logger, TracingLogger};
use crate::stack::InvocationStack;

/// Builder for [`InvocationTracker`] with pluggable collaborators.
///
/// Defaults: [`TracingLogger`], [`MonotonicClock`], and the stack selected by
/// `TrackerConfig::stack`.
pub struct TrackerBuilder {
    cfg: TrackerConfig,
    logger: Option<Arc<dyn Logger>>,
    clock: Option<Arc<dyn Clock>>,
    stack: Option<Arc<dyn InvocationStack>>,
}

impl TrackerBuilder {
    pub fn new(cfg: TrackerConfig) -> Self {
        Self {
            cfg,
            logger: None,
            clock: None,
            stack: None,
        }
    }

    /// Replaces the diagnostic logger.
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Replaces the time source used for durations.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Uses a custom stack instead of `TrackerConfig::stack`.
    ///
    /// The tracker closes the stack when it closes.
    pub fn with_stack(mut self, stack: Arc<dyn InvocationStack>) -> Self {
        self.stack = Some(stack);
        self
    }

    /// Validates the configuration and builds the tracker.
    pub fn build(self) -> Result<InvocationTracker, ConfigError> {
        self.cfg.validate()?;
        Ok(self.assemble())
    }

    /// Builds without validation; callers guarantee a valid configuration.
    pub(crate) fn assemble(self) -> InvocationTracker {
        let id: Arc<str> = random_id(self.cfg.id_length).into();
        let stack = self.stack.unwrap_or_else(|| self.cfg.stack.build());
        let logger = self.logger.unwrap_or_else(|| Arc::new(TracingLogger));
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(MonotonicClock::new()));
        InvocationTracker::from_inner(TrackerInner::new(id, self.cfg, stack, logger, clock))
    }
}

impl fmt::Debug for TrackerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackerBuilder")
            .field("cfg", &self.cfg)
            .field("custom_logger", &self.logger.is_some())
            .field("custom_clock", &self.clock.is_some())
            .field("custom_stack", &self.stack.is_some())
            .finish()
    }
}

fn random_id(len: usize) -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
