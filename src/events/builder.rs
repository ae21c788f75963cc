use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use crate::events::{ChangeEvent, EventNotifier};

pub(crate) type ChangeHook = Arc<dyn Fn(ChangeEvent) + Send + Sync>;

/// Notifier settings.
///
/// - `debounce`: delay applied to `notify` calls; `Duration::ZERO` disables debouncing
#[derive(Clone, Debug, Default)]
pub struct NotifierConfig {
    pub debounce: Duration,
}

impl NotifierConfig {
    /// Returns the debounce delay, or `None` when notifications are delivered directly.
    #[inline]
    pub fn debounce_delay(&self) -> Option<Duration> {
        if self.debounce.is_zero() {
            None
        } else {
            Some(self.debounce)
        }
    }
}

/// Builder for [`EventNotifier`].
///
/// Debounced notifiers spawn timers and must be used inside a Tokio runtime.
pub struct NotifierBuilder<T> {
    cfg: NotifierConfig,
    on_change: Option<ChangeHook>,
    _marker: PhantomData<fn(T)>,
}

impl<T> NotifierBuilder<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(cfg: NotifierConfig) -> Self {
        Self {
            cfg,
            on_change: None,
            _marker: PhantomData,
        }
    }

    /// Delays delivery; a burst of notifications delivers only the last value.
    pub fn debounce(mut self, delay: Duration) -> Self {
        self.cfg.debounce = delay;
        self
    }

    /// Hook called after listeners or the waiter are added, removed or resolved, and on close.
    pub fn on_change<F>(mut self, hook: F) -> Self
    where
        F: Fn(ChangeEvent) + Send + Sync + 'static,
    {
        self.on_change = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> EventNotifier<T> {
        EventNotifier::from_parts(self.cfg, self.on_change)
    }
}

impl<T> fmt::Debug for NotifierBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifierBuilder")
            .field("cfg", &self.cfg)
            .field("on_change", &self.on_change.is_some())
            .finish()
    }
}
