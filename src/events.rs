//! Event reporting for the sampling loop.
//!
//! The core never configures a global logger. Anything worth reporting goes
//! through an [`EventSink`], and the host decides where it ends up.

use std::sync::Arc;

pub use tracing::Level;

/// Receiver for informational and warning events raised during sampling.
pub trait EventSink: Send + Sync {
    fn emit(&self, level: Level, message: &str);
}

/// Forwards events to the `tracing` macros under the `stochsearch` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, level: Level, message: &str) {
        match level {
            Level::ERROR => tracing::error!(target: "stochsearch", "{message}"),
            Level::WARN => tracing::warn!(target: "stochsearch", "{message}"),
            Level::INFO => tracing::info!(target: "stochsearch", "{message}"),
            Level::DEBUG => tracing::debug!(target: "stochsearch", "{message}"),
            _ => tracing::trace!(target: "stochsearch", "{message}"),
        }
    }
}

/// Drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _level: Level, _message: &str) {}
}

pub(crate) fn default_sink() -> Arc<dyn EventSink> {
    Arc::new(TracingSink)
}

#[cfg(test)]
pub(crate) mod test_sink {
    use std::sync::Mutex;

    use super::{EventSink, Level};

    /// Keeps every event for later inspection.
    #[derive(Debug, Default)]
    pub struct RecordingSink {
        pub events: Mutex<Vec<(Level, String)>>,
    }

    impl RecordingSink {
        pub fn count(&self, level: Level) -> usize {
            self.events
                .lock()
                .expect("Poisoned lock")
                .iter()
                .filter(|(l, _)| *l == level)
                .count()
        }

        pub fn messages(&self) -> Vec<String> {
            self.events
                .lock()
                .expect("Poisoned lock")
                .iter()
                .map(|(_, msg)| msg.clone())
                .collect()
        }
    }

    impl EventSink for RecordingSink {
        fn emit(&self, level: Level, message: &str) {
            self.events
                .lock()
                .expect("Poisoned lock")
                .push((level, message.to_string()));
        }
    }
}
