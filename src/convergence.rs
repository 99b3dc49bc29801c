use std::sync::Arc;

use crate::{
    events::{default_sink, EventSink, Level},
    tracker::{BestSampleTracker, ImprovementHistory},
};

/// Settings for early stopping of a stochastic search
#[derive(Debug, Clone, Copy)]
pub struct ConvergenceSettings {
    /// Stop once more than this many consecutive updates failed to improve.
    /// Also the window length of the trailing-mean criterion.
    pub tolerance: u64,
    /// If set, also stop when the mean of the last `tolerance` improvements
    /// drops below this value.
    pub min_mean_improvement: Option<f64>,
}

impl Default for ConvergenceSettings {
    fn default() -> ConvergenceSettings {
        ConvergenceSettings {
            tolerance: 100,
            min_mean_improvement: None,
        }
    }
}

/// Decides when a stochastic search has stalled.
///
/// The recommendation is advisory: the driving loop decides whether to stop.
pub struct ConvergenceMonitor {
    settings: ConvergenceSettings,
    sink: Arc<dyn EventSink>,
}

impl ConvergenceMonitor {
    pub fn new(settings: ConvergenceSettings) -> ConvergenceMonitor {
        ConvergenceMonitor {
            settings,
            sink: default_sink(),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub(crate) fn set_sink(&mut self, sink: Arc<dyn EventSink>) {
        self.sink = sink;
    }

    pub fn settings(&self) -> &ConvergenceSettings {
        &self.settings
    }

    pub fn should_stop(&self, history: &ImprovementHistory, no_improvement_count: u64) -> bool {
        if history.is_empty() {
            return false;
        }

        let tolerance = self.settings.tolerance;
        if no_improvement_count > tolerance {
            self.sink.emit(
                Level::WARN,
                &format!(
                    "Too little improvement for {tolerance} iterations - Abort searching"
                ),
            );
            return true;
        }

        if let Some(min_mean) = self.settings.min_mean_improvement {
            let window = usize::try_from(tolerance).unwrap_or(usize::MAX);
            if let Some(mean) = history.trailing_mean(window) {
                if mean < min_mean {
                    self.sink.emit(
                        Level::WARN,
                        &format!(
                            "Mean of the last {tolerance} improvements is {mean}, \
                             below {min_mean} - Abort searching"
                        ),
                    );
                    return true;
                }
            }
        }

        false
    }

    /// [`should_stop`](Self::should_stop) fed from a tracker.
    pub fn check<S: Clone>(&self, tracker: &BestSampleTracker<S>) -> bool {
        self.should_stop(tracker.history(), tracker.no_improvement_count())
    }
}
