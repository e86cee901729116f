//! Monitoring configuration.

use std::time::Duration;

use domain::EvaluatorConfig;
use domain::persistence::DEFAULT_PERSISTENCE_BUDGET;

/// Default number of readings kept per order for duplicate suppression.
pub const DEFAULT_HISTORY_CAPACITY: usize = 128;

/// Settings shared by every order monitor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitoringConfig {
    /// Alert thresholds.
    pub evaluator: EvaluatorConfig,

    /// Time budget for each persistence call and each transport publish.
    pub persistence_budget: Duration,

    /// Recent readings remembered per order. Zero is treated as one.
    pub history_capacity: usize,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            evaluator: EvaluatorConfig::default(),
            persistence_budget: DEFAULT_PERSISTENCE_BUDGET,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

impl MonitoringConfig {
    /// Reads the thresholds, `PERSISTENCE_TIMEOUT_MS` and `HISTORY_CAPACITY`
    /// from the environment, keeping defaults for unset or unparsable values.
    /// A zero persistence timeout also falls back to the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            evaluator: EvaluatorConfig::from_lookup(&lookup),
            persistence_budget: lookup("PERSISTENCE_TIMEOUT_MS")
                .and_then(|value| value.trim().parse::<u64>().ok())
                .filter(|millis| *millis > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.persistence_budget),
            history_capacity: lookup("HISTORY_CAPACITY")
                .and_then(|value| value.trim().parse().ok())
                .unwrap_or(defaults.history_capacity),
        }
    }

    pub fn with_evaluator(mut self, evaluator: EvaluatorConfig) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn with_persistence_budget(mut self, budget: Duration) -> Self {
        self.persistence_budget = budget;
        self
    }

    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }
}
