//! Maps a telemetry snapshot to an alert level and the dimension that caused it.

use serde::{Deserialize, Serialize};

use super::config::{ConfigError, EvaluatorConfig, Thresholds};
use super::values::TelemetrySnapshot;

/// How dangerous a reading is. Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertLevel {
    Stable,
    Warning,
    Critical,
}

impl AlertLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Stable => "STABLE",
            AlertLevel::Warning => "WARNING",
            AlertLevel::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The telemetry dimension behind an alert.
///
/// Declaration order is the tie-break priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    Distance,
    Angle,
    Camera,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::Distance => "DISTANCE",
            AlertType::Angle => "ANGLE",
            AlertType::Camera => "CAMERA",
        }
    }
}

impl std::fmt::Display for AlertType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of evaluating one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub level: AlertLevel,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
}

impl Alert {
    pub fn new(level: AlertLevel, alert_type: AlertType) -> Self {
        Self { level, alert_type }
    }

    pub fn is_critical(&self) -> bool {
        self.level == AlertLevel::Critical
    }
}

/// Pure, stateless evaluator over injectable thresholds.
#[derive(Debug, Clone, Copy)]
pub struct TelemetryEvaluator {
    config: EvaluatorConfig,
}

impl Default for TelemetryEvaluator {
    fn default() -> Self {
        Self {
            config: EvaluatorConfig::default(),
        }
    }
}

impl TelemetryEvaluator {
    /// Creates an evaluator, rejecting inconsistent thresholds.
    pub fn new(config: EvaluatorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Returns the most severe level across the populated dimensions.
    ///
    /// Ties go to distance, then angle, then camera. An empty snapshot is
    /// stable distance.
    pub fn evaluate(&self, snapshot: &TelemetrySnapshot) -> Alert {
        let candidates = [
            snapshot
                .proximity
                .map(|p| (lower_is_worse(p.distance(), &self.config.proximity), AlertType::Distance)),
            snapshot
                .accelerometer
                .map(|o| (higher_is_worse(o.tilt(), &self.config.angle), AlertType::Angle)),
            snapshot
                .camera
                .map(|c| (lower_is_worse(c.bytes() as f64, &self.config.camera), AlertType::Camera)),
        ];

        let mut worst: Option<Alert> = None;
        for (level, alert_type) in candidates.into_iter().flatten() {
            match worst {
                Some(current) if current.level >= level => {}
                _ => worst = Some(Alert::new(level, alert_type)),
            }
        }
        worst.unwrap_or(Alert::new(AlertLevel::Stable, AlertType::Distance))
    }
}

fn lower_is_worse(value: f64, thresholds: &Thresholds) -> AlertLevel {
    if value <= thresholds.critical {
        AlertLevel::Critical
    } else if value <= thresholds.warning {
        AlertLevel::Warning
    } else {
        AlertLevel::Stable
    }
}

fn higher_is_worse(value: f64, thresholds: &Thresholds) -> AlertLevel {
    if value >= thresholds.critical {
        AlertLevel::Critical
    } else if value >= thresholds.warning {
        AlertLevel::Warning
    } else {
        AlertLevel::Stable
    }
}
