//! Threshold configuration for the telemetry evaluator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejected threshold configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{dimension} thresholds must be finite and non-negative")]
    InvalidThreshold { dimension: &'static str },

    #[error(
        "{dimension} critical threshold {critical} is less severe than warning threshold {warning}"
    )]
    Inverted {
        dimension: &'static str,
        warning: f64,
        critical: f64,
    },
}

/// Which way a reading gets worse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Smaller readings are worse (distance, frame size).
    LowerIsWorse,
    /// Larger readings are worse (tilt).
    HigherIsWorse,
}

/// Warning and critical limits for one dimension.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub warning: f64,
    pub critical: f64,
}

impl Thresholds {
    pub fn new(warning: f64, critical: f64) -> Self {
        Self { warning, critical }
    }

    fn validate(&self, dimension: &'static str, severity: Severity) -> Result<(), ConfigError> {
        let valid = |v: f64| v.is_finite() && v >= 0.0;
        if !valid(self.warning) || !valid(self.critical) {
            return Err(ConfigError::InvalidThreshold { dimension });
        }
        let inverted = match severity {
            Severity::LowerIsWorse => self.critical > self.warning,
            Severity::HigherIsWorse => self.critical < self.warning,
        };
        if inverted {
            return Err(ConfigError::Inverted {
                dimension,
                warning: self.warning,
                critical: self.critical,
            });
        }
        Ok(())
    }
}

/// Thresholds for every telemetry dimension.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluatorConfig {
    /// Obstacle distance in metres; lower is worse.
    pub proximity: Thresholds,

    /// Absolute roll or pitch in degrees; higher is worse.
    pub angle: Thresholds,

    /// Camera frame size in bytes; lower is worse.
    pub camera: Thresholds,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            proximity: Thresholds::new(1.0, 0.3),
            angle: Thresholds::new(30.0, 45.0),
            camera: Thresholds::new(2048.0, 512.0),
        }
    }
}

impl EvaluatorConfig {
    /// Reads `PROXIMITY_WARNING`, `PROXIMITY_CRITICAL`, `ANGLE_WARNING`,
    /// `ANGLE_CRITICAL`, `CAMERA_WARNING` and `CAMERA_CRITICAL`, keeping the
    /// default for any variable that is unset or not a number.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`EvaluatorConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str, fallback: f64| {
            lookup(key)
                .and_then(|value| value.trim().parse().ok())
                .unwrap_or(fallback)
        };
        let defaults = Self::default();
        Self {
            proximity: Thresholds::new(
                read("PROXIMITY_WARNING", defaults.proximity.warning),
                read("PROXIMITY_CRITICAL", defaults.proximity.critical),
            ),
            angle: Thresholds::new(
                read("ANGLE_WARNING", defaults.angle.warning),
                read("ANGLE_CRITICAL", defaults.angle.critical),
            ),
            camera: Thresholds::new(
                read("CAMERA_WARNING", defaults.camera.warning),
                read("CAMERA_CRITICAL", defaults.camera.critical),
            ),
        }
    }

    /// Checks that each critical limit is at least as severe as its warning limit.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.proximity
            .validate("proximity", Severity::LowerIsWorse)?;
        self.angle.validate("angle", Severity::HigherIsWorse)?;
        self.camera.validate("camera", Severity::LowerIsWorse)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(EvaluatorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_inverted_proximity_is_rejected() {
        let config = EvaluatorConfig {
            proximity: Thresholds::new(0.3, 1.0),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Inverted {
                dimension: "proximity",
                ..
            })
        ));
    }

    #[test]
    fn test_inverted_angle_is_rejected() {
        let config = EvaluatorConfig {
            angle: Thresholds::new(45.0, 30.0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_equal_thresholds_are_allowed() {
        let config = EvaluatorConfig {
            camera: Thresholds::new(1024.0, 1024.0),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_overrides_and_falls_back() {
        let config = EvaluatorConfig::from_lookup(|key| match key {
            "PROXIMITY_WARNING" => Some("2.5".into()),
            "ANGLE_CRITICAL" => Some("not a number".into()),
            _ => None,
        });
        assert_eq!(config.proximity, Thresholds::new(2.5, 0.3));
        assert_eq!(config.angle, EvaluatorConfig::default().angle);
        assert_eq!(config.camera, EvaluatorConfig::default().camera);
    }

    #[test]
    fn test_negative_threshold_is_rejected() {
        let config = EvaluatorConfig {
            angle: Thresholds::new(-1.0, 45.0),
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidThreshold { dimension: "angle" })
        );
    }
}
