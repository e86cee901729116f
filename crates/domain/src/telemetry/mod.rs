//! Telemetry values, thresholds and the alert evaluator.

mod config;
mod evaluator;
mod reading;
mod values;

pub use config::{ConfigError, EvaluatorConfig, Thresholds};
pub use evaluator::{Alert, AlertLevel, AlertType, TelemetryEvaluator};
pub use reading::{ProcessedReading, TelemetryReading};
pub use values::{Angle, ImageSize, Orientation, Proximity, TelemetrySnapshot};
