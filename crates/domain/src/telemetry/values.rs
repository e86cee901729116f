//! Sensor value types carried in a telemetry snapshot.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Distance to the nearest obstacle, in metres.
///
/// Stored rounded to two decimal places, ties to even.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Proximity(f64);

impl Proximity {
    pub fn new(distance: f64) -> Result<Self, ValidationError> {
        if !distance.is_finite() || distance < 0.0 {
            return Err(ValidationError::InvalidProximity(distance));
        }
        // Scaling can overflow for values near f64::MAX.
        let rounded = (distance * 100.0).round_ties_even() / 100.0;
        if !rounded.is_finite() {
            return Err(ValidationError::InvalidProximity(distance));
        }
        Ok(Self(rounded))
    }

    pub fn distance(&self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Proximity {
    type Error = ValidationError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Proximity> for f64 {
    fn from(value: Proximity) -> Self {
        value.0
    }
}

/// One orientation angle in degrees, within [-180, 180].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Angle(f64);

impl Angle {
    pub const MIN: f64 = -180.0;
    pub const MAX: f64 = 180.0;

    pub fn new(degrees: f64) -> Result<Self, ValidationError> {
        if !(Self::MIN..=Self::MAX).contains(&degrees) {
            return Err(ValidationError::AngleOutOfRange(degrees));
        }
        Ok(Self(degrees))
    }

    pub fn degrees(&self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Angle {
    type Error = ValidationError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Angle> for f64 {
    fn from(value: Angle) -> Self {
        value.0
    }
}

/// Accelerometer reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    pub roll: Angle,
    pub pitch: Angle,
    pub yaw: Angle,
}

impl Orientation {
    pub fn new(roll: f64, pitch: f64, yaw: f64) -> Result<Self, ValidationError> {
        Ok(Self {
            roll: Angle::new(roll)?,
            pitch: Angle::new(pitch)?,
            yaw: Angle::new(yaw)?,
        })
    }

    /// Largest absolute tilt over roll and pitch. Yaw is a heading, not a tilt.
    pub fn tilt(&self) -> f64 {
        self.roll.0.abs().max(self.pitch.0.abs())
    }
}

/// Size of one camera frame, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u64")]
pub struct ImageSize(u64);

impl ImageSize {
    pub fn new(bytes: u64) -> Self {
        Self(bytes)
    }

    pub fn bytes(&self) -> u64 {
        self.0
    }
}

impl TryFrom<i64> for ImageSize {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u64::try_from(value)
            .map(Self)
            .map_err(|_| ValidationError::NegativeImageSize(value))
    }
}

impl From<ImageSize> for u64 {
    fn from(value: ImageSize) -> Self {
        value.0
    }
}

/// One point-in-time bundle of sensor readings. Any dimension may be missing.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proximity: Option<Proximity>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accelerometer: Option<Orientation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera: Option<ImageSize>,
}

impl TelemetrySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_proximity(mut self, proximity: Proximity) -> Self {
        self.proximity = Some(proximity);
        self
    }

    pub fn with_accelerometer(mut self, orientation: Orientation) -> Self {
        self.accelerometer = Some(orientation);
        self
    }

    pub fn with_camera(mut self, camera: ImageSize) -> Self {
        self.camera = Some(camera);
        self
    }

    /// Returns true if no dimension is populated.
    pub fn is_empty(&self) -> bool {
        self.proximity.is_none() && self.accelerometer.is_none() && self.camera.is_none()
    }
}
