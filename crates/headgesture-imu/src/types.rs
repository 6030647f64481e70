use glam::Vec3;
use std::time::Duration;

/// The three sensor kinds the detector consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKind {
    MagneticField,
    Accelerometer,
    Gyroscope,
}

impl SensorKind {
    /// Every kind, in registration order.
    pub const ALL: [SensorKind; 3] = [
        SensorKind::MagneticField,
        SensorKind::Accelerometer,
        SensorKind::Gyroscope,
    ];

    /// Rate the detector requests for this kind.
    ///
    /// Orientation needs fresh magnetic and accelerometer pairs, gestures only
    /// need coarse gyroscope bursts.
    pub fn default_rate(self) -> SensorRate {
        match self {
            SensorKind::MagneticField | SensorKind::Accelerometer => SensorRate::Fastest,
            SensorKind::Gyroscope => SensorRate::Normal,
        }
    }
}

/// Requested delivery rate for a sensor subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorRate {
    /// As fast as the hardware delivers.
    Fastest,
    /// Roughly 5 Hz.
    Normal,
}

impl SensorRate {
    /// Nominal interval between samples at this rate.
    pub fn nominal_period(self) -> Duration {
        match self {
            SensorRate::Fastest => Duration::ZERO,
            SensorRate::Normal => Duration::from_millis(200),
        }
    }
}

/// Accuracy flag reported alongside each sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SensorAccuracy {
    Unreliable,
    Low,
    Medium,
    #[default]
    High,
}

/// Payload of one sensor sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SensorReading {
    /// Geomagnetic field (μT).
    MagneticField { values: Vec3 },
    /// Gravity plus linear acceleration (m/s^2).
    Accelerometer { values: Vec3 },
    /// Angular velocity (rad/s) with its monotonic sensor timestamp.
    Gyroscope { values: Vec3, timestamp_ns: u64 },
}

impl SensorReading {
    pub fn kind(&self) -> SensorKind {
        match self {
            SensorReading::MagneticField { .. } => SensorKind::MagneticField,
            SensorReading::Accelerometer { .. } => SensorKind::Accelerometer,
            SensorReading::Gyroscope { .. } => SensorKind::Gyroscope,
        }
    }
}

/// A sample as delivered by a sensor source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorEvent {
    pub reading: SensorReading,
    pub accuracy: SensorAccuracy,
}

impl SensorEvent {
    pub fn magnetic(values: Vec3) -> Self {
        Self {
            reading: SensorReading::MagneticField { values },
            accuracy: SensorAccuracy::High,
        }
    }

    pub fn accelerometer(values: Vec3) -> Self {
        Self {
            reading: SensorReading::Accelerometer { values },
            accuracy: SensorAccuracy::High,
        }
    }

    pub fn gyroscope(values: Vec3, timestamp_ns: u64) -> Self {
        Self {
            reading: SensorReading::Gyroscope {
                values,
                timestamp_ns,
            },
            accuracy: SensorAccuracy::High,
        }
    }

    pub fn with_accuracy(mut self, accuracy: SensorAccuracy) -> Self {
        self.accuracy = accuracy;
        self
    }

    pub fn kind(&self) -> SensorKind {
        self.reading.kind()
    }
}

/// Head orientation derived from gravity and the geomagnetic field.
///
/// All angles are radians. The default is all zeros, which is what the
/// detector reports until the first usable accelerometer/magnetometer pair.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Orientation {
    /// Rotation around the vertical axis.
    pub azimuth: f32,
    /// Rotation around the lateral axis.
    pub pitch: f32,
    /// Rotation around the longitudinal axis.
    pub roll: f32,
}

impl Orientation {
    /// `[azimuth, pitch, roll]` packed into a vector.
    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(self.azimuth, self.pitch, self.roll)
    }
}
