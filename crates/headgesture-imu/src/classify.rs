//! Wearing and stability predicates.

use crate::types::Orientation;
use glam::Vec3;

/// Below this on every axis the head counts as still (rad/s).
pub const STABLE_ANGULAR_VELOCITY: f32 = 0.10;
/// Dominant-axis speed needed to move the gesture state machine (rad/s).
pub const MIN_MOVEMENT_ANGULAR_VELOCITY: f32 = 1.00;
/// A partial gesture must complete within this window.
pub const STATE_TIMEOUT_NS: u64 = 1_000_000_000;
/// Pitch envelope half-width while worn (degrees, exclusive).
pub const MAX_WEAR_PITCH_DEG: f32 = 10.0;
/// Roll envelope half-width while worn (degrees, exclusive).
pub const MAX_WEAR_ROLL_DEG: f32 = 40.0;

/// Tunable limits for classification and gesture detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub stable_angular_velocity: f32,
    pub min_movement_angular_velocity: f32,
    pub state_timeout_ns: u64,
    /// Radians.
    pub max_wear_pitch: f32,
    /// Radians.
    pub max_wear_roll: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            stable_angular_velocity: STABLE_ANGULAR_VELOCITY,
            min_movement_angular_velocity: MIN_MOVEMENT_ANGULAR_VELOCITY,
            state_timeout_ns: STATE_TIMEOUT_NS,
            max_wear_pitch: MAX_WEAR_PITCH_DEG.to_radians(),
            max_wear_roll: MAX_WEAR_ROLL_DEG.to_radians(),
        }
    }
}

impl Thresholds {
    /// True when pitch and roll sit strictly inside the wearing envelope.
    pub fn is_worn(&self, pitch: f32, roll: f32) -> bool {
        pitch > -self.max_wear_pitch
            && pitch < self.max_wear_pitch
            && roll > -self.max_wear_roll
            && roll < self.max_wear_roll
    }

    pub fn is_worn_orientation(&self, orientation: &Orientation) -> bool {
        self.is_worn(orientation.pitch, orientation.roll)
    }

    /// True when every axis is below the stability limit.
    pub fn is_stable(&self, angular_velocity: Vec3) -> bool {
        angular_velocity
            .abs()
            .cmplt(Vec3::splat(self.stable_angular_velocity))
            .all()
    }
}

/// [`Thresholds::is_worn`] with the default envelope.
pub fn is_worn(pitch: f32, roll: f32) -> bool {
    Thresholds::default().is_worn(pitch, roll)
}

/// [`Thresholds::is_stable`] with the default limit.
pub fn is_stable(angular_velocity: Vec3) -> bool {
    Thresholds::default().is_stable(angular_velocity)
}
