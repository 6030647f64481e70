use crate::types::Orientation;
use glam::Vec3;
use thiserror::Error;

/// Standard gravity (m/s^2).
const STANDARD_GRAVITY: f32 = 9.806_65;
/// Accelerometer readings below 10% of gravity carry no usable "down".
const FREE_FALL_GRAVITY_SQUARED: f32 = 0.01 * STANDARD_GRAVITY * STANDARD_GRAVITY;
/// Minimum norm of geomagnetic x gravity; below this the field is missing
/// or (anti)parallel to gravity.
const MIN_EAST_NORM: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OrientationError {
    #[error("Accelerometer magnitude too small to derive gravity (free fall?)")]
    FreeFall,
    #[error("Geomagnetic vector is missing or colinear with gravity")]
    DegenerateField,
}

/// Row-major 3x3 rotation taking device coordinates into the
/// east-north-up world frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationMatrix {
    pub rows: [Vec3; 3],
}

impl RotationMatrix {
    /// Build the rotation from an accelerometer reading and a magnetometer
    /// reading taken in the same device frame.
    pub fn from_gravity_and_geomagnetic(
        gravity: Vec3,
        geomagnetic: Vec3,
    ) -> Result<Self, OrientationError> {
        if gravity.length_squared() < FREE_FALL_GRAVITY_SQUARED {
            return Err(OrientationError::FreeFall);
        }

        let east = geomagnetic.cross(gravity);
        let east_norm = east.length();
        // Negated comparison so NaN input is rejected too.
        if !(east_norm >= MIN_EAST_NORM) {
            return Err(OrientationError::DegenerateField);
        }

        let east = east / east_norm;
        let up = gravity.normalize();
        let north = up.cross(east);

        Ok(Self {
            rows: [east, north, up],
        })
    }

    /// Remap axes for a head-mounted device: the device Z axis becomes the
    /// new X axis and the negated device Y axis becomes the new Y axis.
    pub fn remap_for_head_mount(&self) -> Self {
        Self {
            rows: self.rows.map(|r| Vec3::new(r.z, -r.y, r.x)),
        }
    }

    /// Decompose into azimuth/pitch/roll (radians).
    pub fn orientation(&self) -> Orientation {
        let [r0, r1, r2] = self.rows;
        Orientation {
            azimuth: r0.y.atan2(r1.y),
            pitch: (-r2.y).clamp(-1.0, 1.0).asin(),
            roll: (-r2.x).atan2(r2.z),
        }
    }
}

/// One-shot estimate of head orientation from gravity and the geomagnetic field.
pub fn estimate_orientation(
    gravity: Vec3,
    geomagnetic: Vec3,
) -> Result<Orientation, OrientationError> {
    let rotation = RotationMatrix::from_gravity_and_geomagnetic(gravity, geomagnetic)?;
    Ok(rotation.remap_for_head_mount().orientation())
}

/// Keeps the most recent successful orientation estimate.
///
/// A degenerate input pair leaves the previous estimate untouched.
#[derive(Debug, Default)]
pub struct OrientationEstimator {
    orientation: Orientation,
    updates: u64,
}

impl OrientationEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute orientation from a fresh gravity/geomagnetic pair.
    pub fn update(
        &mut self,
        gravity: Vec3,
        geomagnetic: Vec3,
    ) -> Result<Orientation, OrientationError> {
        let orientation = estimate_orientation(gravity, geomagnetic)?;
        self.orientation = orientation;
        self.updates += 1;
        if self.updates % 1000 == 0 {
            tracing::debug!(updates = self.updates, "Orientation updates processed");
        }
        Ok(orientation)
    }

    /// Latest estimate; all zeros until the first successful update.
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }
}
