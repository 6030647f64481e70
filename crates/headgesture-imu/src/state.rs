//! Gesture state machine driven by gyroscope bursts.
//!
//! Each gyroscope sample is checked for timeout, gated on wearing and
//! stability, then reduced to a dominant axis and a direction. The pair is
//! looked up in [`TRANSITIONS`] together with the current state; anything not
//! in the table is absorbed without effect.

use crate::classify::Thresholds;
use crate::events::GestureEvent;
use glam::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GestureState {
    #[default]
    Idle,
    ShakeToRight,
    ShakeBackToLeft,
    ShakeToLeft,
    ShakeBackToRight,
    GoDown,
    BackUp,
    GoUp,
    BackDown,
}

impl GestureState {
    /// Event announced when the machine enters this state.
    ///
    /// `azimuth` is the snapshotted azimuth in radians; only [`GestureState::BackUp`]
    /// reports it, converted to degrees.
    pub fn entry_event(self, azimuth: f32) -> Option<GestureEvent> {
        let event = match self {
            GestureState::Idle => return None,
            GestureState::ShakeToRight => GestureEvent::ShakeToRight,
            GestureState::ShakeBackToLeft => GestureEvent::ShakeBackToLeft,
            GestureState::ShakeToLeft => GestureEvent::ShakeToLeft,
            GestureState::ShakeBackToRight => GestureEvent::ShakeBackToRight,
            GestureState::GoDown => GestureEvent::LookDown,
            GestureState::BackUp => GestureEvent::BackLookUp {
                initial_azimuth_degrees: f64::from(azimuth).to_degrees(),
            },
            GestureState::GoUp => GestureEvent::LookUp,
            GestureState::BackDown => GestureEvent::BackLookDown,
        };
        Some(event)
    }
}

/// Gyroscope axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];
}

/// Sign of the dominant angular velocity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Negative,
    Positive,
}

/// One row of the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub axis: Axis,
    pub direction: Direction,
    pub from: GestureState,
    pub to: GestureState,
}

const fn row(axis: Axis, direction: Direction, from: GestureState, to: GestureState) -> Transition {
    Transition {
        axis,
        direction,
        from,
        to,
    }
}

/// Every transition the machine can take. The Z axis never appears.
pub const TRANSITIONS: [Transition; 8] = {
    use Axis::*;
    use Direction::*;
    use GestureState::*;
    [
        row(X, Negative, Idle, ShakeToRight),
        row(X, Negative, ShakeToLeft, ShakeBackToRight),
        row(X, Positive, Idle, ShakeToLeft),
        row(X, Positive, ShakeToRight, ShakeBackToLeft),
        row(Y, Negative, Idle, GoUp),
        row(Y, Negative, GoDown, BackUp),
        row(Y, Positive, Idle, GoDown),
        row(Y, Positive, GoUp, BackDown),
    ]
};

/// Target state for `from` given a movement, if the table has one.
pub fn lookup(from: GestureState, axis: Axis, direction: Direction) -> Option<GestureState> {
    TRANSITIONS
        .iter()
        .find(|t| t.from == from && t.axis == axis && t.direction == direction)
        .map(|t| t.to)
}

/// Axis with the largest absolute angular velocity.
///
/// Ties go to the earlier axis. `None` when every component is zero.
pub fn dominant_axis(angular_velocity: Vec3) -> Option<Axis> {
    let mut best: Option<(Axis, f32)> = None;
    for (axis, value) in Axis::ALL.into_iter().zip(angular_velocity.to_array()) {
        let magnitude = value.abs();
        if best.map_or(magnitude > 0.0, |(_, max)| magnitude > max) {
            best = Some((axis, magnitude));
        }
    }
    best.map(|(axis, _)| axis)
}

/// Direction of `value` when it clears the activation threshold.
fn movement_direction(value: f32, min_movement: f32) -> Option<Direction> {
    if value < -min_movement {
        Some(Direction::Negative)
    } else if value > min_movement {
        Some(Direction::Positive)
    } else {
        None
    }
}

/// Current gesture state plus the bookkeeping needed to advance it.
#[derive(Debug, Clone, Default)]
pub struct StateMachine {
    state: GestureState,
    /// Sensor time of the last transition or timeout reset; `None` means never.
    last_transition_ns: Option<u64>,
    /// Azimuth (radians) at the last worn orientation update.
    last_azimuth: f32,
}

impl StateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    pub fn last_transition_ns(&self) -> Option<u64> {
        self.last_transition_ns
    }

    pub fn last_azimuth(&self) -> f32 {
        self.last_azimuth
    }

    /// Record the azimuth reported with a back-look-up.
    pub fn snapshot_azimuth(&mut self, azimuth: f32) {
        self.last_azimuth = azimuth;
    }

    /// Drop back to idle if a partial gesture has been pending too long.
    ///
    /// Returns true when a reset happened. The reset is silent: no event.
    pub fn expire(&mut self, timestamp_ns: u64, timeout_ns: u64) -> bool {
        if self.state == GestureState::Idle {
            return false;
        }
        let elapsed = self
            .last_transition_ns
            .map_or(u64::MAX, |last| timestamp_ns.saturating_sub(last));
        if elapsed <= timeout_ns {
            return false;
        }

        tracing::debug!(from = ?self.state, elapsed_ns = elapsed, "state timeout");
        self.state = GestureState::Idle;
        self.last_transition_ns = Some(timestamp_ns);
        true
    }

    /// Process one gyroscope sample.
    ///
    /// The timeout check always runs first; the wearing and stability gates
    /// only suppress transitions.
    pub fn on_angular_velocity(
        &mut self,
        angular_velocity: Vec3,
        timestamp_ns: u64,
        worn: bool,
        thresholds: &Thresholds,
    ) -> Option<GestureEvent> {
        self.expire(timestamp_ns, thresholds.state_timeout_ns);

        if !worn {
            tracing::trace!("Device not worn, ignoring gyroscope sample");
            return None;
        }
        if thresholds.is_stable(angular_velocity) {
            return None;
        }

        let axis = dominant_axis(angular_velocity)?;
        let value = angular_velocity.to_array()[axis as usize];
        let direction = movement_direction(value, thresholds.min_movement_angular_velocity)?;
        let next = lookup(self.state, axis, direction)?;

        tracing::debug!(from = ?self.state, to = ?next, ?axis, value, "Gesture transition");
        self.state = next;
        self.last_transition_ns = Some(timestamp_ns);
        next.entry_event(self.last_azimuth)
    }
}
