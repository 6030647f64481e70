use crate::classify::Thresholds;
use crate::events::{GestureEvent, HeadGestureListener};
use crate::fusion::OrientationEstimator;
use crate::state::{GestureState, StateMachine};
use crate::types::{Orientation, SensorAccuracy, SensorEvent, SensorReading};
use glam::Vec3;

/// Turns a serial stream of sensor samples into head gesture events.
///
/// All state lives here and is only touched by [`HeadGestureDetector::on_sensor_event`],
/// so callers delivering from several threads must serialise access.
pub struct HeadGestureDetector {
    thresholds: Thresholds,
    estimator: OrientationEstimator,
    /// Most recent magnetometer reading.
    magnetic: Option<Vec3>,
    machine: StateMachine,
    listener: Option<Box<dyn HeadGestureListener>>,
}

impl HeadGestureDetector {
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            thresholds,
            estimator: OrientationEstimator::new(),
            magnetic: None,
            machine: StateMachine::new(),
            listener: None,
        }
    }

    /// Replace the listener, returning the previous one.
    pub fn set_listener(
        &mut self,
        listener: Option<Box<dyn HeadGestureListener>>,
    ) -> Option<Box<dyn HeadGestureListener>> {
        std::mem::replace(&mut self.listener, listener)
    }

    pub fn has_listener(&self) -> bool {
        self.listener.is_some()
    }

    /// Latest orientation, whether or not it was worn.
    pub fn orientation(&self) -> Orientation {
        self.estimator.orientation()
    }

    pub fn state(&self) -> GestureState {
        self.machine.state()
    }

    pub fn machine(&self) -> &StateMachine {
        &self.machine
    }

    /// Wearing classification of the latest orientation.
    pub fn is_worn(&self) -> bool {
        self.thresholds.is_worn_orientation(&self.orientation())
    }

    /// Handle one sample and deliver any resulting event to the listener.
    ///
    /// The event is returned as well, so it is observable even with no
    /// listener registered.
    pub fn on_sensor_event(&mut self, event: &SensorEvent) -> Option<GestureEvent> {
        if event.accuracy == SensorAccuracy::Unreliable {
            // Observed only; unreliable samples are processed like any other.
            tracing::trace!(kind = ?event.kind(), "Unreliable sensor sample");
        }

        let emitted = match event.reading {
            SensorReading::MagneticField { values } => {
                self.magnetic = Some(values);
                None
            }
            SensorReading::Accelerometer { values } => self.on_accelerometer(values),
            SensorReading::Gyroscope {
                values,
                timestamp_ns,
            } => {
                let worn = self.is_worn();
                self.machine
                    .on_angular_velocity(values, timestamp_ns, worn, &self.thresholds)
            }
        };

        if let Some(event) = emitted {
            if let Some(listener) = self.listener.as_deref_mut() {
                event.dispatch(listener);
            }
        }
        emitted
    }

    fn on_accelerometer(&mut self, gravity: Vec3) -> Option<GestureEvent> {
        let Some(geomagnetic) = self.magnetic else {
            tracing::trace!("No geomagnetic sample yet, skipping orientation update");
            return None;
        };

        let orientation = match self.estimator.update(gravity, geomagnetic) {
            Ok(orientation) => orientation,
            Err(e) => {
                tracing::trace!(?e, "Keeping previous orientation");
                return None;
            }
        };

        if !self.thresholds.is_worn_orientation(&orientation) {
            return None;
        }
        self.machine.snapshot_azimuth(orientation.azimuth);
        Some(GestureEvent::OrientationChanged(orientation.to_vec3()))
    }
}

impl Default for HeadGestureDetector {
    fn default() -> Self {
        Self::new(Thresholds::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    const MS: u64 = 1_000_000;
    const GRAVITY: f32 = 9.81;

    fn listening() -> (HeadGestureDetector, mpsc::UnboundedReceiver<GestureEvent>) {
        let (tx, rx) = mpsc::unbounded_channel::<GestureEvent>();
        let mut detector = HeadGestureDetector::default();
        detector.set_listener(Some(Box::new(tx)));
        (detector, rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<GestureEvent>) -> Vec<GestureEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Upright head facing `azimuth_deg`.
    fn wear_facing(detector: &mut HeadGestureDetector, azimuth_deg: f32) -> Option<GestureEvent> {
        let a = azimuth_deg.to_radians();
        detector.on_sensor_event(&SensorEvent::magnetic(
            Vec3::new(0.0, -a.cos(), -a.sin()) * 40.0,
        ));
        detector.on_sensor_event(&SensorEvent::accelerometer(Vec3::new(GRAVITY, 0.0, 0.0)))
    }

    /// Head rolled 50 degrees, outside the wearing envelope.
    fn take_off(detector: &mut HeadGestureDetector) -> Option<GestureEvent> {
        let r = 50.0_f32.to_radians();
        detector.on_sensor_event(&SensorEvent::magnetic(Vec3::new(0.0, -40.0, 0.0)));
        detector.on_sensor_event(&SensorEvent::accelerometer(
            Vec3::new(r.cos(), 0.0, -r.sin()) * GRAVITY,
        ))
    }

    fn gyro(detector: &mut HeadGestureDetector, v: [f32; 3], t: u64) -> Option<GestureEvent> {
        detector.on_sensor_event(&SensorEvent::gyroscope(Vec3::from_array(v), t))
    }

    #[test]
    fn shake_sequence_end_to_end() {
        let (mut detector, mut rx) = listening();
        assert!(matches!(
            wear_facing(&mut detector, 0.0),
            Some(GestureEvent::OrientationChanged(_))
        ));
        drain(&mut rx);

        gyro(&mut detector, [-1.5, 0.0, 0.0], 10 * MS);
        assert_eq!(drain(&mut rx), vec![GestureEvent::ShakeToRight]);
        assert_eq!(detector.state(), GestureState::ShakeToRight);

        gyro(&mut detector, [1.5, 0.0, 0.0], 600 * MS);
        assert_eq!(drain(&mut rx), vec![GestureEvent::ShakeBackToLeft]);
        assert_eq!(detector.state(), GestureState::ShakeBackToLeft);
    }

    #[test]
    fn timeout_reset_fires_no_event() {
        let (mut detector, mut rx) = listening();
        wear_facing(&mut detector, 0.0);
        gyro(&mut detector, [-1.5, 0.0, 0.0], 0);
        drain(&mut rx);

        gyro(&mut detector, [0.01, 0.0, 0.0], 1_200 * MS);
        assert_eq!(detector.state(), GestureState::Idle);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn not_worn_blocks_gestures_and_orientation_events() {
        let (mut detector, mut rx) = listening();
        assert_eq!(take_off(&mut detector), None);
        assert!(!detector.is_worn());

        assert_eq!(gyro(&mut detector, [-1.5, 0.0, 0.0], 0), None);
        assert_eq!(detector.state(), GestureState::Idle);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn steep_pitch_is_not_worn() {
        let mut detector = HeadGestureDetector::default();
        detector.on_sensor_event(&SensorEvent::magnetic(Vec3::new(0.0, 0.0, -40.0)));
        assert_eq!(
            detector.on_sensor_event(&SensorEvent::accelerometer(Vec3::new(0.0, GRAVITY, 0.0))),
            None
        );
        assert!((detector.orientation().pitch.to_degrees() - 90.0).abs() < 1e-3);
        assert!(!detector.is_worn());
    }

    #[test]
    fn defaults_count_as_worn_before_any_orientation() {
        let mut detector = HeadGestureDetector::default();
        assert!(detector.is_worn());
        assert_eq!(
            gyro(&mut detector, [0.0, -1.5, 0.0], 0),
            Some(GestureEvent::LookUp)
        );
    }

    #[test]
    fn tie_break_uses_x_axis() {
        let (mut detector, mut rx) = listening();
        gyro(&mut detector, [1.2, 1.2, 0.0], 0);
        assert_eq!(drain(&mut rx), vec![GestureEvent::ShakeToLeft]);
    }

    #[test]
    fn back_look_up_reports_snapshotted_azimuth() {
        let (mut detector, mut rx) = listening();
        wear_facing(&mut detector, 45.0);
        gyro(&mut detector, [0.0, 1.5, 0.0], 0);
        gyro(&mut detector, [0.0, -1.5, 0.0], 300 * MS);

        let events = drain(&mut rx);
        assert_eq!(events.len(), 3);
        assert_eq!(events[1], GestureEvent::LookDown);
        match events[2] {
            GestureEvent::BackLookUp {
                initial_azimuth_degrees,
            } => assert!((initial_azimuth_degrees - 45.0).abs() < 1e-2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unworn_orientation_does_not_refresh_snapshot() {
        let (mut detector, mut rx) = listening();
        wear_facing(&mut detector, 45.0);
        gyro(&mut detector, [0.0, 1.5, 0.0], 0);
        assert_eq!(detector.state(), GestureState::GoDown);

        take_off(&mut detector);
        assert!(detector.orientation().azimuth.to_degrees().abs() < 1e-2);
        assert!((detector.machine().last_azimuth().to_degrees() - 45.0).abs() < 1e-2);

        // Worn again before the head comes back up.
        wear_facing(&mut detector, 45.0);
        drain(&mut rx);
        gyro(&mut detector, [0.0, -1.5, 0.0], 300 * MS);
        match drain(&mut rx).as_slice() {
            [GestureEvent::BackLookUp {
                initial_azimuth_degrees,
            }] => assert!((initial_azimuth_degrees - 45.0).abs() < 1e-2),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(detector.state(), GestureState::BackUp);
    }

    #[test]
    fn degenerate_input_keeps_previous_orientation() {
        let (mut detector, mut rx) = listening();
        wear_facing(&mut detector, 45.0);
        let before = detector.orientation();
        drain(&mut rx);

        detector.on_sensor_event(&SensorEvent::magnetic(Vec3::ZERO));
        assert_eq!(
            detector.on_sensor_event(&SensorEvent::accelerometer(Vec3::new(GRAVITY, 0.0, 0.0))),
            None
        );
        assert_eq!(detector.orientation(), before);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn accelerometer_without_magnetometer_is_ignored() {
        let mut detector = HeadGestureDetector::default();
        assert_eq!(
            detector.on_sensor_event(&SensorEvent::accelerometer(Vec3::new(0.0, GRAVITY, 0.0))),
            None
        );
        assert_eq!(detector.orientation(), Orientation::default());
    }

    #[test]
    fn missing_listener_still_advances_state() {
        let mut detector = HeadGestureDetector::default();
        assert!(!detector.has_listener());
        assert_eq!(
            gyro(&mut detector, [0.0, 1.5, 0.0], 0),
            Some(GestureEvent::LookDown)
        );
        assert_eq!(detector.state(), GestureState::GoDown);
    }

    #[test]
    fn unreliable_samples_are_processed() {
        let mut detector = HeadGestureDetector::default();
        let event = SensorEvent::gyroscope(Vec3::new(-1.5, 0.0, 0.0), 0)
            .with_accuracy(SensorAccuracy::Unreliable);
        assert_eq!(
            detector.on_sensor_event(&event),
            Some(GestureEvent::ShakeToRight)
        );
    }

    #[test]
    fn replacing_listener_redirects_events() {
        let (mut detector, mut first) = listening();
        gyro(&mut detector, [-1.5, 0.0, 0.0], 0);

        let (tx, mut second) = mpsc::unbounded_channel::<GestureEvent>();
        assert!(detector.set_listener(Some(Box::new(tx))).is_some());
        gyro(&mut detector, [1.5, 0.0, 0.0], 100 * MS);

        assert_eq!(drain(&mut first), vec![GestureEvent::ShakeToRight]);
        assert_eq!(drain(&mut second), vec![GestureEvent::ShakeBackToLeft]);
    }
}
