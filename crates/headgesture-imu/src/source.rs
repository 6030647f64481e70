use crate::types::{SensorEvent, SensorKind, SensorRate};
use crate::DetectorInput;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::sync::mpsc;

/// Queue a source delivers samples into.
pub type SampleSink = mpsc::UnboundedSender<DetectorInput>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("No {0:?} sensor available")]
    Unavailable(SensorKind),
    #[error("Sensor source has shut down")]
    Closed,
}

/// Platform-specific provider of sensor samples.
pub trait SensorSource: Send {
    /// Start delivering samples of `kind` into `sink` at roughly `rate`.
    fn register(
        &mut self,
        kind: SensorKind,
        rate: SensorRate,
        sink: SampleSink,
    ) -> Result<(), SourceError>;

    /// Release every subscription made through `register`.
    fn unregister_all(&mut self);
}

#[derive(Debug)]
struct Subscription {
    rate: SensorRate,
    sink: SampleSink,
}

#[derive(Debug, Default)]
struct HubState {
    available: Vec<SensorKind>,
    subscriptions: HashMap<SensorKind, Subscription>,
}

/// In-process sensor source fed through [`SensorPublisher`] handles.
///
/// Samples published for a kind with no subscriber are dropped.
#[derive(Debug, Clone)]
pub struct SensorHub {
    state: Arc<Mutex<HubState>>,
}

impl SensorHub {
    /// Hub offering every sensor kind.
    pub fn new() -> Self {
        Self::with_sensors(&SensorKind::ALL)
    }

    /// Hub offering only `available`; registering anything else fails.
    pub fn with_sensors(available: &[SensorKind]) -> Self {
        Self {
            state: Arc::new(Mutex::new(HubState {
                available: available.to_vec(),
                subscriptions: HashMap::new(),
            })),
        }
    }

    pub fn publisher(&self) -> SensorPublisher {
        SensorPublisher {
            state: Arc::clone(&self.state),
        }
    }

    /// Kinds currently subscribed, with their requested rate.
    pub fn subscriptions(&self) -> Vec<(SensorKind, SensorRate)> {
        let state = lock(&self.state);
        SensorKind::ALL
            .into_iter()
            .filter_map(|kind| state.subscriptions.get(&kind).map(|s| (kind, s.rate)))
            .collect()
    }
}

impl Default for SensorHub {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorSource for SensorHub {
    fn register(
        &mut self,
        kind: SensorKind,
        rate: SensorRate,
        sink: SampleSink,
    ) -> Result<(), SourceError> {
        let mut state = lock(&self.state);
        if !state.available.contains(&kind) {
            return Err(SourceError::Unavailable(kind));
        }
        tracing::debug!(
            ?kind,
            ?rate,
            period_ms = rate.nominal_period().as_millis() as u64,
            "Sensor registered"
        );
        state.subscriptions.insert(kind, Subscription { rate, sink });
        Ok(())
    }

    fn unregister_all(&mut self) {
        let mut state = lock(&self.state);
        let released = state.subscriptions.len();
        state.subscriptions.clear();
        tracing::debug!(released, "Sensor subscriptions released");
    }
}

/// Handle that pushes samples into a [`SensorHub`].
#[derive(Debug, Clone)]
pub struct SensorPublisher {
    state: Arc<Mutex<HubState>>,
}

impl SensorPublisher {
    /// Deliver `event` to the subscriber of its kind.
    ///
    /// Returns `Ok(false)` when nobody is subscribed and
    /// [`SourceError::Closed`] when the subscriber has gone away.
    pub fn publish(&self, event: SensorEvent) -> Result<bool, SourceError> {
        let state = lock(&self.state);
        match state.subscriptions.get(&event.kind()) {
            None => Ok(false),
            Some(subscription) => subscription
                .sink
                .send(DetectorInput::Sample(event))
                .map(|()| true)
                .map_err(|_| SourceError::Closed),
        }
    }

    /// True while any kind is subscribed.
    pub fn is_active(&self) -> bool {
        !lock(&self.state).subscriptions.is_empty()
    }
}

fn lock(state: &Mutex<HubState>) -> MutexGuard<'_, HubState> {
    // No critical section leaves the table half-updated, so poisoning is ignored.
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn publish_reaches_matching_subscriber_only() {
        let mut hub = SensorHub::new();
        let publisher = hub.publisher();
        let (tx, mut rx) = mpsc::unbounded_channel();
        hub.register(SensorKind::Gyroscope, SensorRate::Normal, tx)
            .unwrap();

        let gyro = SensorEvent::gyroscope(Vec3::X, 7);
        assert_eq!(publisher.publish(gyro), Ok(true));
        assert_eq!(
            publisher.publish(SensorEvent::magnetic(Vec3::Y)),
            Ok(false)
        );
        assert_eq!(rx.try_recv().unwrap().into_sample(), Some(gyro));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn unavailable_sensor_is_rejected() {
        let mut hub = SensorHub::with_sensors(&[SensorKind::Gyroscope]);
        let (tx, _rx) = mpsc::unbounded_channel();
        assert_eq!(
            hub.register(SensorKind::MagneticField, SensorRate::Fastest, tx),
            Err(SourceError::Unavailable(SensorKind::MagneticField))
        );
        assert!(hub.subscriptions().is_empty());
    }

    #[test]
    fn unregister_releases_everything() {
        let mut hub = SensorHub::new();
        let publisher = hub.publisher();
        let (tx, _rx) = mpsc::unbounded_channel();
        for kind in SensorKind::ALL {
            hub.register(kind, kind.default_rate(), tx.clone()).unwrap();
        }
        assert_eq!(
            hub.subscriptions(),
            vec![
                (SensorKind::MagneticField, SensorRate::Fastest),
                (SensorKind::Accelerometer, SensorRate::Fastest),
                (SensorKind::Gyroscope, SensorRate::Normal),
            ]
        );
        assert!(publisher.is_active());

        hub.unregister_all();
        assert!(!publisher.is_active());
        assert_eq!(publisher.publish(SensorEvent::gyroscope(Vec3::X, 0)), Ok(false));
    }

    #[test]
    fn dropped_subscriber_reports_closed() {
        let mut hub = SensorHub::new();
        let publisher = hub.publisher();
        let (tx, rx) = mpsc::unbounded_channel();
        hub.register(SensorKind::Accelerometer, SensorRate::Fastest, tx)
            .unwrap();
        drop(rx);
        assert_eq!(
            publisher.publish(SensorEvent::accelerometer(Vec3::Z)),
            Err(SourceError::Closed)
        );
    }
}
