pub mod classify;
pub mod detector;
pub mod events;
pub mod fusion;
pub mod protocol;
pub mod source;
pub mod state;
pub mod types;

pub use classify::{is_stable, is_worn, Thresholds};
pub use detector::HeadGestureDetector;
pub use events::{GestureEvent, HeadGestureListener};
pub use source::{SampleSink, SensorHub, SensorPublisher, SensorSource, SourceError};
pub use state::GestureState;
pub use types::{Orientation, SensorAccuracy, SensorEvent, SensorKind, SensorRate, SensorReading};

use anyhow::Result;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Everything the detector task consumes, in arrival order.
///
/// Samples and commands share one queue, so a listener change or a stop
/// takes effect only after every sample queued before it.
pub enum DetectorInput {
    Sample(SensorEvent),
    SetListener(Option<Box<dyn HeadGestureListener>>),
    Stop,
}

impl DetectorInput {
    pub fn into_sample(self) -> Option<SensorEvent> {
        match self {
            DetectorInput::Sample(sample) => Some(sample),
            _ => None,
        }
    }
}

/// Latest detector state, published after every sample.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DetectorSnapshot {
    pub orientation: Orientation,
    pub state: GestureState,
    pub worn: bool,
    pub samples: u64,
}

/// Runs a [`HeadGestureDetector`] on a background task fed by a sensor source.
///
/// The task is the only owner of the detector, so samples are processed one
/// at a time no matter which threads the source delivers from.
pub struct HeadGestureService {
    source: Box<dyn SensorSource>,
    snapshot_rx: watch::Receiver<DetectorSnapshot>,
    input_tx: mpsc::UnboundedSender<DetectorInput>,
    task: Option<JoinHandle<()>>,
}

impl HeadGestureService {
    /// Subscribe to the three sensor kinds on `source` and start processing.
    ///
    /// Sensors the source does not offer are skipped. Must be called from
    /// within a Tokio runtime.
    pub fn start(mut source: Box<dyn SensorSource>, thresholds: Thresholds) -> Result<Self> {
        let (input_tx, input_rx) = mpsc::unbounded_channel();

        for kind in SensorKind::ALL {
            let rate = kind.default_rate();
            match source.register(kind, rate, input_tx.clone()) {
                Ok(()) => tracing::info!(?kind, ?rate, "Registered sensor"),
                Err(SourceError::Unavailable(kind)) => {
                    tracing::warn!(?kind, "Sensor not available, skipping")
                }
                Err(e) => {
                    source.unregister_all();
                    return Err(e.into());
                }
            }
        }

        let (snapshot_tx, snapshot_rx) = watch::channel(DetectorSnapshot {
            worn: true,
            ..DetectorSnapshot::default()
        });

        let task = tokio::spawn(detector_loop(
            HeadGestureDetector::new(thresholds),
            input_rx,
            snapshot_tx,
        ));

        Ok(Self {
            source,
            snapshot_rx,
            input_tx,
            task: Some(task),
        })
    }

    /// Replace the listener; `None` removes it. Detection keeps running.
    ///
    /// Samples already queued are still delivered to the previous listener.
    pub fn set_listener(&self, listener: Option<Box<dyn HeadGestureListener>>) {
        let _ = self.input_tx.send(DetectorInput::SetListener(listener));
    }

    /// Latest published state (non-blocking).
    pub fn snapshot(&self) -> DetectorSnapshot {
        *self.snapshot_rx.borrow()
    }

    /// Receiver that observes every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<DetectorSnapshot> {
        self.snapshot_rx.clone()
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Release every sensor subscription and wait for the task to finish.
    ///
    /// Samples published before the call are processed first.
    pub async fn stop(&mut self) -> Result<()> {
        self.source.unregister_all();
        let _ = self.input_tx.send(DetectorInput::Stop);
        if let Some(task) = self.task.take() {
            task.await?;
            tracing::info!("Head gesture detection stopped");
        }
        Ok(())
    }
}

impl Drop for HeadGestureService {
    fn drop(&mut self) {
        if self.task.is_some() {
            self.source.unregister_all();
            let _ = self.input_tx.send(DetectorInput::Stop);
        }
    }
}

/// Background task: feed samples to the detector, apply commands, publish state.
async fn detector_loop(
    mut detector: HeadGestureDetector,
    mut input_rx: mpsc::UnboundedReceiver<DetectorInput>,
    snapshot_tx: watch::Sender<DetectorSnapshot>,
) {
    let mut sample_count: u64 = 0;

    while let Some(input) = input_rx.recv().await {
        match input {
            DetectorInput::Sample(sample) => {
                if let Some(event) = detector.on_sensor_event(&sample) {
                    tracing::debug!(event = event.as_str(), state = ?detector.state(), "Gesture event");
                }

                sample_count += 1;
                snapshot_tx.send_replace(DetectorSnapshot {
                    orientation: detector.orientation(),
                    state: detector.state(),
                    worn: detector.is_worn(),
                    samples: sample_count,
                });
                if sample_count % 1000 == 0 {
                    tracing::debug!(sample_count, "Sensor samples processed");
                }
            }
            DetectorInput::SetListener(listener) => {
                tracing::debug!(present = listener.is_some(), "Listener replaced");
                detector.set_listener(listener);
            }
            DetectorInput::Stop => return,
        }
    }
    tracing::info!("Detector input closed");
}
