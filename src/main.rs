mod replay;

use anyhow::{Context, Result};
use glam::Vec3;
use headgesture_config::{AppConfig, GestureConfig};
use headgesture_imu::{
    HeadGestureListener, HeadGestureService, SensorHub, SensorPublisher, Thresholds,
};
use replay::{replay, ReplayStats, DEMO_RECORDING};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Logs every detector callback.
struct LoggingListener;

impl HeadGestureListener for LoggingListener {
    fn on_orientation_changed(&mut self, orientation: Vec3) {
        debug!(
            azimuth = orientation.x.to_degrees(),
            pitch = orientation.y.to_degrees(),
            roll = orientation.z.to_degrees(),
            "Orientation changed"
        );
    }

    fn on_look_up(&mut self) {
        info!("Look up");
    }

    fn on_look_down(&mut self) {
        info!("Look down");
    }

    fn on_back_look_up(&mut self, initial_azimuth_degrees: f64) {
        info!(initial_azimuth_degrees, "Back look up");
    }

    fn on_back_look_down(&mut self) {
        info!("Back look down");
    }

    fn on_shake_to_left(&mut self) {
        info!("Shake to left");
    }

    fn on_shake_to_right(&mut self) {
        info!("Shake to right");
    }

    fn on_shake_back_to_left(&mut self) {
        info!("Shake back to left");
    }

    fn on_shake_back_to_right(&mut self) {
        info!("Shake back to right");
    }
}

fn thresholds_from_config(gesture: &GestureConfig) -> Thresholds {
    Thresholds {
        stable_angular_velocity: gesture.stable_angular_velocity,
        min_movement_angular_velocity: gesture.min_movement_angular_velocity,
        state_timeout_ns: gesture.state_timeout_ms.saturating_mul(1_000_000),
        max_wear_pitch: gesture.max_wear_pitch_deg.to_radians(),
        max_wear_roll: gesture.max_wear_roll_deg.to_radians(),
    }
}

/// Replay `recording`, or the built-in demo when there is none.
async fn play(
    recording: Option<&Path>,
    publisher: &SensorPublisher,
    realtime: bool,
) -> Result<ReplayStats> {
    match recording {
        Some(path) => {
            info!(?path, "Replaying recording");
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open recording {}", path.display()))?;
            replay(file, publisher, realtime).await
        }
        None => {
            info!("No recording configured, replaying built-in demo");
            replay(DEMO_RECORDING.as_bytes(), publisher, realtime).await
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "headgesture_app=info,headgesture_imu=info".into()),
        )
        .init();

    info!("Head gesture detector starting");

    // Load config.
    let config = headgesture_config::load_config().unwrap_or_else(|e| {
        warn!(?e, "Failed to load config, using defaults");
        AppConfig::default()
    });
    let thresholds = thresholds_from_config(&config.gesture);
    info!(?thresholds, realtime = config.replay.realtime, "Config loaded");

    let recording: Option<PathBuf> = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| config.replay.recording.clone());

    let hub = SensorHub::new();
    let publisher = hub.publisher();
    let mut service = HeadGestureService::start(Box::new(hub), thresholds)?;
    service.set_listener(Some(Box::new(LoggingListener)));

    tokio::select! {
        result = play(recording.as_deref(), &publisher, config.replay.realtime) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => info!("Interrupted"),
    }

    // Everything published so far is processed before the task ends.
    service.stop().await?;
    let last = service.snapshot();
    info!(
        state = ?last.state,
        worn = last.worn,
        samples = last.samples,
        azimuth = last.orientation.azimuth.to_degrees(),
        "Final detector state"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_thresholds_match_defaults() {
        let thresholds = thresholds_from_config(&GestureConfig::default());
        let defaults = Thresholds::default();
        assert_eq!(thresholds.state_timeout_ns, defaults.state_timeout_ns);
        assert!(
            (thresholds.stable_angular_velocity - defaults.stable_angular_velocity).abs() < 1e-6
        );
        assert!(
            (thresholds.min_movement_angular_velocity - defaults.min_movement_angular_velocity)
                .abs()
                < 1e-6
        );
        assert!((thresholds.max_wear_pitch - defaults.max_wear_pitch).abs() < 1e-6);
        assert!((thresholds.max_wear_roll - defaults.max_wear_roll).abs() < 1e-6);
    }

    #[test]
    fn timeout_converts_to_nanoseconds() {
        let gesture = GestureConfig {
            state_timeout_ms: 250,
            ..GestureConfig::default()
        };
        assert_eq!(thresholds_from_config(&gesture).state_timeout_ns, 250_000_000);
    }
}
