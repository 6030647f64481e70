use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Gesture detection limits.
    pub gesture: GestureConfig,
    /// Recording playback.
    pub replay: ReplayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// A partial gesture is abandoned after this long without a transition.
    pub state_timeout_ms: u64,
    /// Angular velocity (rad/s) below which every axis counts as still.
    pub stable_angular_velocity: f32,
    /// Dominant-axis angular velocity (rad/s) needed to register movement.
    pub min_movement_angular_velocity: f32,
    /// Pitch half-width of the wearing envelope, degrees.
    pub max_wear_pitch_deg: f32,
    /// Roll half-width of the wearing envelope, degrees.
    pub max_wear_roll_deg: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            state_timeout_ms: 1000,
            stable_angular_velocity: 0.10,
            min_movement_angular_velocity: 1.00,
            max_wear_pitch_deg: 10.0,
            max_wear_roll_deg: 40.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Pace playback by gyroscope timestamps instead of as fast as possible.
    pub realtime: bool,
    /// Recording played when none is given on the command line.
    /// `None` plays the built-in demo.
    pub recording: Option<PathBuf>,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            realtime: true,
            recording: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_fills_in_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [gesture]
            state_timeout_ms = 500
            "#,
        )
        .unwrap();
        assert_eq!(config.gesture.state_timeout_ms, 500);
        assert_eq!(config.gesture.max_wear_roll_deg, 40.0);
        assert!(config.replay.realtime);
        assert!(config.replay.recording.is_none());
    }

    #[test]
    fn empty_file_is_default() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.gesture.min_movement_angular_velocity, 1.0);
        assert_eq!(config.gesture.stable_angular_velocity, 0.1);
    }
}
