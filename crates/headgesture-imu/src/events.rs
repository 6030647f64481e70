//! Gesture events and the listener they are delivered to.

use glam::Vec3;
use tokio::sync::mpsc;

/// Everything the detector can report, one variant per listener callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureEvent {
    /// Worn orientation update: `[azimuth, pitch, roll]` in radians.
    OrientationChanged(Vec3),
    LookUp,
    LookDown,
    /// Returned from looking down; carries the azimuth (degrees) snapshotted
    /// at the last worn orientation update.
    BackLookUp { initial_azimuth_degrees: f64 },
    BackLookDown,
    ShakeToLeft,
    ShakeToRight,
    ShakeBackToLeft,
    ShakeBackToRight,
}

impl GestureEvent {
    /// Invoke the matching callback on `listener`.
    pub fn dispatch(self, listener: &mut dyn HeadGestureListener) {
        match self {
            GestureEvent::OrientationChanged(o) => listener.on_orientation_changed(o),
            GestureEvent::LookUp => listener.on_look_up(),
            GestureEvent::LookDown => listener.on_look_down(),
            GestureEvent::BackLookUp {
                initial_azimuth_degrees,
            } => listener.on_back_look_up(initial_azimuth_degrees),
            GestureEvent::BackLookDown => listener.on_back_look_down(),
            GestureEvent::ShakeToLeft => listener.on_shake_to_left(),
            GestureEvent::ShakeToRight => listener.on_shake_to_right(),
            GestureEvent::ShakeBackToLeft => listener.on_shake_back_to_left(),
            GestureEvent::ShakeBackToRight => listener.on_shake_back_to_right(),
        }
    }

    /// Short name for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            GestureEvent::OrientationChanged(_) => "orientation-changed",
            GestureEvent::LookUp => "look-up",
            GestureEvent::LookDown => "look-down",
            GestureEvent::BackLookUp { .. } => "back-look-up",
            GestureEvent::BackLookDown => "back-look-down",
            GestureEvent::ShakeToLeft => "shake-to-left",
            GestureEvent::ShakeToRight => "shake-to-right",
            GestureEvent::ShakeBackToLeft => "shake-back-to-left",
            GestureEvent::ShakeBackToRight => "shake-back-to-right",
        }
    }
}

/// Receiver of head gesture callbacks.
///
/// Callbacks run synchronously on whichever thread delivered the sample.
/// Every method defaults to a no-op so implementors pick what they need.
pub trait HeadGestureListener: Send {
    fn on_orientation_changed(&mut self, _orientation: Vec3) {}
    fn on_look_up(&mut self) {}
    fn on_look_down(&mut self) {}
    fn on_back_look_up(&mut self, _initial_azimuth_degrees: f64) {}
    fn on_back_look_down(&mut self) {}
    fn on_shake_to_left(&mut self) {}
    fn on_shake_to_right(&mut self) {}
    fn on_shake_back_to_left(&mut self) {}
    fn on_shake_back_to_right(&mut self) {}
}

/// Forward every callback into a channel as a [`GestureEvent`].
///
/// A closed receiver drops events silently, the same as having no listener.
impl HeadGestureListener for mpsc::UnboundedSender<GestureEvent> {
    fn on_orientation_changed(&mut self, orientation: Vec3) {
        let _ = self.send(GestureEvent::OrientationChanged(orientation));
    }
    fn on_look_up(&mut self) {
        let _ = self.send(GestureEvent::LookUp);
    }
    fn on_look_down(&mut self) {
        let _ = self.send(GestureEvent::LookDown);
    }
    fn on_back_look_up(&mut self, initial_azimuth_degrees: f64) {
        let _ = self.send(GestureEvent::BackLookUp {
            initial_azimuth_degrees,
        });
    }
    fn on_back_look_down(&mut self) {
        let _ = self.send(GestureEvent::BackLookDown);
    }
    fn on_shake_to_left(&mut self) {
        let _ = self.send(GestureEvent::ShakeToLeft);
    }
    fn on_shake_to_right(&mut self) {
        let _ = self.send(GestureEvent::ShakeToRight);
    }
    fn on_shake_back_to_left(&mut self) {
        let _ = self.send(GestureEvent::ShakeBackToLeft);
    }
    fn on_shake_back_to_right(&mut self) {
        let _ = self.send(GestureEvent::ShakeBackToRight);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [GestureEvent; 9] = [
        GestureEvent::OrientationChanged(Vec3::new(0.1, 0.2, 0.3)),
        GestureEvent::LookUp,
        GestureEvent::LookDown,
        GestureEvent::BackLookUp {
            initial_azimuth_degrees: 45.0,
        },
        GestureEvent::BackLookDown,
        GestureEvent::ShakeToLeft,
        GestureEvent::ShakeToRight,
        GestureEvent::ShakeBackToLeft,
        GestureEvent::ShakeBackToRight,
    ];

    #[test]
    fn channel_listener_round_trips_every_callback() {
        let (tx, mut rx) = mpsc::unbounded_channel::<GestureEvent>();
        let mut listener = tx;
        for event in ALL {
            event.dispatch(&mut listener);
        }
        for expected in ALL {
            assert_eq!(rx.try_recv().unwrap(), expected);
        }
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn closed_channel_is_ignored() {
        let (tx, rx) = mpsc::unbounded_channel::<GestureEvent>();
        drop(rx);
        let mut listener = tx;
        GestureEvent::LookUp.dispatch(&mut listener);
    }

    #[test]
    fn default_methods_are_no_ops() {
        struct OnlyShakes(u32);
        impl HeadGestureListener for OnlyShakes {
            fn on_shake_to_left(&mut self) {
                self.0 += 1;
            }
        }

        let mut listener = OnlyShakes(0);
        for event in ALL {
            event.dispatch(&mut listener);
        }
        assert_eq!(listener.0, 1);
    }
}
