//! Last-value input cache
//!
//! Orientation, keyboard and controller events arrive asynchronously; the
//! frame loop only ever reads the latest value through [`InputCache::sample`].

use crate::settings::ControlScheme;
use crate::sim::TickInput;

/// Device-orientation permission state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TiltPermission {
    /// Not asked yet, or no reading seen
    #[default]
    Unknown,
    Granted,
    /// Refused or unsupported; steering falls back to keys
    Denied,
}

/// Steering key recognized by the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SteerKey {
    Left,
    Right,
}

impl SteerKey {
    /// Map a DOM `KeyboardEvent.key` value
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "ArrowLeft" | "a" | "A" => Some(SteerKey::Left),
            "ArrowRight" | "d" | "D" => Some(SteerKey::Right),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct InputCache {
    tilt: Option<f32>,
    axis: Option<f32>,
    left: bool,
    right: bool,
    permission: TiltPermission,
}

impl InputCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn permission(&self) -> TiltPermission {
        self.permission
    }

    /// Store a device-orientation reading (`gamma`, degrees). Browsers send
    /// null angles on devices without a sensor.
    pub fn on_orientation(&mut self, gamma: Option<f64>) {
        if self.permission == TiltPermission::Denied {
            return;
        }
        match gamma {
            Some(g) if g.is_finite() => {
                if self.permission != TiltPermission::Granted {
                    log::info!("Tilt steering active");
                }
                self.permission = TiltPermission::Granted;
                self.tilt = Some(g as f32);
            }
            _ => self.tilt = None,
        }
    }

    /// Record the outcome of a permission request
    pub fn set_permission(&mut self, granted: bool) {
        if granted {
            self.permission = TiltPermission::Granted;
        } else {
            log::warn!("Device orientation permission denied; using keyboard");
            self.permission = TiltPermission::Denied;
            self.tilt = None;
        }
    }

    /// Key down/up; returns true if the key steers
    pub fn on_key(&mut self, key: &str, down: bool) -> bool {
        match SteerKey::from_key(key) {
            Some(SteerKey::Left) => self.left = down,
            Some(SteerKey::Right) => self.right = down,
            None => return false,
        }
        true
    }

    /// Analog controller axis, `None` when the controller disconnects
    pub fn on_axis(&mut self, axis: Option<f32>) {
        self.axis = axis.filter(|a| a.is_finite());
    }

    /// Forget held keys (window lost focus, keyup will never arrive)
    pub fn release_keys(&mut self) {
        self.left = false;
        self.right = false;
    }

    /// Snapshot for this frame
    pub fn sample(&self, scheme: ControlScheme) -> TickInput {
        let tilt = if scheme.uses_tilt() && self.permission != TiltPermission::Denied {
            self.tilt
        } else {
            None
        };
        let keys = scheme != ControlScheme::Tilt || tilt.is_none();
        TickInput {
            tilt,
            axis: self.axis,
            left: keys && self.left,
            right: keys && self.right,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_orientation_wins() {
        let mut cache = InputCache::new();
        cache.on_orientation(Some(5.0));
        cache.on_orientation(Some(-12.0));
        assert_eq!(cache.permission(), TiltPermission::Granted);
        assert_eq!(cache.sample(ControlScheme::Auto).tilt, Some(-12.0));
    }

    #[test]
    fn test_null_orientation_clears_tilt() {
        let mut cache = InputCache::new();
        cache.on_orientation(Some(5.0));
        cache.on_orientation(None);
        assert_eq!(cache.sample(ControlScheme::Auto).tilt, None);
    }

    #[test]
    fn test_denied_permission_falls_back_to_keys() {
        let mut cache = InputCache::new();
        cache.on_orientation(Some(20.0));
        cache.set_permission(false);
        cache.on_orientation(Some(25.0));
        assert!(cache.on_key("ArrowLeft", true));

        let input = cache.sample(ControlScheme::Tilt);
        assert_eq!(input.tilt, None);
        assert!(input.left);
        assert_eq!(input.steer(30.0), -1.0);
    }

    #[test]
    fn test_keyboard_scheme_ignores_tilt() {
        let mut cache = InputCache::new();
        cache.on_orientation(Some(20.0));
        cache.on_key("d", true);
        let input = cache.sample(ControlScheme::Keyboard);
        assert_eq!(input.tilt, None);
        assert!(input.right);
    }

    #[test]
    fn test_key_release_and_unknown_keys() {
        let mut cache = InputCache::new();
        assert!(!cache.on_key("Enter", true));
        cache.on_key("ArrowRight", true);
        cache.on_key("ArrowRight", false);
        assert!(!cache.sample(ControlScheme::Auto).right);

        cache.on_key("a", true);
        cache.release_keys();
        assert!(!cache.sample(ControlScheme::Auto).left);
    }

    #[test]
    fn test_axis_filters_nan() {
        let mut cache = InputCache::new();
        cache.on_axis(Some(0.4));
        assert_eq!(cache.sample(ControlScheme::Auto).axis, Some(0.4));
        cache.on_axis(Some(f32::NAN));
        assert_eq!(cache.sample(ControlScheme::Auto).axis, None);
    }
}
