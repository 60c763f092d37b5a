//! Tilt Drive - an endless curved-road driving game
//!
//! Core modules:
//! - `sim`: Simulation (road generation, car update, collisions, crash effects)
//! - `tuning`: Data-driven game balance and policy selection
//! - `settings`: Player preferences
//! - `platform`: Adapter boundary to scene, audio and input services
//! - `ui`: HUD view model

#[cfg(target_arch = "wasm32")]
pub mod audio;
pub mod platform;
pub mod settings;
pub mod sim;
pub mod tuning;
pub mod ui;

pub use settings::{ControlScheme, QualityPreset, Settings};
pub use tuning::{ConfigError, DriveConfig, RestartPolicy, RoadPolicy, SpeedPolicy};

/// Game configuration constants
pub mod consts {
    /// Frame delta cap (seconds); longer gaps (tab switch) are clamped
    pub const MAX_FRAME_DT: f32 = 0.1;

    /// Height of the car body origin above the road plane
    pub const CAR_RIDE_HEIGHT: f32 = 0.0;
    /// Ground plane height for debris
    pub const GROUND_Y: f32 = 0.0;

    /// Speeds below this snap to a full stop while crashed
    pub const STOP_EPSILON: f32 = 0.05;

    /// Meters per second to kilometers per hour
    pub const MPS_TO_KMH: f32 = 3.6;
}

/// Linear interpolation between `a` and `b`
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Smoothstep easing on [0, 1]
#[inline]
pub fn smoothstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Deterministic hash of `(seed, index, salt)` to [0, 1)
///
/// SplitMix64 finalizer; used wherever generation must depend only on the
/// segment index so batches can be produced in any order.
#[inline]
pub fn hash01(seed: u64, index: u64, salt: u64) -> f32 {
    let mut z = seed
        .wrapping_add(index.wrapping_mul(0x9E37_79B9_7F4A_7C15))
        .wrapping_add(salt.wrapping_mul(0xD1B5_4A32_D192_ED03));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^= z >> 31;
    (z >> 40) as f32 / (1u64 << 24) as f32
}
