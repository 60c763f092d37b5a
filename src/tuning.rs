//! Data-driven game balance
//!
//! Every tunable number of the drive loop lives in [`DriveConfig`], together
//! with the three policy choices that are mutually exclusive per game mode:
//! how speed ramps, where a restart puts the car, and what happens at the end
//! of the known road.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How forward speed increases while driving
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SpeedPolicy {
    /// Continuous ramp: speed += accel * dt, capped at `max`
    Accelerate { accel: f32, max: f32 },
    /// Periodic bump: every `interval` seconds speed *= factor, capped at `max`
    Stepped { interval: f32, factor: f32, max: f32 },
}

impl SpeedPolicy {
    /// Upper speed bound
    pub fn max_speed(&self) -> f32 {
        match *self {
            SpeedPolicy::Accelerate { max, .. } | SpeedPolicy::Stepped { max, .. } => max,
        }
    }
}

/// Where the car goes when the player restarts after a crash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestartPolicy {
    /// Teleport back to the start of the road
    Origin,
    /// Continue from the distance where the crash happened
    Resume,
}

/// Behavior at the end of the generated road
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RoadPolicy {
    /// Fixed-length periodic road; distance wraps modulo its length
    Wrap,
    /// Append `batch_segments` more segments once less than `threshold`
    /// meters of road remain ahead of the car
    Extend { threshold: f32, batch_segments: usize },
}

/// Shape of the generated road (all amplitudes in meters, frequencies in
/// radians per segment)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurveShape {
    pub gentle_amplitude: f32,
    pub gentle_frequency: f32,
    pub dramatic_amplitude: f32,
    pub dramatic_frequency: f32,
    pub jitter_amplitude: f32,
    /// Segments between random jitter knots
    pub jitter_spacing: usize,
    /// Hard bound on |curve[i + 1] - curve[i]|
    pub max_delta: f32,
}

impl Default for CurveShape {
    fn default() -> Self {
        Self {
            gentle_amplitude: 3.0,
            gentle_frequency: 0.05,
            dramatic_amplitude: 8.0,
            dramatic_frequency: 0.012,
            jitter_amplitude: 0.6,
            jitter_spacing: 6,
            max_delta: 0.75,
        }
    }
}

/// Obstacle collision radii per kind
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObstacleRadii {
    pub rock: f32,
    pub pothole: f32,
    pub mountain: f32,
}

impl Default for ObstacleRadii {
    fn default() -> Self {
        Self {
            rock: 0.6,
            pothole: 0.8,
            mountain: 1.6,
        }
    }
}

/// Complete drive-loop configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    // === Road ===
    /// Length of one road segment (meters)
    pub segment_length: f32,
    /// Full drivable width of the road
    pub road_width: f32,
    /// Road length generated up front
    pub initial_road_length: f32,
    pub curve: CurveShape,
    pub road_policy: RoadPolicy,

    // === Obstacles ===
    /// Probability that a segment carries obstacles
    pub obstacle_chance: f32,
    /// Maximum obstacles on one segment
    pub max_obstacles_per_segment: u32,
    pub obstacle_radii: ObstacleRadii,
    /// Segments at the start of the road kept free of obstacles
    pub start_safe_segments: usize,
    /// Obstacles within this distance of a restart point are removed
    pub restart_clear_radius: f32,
    /// Collision scan window, in segments behind and ahead of the car
    pub collision_window_behind: usize,
    pub collision_window_ahead: usize,

    // === Car ===
    pub car_radius: f32,
    /// Inset from the road edge the car center may not cross
    pub car_margin: f32,
    /// Extra lateral slack beyond half the road width before off-road
    pub off_road_tolerance: f32,
    pub initial_speed: f32,
    pub speed_policy: SpeedPolicy,
    /// Lateral meters per second at full steering input
    pub steer_sensitivity: f32,
    /// Device tilt (degrees) that maps to full steering input
    pub max_tilt_degrees: f32,
    /// Visual roll (radians) at full steering input
    pub max_roll: f32,

    // === Camera ===
    pub camera_height: f32,
    pub camera_behind: f32,
    pub camera_look_ahead: f32,
    pub camera_look_height: f32,

    // === Crash ===
    /// Exponential speed decay rate while crashed (1/s)
    pub crash_decel_rate: f32,
    pub gravity: f32,
    /// Seconds from crash until restart becomes available
    pub restart_delay: f32,
    /// Particles spawned by one crash
    pub burst_particles: usize,
    pub restart_policy: RestartPolicy,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            segment_length: 10.0,
            road_width: 10.0,
            initial_road_length: 1000.0,
            curve: CurveShape::default(),
            road_policy: RoadPolicy::Extend {
                threshold: 300.0,
                batch_segments: 50,
            },

            obstacle_chance: 0.3,
            max_obstacles_per_segment: 2,
            obstacle_radii: ObstacleRadii::default(),
            start_safe_segments: 5,
            restart_clear_radius: 40.0,
            collision_window_behind: 1,
            collision_window_ahead: 2,

            car_radius: 0.6,
            car_margin: 1.0,
            off_road_tolerance: 0.5,
            initial_speed: 20.0,
            speed_policy: SpeedPolicy::Stepped {
                interval: 5.0,
                factor: 1.2,
                max: 60.0,
            },
            steer_sensitivity: 8.0,
            max_tilt_degrees: 30.0,
            max_roll: 0.15,

            camera_height: 2.0,
            camera_behind: 5.0,
            camera_look_ahead: 10.0,
            camera_look_height: 1.0,

            crash_decel_rate: 2.5,
            gravity: 9.8,
            restart_delay: 2.0,
            burst_particles: 60,
            restart_policy: RestartPolicy::Origin,
        }
    }
}

/// Reasons a configuration is rejected
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{field} must be positive (got {value})")]
    NotPositive { field: &'static str, value: f32 },
    #[error("road width {road_width} leaves no corridor for car margin {margin}")]
    NoCorridor { road_width: f32, margin: f32 },
    #[error("max speed {max} is below initial speed {initial}")]
    SpeedCapBelowInitial { max: f32, initial: f32 },
    #[error("stepped speed factor must exceed 1.0 (got {0})")]
    FactorNotIncreasing(f32),
    #[error("obstacle chance must be within [0, 1] (got {0})")]
    ChanceOutOfRange(f32),
    #[error("wrapped road needs at least two segments")]
    RoadTooShort,
}

impl DriveConfig {
    /// Parse a (possibly partial) JSON config over the defaults and validate it
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positives = [
            ("segment_length", self.segment_length),
            ("road_width", self.road_width),
            ("initial_road_length", self.initial_road_length),
            ("car_radius", self.car_radius),
            ("initial_speed", self.initial_speed),
            ("max_tilt_degrees", self.max_tilt_degrees),
            ("curve.max_delta", self.curve.max_delta),
        ];
        for (field, value) in positives {
            if !(value > 0.0) {
                return Err(ConfigError::NotPositive { field, value });
            }
        }

        if self.road_width / 2.0 <= self.car_margin {
            return Err(ConfigError::NoCorridor {
                road_width: self.road_width,
                margin: self.car_margin,
            });
        }

        let max = self.speed_policy.max_speed();
        if max < self.initial_speed {
            return Err(ConfigError::SpeedCapBelowInitial {
                max,
                initial: self.initial_speed,
            });
        }
        match self.speed_policy {
            SpeedPolicy::Stepped {
                interval, factor, ..
            } => {
                if !(interval > 0.0) {
                    return Err(ConfigError::NotPositive {
                        field: "speed_policy.interval",
                        value: interval,
                    });
                }
                if !(factor > 1.0) {
                    return Err(ConfigError::FactorNotIncreasing(factor));
                }
            }
            SpeedPolicy::Accelerate { accel, .. } => {
                if accel < 0.0 {
                    return Err(ConfigError::NotPositive {
                        field: "speed_policy.accel",
                        value: accel,
                    });
                }
            }
        }

        if !(0.0..=1.0).contains(&self.obstacle_chance) {
            return Err(ConfigError::ChanceOutOfRange(self.obstacle_chance));
        }

        if self.road_policy == RoadPolicy::Wrap && self.initial_segment_count() < 2 {
            return Err(ConfigError::RoadTooShort);
        }

        Ok(())
    }

    /// Half of the drivable width
    #[inline]
    pub fn half_width(&self) -> f32 {
        self.road_width / 2.0
    }

    /// Largest lateral offset the car center may take
    #[inline]
    pub fn corridor_half_width(&self) -> f32 {
        self.half_width() - self.car_margin
    }

    /// Number of segments generated up front
    pub fn initial_segment_count(&self) -> usize {
        (self.initial_road_length / self.segment_length).ceil() as usize
    }
}
