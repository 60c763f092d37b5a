//! Game state and core simulation types
//!
//! Everything the drive loop mutates is owned by [`DriveState`].

use std::fmt;

use glam::Vec3;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::car::{Camera, Car};
use super::particles::ParticleSystem;
use super::road::{ObstacleKind, Road};
use crate::tuning::DriveConfig;

/// Current phase of the drive loop
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GamePhase {
    /// Road built, waiting for start
    Ready,
    /// Normal driving: steering, speed ramp, collision checks
    Driving,
    /// Stopped by the player
    Paused,
    /// Wrecked; particles burn and the car slows to a halt
    Crashed { elapsed: f32 },
    /// Restart may be triggered
    Restartable,
}

impl GamePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            GamePhase::Ready => "Ready",
            GamePhase::Driving => "Driving",
            GamePhase::Paused => "Paused",
            GamePhase::Crashed { .. } => "Crashed",
            GamePhase::Restartable => "Restartable",
        }
    }

    /// Crashed or waiting for restart
    pub fn is_wrecked(&self) -> bool {
        matches!(self, GamePhase::Crashed { .. } | GamePhase::Restartable)
    }
}

/// What ended the run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrashCause {
    Obstacle(ObstacleKind),
    OffRoad,
}

impl fmt::Display for CrashCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrashCause::Obstacle(kind) => write!(f, "hit a {}", kind.as_str()),
            CrashCause::OffRoad => write!(f, "went off the road"),
        }
    }
}

/// State changes reported to the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    Started,
    Stopped,
    Crashed { cause: CrashCause, distance: f32 },
    Restartable,
    Restarted { distance: f32 },
    RoadExtended { segments: usize },
    SpeedUp { speed: f32 },
    Lap { laps: u32 },
}

/// Complete drive-loop state
#[derive(Debug, Clone)]
pub struct DriveState {
    pub config: DriveConfig,
    /// Run seed for reproducibility
    pub seed: u64,
    pub road: Road,
    pub car: Car,
    pub camera: Camera,
    pub particles: ParticleSystem,
    pub phase: GamePhase,
    /// Seconds spent driving (not paused)
    pub time: f32,
    /// Distance at the moment of the last crash
    pub crash_distance: f32,
    /// Crash count for this session
    pub crashes: u32,
    pub last_crash: Option<CrashCause>,
    /// Effects RNG
    pub(crate) rng: Pcg32,
    events: Vec<GameEvent>,
}

impl DriveState {
    /// Build the road and place the car at its start
    pub fn new(config: DriveConfig, seed: u64) -> Self {
        let road = Road::generate(&config, seed);
        let car = Car::new(0.0, config.initial_speed);
        let camera = Camera::follow(car.world_position(&road.curve), &config);
        Self {
            config,
            seed,
            road,
            car,
            camera,
            particles: ParticleSystem::new(),
            phase: GamePhase::Ready,
            time: 0.0,
            crash_distance: 0.0,
            crashes: 0,
            last_crash: None,
            rng: Pcg32::seed_from_u64(seed ^ 0x5EED_CAFE),
            events: Vec::new(),
        }
    }

    /// Current segment under the car
    pub fn segment(&self) -> usize {
        self.road.curve.segment_at(self.car.distance)
    }

    pub fn car_position(&self) -> Vec3 {
        self.car.world_position(&self.road.curve)
    }

    /// Recompute the chase camera from the car
    pub fn follow_camera(&mut self) {
        self.camera = Camera::follow(self.car_position(), &self.config);
    }

    pub(crate) fn push_event(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Take the events produced since the last call
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Events not yet drained
    pub fn pending_events(&self) -> &[GameEvent] {
        &self.events
    }
}
