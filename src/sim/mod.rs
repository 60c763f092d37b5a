//! Deterministic drive simulation
//!
//! All gameplay logic lives here. This module must stay pure:
//! - Road and obstacles depend only on (seed, segment index)
//! - Seeded RNG only, for crash effects
//! - No rendering, audio or DOM dependencies

pub mod car;
pub mod collision;
pub mod particles;
pub mod road;
pub mod state;
pub mod tick;

pub use car::{Camera, Car};
pub use collision::{check_crash, is_off_road, obstacle_hit};
pub use particles::{Particle, ParticleKind, ParticleSystem};
pub use road::{Obstacle, ObstacleKind, Road, RoadCurve};
pub use state::{CrashCause, DriveState, GameEvent, GamePhase};
pub use tick::{TickInput, autopilot, crash, restart, start, stop, tick};
