//! Platform adapter layer
//!
//! Boundary between the simulation and the host:
//! - Input: last-value cache of tilt, keys and controller axis
//! - Scene: diffed place/remove calls into an external renderer
//! - Sound: engine loop and crash one-shot, gated by the sound flag

pub mod input;
pub mod scene;
pub mod sound;

pub use input::{InputCache, SteerKey, TiltPermission};
pub use scene::{Primitive, SceneHandle, SceneService, SceneSync, SyncStats, Transform};
pub use sound::{AudioService, SoundDirector};
