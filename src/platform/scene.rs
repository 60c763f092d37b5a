//! Scene adapter
//!
//! The renderer lives outside the crate. [`SceneSync`] diffs the drive state
//! against what was last sent and issues only the place/remove calls needed
//! to bring the external scene up to date.

use std::collections::{HashMap, HashSet};
use std::fmt;

use glam::Vec3;

use crate::sim::{Camera, DriveState, ObstacleKind, ParticleKind};

/// Stable identity of a scene object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SceneHandle {
    Car,
    Road(usize),
    Obstacle(u32),
    Particle(u32),
}

impl fmt::Display for SceneHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SceneHandle::Car => write!(f, "car"),
            SceneHandle::Road(i) => write!(f, "road-{}", i),
            SceneHandle::Obstacle(id) => write!(f, "obstacle-{}", id),
            SceneHandle::Particle(id) => write!(f, "particle-{}", id),
        }
    }
}

/// What to draw for a handle
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Primitive {
    Car { damaged: bool, flame: f32 },
    RoadSegment { width: f32, length: f32 },
    Obstacle { kind: ObstacleKind, radius: f32 },
    Particle { kind: &'static str, opacity: f32 },
}

impl Primitive {
    pub fn as_str(&self) -> &'static str {
        match self {
            Primitive::Car { .. } => "car",
            Primitive::RoadSegment { .. } => "road",
            Primitive::Obstacle { kind, .. } => kind.as_str(),
            Primitive::Particle { kind, .. } => *kind,
        }
    }
}

/// Where to draw it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    /// Rotation about the up axis (radians)
    pub yaw: f32,
    /// Rotation about the forward axis (radians)
    pub roll: f32,
    pub scale: f32,
}

impl Transform {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            yaw: 0.0,
            roll: 0.0,
            scale: 1.0,
        }
    }
}

/// External scene/rendering service
pub trait SceneService {
    /// Create the object if new, otherwise update it
    fn place(&mut self, handle: SceneHandle, primitive: &Primitive, transform: &Transform);
    fn remove(&mut self, handle: SceneHandle);
    fn camera(&mut self, position: Vec3, look_at: Vec3);
}

/// Counts from one sync pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub placed: usize,
    pub removed: usize,
    pub live: usize,
}

/// Mirrors the drive state into a [`SceneService`]
#[derive(Debug, Clone)]
pub struct SceneSync {
    /// Meters of road kept behind the car
    pub view_behind: f32,
    /// Meters of road drawn ahead of the car
    pub view_ahead: f32,
    placed: HashMap<SceneHandle, (Primitive, Transform)>,
    camera: Option<Camera>,
}

impl Default for SceneSync {
    fn default() -> Self {
        Self::new(20.0, 300.0)
    }
}

impl SceneSync {
    pub fn new(view_behind: f32, view_ahead: f32) -> Self {
        Self {
            view_behind,
            view_ahead,
            placed: HashMap::new(),
            camera: None,
        }
    }

    pub fn live(&self) -> usize {
        self.placed.len()
    }

    /// Bring the scene in line with `state`
    pub fn sync(&mut self, state: &DriveState, scene: &mut dyn SceneService) -> SyncStats {
        let wanted = self.collect(state);
        let mut stats = SyncStats::default();

        let stale: Vec<SceneHandle> = self
            .placed
            .keys()
            .filter(|h| !wanted.contains_key(h))
            .copied()
            .collect();
        for handle in stale {
            scene.remove(handle);
            self.placed.remove(&handle);
            stats.removed += 1;
        }

        for (handle, entry) in wanted {
            if self.placed.get(&handle) != Some(&entry) {
                scene.place(handle, &entry.0, &entry.1);
                self.placed.insert(handle, entry);
                stats.placed += 1;
            }
        }

        if self.camera != Some(state.camera) {
            scene.camera(state.camera.position, state.camera.look_at);
            self.camera = Some(state.camera);
        }

        stats.live = self.placed.len();
        stats
    }

    /// Remove everything this adapter created
    pub fn clear(&mut self, scene: &mut dyn SceneService) {
        for handle in self.placed.keys() {
            scene.remove(*handle);
        }
        self.placed.clear();
        self.camera = None;
    }

    fn collect(&self, state: &DriveState) -> HashMap<SceneHandle, (Primitive, Transform)> {
        let mut wanted = HashMap::new();
        let curve = &state.road.curve;
        let config = &state.config;
        let seg_len = curve.segment_length();
        let distance = state.car.distance;
        let n = curve.len() as i64;

        // Positions along the road are expressed relative to the car so a
        // periodic road stays continuous across its seam
        let along = |z: f32| distance + curve.longitudinal_delta(distance, z);

        let first = ((distance - self.view_behind) / seg_len).floor() as i64;
        let last = ((distance + self.view_ahead) / seg_len).ceil() as i64;
        for i in first..=last {
            let index = if curve.is_periodic() {
                i.rem_euclid(n.max(1))
            } else if i < 0 || i >= n {
                continue;
            } else {
                i
            };
            let index = index as usize;
            let center = curve.center(index);
            let next = curve.center(index + 1);
            let transform = Transform {
                position: Vec3::new(center, 0.0, i as f32 * seg_len + seg_len * 0.5),
                yaw: (next - center).atan2(seg_len),
                roll: 0.0,
                scale: 1.0,
            };
            let primitive = Primitive::RoadSegment {
                width: config.road_width,
                length: seg_len,
            };
            wanted.insert(SceneHandle::Road(index), (primitive, transform));
        }

        let behind = (self.view_behind / seg_len).ceil() as usize;
        let ahead = (self.view_ahead / seg_len).ceil() as usize;
        for obstacle in state.road.obstacles_near(state.segment(), behind, ahead) {
            let z = along(obstacle.pos.y);
            if z < distance - self.view_behind || z > distance + self.view_ahead {
                continue;
            }
            let primitive = Primitive::Obstacle {
                kind: obstacle.kind,
                radius: obstacle.radius,
            };
            let transform = Transform::at(Vec3::new(obstacle.pos.x, 0.0, z));
            wanted.insert(SceneHandle::Obstacle(obstacle.id), (primitive, transform));
        }

        let car_pos = state.car_position();
        wanted.insert(
            SceneHandle::Car,
            (
                Primitive::Car {
                    damaged: state.car.damaged,
                    flame: state.car.flame,
                },
                Transform {
                    position: car_pos,
                    yaw: state.car.yaw,
                    roll: state.car.roll,
                    scale: 1.0,
                },
            ),
        );

        for particle in state.particles.iter() {
            let yaw = match particle.kind {
                ParticleKind::Debris { angle, .. } => angle,
                _ => 0.0,
            };
            let transform = Transform {
                position: Vec3::new(particle.pos.x, particle.pos.y, along(particle.pos.z)),
                yaw,
                roll: 0.0,
                scale: particle.scale,
            };
            let primitive = Primitive::Particle {
                kind: particle.kind.as_str(),
                opacity: particle.opacity,
            };
            wanted.insert(SceneHandle::Particle(particle.id), (primitive, transform));
        }

        wanted
    }

    /// Handles currently present in the scene
    pub fn handles(&self) -> HashSet<SceneHandle> {
        self.placed.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{CrashCause, TickInput, crash, start, tick};
    use crate::tuning::{DriveConfig, RoadPolicy};

    #[derive(Default)]
    struct RecordingScene {
        placed: Vec<SceneHandle>,
        removed: Vec<SceneHandle>,
        cameras: usize,
        objects: HashMap<SceneHandle, Transform>,
    }

    impl SceneService for RecordingScene {
        fn place(&mut self, handle: SceneHandle, _primitive: &Primitive, transform: &Transform) {
            self.placed.push(handle);
            self.objects.insert(handle, *transform);
        }

        fn remove(&mut self, handle: SceneHandle) {
            self.removed.push(handle);
            self.objects.remove(&handle);
        }

        fn camera(&mut self, _position: Vec3, _look_at: Vec3) {
            self.cameras += 1;
        }
    }

    fn quiet_state(policy: RoadPolicy) -> DriveState {
        let config = DriveConfig {
            obstacle_chance: 0.0,
            road_policy: policy,
            ..Default::default()
        };
        DriveState::new(config, 9)
    }

    #[test]
    fn test_handle_keys() {
        assert_eq!(SceneHandle::Car.to_string(), "car");
        assert_eq!(SceneHandle::Road(12).to_string(), "road-12");
        assert_eq!(SceneHandle::Obstacle(3).to_string(), "obstacle-3");
        assert_eq!(SceneHandle::Particle(40).to_string(), "particle-40");
    }

    #[test]
    fn test_second_sync_is_noop() {
        let state = quiet_state(RoadPolicy::Wrap);
        let mut sync = SceneSync::default();
        let mut scene = RecordingScene::default();

        let first = sync.sync(&state, &mut scene);
        assert!(first.placed > 0);
        assert_eq!(first.removed, 0);
        assert_eq!(scene.cameras, 1);

        let second = sync.sync(&state, &mut scene);
        assert_eq!(second.placed, 0);
        assert_eq!(second.removed, 0);
        assert_eq!(second.live, first.live);
        assert_eq!(scene.cameras, 1);
    }

    #[test]
    fn test_road_window_scrolls() {
        let mut state = quiet_state(RoadPolicy::Extend {
            threshold: 300.0,
            batch_segments: 50,
        });
        let mut sync = SceneSync::new(20.0, 100.0);
        let mut scene = RecordingScene::default();
        sync.sync(&state, &mut scene);
        assert!(scene.objects.contains_key(&SceneHandle::Road(0)));
        assert!(!scene.objects.contains_key(&SceneHandle::Road(20)));

        state.car.distance = 150.0;
        state.follow_camera();
        sync.sync(&state, &mut scene);
        assert!(!scene.objects.contains_key(&SceneHandle::Road(0)));
        assert!(scene.objects.contains_key(&SceneHandle::Road(20)));
        assert!(scene.removed.contains(&SceneHandle::Road(0)));
        assert_eq!(sync.handles().len(), scene.objects.len());
    }

    #[test]
    fn test_wrap_seam_keeps_road_ahead() {
        let mut state = quiet_state(RoadPolicy::Wrap);
        state.car.distance = 995.0;
        state.follow_camera();
        let mut sync = SceneSync::new(20.0, 50.0);
        let mut scene = RecordingScene::default();
        sync.sync(&state, &mut scene);

        // Segment 0 follows segment 99 ahead of the car, not 1000 m behind it
        let start = scene.objects[&SceneHandle::Road(0)];
        assert!((start.position.z - 1005.0).abs() < 1e-3);
        assert!(scene.objects.contains_key(&SceneHandle::Road(99)));
    }

    #[test]
    fn test_particles_come_and_go() {
        let mut state = quiet_state(RoadPolicy::Wrap);
        start(&mut state);
        let mut sync = SceneSync::default();
        let mut scene = RecordingScene::default();
        sync.sync(&state, &mut scene);
        let before = sync.live();

        crash(&mut state, CrashCause::OffRoad);
        let stats = sync.sync(&state, &mut scene);
        assert_eq!(stats.live, before + state.config.burst_particles);

        for _ in 0..300 {
            tick(&mut state, &TickInput::default(), 1.0 / 60.0);
        }
        assert!(state.particles.is_empty());
        sync.sync(&state, &mut scene);
        assert!(
            !scene
                .objects
                .keys()
                .any(|h| matches!(h, SceneHandle::Particle(_)))
        );
    }

    #[test]
    fn test_clear_removes_everything() {
        let state = quiet_state(RoadPolicy::Wrap);
        let mut sync = SceneSync::default();
        let mut scene = RecordingScene::default();
        sync.sync(&state, &mut scene);
        sync.clear(&mut scene);
        assert!(scene.objects.is_empty());
        assert_eq!(sync.live(), 0);
    }
}
