//! Procedural road and obstacle generation
//!
//! The road is a sequence of lateral center offsets, one per fixed-length
//! segment. The shape is the sum of a gentle sine, a slower "dramatic turn"
//! sine and smoothed random jitter. Every sample and every obstacle is a pure
//! function of `(seed, segment index)`, so extending the road in batches gives
//! the same road as generating it in one go.

use std::ops::Range;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::tuning::{CurveShape, DriveConfig, RoadPolicy};
use crate::{hash01, lerp, smoothstep};

const SALT_DRAMATIC_PHASE: u64 = 1;
const SALT_JITTER: u64 = 2;
const SALT_OBSTACLE_CHANCE: u64 = 10;
const SALT_OBSTACLE_COUNT: u64 = 11;
const SALT_FREE_LANE: u64 = 12;
const SALT_OBSTACLE_KIND: u64 = 20;
const SALT_OBSTACLE_LATERAL: u64 = 21;
const SALT_OBSTACLE_Z: u64 = 22;

/// Placement attempts per obstacle before giving up on it
const PLACEMENT_TRIES: u64 = 4;
/// Extra clearance kept around the free lane
const LANE_CLEARANCE: f32 = 0.2;

/// Obstacle types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObstacleKind {
    Rock,
    Pothole,
    Mountain,
}

impl ObstacleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObstacleKind::Rock => "rock",
            ObstacleKind::Pothole => "pothole",
            ObstacleKind::Mountain => "mountain",
        }
    }

    /// Collision radius for this kind
    pub fn radius(&self, config: &DriveConfig) -> f32 {
        match self {
            ObstacleKind::Rock => config.obstacle_radii.rock,
            ObstacleKind::Pothole => config.obstacle_radii.pothole,
            ObstacleKind::Mountain => config.obstacle_radii.mountain,
        }
    }
}

/// An obstacle on the road
#[derive(Debug, Clone, PartialEq)]
pub struct Obstacle {
    pub id: u32,
    pub kind: ObstacleKind,
    /// Owning segment index
    pub segment: usize,
    /// Offset from the road center at the owning segment
    pub lateral: f32,
    /// Absolute position on the road plane (x = lateral world, y = distance)
    pub pos: Vec2,
    pub radius: f32,
}

/// Lateral center offsets, one per segment
#[derive(Debug, Clone)]
pub struct RoadCurve {
    samples: Vec<f32>,
    segment_length: f32,
    /// Wrapped roads repeat after `samples.len()` segments
    periodic: bool,
}

impl RoadCurve {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn segment_length(&self) -> f32 {
        self.segment_length
    }

    pub fn is_periodic(&self) -> bool {
        self.periodic
    }

    /// Total length of the known road
    pub fn total_length(&self) -> f32 {
        self.samples.len() as f32 * self.segment_length
    }

    /// Center offset of a segment (wraps on periodic roads, clamps otherwise)
    pub fn center(&self, segment: usize) -> f32 {
        match self.samples.len() {
            0 => 0.0,
            n if self.periodic => self.samples[segment % n],
            n => self.samples[segment.min(n - 1)],
        }
    }

    /// Segment index containing `distance`
    pub fn segment_at(&self, distance: f32) -> usize {
        let raw = (distance.max(0.0) / self.segment_length).floor() as usize;
        match self.samples.len() {
            0 => 0,
            n if self.periodic => raw % n,
            n => raw.min(n - 1),
        }
    }

    /// Signed longitudinal distance from `from` to `to`, taking the short way
    /// around on periodic roads
    pub fn longitudinal_delta(&self, from: f32, to: f32) -> f32 {
        let delta = to - from;
        if !self.periodic {
            return delta;
        }
        let total = self.total_length();
        let wrapped = delta.rem_euclid(total);
        if wrapped > total / 2.0 {
            wrapped - total
        } else {
            wrapped
        }
    }

    /// Largest |curve[i + 1] - curve[i]|, including the seam of a periodic road
    pub fn max_step(&self) -> f32 {
        let mut max = self
            .samples
            .windows(2)
            .map(|w| (w[1] - w[0]).abs())
            .fold(0.0, f32::max);
        if self.periodic && self.samples.len() > 1 {
            let seam = self.samples[0] - self.samples[self.samples.len() - 1];
            max = max.max(seam.abs());
        }
        max
    }
}

/// Evaluates the compound curve function for a segment index
#[derive(Debug, Clone)]
struct CurveGenerator {
    seed: u64,
    shape: CurveShape,
    gentle_frequency: Option<f32>,
    dramatic_frequency: Option<f32>,
    dramatic_phase: f32,
    /// Jitter knot count on a periodic road
    jitter_knots: Option<usize>,
    period: Option<usize>,
}

impl CurveGenerator {
    fn new(seed: u64, shape: CurveShape, period: Option<usize>) -> Self {
        // A periodic road needs a whole number of cycles; a component that
        // would not complete one cycle is left out.
        let fit = |freq: f32| match period {
            None => Some(freq),
            Some(n) => {
                let cycles = (n as f32 * freq / std::f32::consts::TAU).round();
                (cycles >= 1.0).then(|| cycles * std::f32::consts::TAU / n as f32)
            }
        };
        let jitter_knots = period.map(|n| (n as f32 / shape.jitter_spacing.max(1) as f32).round().max(1.0) as usize);

        Self {
            seed,
            shape,
            gentle_frequency: fit(shape.gentle_frequency),
            dramatic_frequency: fit(shape.dramatic_frequency),
            dramatic_phase: hash01(seed, 0, SALT_DRAMATIC_PHASE) * std::f32::consts::TAU,
            jitter_knots,
            period,
        }
    }

    fn offset(&self, index: usize) -> f32 {
        let i = index as f32;

        let gentle = self
            .gentle_frequency
            .map_or(0.0, |f| (i * f).sin() * self.shape.gentle_amplitude);

        // Shifted so the road starts straight ahead of the spawn point
        let dramatic = self.dramatic_frequency.map_or(0.0, |f| {
            ((i * f + self.dramatic_phase).sin() - self.dramatic_phase.sin())
                * self.shape.dramatic_amplitude
        });

        gentle + dramatic + self.jitter(index)
    }

    fn jitter(&self, index: usize) -> f32 {
        if self.shape.jitter_amplitude == 0.0 {
            return 0.0;
        }
        let (u, knots) = match (self.period, self.jitter_knots) {
            (Some(n), Some(knots)) => (index as f32 * knots as f32 / n as f32, Some(knots)),
            _ => (index as f32 / self.shape.jitter_spacing.max(1) as f32, None),
        };
        let k0 = u.floor() as usize;
        let t = u - k0 as f32;
        let (k0, k1) = match knots {
            Some(knots) => (k0 % knots, (k0 + 1) % knots),
            None => (k0, k0 + 1),
        };
        let knot = |k: usize| (hash01(self.seed, k as u64, SALT_JITTER) * 2.0 - 1.0) * self.shape.jitter_amplitude;
        lerp(knot(k0), knot(k1), smoothstep(t))
    }
}

/// Bound every step of a closed loop, seam included, by `max_delta`.
///
/// Midpoint of the lower and upper `max_delta`-Lipschitz envelopes of `raw`
/// on the cycle. Samples whose neighbourhood already satisfies the bound keep
/// their raw value.
fn close_loop(raw: &[f32], max_delta: f32) -> Vec<f32> {
    let n = raw.len();
    if n < 2 {
        return raw.to_vec();
    }
    let mut lower = raw.to_vec();
    let mut upper = raw.to_vec();
    // Two laps each way reach every sample from every other on the cycle
    for step in 1..2 * n {
        let (prev, i) = ((step - 1) % n, step % n);
        lower[i] = lower[i].min(lower[prev] + max_delta);
        upper[i] = upper[i].max(upper[prev] - max_delta);
    }
    for step in (0..2 * n - 1).rev() {
        let (next, i) = ((step + 1) % n, step % n);
        lower[i] = lower[i].min(lower[next] + max_delta);
        upper[i] = upper[i].max(upper[next] - max_delta);
    }
    lower.iter().zip(&upper).map(|(lo, hi)| (lo + hi) / 2.0).collect()
}

/// The road: curve samples plus the obstacles placed along it
#[derive(Debug, Clone)]
pub struct Road {
    pub curve: RoadCurve,
    /// Sorted by owning segment
    obstacles: Vec<Obstacle>,
    generator: CurveGenerator,
    seed: u64,
    next_obstacle_id: u32,
}

impl Road {
    /// Generate the initial road for a config
    pub fn generate(config: &DriveConfig, seed: u64) -> Self {
        let count = config.initial_segment_count().max(1);
        let periodic = config.road_policy == RoadPolicy::Wrap;
        let generator = CurveGenerator::new(seed, config.curve, periodic.then_some(count));

        let mut road = Self {
            curve: RoadCurve {
                samples: Vec::with_capacity(count),
                segment_length: config.segment_length,
                periodic,
            },
            obstacles: Vec::new(),
            generator,
            seed,
            next_obstacle_id: 1,
        };
        let range = road.append_samples(count, config.curve.max_delta);
        road.place_obstacles(range, config);

        log::info!(
            "Generated road: {} segments, {} obstacles (seed {})",
            road.curve.len(),
            road.obstacles.len(),
            seed
        );
        road
    }

    /// Append `segments` new segments continuing from the last sample and
    /// place obstacles on them. Returns the new segment range.
    ///
    /// Periodic roads never grow.
    pub fn extend(&mut self, segments: usize, config: &DriveConfig) -> Range<usize> {
        if self.curve.periodic || segments == 0 {
            let end = self.curve.len();
            return end..end;
        }
        let range = self.append_samples(segments, config.curve.max_delta);
        self.place_obstacles(range.clone(), config);
        log::debug!(
            "Road extended to {} segments ({} obstacles)",
            self.curve.len(),
            self.obstacles.len()
        );
        range
    }

    fn append_samples(&mut self, segments: usize, max_delta: f32) -> Range<usize> {
        let start = self.curve.samples.len();
        if self.curve.periodic {
            let raw: Vec<f32> = (start..start + segments).map(|i| self.generator.offset(i)).collect();
            self.curve.samples.extend(close_loop(&raw, max_delta));
            return start..start + segments;
        }
        for index in start..start + segments {
            let raw = self.generator.offset(index);
            let sample = match self.curve.samples.last() {
                Some(&prev) => prev + (raw - prev).clamp(-max_delta, max_delta),
                None => raw,
            };
            self.curve.samples.push(sample);
        }
        start..start + segments
    }

    fn place_obstacles(&mut self, range: Range<usize>, config: &DriveConfig) {
        let half_width = config.half_width();
        let corridor = config.corridor_half_width();

        for segment in range {
            if segment < config.start_safe_segments {
                continue;
            }
            let seg = segment as u64;
            if hash01(self.seed, seg, SALT_OBSTACLE_CHANCE) >= config.obstacle_chance {
                continue;
            }

            let max = config.max_obstacles_per_segment.max(1);
            let count = 1 + (hash01(self.seed, seg, SALT_OBSTACLE_COUNT) * max as f32) as u32;
            let count = count.min(max);

            // Keep one lane of the segment passable
            let free_lane = (hash01(self.seed, seg, SALT_FREE_LANE) * 2.0 - 1.0) * corridor;
            let center = self.curve.center(segment);

            for k in 0..count as u64 {
                let kind_roll = hash01(self.seed, seg * 8 + k, SALT_OBSTACLE_KIND);
                let kind = if kind_roll < 0.55 {
                    ObstacleKind::Rock
                } else if kind_roll < 0.9 {
                    ObstacleKind::Pothole
                } else {
                    ObstacleKind::Mountain
                };
                let radius = kind.radius(config);
                let max_lateral = (half_width - radius).max(0.0);

                let lateral = (0..PLACEMENT_TRIES)
                    .map(|attempt| {
                        let roll = hash01(self.seed, (seg * 8 + k) * PLACEMENT_TRIES + attempt, SALT_OBSTACLE_LATERAL);
                        (roll * 2.0 - 1.0) * max_lateral
                    })
                    .find(|lateral| {
                        (lateral - free_lane).abs() >= radius + config.car_radius + LANE_CLEARANCE
                    });
                let Some(lateral) = lateral else {
                    continue;
                };

                let along = 0.2 + 0.6 * hash01(self.seed, seg * 8 + k, SALT_OBSTACLE_Z);
                let z = (segment as f32 + along) * config.segment_length;
                let id = self.next_obstacle_id;
                self.next_obstacle_id += 1;
                self.obstacles.push(Obstacle {
                    id,
                    kind,
                    segment,
                    lateral,
                    pos: Vec2::new(center + lateral, z),
                    radius,
                });
            }
        }
    }

    /// Place an obstacle by hand at `distance` along the road, `lateral` from
    /// the center. Returns its id.
    pub fn add_obstacle(&mut self, kind: ObstacleKind, distance: f32, lateral: f32, radius: f32) -> u32 {
        let segment = self.curve.segment_at(distance);
        let id = self.next_obstacle_id;
        self.next_obstacle_id += 1;
        let obstacle = Obstacle {
            id,
            kind,
            segment,
            lateral,
            pos: Vec2::new(self.curve.center(segment) + lateral, distance),
            radius,
        };
        let at = self.obstacles.partition_point(|o| o.segment <= segment);
        self.obstacles.insert(at, obstacle);
        id
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    /// Obstacles owned by one segment
    pub fn obstacles_in_segment(&self, segment: usize) -> &[Obstacle] {
        let start = self.obstacles.partition_point(|o| o.segment < segment);
        let end = self.obstacles.partition_point(|o| o.segment <= segment);
        &self.obstacles[start..end]
    }

    /// Obstacles whose segment lies within `behind`/`ahead` segments of
    /// `segment` (wrapping on periodic roads)
    pub fn obstacles_near(&self, segment: usize, behind: usize, ahead: usize) -> Vec<&Obstacle> {
        let len = self.curve.len();
        if len == 0 {
            return Vec::new();
        }
        let mut segments: Vec<usize> = if self.curve.periodic {
            let span = (behind + ahead + 1).min(len);
            (0..span)
                .map(|i| (segment + len - behind % len + i) % len)
                .collect()
        } else {
            (segment.saturating_sub(behind)..=(segment + ahead).min(len - 1)).collect()
        };
        segments.dedup();
        segments
            .into_iter()
            .flat_map(|s| self.obstacles_in_segment(s))
            .collect()
    }

    /// Remove obstacles within `radius` meters (along the road) of `distance`.
    /// Returns how many were removed.
    pub fn clear_obstacles_near(&mut self, distance: f32, radius: f32) -> usize {
        let before = self.obstacles.len();
        let curve = &self.curve;
        self.obstacles
            .retain(|o| curve.longitudinal_delta(distance, o.pos.y).abs() > radius);
        let removed = before - self.obstacles.len();
        if removed > 0 {
            log::debug!("Cleared {} obstacles near {:.1}", removed, distance);
        }
        removed
    }

    /// Meters of known road ahead of `distance`
    pub fn remaining(&self, distance: f32) -> f32 {
        self.curve.total_length() - distance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn wrap_config() -> DriveConfig {
        DriveConfig {
            road_policy: RoadPolicy::Wrap,
            ..Default::default()
        }
    }

    #[test]
    fn test_generate_initial_length() {
        let config = DriveConfig::default();
        let road = Road::generate(&config, 7);
        assert_eq!(road.curve.len(), 100);
        assert_eq!(road.curve.total_length(), 1000.0);
    }

    #[test]
    fn test_no_obstacles_in_start_window() {
        let config = DriveConfig {
            obstacle_chance: 1.0,
            ..Default::default()
        };
        let road = Road::generate(&config, 3);
        assert!(!road.obstacles().is_empty());
        assert!(road.obstacles().iter().all(|o| o.segment >= config.start_safe_segments));
    }

    #[test]
    fn test_obstacles_within_road_and_sorted() {
        let config = DriveConfig {
            obstacle_chance: 1.0,
            ..Default::default()
        };
        let road = Road::generate(&config, 11);
        for o in road.obstacles() {
            assert!(o.lateral.abs() <= config.half_width());
            let center = road.curve.center(o.segment);
            assert!((o.pos.x - (center + o.lateral)).abs() < 1e-4);
            assert_eq!(road.curve.segment_at(o.pos.y), o.segment);
        }
        assert!(road.obstacles().windows(2).all(|w| w[0].segment <= w[1].segment));
    }

    #[test]
    fn test_batches_match_single_generation() {
        let config = DriveConfig::default();
        let mut batched = Road::generate(&config, 99);
        batched.extend(30, &config);
        batched.extend(20, &config);

        let whole_config = DriveConfig {
            initial_road_length: 1500.0,
            ..Default::default()
        };
        let whole = Road::generate(&whole_config, 99);

        assert_eq!(batched.curve.samples(), whole.curve.samples());
        let a: Vec<_> = batched.obstacles().iter().map(|o| (o.segment, o.pos)).collect();
        let b: Vec<_> = whole.obstacles().iter().map(|o| (o.segment, o.pos)).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_extension_continues_smoothly() {
        let config = DriveConfig::default();
        let mut road = Road::generate(&config, 5);
        let last = *road.curve.samples().last().unwrap();
        let range = road.extend(50, &config);
        assert_eq!(range, 100..150);
        assert_eq!(road.curve.len(), 150);
        assert!((road.curve.samples()[100] - last).abs() <= config.curve.max_delta);
        assert!(road.curve.max_step() <= config.curve.max_delta);
    }

    #[test]
    fn test_periodic_road_does_not_extend() {
        let config = wrap_config();
        let mut road = Road::generate(&config, 5);
        let range = road.extend(50, &config);
        assert!(range.is_empty());
        assert_eq!(road.curve.len(), 100);
    }

    #[test]
    fn test_periodic_seam_is_smooth() {
        let config = wrap_config();
        let road = Road::generate(&config, 21);
        assert!(road.curve.is_periodic());
        assert!(road.curve.max_step() < config.curve.max_delta);
        assert_eq!(road.curve.center(100), road.curve.center(0));
        assert_eq!(road.curve.segment_at(1005.0), 0);
    }

    #[test]
    fn test_tight_wrapped_road_closes_smoothly() {
        let config = DriveConfig::from_json(
            r#"{"road_policy":{"kind":"wrap"},"curve":{"max_delta":0.3}}"#,
        )
        .unwrap();
        for seed in 0..50 {
            let road = Road::generate(&config, seed);
            let samples = road.curve.samples();
            let seam = (samples[0] - samples[samples.len() - 1]).abs();
            assert!(seam <= 0.3 + 1e-5, "seed {} seam {}", seed, seam);
            assert!(road.curve.max_step() <= 0.3 + 1e-5, "seed {}", seed);
        }
    }

    #[test]
    fn test_close_loop_keeps_smooth_input() {
        let raw: Vec<f32> = (0..40).map(|i| (i as f32 * std::f32::consts::TAU / 40.0).sin()).collect();
        assert_eq!(close_loop(&raw, 0.5), raw);

        let spiky = vec![0.0, 0.0, 5.0, 0.0, 0.0, 0.0];
        let closed = close_loop(&spiky, 1.0);
        for i in 0..closed.len() {
            let next = closed[(i + 1) % closed.len()];
            assert!((next - closed[i]).abs() <= 1.0 + 1e-6);
        }
    }

    #[test]
    fn test_longitudinal_delta_wraps() {
        let road = Road::generate(&wrap_config(), 1);
        assert!((road.curve.longitudinal_delta(995.0, 5.0) - 10.0).abs() < 1e-3);
        assert!((road.curve.longitudinal_delta(5.0, 995.0) + 10.0).abs() < 1e-3);

        let open = Road::generate(&DriveConfig::default(), 1);
        assert_eq!(open.curve.longitudinal_delta(995.0, 5.0), -990.0);
    }

    #[test]
    fn test_clear_obstacles_near() {
        let config = DriveConfig {
            obstacle_chance: 1.0,
            ..Default::default()
        };
        let mut road = Road::generate(&config, 8);
        let removed = road.clear_obstacles_near(200.0, 40.0);
        assert!(removed > 0);
        assert!(road.obstacles().iter().all(|o| (o.pos.y - 200.0).abs() > 40.0));
    }

    #[test]
    fn test_clear_wraps_around_seam() {
        let config = DriveConfig {
            obstacle_chance: 0.0,
            ..wrap_config()
        };
        let mut road = Road::generate(&config, 8);
        road.add_obstacle(ObstacleKind::Rock, 985.0, 0.0, 0.6);
        road.add_obstacle(ObstacleKind::Rock, 500.0, 0.0, 0.6);
        assert_eq!(road.clear_obstacles_near(0.0, 40.0), 1);
        assert_eq!(road.obstacles().len(), 1);
    }

    #[test]
    fn test_obstacles_near_window() {
        let config = DriveConfig {
            obstacle_chance: 0.0,
            ..Default::default()
        };
        let mut road = Road::generate(&config, 2);
        road.add_obstacle(ObstacleKind::Rock, 105.0, 0.0, 0.6); // segment 10
        road.add_obstacle(ObstacleKind::Pothole, 135.0, 1.0, 0.8); // segment 13
        road.add_obstacle(ObstacleKind::Mountain, 305.0, 0.0, 1.6); // segment 30

        let near: Vec<_> = road.obstacles_near(11, 1, 2).iter().map(|o| o.segment).collect();
        assert_eq!(near, vec![10, 13]);
        assert!(road.obstacles_near(20, 1, 2).is_empty());
    }

    #[test]
    fn test_obstacles_near_wraps() {
        let config = DriveConfig {
            obstacle_chance: 0.0,
            ..wrap_config()
        };
        let mut road = Road::generate(&config, 2);
        road.add_obstacle(ObstacleKind::Rock, 995.0, 0.0, 0.6); // segment 99
        let near = road.obstacles_near(0, 1, 2);
        assert_eq!(near.len(), 1);
        assert_eq!(near[0].segment, 99);
    }

    #[test]
    fn test_segment_keeps_free_lane() {
        let config = DriveConfig {
            obstacle_chance: 1.0,
            max_obstacles_per_segment: 3,
            ..Default::default()
        };
        let road = Road::generate(&config, 17);
        let corridor = config.corridor_half_width();
        for segment in 0..road.curve.len() {
            let obstacles = road.obstacles_in_segment(segment);
            // Some lateral position in the corridor is clear of every obstacle
            let clear = (0..=80).map(|i| -corridor + 2.0 * corridor * i as f32 / 80.0).any(|x| {
                obstacles
                    .iter()
                    .all(|o| (o.lateral - x).abs() >= o.radius + config.car_radius)
            });
            assert!(clear, "segment {} fully blocked", segment);
        }
    }

    proptest! {
        #[test]
        fn prop_curvature_bounded(seed in any::<u64>(), length in 20.0f32..3000.0, extra in 0usize..200) {
            let config = DriveConfig { initial_road_length: length, ..Default::default() };
            let mut road = Road::generate(&config, seed);
            road.extend(extra, &config);
            prop_assert!(road.curve.max_step() <= config.curve.max_delta + 1e-5);
        }

        #[test]
        fn prop_periodic_curvature_bounded(
            seed in any::<u64>(),
            length in 100.0f32..3000.0,
            gentle_amplitude in 0.0f32..10.0,
            gentle_frequency in 0.001f32..0.5,
            dramatic_amplitude in 0.0f32..20.0,
            dramatic_frequency in 0.001f32..0.1,
            jitter_amplitude in 0.0f32..3.0,
            jitter_spacing in 1usize..20,
            max_delta in 0.05f32..2.0,
        ) {
            let config = DriveConfig {
                initial_road_length: length,
                road_policy: RoadPolicy::Wrap,
                curve: CurveShape {
                    gentle_amplitude,
                    gentle_frequency,
                    dramatic_amplitude,
                    dramatic_frequency,
                    jitter_amplitude,
                    jitter_spacing,
                    max_delta,
                },
                ..Default::default()
            };
            prop_assert!(config.validate().is_ok());
            let road = Road::generate(&config, seed);
            prop_assert!(road.curve.max_step() <= max_delta + 1e-4);
        }
    }
}
