//! Crash detection
//!
//! Obstacle checks only look at obstacles owned by segments near the car;
//! the off-road check compares the car's offset from the road center against
//! half the drivable width.

use glam::Vec2;

use super::car::Car;
use super::road::{Obstacle, Road};
use super::state::CrashCause;
use crate::tuning::DriveConfig;

/// Planar distance between the car and an obstacle, wrap-aware along the road
pub fn obstacle_distance(road: &Road, car_pos: Vec2, obstacle: &Obstacle) -> f32 {
    let dx = car_pos.x - obstacle.pos.x;
    let dz = road.curve.longitudinal_delta(obstacle.pos.y, car_pos.y);
    (dx * dx + dz * dz).sqrt()
}

/// First obstacle within the scan window overlapping the car
pub fn obstacle_hit<'a>(road: &'a Road, car: &Car, config: &DriveConfig) -> Option<&'a Obstacle> {
    let segment = road.curve.segment_at(car.distance);
    let car_pos = Vec2::new(car.world_x(&road.curve), car.distance);

    road.obstacles_near(
        segment,
        config.collision_window_behind,
        config.collision_window_ahead,
    )
    .into_iter()
    .find(|o| obstacle_distance(road, car_pos, o) < config.car_radius + o.radius)
}

/// True once the car center is further than half the road width (plus
/// tolerance) from the road center
#[inline]
pub fn is_off_road(lateral: f32, config: &DriveConfig) -> bool {
    lateral.abs() > config.half_width() + config.off_road_tolerance
}

/// Check every crash condition; obstacle hits win over leaving the road
pub fn check_crash(road: &Road, car: &Car, config: &DriveConfig) -> Option<CrashCause> {
    if let Some(obstacle) = obstacle_hit(road, car, config) {
        return Some(CrashCause::Obstacle(obstacle.kind));
    }
    if is_off_road(car.lateral, config) {
        return Some(CrashCause::OffRoad);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::road::ObstacleKind;
    use crate::tuning::RoadPolicy;

    fn empty_road(config: &DriveConfig) -> Road {
        let config = DriveConfig {
            obstacle_chance: 0.0,
            ..config.clone()
        };
        Road::generate(&config, 4)
    }

    #[test]
    fn test_head_on_obstacle_hits() {
        let config = DriveConfig::default();
        let mut road = empty_road(&config);
        road.add_obstacle(ObstacleKind::Rock, 250.0, 0.0, config.car_radius);

        let mut car = Car::new(250.0, 20.0);
        car.lateral = 0.0;
        assert_eq!(
            check_crash(&road, &car, &config),
            Some(CrashCause::Obstacle(ObstacleKind::Rock))
        );
    }

    #[test]
    fn test_obstacle_beyond_combined_radius_misses() {
        let config = DriveConfig::default();
        let radius = 0.8;
        let mut road = empty_road(&config);
        road.add_obstacle(
            ObstacleKind::Pothole,
            250.0,
            radius + config.car_radius + 0.01,
            radius,
        );

        let car = Car::new(250.0, 20.0);
        assert_eq!(check_crash(&road, &car, &config), None);
    }

    #[test]
    fn test_obstacle_outside_window_ignored() {
        let config = DriveConfig {
            car_radius: 50.0,
            ..Default::default()
        };
        let mut road = empty_road(&config);
        // Overlaps by radius, but owned by a segment far outside the window
        road.add_obstacle(ObstacleKind::Mountain, 300.0, 0.0, 1.6);
        let car = Car::new(255.0, 20.0);
        assert!(obstacle_hit(&road, &car, &config).is_none());
    }

    #[test]
    fn test_obstacle_in_next_segment_hits() {
        let config = DriveConfig::default();
        let mut road = empty_road(&config);
        // Car near the end of segment 24, obstacle just into segment 25
        road.add_obstacle(ObstacleKind::Rock, 250.2, 0.0, 0.6);
        let mut car = Car::new(249.8, 20.0);
        // Align world x exactly with the obstacle
        car.lateral = road.curve.center(25) - road.curve.center(24);
        assert!(obstacle_hit(&road, &car, &config).is_some());
    }

    #[test]
    fn test_off_road_threshold() {
        let config = DriveConfig::default();
        let edge = config.half_width() + config.off_road_tolerance;
        let road = empty_road(&config);

        let mut car = Car::new(100.0, 20.0);
        car.lateral = edge + 0.01;
        assert_eq!(check_crash(&road, &car, &config), Some(CrashCause::OffRoad));
        car.lateral = -(edge + 0.01);
        assert_eq!(check_crash(&road, &car, &config), Some(CrashCause::OffRoad));
        car.lateral = edge - 0.01;
        assert_eq!(check_crash(&road, &car, &config), None);
    }

    #[test]
    fn test_obstacle_wins_over_off_road() {
        let config = DriveConfig::default();
        let mut road = empty_road(&config);
        let lateral = config.half_width() + config.off_road_tolerance + 0.5;
        road.add_obstacle(ObstacleKind::Rock, 150.0, lateral, 0.6);
        let mut car = Car::new(150.0, 20.0);
        car.lateral = lateral;
        assert_eq!(
            check_crash(&road, &car, &config),
            Some(CrashCause::Obstacle(ObstacleKind::Rock))
        );
    }

    #[test]
    fn test_hit_across_wrap_seam() {
        let config = DriveConfig {
            road_policy: RoadPolicy::Wrap,
            ..Default::default()
        };
        let mut road = empty_road(&config);
        road.add_obstacle(ObstacleKind::Rock, 999.8, 0.0, 0.6);
        let mut car = Car::new(0.1, 20.0);
        // Put the car at the obstacle's world x
        car.lateral = road.curve.center(99) - road.curve.center(0);
        assert!(obstacle_hit(&road, &car, &config).is_some());
    }
}
