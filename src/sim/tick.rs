//! Per-frame simulation step
//!
//! Advances the drive loop by one frame and owns the phase transitions:
//! Ready/Paused -> Driving -> Crashed -> Restartable -> Driving.

use glam::Vec3;

use super::collision::check_crash;
use super::state::{CrashCause, DriveState, GameEvent, GamePhase};
use crate::consts::MAX_FRAME_DT;
use crate::tuning::{RestartPolicy, RoadPolicy};

/// Input sample for a single frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickInput {
    /// Left/right device tilt in degrees (None if unavailable)
    pub tilt: Option<f32>,
    /// Analog axis in [-1, 1] (controller thumbstick)
    pub axis: Option<f32>,
    pub left: bool,
    pub right: bool,
}

impl TickInput {
    /// Normalized steering in [-1, 1]. An analog axis takes precedence over
    /// tilt; held keys add on top.
    pub fn steer(&self, max_tilt_degrees: f32) -> f32 {
        let analog = match (self.axis, self.tilt) {
            (Some(axis), _) => axis.clamp(-1.0, 1.0),
            (None, Some(tilt)) if max_tilt_degrees > 0.0 => {
                tilt.clamp(-max_tilt_degrees, max_tilt_degrees) / max_tilt_degrees
            }
            _ => 0.0,
        };
        let keys = match (self.left, self.right) {
            (true, false) => -1.0,
            (false, true) => 1.0,
            _ => 0.0,
        };
        (analog + keys).clamp(-1.0, 1.0)
    }
}

/// Advance the drive loop by `dt` seconds
pub fn tick(state: &mut DriveState, input: &TickInput, dt: f32) {
    let dt = if dt.is_finite() { dt.clamp(0.0, MAX_FRAME_DT) } else { 0.0 };

    match state.phase {
        GamePhase::Ready | GamePhase::Paused => {}
        GamePhase::Driving => drive(state, input, dt),
        GamePhase::Crashed { elapsed } => {
            wind_down(state, dt);
            let elapsed = elapsed + dt;
            if elapsed >= state.config.restart_delay {
                state.phase = GamePhase::Restartable;
                state.push_event(GameEvent::Restartable);
                log::debug!("Restart available");
            } else {
                state.phase = GamePhase::Crashed { elapsed };
            }
        }
        GamePhase::Restartable => wind_down(state, dt),
    }
}

fn drive(state: &mut DriveState, input: &TickInput, dt: f32) {
    state.time += dt;
    let prev_x = state.car.world_x(&state.road.curve);
    let prev_distance = state.car.distance;

    if state.car.ramp_speed(&state.config.speed_policy, dt) {
        log::info!("Speed up: {:.1} m/s", state.car.speed);
        let speed = state.car.speed;
        state.push_event(GameEvent::SpeedUp { speed });
    }

    advance(state, dt);

    let steer = input.steer(state.config.max_tilt_degrees);
    let corridor = state.config.corridor_half_width();
    state
        .car
        .steer(steer, state.config.steer_sensitivity, dt, corridor);

    let dx = state.car.world_x(&state.road.curve) - prev_x;
    let dz = state
        .road
        .curve
        .longitudinal_delta(prev_distance, state.car.distance);
    state
        .car
        .update_facing(dx, dz, steer, state.config.max_roll, dt);
    state.follow_camera();

    if let Some(cause) = check_crash(&state.road, &state.car, &state.config) {
        crash(state, cause);
    }
}

/// Move the car forward and handle the end of the road
fn advance(state: &mut DriveState, dt: f32) {
    state.car.distance += state.car.speed * dt;

    match state.config.road_policy {
        RoadPolicy::Wrap => {
            let total = state.road.curve.total_length();
            if state.car.distance >= total {
                state.car.distance = state.car.distance.rem_euclid(total);
                state.car.laps += 1;
                let laps = state.car.laps;
                state.push_event(GameEvent::Lap { laps });
            }
        }
        RoadPolicy::Extend {
            threshold,
            batch_segments,
        } => {
            let mut extended = false;
            while state.road.remaining(state.car.distance) < threshold {
                state.road.extend(batch_segments.max(1), &state.config);
                extended = true;
            }
            if extended {
                let segments = state.road.curve.len();
                log::info!("Road extended to {} segments", segments);
                state.push_event(GameEvent::RoadExtended { segments });
            }
        }
    }
}

/// Post-crash frame: slow the wreck, burn, age particles
fn wind_down(state: &mut DriveState, dt: f32) {
    state.time += dt;
    state.car.decelerate(state.config.crash_decel_rate, dt);
    advance(state, dt);
    let time = state.time;
    state.car.update_flame(time, dt);
    state.particles.update(dt, state.config.gravity);
    state.follow_camera();
}

/// Enter the crashed state. Only the first crash while driving counts;
/// returns false (and changes nothing) otherwise.
pub fn crash(state: &mut DriveState, cause: CrashCause) -> bool {
    if state.phase != GamePhase::Driving {
        return false;
    }

    state.phase = GamePhase::Crashed { elapsed: 0.0 };
    state.crash_distance = state.car.distance;
    state.crashes += 1;
    state.last_crash = Some(cause);
    state.car.damaged = true;
    state.car.flame = 1.0;

    let origin = state.car_position();
    let carry = Vec3::new(0.0, 0.0, state.car.speed);
    let count = state.config.burst_particles;
    state.particles.burst(origin, carry, count, &mut state.rng);

    log::info!(
        "Crashed ({}) at {:.0} m, {} particles",
        cause,
        state.car.distance,
        state.particles.len()
    );
    let distance = state.car.distance;
    state.push_event(GameEvent::Crashed { cause, distance });
    true
}

/// Start (or resume) driving from Ready or Paused
pub fn start(state: &mut DriveState) -> bool {
    match state.phase {
        GamePhase::Ready | GamePhase::Paused => {
            state.phase = GamePhase::Driving;
            state.push_event(GameEvent::Started);
            log::info!("Driving");
            true
        }
        _ => false,
    }
}

/// Stop driving; idempotent
pub fn stop(state: &mut DriveState) -> bool {
    if state.phase != GamePhase::Driving {
        return false;
    }
    state.phase = GamePhase::Paused;
    state.push_event(GameEvent::Stopped);
    log::info!("Stopped at {:.0} m", state.car.distance);
    true
}

/// Restart after a crash once the restart delay has passed
pub fn restart(state: &mut DriveState) -> bool {
    if state.phase != GamePhase::Restartable {
        return false;
    }

    let restart_at = match state.config.restart_policy {
        RestartPolicy::Origin => 0.0,
        RestartPolicy::Resume => state.crash_distance,
    };

    state.particles.clear();
    let cleared = state
        .road
        .clear_obstacles_near(restart_at, state.config.restart_clear_radius);
    state.car.reset(restart_at, state.config.initial_speed);
    state.follow_camera();
    state.phase = GamePhase::Driving;
    state.push_event(GameEvent::Restarted {
        distance: restart_at,
    });
    log::info!(
        "Restarted at {:.0} m ({} obstacles cleared)",
        restart_at,
        cleared
    );
    true
}

/// Demo driver: steer away from obstacles ahead toward open road
pub fn autopilot(state: &DriveState) -> TickInput {
    let config = &state.config;
    let corridor = config.corridor_half_width();
    let segment = state.segment();
    let look_ahead_segments = (25.0 / config.segment_length).ceil() as usize + 1;

    let mut target = 0.0f32;
    let mut ahead: Vec<_> = state
        .road
        .obstacles_near(segment, 0, look_ahead_segments)
        .into_iter()
        .filter(|o| {
            let dz = state.road.curve.longitudinal_delta(state.car.distance, o.pos.y);
            (-1.0..25.0).contains(&dz)
        })
        .collect();
    ahead.sort_by(|a, b| {
        let da = state.road.curve.longitudinal_delta(state.car.distance, a.pos.y);
        let db = state.road.curve.longitudinal_delta(state.car.distance, b.pos.y);
        da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
    });

    // Nearest obstacle decides the side to pass on
    if let Some(o) = ahead.first() {
        let clear = o.radius + config.car_radius + 0.6;
        let left = o.lateral - clear;
        let right = o.lateral + clear;
        let left_ok = left >= -corridor;
        let right_ok = right <= corridor;
        target = match (left_ok, right_ok) {
            (true, true) if (state.car.lateral - left).abs() < (state.car.lateral - right).abs() => left,
            (true, true) | (false, true) => right,
            (true, false) => left,
            (false, false) => state.car.lateral,
        };
    }

    TickInput {
        axis: Some(((target - state.car.lateral) / 1.5).clamp(-1.0, 1.0)),
        ..Default::default()
    }
}
