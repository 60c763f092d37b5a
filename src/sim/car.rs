//! Car and chase camera state

use glam::Vec3;

use super::road::RoadCurve;
use crate::consts::{CAR_RIDE_HEIGHT, STOP_EPSILON};
use crate::tuning::{DriveConfig, SpeedPolicy};

/// The player's car
#[derive(Debug, Clone, PartialEq)]
pub struct Car {
    /// Distance traveled along the road (wrapped on periodic roads)
    pub distance: f32,
    /// Offset from the road center at the current segment
    pub lateral: f32,
    /// Forward speed (m/s)
    pub speed: f32,
    /// Heading relative to straight down the road (radians, cosmetic)
    pub yaw: f32,
    /// Body roll from steering (radians, cosmetic)
    pub roll: f32,
    /// Time accumulated toward the next stepped speed bump
    pub speed_timer: f32,
    /// Completed laps of a periodic road
    pub laps: u32,
    /// Damage cue shown after a crash
    pub damaged: bool,
    /// Burning-wreck flame strength, 0..=1
    pub flame: f32,
}

impl Car {
    pub fn new(distance: f32, speed: f32) -> Self {
        Self {
            distance,
            lateral: 0.0,
            speed,
            yaw: 0.0,
            roll: 0.0,
            speed_timer: 0.0,
            laps: 0,
            damaged: false,
            flame: 0.0,
        }
    }

    /// Put the car back on the road center at `distance`, undamaged
    pub fn reset(&mut self, distance: f32, speed: f32) {
        let laps = self.laps;
        *self = Self::new(distance, speed);
        self.laps = laps;
    }

    /// World x of the car given the road under it
    pub fn world_x(&self, curve: &RoadCurve) -> f32 {
        curve.center(curve.segment_at(self.distance)) + self.lateral
    }

    /// World position (x lateral, y up, z along the road)
    pub fn world_position(&self, curve: &RoadCurve) -> Vec3 {
        Vec3::new(self.world_x(curve), CAR_RIDE_HEIGHT, self.distance)
    }

    /// Increase speed per the policy. Returns true when a stepped bump fired.
    ///
    /// Never decreases speed and never exceeds the policy cap.
    pub fn ramp_speed(&mut self, policy: &SpeedPolicy, dt: f32) -> bool {
        match *policy {
            SpeedPolicy::Accelerate { accel, max } => {
                self.speed = (self.speed + accel.max(0.0) * dt).min(max).max(self.speed);
                false
            }
            SpeedPolicy::Stepped {
                interval,
                factor,
                max,
            } => {
                self.speed_timer += dt;
                let mut bumped = false;
                while interval > 0.0 && self.speed_timer >= interval {
                    self.speed_timer -= interval;
                    let next = (self.speed * factor.max(1.0)).min(max);
                    if next > self.speed {
                        self.speed = next;
                        bumped = true;
                    }
                }
                bumped
            }
        }
    }

    /// Exponential slow-down while wrecked; snaps to zero near rest
    pub fn decelerate(&mut self, rate: f32, dt: f32) {
        self.speed *= (-rate.max(0.0) * dt).exp();
        if self.speed < STOP_EPSILON {
            self.speed = 0.0;
        }
    }

    /// Integrate a normalized steering input in [-1, 1] and clamp the car
    /// into the corridor `[-corridor, corridor]` around the road center
    pub fn steer(&mut self, input: f32, sensitivity: f32, dt: f32, corridor: f32) {
        let input = input.clamp(-1.0, 1.0);
        self.lateral = (self.lateral + input * sensitivity * dt).clamp(-corridor, corridor);
    }

    /// Cosmetic facing from the world-x change over the distance just
    /// driven. Has no effect on motion.
    pub fn update_facing(&mut self, dx: f32, dz: f32, steer: f32, max_roll: f32, dt: f32) {
        let target_yaw = dx.atan2(dz.max(1e-3));
        let blend = 1.0 - (-10.0 * dt).exp();
        self.yaw += (target_yaw - self.yaw) * blend;
        self.roll += (-steer.clamp(-1.0, 1.0) * max_roll - self.roll) * blend;
    }

    /// Flame strength pulses while the wreck is still moving, then dies down
    pub fn update_flame(&mut self, time: f32, dt: f32) {
        if self.speed > 0.0 {
            self.flame = 0.6 + 0.4 * (time * 25.0).sin();
        } else {
            self.flame = (self.flame - dt).max(0.0);
        }
    }
}

/// Chase camera, derived from the car every frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub look_at: Vec3,
}

impl Camera {
    /// Fixed offset behind and above the car, looking ahead of it
    pub fn follow(car_pos: Vec3, config: &DriveConfig) -> Self {
        Self {
            position: car_pos + Vec3::new(0.0, config.camera_height, -config.camera_behind),
            look_at: car_pos + Vec3::new(0.0, config.camera_look_height, config.camera_look_ahead),
        }
    }
}
