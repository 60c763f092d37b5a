//! Crash explosion particles
//!
//! Each particle kind carries only the data its update rule needs; one
//! `match` per frame advances all of them.

use glam::Vec3;
use rand::Rng;
use rand_pcg::Pcg32;

use crate::consts::GROUND_Y;
use crate::lerp;

/// Velocity retained after `dt`, given the fraction kept per 60 Hz frame
#[inline]
fn drag(per_frame: f32, dt: f32) -> f32 {
    per_frame.powf(dt * 60.0)
}

/// Kind-specific particle data
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParticleKind {
    /// Bright expanding ball at the impact point
    Flash { max_scale: f32 },
    /// Rising, flickering fire
    Flame { flicker_phase: f32 },
    /// Slow rising cloud that grows as it fades
    Smoke { growth: f32 },
    /// Fast ballistic spark
    Spark,
    /// Tumbling car fragment that bounces on the ground
    Debris { spin: f32, angle: f32 },
}

impl ParticleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticleKind::Flash { .. } => "flash",
            ParticleKind::Flame { .. } => "flame",
            ParticleKind::Smoke { .. } => "smoke",
            ParticleKind::Spark => "spark",
            ParticleKind::Debris { .. } => "debris",
        }
    }
}

/// A single effect particle
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub id: u32,
    pub pos: Vec3,
    pub vel: Vec3,
    pub age: f32,
    pub lifetime: f32,
    pub scale: f32,
    /// 1 = opaque, 0 = gone
    pub opacity: f32,
    pub kind: ParticleKind,
}

impl Particle {
    /// Fraction of lifetime used, in [0, 1]
    #[inline]
    pub fn life_fraction(&self) -> f32 {
        (self.age / self.lifetime).min(1.0)
    }

    pub fn is_dead(&self) -> bool {
        self.age >= self.lifetime || self.opacity <= 0.0
    }

    pub fn update(&mut self, dt: f32, gravity: f32) {
        self.age += dt;
        let life = self.life_fraction();

        match &mut self.kind {
            ParticleKind::Flash { max_scale } => {
                self.scale = lerp(1.0, *max_scale, life.sqrt());
                self.opacity = (1.0 - life) * (1.0 - life);
            }
            ParticleKind::Flame { flicker_phase } => {
                self.pos += self.vel * dt;
                // Buoyant: flames accelerate upward
                self.vel.y += gravity * 0.25 * dt;
                self.vel *= drag(0.96, dt);
                let flicker = 0.8 + 0.2 * (self.age * 30.0 + *flicker_phase).sin();
                self.scale = (1.0 - life) * flicker;
                self.opacity = 1.0 - life;
            }
            ParticleKind::Smoke { growth } => {
                self.pos += self.vel * dt;
                self.vel *= drag(0.98, dt);
                self.scale += *growth * dt;
                self.opacity = 0.6 * (1.0 - life);
            }
            ParticleKind::Spark => {
                self.pos += self.vel * dt;
                self.vel.y -= gravity * dt;
                self.vel *= drag(0.99, dt);
                self.opacity = 1.0 - life;
            }
            ParticleKind::Debris { spin, angle } => {
                self.pos += self.vel * dt;
                self.vel.y -= gravity * dt;
                *angle += *spin * dt;
                if self.pos.y <= GROUND_Y {
                    self.pos.y = GROUND_Y;
                    self.vel.y = -self.vel.y * 0.3;
                    self.vel.x *= 0.7;
                    self.vel.z *= 0.7;
                    *spin *= 0.7;
                }
                // Solid until the last 30% of its life
                self.opacity = if life > 0.7 { (1.0 - life) / 0.3 } else { 1.0 };
            }
        }
    }
}

/// All live particles
#[derive(Debug, Clone, Default)]
pub struct ParticleSystem {
    particles: Vec<Particle>,
    next_id: u32,
}

impl ParticleSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter()
    }

    pub fn clear(&mut self) {
        self.particles.clear();
    }

    fn push(&mut self, pos: Vec3, vel: Vec3, lifetime: f32, scale: f32, kind: ParticleKind) {
        self.next_id = self.next_id.wrapping_add(1);
        self.particles.push(Particle {
            id: self.next_id,
            pos,
            vel,
            age: 0.0,
            lifetime,
            scale,
            opacity: 1.0,
            kind,
        });
    }

    /// Spawn an explosion of `count` particles at `origin`. `carry` is the
    /// velocity the wreck had, added in part to every particle.
    pub fn burst(&mut self, origin: Vec3, carry: Vec3, count: usize, rng: &mut Pcg32) {
        if count == 0 {
            return;
        }
        self.push(
            origin + Vec3::Y * 0.5,
            Vec3::ZERO,
            0.35,
            1.0,
            ParticleKind::Flash {
                max_scale: rng.random_range(3.0..4.5),
            },
        );

        for i in 1..count {
            let offset = Vec3::new(
                rng.random_range(-0.5..0.5),
                rng.random_range(0.2..0.9),
                rng.random_range(-0.8..0.8),
            );
            let pos = origin + offset;
            let dir = Vec3::new(
                rng.random_range(-1.0..1.0),
                rng.random_range(0.0..1.0),
                rng.random_range(-1.0..1.0),
            )
            .normalize_or_zero();

            // 35% flame, 25% smoke, 25% spark, 15% debris
            match i % 20 {
                0..=6 => self.push(
                    pos,
                    dir * rng.random_range(0.5..2.0) + carry * 0.3,
                    rng.random_range(0.6..1.4),
                    rng.random_range(0.6..1.2),
                    ParticleKind::Flame {
                        flicker_phase: rng.random_range(0.0..std::f32::consts::TAU),
                    },
                ),
                7..=11 => self.push(
                    pos + Vec3::Y * 0.5,
                    Vec3::new(dir.x * 0.5, rng.random_range(0.8..1.8), dir.z * 0.5) + carry * 0.2,
                    rng.random_range(1.5..3.0),
                    rng.random_range(0.5..0.9),
                    ParticleKind::Smoke {
                        growth: rng.random_range(0.6..1.4),
                    },
                ),
                12..=16 => self.push(
                    pos,
                    dir * rng.random_range(6.0..12.0) + carry * 0.5,
                    rng.random_range(0.4..0.9),
                    0.1,
                    ParticleKind::Spark,
                ),
                _ => self.push(
                    pos,
                    dir * rng.random_range(3.0..7.0) + Vec3::Y * 3.0 + carry * 0.6,
                    rng.random_range(1.5..2.5),
                    rng.random_range(0.15..0.35),
                    ParticleKind::Debris {
                        spin: rng.random_range(-12.0..12.0),
                        angle: 0.0,
                    },
                ),
            }
        }
    }

    /// Advance every particle and drop the expired ones
    pub fn update(&mut self, dt: f32, gravity: f32) {
        for particle in self.particles.iter_mut() {
            particle.update(dt, gravity);
        }
        self.particles.retain(|p| !p.is_dead());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn particle(kind: ParticleKind) -> Particle {
        Particle {
            id: 1,
            pos: Vec3::new(0.0, 1.0, 0.0),
            vel: Vec3::new(1.0, 2.0, 0.0),
            age: 0.0,
            lifetime: 1.0,
            scale: 1.0,
            opacity: 1.0,
            kind,
        }
    }

    #[test]
    fn test_burst_spawns_requested_count() {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut system = ParticleSystem::new();
        system.burst(Vec3::ZERO, Vec3::Z * 20.0, 60, &mut rng);
        assert_eq!(system.len(), 60);
        let flashes = system
            .iter()
            .filter(|p| matches!(p.kind, ParticleKind::Flash { .. }))
            .count();
        assert_eq!(flashes, 1);
        for kind in ["flame", "smoke", "spark", "debris"] {
            assert!(system.iter().any(|p| p.kind.as_str() == kind), "missing {}", kind);
        }
    }

    #[test]
    fn test_ids_unique() {
        let mut rng = Pcg32::seed_from_u64(2);
        let mut system = ParticleSystem::new();
        system.burst(Vec3::ZERO, Vec3::ZERO, 30, &mut rng);
        system.burst(Vec3::ZERO, Vec3::ZERO, 30, &mut rng);
        let mut ids: Vec<_> = system.iter().map(|p| p.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 60);
    }

    #[test]
    fn test_drag_independent_of_frame_rate() {
        let mut slow = particle(ParticleKind::Smoke { growth: 0.5 });
        let mut fast = slow.clone();
        slow.update(1.0 / 30.0, 9.8);
        for _ in 0..5 {
            fast.update(1.0 / 150.0, 9.8);
        }
        assert!((slow.vel - fast.vel).length() < 1e-4);
        assert!((slow.pos - fast.pos).length() < 0.01);
        assert!(slow.vel.x < 1.0);
    }

    #[test]
    fn test_spark_falls_under_gravity() {
        let mut p = particle(ParticleKind::Spark);
        p.update(0.1, 9.8);
        assert!(p.vel.y < 2.0);
        assert!(p.pos.x > 0.0);
        assert!(p.opacity < 1.0);
    }

    #[test]
    fn test_flame_rises() {
        let mut p = particle(ParticleKind::Flame { flicker_phase: 0.0 });
        p.update(0.1, 9.8);
        assert!(p.pos.y > 1.0);
    }

    #[test]
    fn test_smoke_grows() {
        let mut p = particle(ParticleKind::Smoke { growth: 1.0 });
        p.update(0.2, 9.8);
        assert!(p.scale > 1.0);
        assert!(p.opacity < 0.6);
    }

    #[test]
    fn test_flash_expands_without_moving() {
        let mut p = particle(ParticleKind::Flash { max_scale: 4.0 });
        p.update(0.25, 9.8);
        assert!(p.scale > 1.0);
        assert_eq!(p.pos, Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_debris_bounces_off_ground() {
        let mut p = particle(ParticleKind::Debris { spin: 5.0, angle: 0.0 });
        p.pos.y = 0.05;
        p.vel = Vec3::new(2.0, -5.0, 0.0);
        p.update(0.05, 9.8);
        assert_eq!(p.pos.y, GROUND_Y);
        assert!(p.vel.y > 0.0);
        match p.kind {
            ParticleKind::Debris { angle, .. } => assert!(angle > 0.0),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_expired_particles_removed() {
        let mut rng = Pcg32::seed_from_u64(3);
        let mut system = ParticleSystem::new();
        system.burst(Vec3::ZERO, Vec3::ZERO, 40, &mut rng);
        // Longest lifetime is 3 s
        for _ in 0..200 {
            system.update(1.0 / 60.0, 9.8);
        }
        assert!(system.is_empty());
    }
}
