//! Particle pool and its per-tick update.
//!
//! The pool is built once and never changes size. Each tick lifts every
//! particle by its own vertical speed, spins it about X and Z, and recycles
//! anything that rose past the top of the band back to the floor.
//!
//! # Step modes
//!
//! [`StepMode::PerTick`] applies each particle's speed once per call to
//! [`ParticleSimulator::advance`] and ignores the frame delta, so the
//! apparent speed follows the display refresh rate. [`StepMode::DeltaScaled`]
//! multiplies the increments by `dt * reference_hz`, which matches
//! `PerTick` exactly when frames arrive at `reference_hz`.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::ParticleError;
use crate::geometry::GeometryKind;
use crate::spawn::{Span, SpawnBox, SpawnContext};

/// Upper bound on pool size.
pub const MAX_PARTICLES: usize = 1 << 20;

/// Per-particle speed pair, sampled once at creation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ParticleSpeed {
    /// Units added to `position.y` per step.
    pub vertical: f32,
    /// Radians added to `rotation.x` and `rotation.z` per step.
    pub rotation: f32,
}

/// A single particle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub position: Vec3,
    /// Euler angles in radians (XYZ order).
    pub rotation: Vec3,
    pub scale: Vec3,
    pub speed: ParticleSpeed,
}

/// Vertical band particles live in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VerticalBand {
    pub y_min: f32,
    pub y_max: f32,
}

impl VerticalBand {
    pub fn new(y_min: f32, y_max: f32) -> Result<Self, ParticleError> {
        let band = Self { y_min, y_max };
        band.validate()?;
        Ok(band)
    }

    pub fn validate(&self) -> Result<(), ParticleError> {
        if self.y_min.is_finite() && self.y_max.is_finite() && self.y_min < self.y_max {
            Ok(())
        } else {
            Err(ParticleError::InvalidBand {
                y_min: self.y_min,
                y_max: self.y_max,
            })
        }
    }

    #[inline]
    pub fn contains(&self, y: f32) -> bool {
        y >= self.y_min && y <= self.y_max
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.y_max - self.y_min
    }
}

impl Default for VerticalBand {
    fn default() -> Self {
        Self {
            y_min: -15.0,
            y_max: 15.0,
        }
    }
}

/// How `advance` treats the frame delta.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum StepMode {
    /// Fixed increment per call; `dt` is ignored.
    #[default]
    PerTick,
    /// Increments scaled by `dt * reference_hz`.
    DeltaScaled { reference_hz: f32 },
}

impl StepMode {
    fn validate(&self) -> Result<(), ParticleError> {
        match *self {
            StepMode::PerTick => Ok(()),
            StepMode::DeltaScaled { reference_hz } => {
                if reference_hz.is_finite() && reference_hz > 0.0 {
                    Ok(())
                } else {
                    Err(ParticleError::InvalidReferenceRate(reference_hz))
                }
            }
        }
    }

    #[inline]
    fn factor(&self, dt: f32) -> f32 {
        match *self {
            StepMode::PerTick => 1.0,
            StepMode::DeltaScaled { reference_hz } => dt.max(0.0) * reference_hz,
        }
    }
}

/// Settings for a randomly initialized pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleSettings {
    pub count: usize,
    pub seed: u64,
    pub band: VerticalBand,
    pub spawn: SpawnBox,
    pub vertical_speed: Span,
    pub rotation_speed: Span,
    /// Uniform scale range.
    pub scale: Span,
    pub step: StepMode,
    /// Mesh every particle instance draws.
    pub mesh: GeometryKind,
}

impl Default for ParticleSettings {
    fn default() -> Self {
        Self {
            count: 300,
            seed: 0x5EED,
            band: VerticalBand::default(),
            spawn: SpawnBox::default(),
            vertical_speed: Span::new(0.01, 0.05),
            rotation_speed: Span::new(0.005, 0.02),
            scale: Span::new(0.4, 1.2),
            step: StepMode::PerTick,
            mesh: GeometryKind::Tetrahedron {
                radius: 0.6,
                detail: 0,
            },
        }
    }
}

impl ParticleSettings {
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_band(mut self, y_min: f32, y_max: f32) -> Self {
        self.band = VerticalBand { y_min, y_max };
        self
    }

    pub fn with_vertical_speed(mut self, speed: Span) -> Self {
        self.vertical_speed = speed;
        self
    }

    pub fn with_step(mut self, step: StepMode) -> Self {
        self.step = step;
        self
    }

    /// Reject anything the simulator would not accept.
    pub fn validate(&self) -> Result<(), ParticleError> {
        if self.count > MAX_PARTICLES {
            return Err(ParticleError::TooManyParticles {
                count: self.count,
                max: MAX_PARTICLES,
            });
        }
        self.band.validate()?;
        self.step.validate()?;
        let ranges = [
            ("spawn.x", self.spawn.x),
            ("spawn.y", self.spawn.y),
            ("spawn.z", self.spawn.z),
            ("vertical_speed", self.vertical_speed),
            ("rotation_speed", self.rotation_speed),
            ("scale", self.scale),
        ];
        for (name, span) in ranges {
            if !span.is_valid() {
                return Err(ParticleError::InvalidRange {
                    name,
                    min: span.min,
                    max: span.max,
                });
            }
        }
        if self.vertical_speed.min < 0.0 {
            return Err(ParticleError::NegativeVerticalSpeed(self.vertical_speed.min));
        }
        Ok(())
    }
}

/// Owns the particle pool.
#[derive(Debug, Clone)]
pub struct ParticleSimulator {
    particles: Vec<Particle>,
    band: VerticalBand,
    step: StepMode,
    ticks: u64,
    recycled: u64,
}

impl ParticleSimulator {
    /// Build a pool from `settings`, seeded with `settings.seed`.
    pub fn new(settings: &ParticleSettings) -> Result<Self, ParticleError> {
        settings.validate()?;
        let band = settings.band;
        let mut ctx = SpawnContext::seeded(settings.seed);

        let particles = (0..settings.count)
            .map(|_| {
                let mut position = ctx.random_in_box(&settings.spawn);
                position.y = position.y.clamp(band.y_min, band.y_max);
                let rotation = ctx.random_rotation();
                let scale = Vec3::splat(ctx.random_in(settings.scale));
                let speed = ParticleSpeed {
                    vertical: ctx.random_in(settings.vertical_speed),
                    rotation: ctx.random_in(settings.rotation_speed),
                };
                Particle {
                    position,
                    rotation,
                    scale,
                    speed,
                }
            })
            .collect();

        log::debug!(
            "spawned {} particles (seed {:#x}) in band [{}, {}]",
            settings.count,
            settings.seed,
            band.y_min,
            band.y_max
        );

        Ok(Self {
            particles,
            band,
            step: settings.step,
            ticks: 0,
            recycled: 0,
        })
    }

    /// Adopt an explicit pool.
    pub fn from_particles(
        particles: Vec<Particle>,
        band: VerticalBand,
        step: StepMode,
    ) -> Result<Self, ParticleError> {
        if particles.len() > MAX_PARTICLES {
            return Err(ParticleError::TooManyParticles {
                count: particles.len(),
                max: MAX_PARTICLES,
            });
        }
        band.validate()?;
        step.validate()?;
        for (index, p) in particles.iter().enumerate() {
            if !(p.speed.vertical.is_finite() && p.speed.vertical >= 0.0) {
                return Err(ParticleError::NegativeVerticalSpeed(p.speed.vertical));
            }
            if !band.contains(p.position.y) {
                return Err(ParticleError::OutsideBand {
                    index,
                    y: p.position.y,
                    y_min: band.y_min,
                    y_max: band.y_max,
                });
            }
        }
        Ok(Self {
            particles,
            band,
            step,
            ticks: 0,
            recycled: 0,
        })
    }

    /// Advance every particle one step.
    pub fn advance(&mut self, dt: f32) {
        let factor = self.step.factor(dt);
        let VerticalBand { y_min, y_max } = self.band;
        let mut recycled = 0u64;

        for p in &mut self.particles {
            p.position.y += p.speed.vertical * factor;
            let spin = p.speed.rotation * factor;
            p.rotation.x += spin;
            p.rotation.z += spin;

            if p.position.y > y_max {
                p.position.y = y_min;
                recycled += 1;
            }
        }

        self.ticks += 1;
        self.recycled += recycled;
        if recycled > 0 {
            log::trace!("tick {}: recycled {} particles", self.ticks, recycled);
        }
    }

    #[inline]
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    #[inline]
    pub fn band(&self) -> VerticalBand {
        self.band
    }

    #[inline]
    pub fn step_mode(&self) -> StepMode {
        self.step
    }

    /// Number of completed `advance` calls.
    #[inline]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Total wraps since construction.
    #[inline]
    pub fn recycled(&self) -> u64 {
        self.recycled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn particle_at(y: f32, vertical: f32) -> Particle {
        Particle {
            position: Vec3::new(0.0, y, 0.0),
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            speed: ParticleSpeed {
                vertical,
                rotation: 0.1,
            },
        }
    }

    #[test]
    fn test_advance_moves_and_spins() {
        let mut sim = ParticleSimulator::from_particles(
            vec![particle_at(0.0, 0.5)],
            VerticalBand::default(),
            StepMode::PerTick,
        )
        .unwrap();
        sim.advance(1.0 / 60.0);
        let p = sim.particles()[0];
        assert_eq!(p.position.y, 0.5);
        assert_eq!(p.rotation.x, 0.1);
        assert_eq!(p.rotation.y, 0.0);
        assert_eq!(p.rotation.z, 0.1);
        assert_eq!(sim.ticks(), 1);
    }

    #[test]
    fn test_wrap_resets_to_floor() {
        let mut sim = ParticleSimulator::from_particles(
            vec![particle_at(14.9, 0.2)],
            VerticalBand::default(),
            StepMode::PerTick,
        )
        .unwrap();
        sim.advance(0.0);
        assert_eq!(sim.particles()[0].position.y, -15.0);
        assert_eq!(sim.recycled(), 1);
    }

    #[test]
    fn test_exactly_at_top_does_not_wrap() {
        let mut sim = ParticleSimulator::from_particles(
            vec![particle_at(14.0, 1.0)],
            VerticalBand::default(),
            StepMode::PerTick,
        )
        .unwrap();
        sim.advance(0.0);
        assert_eq!(sim.particles()[0].position.y, 15.0);
        assert_eq!(sim.recycled(), 0);
    }

    #[test]
    fn test_per_tick_ignores_dt() {
        let mut a = ParticleSimulator::from_particles(
            vec![particle_at(0.0, 0.1)],
            VerticalBand::default(),
            StepMode::PerTick,
        )
        .unwrap();
        let mut b = a.clone();
        a.advance(1.0 / 30.0);
        b.advance(1.0 / 144.0);
        assert_eq!(a.particles(), b.particles());
    }

    #[test]
    fn test_delta_scaled_matches_reference_rate() {
        let mut sim = ParticleSimulator::from_particles(
            vec![particle_at(0.0, 0.1)],
            VerticalBand::default(),
            StepMode::DeltaScaled { reference_hz: 60.0 },
        )
        .unwrap();
        sim.advance(1.0 / 30.0);
        assert!((sim.particles()[0].position.y - 0.2).abs() < 1e-5);
        sim.advance(-1.0);
        assert!((sim.particles()[0].position.y - 0.2).abs() < 1e-5);
    }

    #[test]
    fn test_seeded_pool_is_inside_ranges() {
        let settings = ParticleSettings::default().with_count(500);
        let sim = ParticleSimulator::new(&settings).unwrap();
        assert_eq!(sim.len(), 500);
        for p in sim.particles() {
            assert!(settings.spawn.x.contains(p.position.x));
            assert!(settings.band.contains(p.position.y));
            assert!(settings.spawn.z.contains(p.position.z));
            assert!(settings.vertical_speed.contains(p.speed.vertical));
            assert!(settings.rotation_speed.contains(p.speed.rotation));
            assert_eq!(p.scale.x, p.scale.y);
            assert_eq!(p.scale.y, p.scale.z);
        }
    }

    #[test]
    fn test_zero_count_pool() {
        let mut sim = ParticleSimulator::new(&ParticleSettings::default().with_count(0)).unwrap();
        sim.advance(0.016);
        assert!(sim.is_empty());
    }

    #[test]
    fn test_rejects_bad_settings() {
        assert!(matches!(
            ParticleSimulator::new(&ParticleSettings::default().with_count(MAX_PARTICLES + 1)),
            Err(ParticleError::TooManyParticles { .. })
        ));
        assert!(matches!(
            ParticleSimulator::new(&ParticleSettings::default().with_band(5.0, 5.0)),
            Err(ParticleError::InvalidBand { .. })
        ));
        assert!(matches!(
            ParticleSimulator::new(
                &ParticleSettings::default().with_vertical_speed(Span::new(-0.1, 0.1))
            ),
            Err(ParticleError::NegativeVerticalSpeed(_))
        ));
        assert!(matches!(
            ParticleSimulator::new(
                &ParticleSettings::default().with_step(StepMode::DeltaScaled { reference_hz: 0.0 })
            ),
            Err(ParticleError::InvalidReferenceRate(_))
        ));
    }

    #[test]
    fn test_from_particles_rejects_outside_band() {
        let err = ParticleSimulator::from_particles(
            vec![particle_at(0.0, 0.1), particle_at(20.0, 0.1)],
            VerticalBand::default(),
            StepMode::PerTick,
        )
        .unwrap_err();
        assert!(matches!(err, ParticleError::OutsideBand { index: 1, .. }));
    }
}
