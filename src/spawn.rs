//! Seeded spawn context for particle initialization.
//!
//! The context walks the pool in index order with a single RNG stream, so a
//! given seed always produces the same pool regardless of how many times it
//! is built.

use glam::Vec3;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

/// Closed interval `[min, max]` used by spawn settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub min: f32,
    pub max: f32,
}

impl Span {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// A degenerate span that always yields `value`.
    pub const fn fixed(value: f32) -> Self {
        Self::new(value, value)
    }

    /// Both ends finite and `min <= max`.
    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }

    #[inline]
    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }

    /// Width of the span.
    #[inline]
    pub fn extent(&self) -> f32 {
        self.max - self.min
    }
}

/// Axis-aligned spawn volume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnBox {
    pub x: Span,
    pub y: Span,
    pub z: Span,
}

impl Default for SpawnBox {
    fn default() -> Self {
        Self {
            x: Span::new(-30.0, 30.0),
            y: Span::new(-15.0, 15.0),
            z: Span::new(-20.0, 10.0),
        }
    }
}

/// Seeded random source used while building a particle pool.
pub struct SpawnContext {
    rng: SmallRng,
}

impl SpawnContext {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Random f32 in `span`. Degenerate spans return `span.min`.
    #[inline]
    pub fn random_in(&mut self, span: Span) -> f32 {
        if span.min < span.max {
            self.rng.gen_range(span.min..=span.max)
        } else {
            span.min
        }
    }

    /// Random point inside an axis-aligned box.
    pub fn random_in_box(&mut self, bounds: &SpawnBox) -> Vec3 {
        Vec3::new(
            self.random_in(bounds.x),
            self.random_in(bounds.y),
            self.random_in(bounds.z),
        )
    }

    /// Random Euler rotation, each axis in `[0, TAU)`.
    pub fn random_rotation(&mut self) -> Vec3 {
        Vec3::new(
            self.rng.gen_range(0.0..TAU),
            self.rng.gen_range(0.0..TAU),
            self.rng.gen_range(0.0..TAU),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_in_box_bounds() {
        let mut ctx = SpawnContext::seeded(7);
        let bounds = SpawnBox::default();
        for _ in 0..500 {
            let p = ctx.random_in_box(&bounds);
            assert!(bounds.x.contains(p.x));
            assert!(bounds.y.contains(p.y));
            assert!(bounds.z.contains(p.z));
        }
    }

    #[test]
    fn test_fixed_span() {
        let mut ctx = SpawnContext::seeded(3);
        assert_eq!(ctx.random_in(Span::fixed(0.02)), 0.02);
    }

    #[test]
    fn test_same_seed_same_stream() {
        let mut a = SpawnContext::seeded(42);
        let mut b = SpawnContext::seeded(42);
        let span = Span::new(-5.0, 5.0);
        for _ in 0..16 {
            assert_eq!(a.random_in(span), b.random_in(span));
        }
        assert_eq!(a.random_rotation(), b.random_rotation());
    }

    #[test]
    fn test_span_validity() {
        assert!(Span::new(-1.0, 1.0).is_valid());
        assert!(Span::fixed(2.0).is_valid());
        assert!(!Span::new(1.0, -1.0).is_valid());
        assert!(!Span::new(f32::NAN, 1.0).is_valid());
    }
}
