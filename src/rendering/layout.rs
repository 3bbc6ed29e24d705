//! Particle auto-layout and deterministic per-index jitter.

use glam::Vec2;
use noise::{NoiseFn, Perlin};

use crate::params::{LayoutConfig, EPSILON};

/// Count and radius of the particle row, derived each frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleLayout {
    pub count: usize,
    pub radius: f32,
    /// Distance between neighbouring rest positions (pixels)
    pub spacing: f32,
}

fn spacing_for(span: f32, count: usize) -> f32 {
    if count > 1 {
        span / (count - 1) as f32
    } else {
        span
    }
}

/// Largest count whose spacing keeps `need` pixels between centres
fn fitting_count(span: f32, need: f32) -> usize {
    ((span / need.max(EPSILON)) * (1.0 - 1e-6)).floor() as usize + 1
}

impl ParticleLayout {
    /// Lay out particles across `span` pixels.
    ///
    /// Count follows wavelength and quality, radius follows amplitude. Manual
    /// overrides replace either value but are still subject to the gap rule:
    /// neighbouring particles keep at least `2·radius + min_gap` between
    /// centres. The count is reduced first (down to the configured floor),
    /// then the radius shrinks, and only then is the floor given up.
    pub fn compute(
        config: &LayoutConfig,
        span: f32,
        wavelength: f32,
        amplitude: f32,
        quality: f32,
        count_override: Option<usize>,
        radius_override: Option<f32>,
    ) -> Self {
        let span = if span.is_finite() { span.max(1.0) } else { 1.0 };
        let quality = if quality.is_finite() { quality.clamp(0.0, 1.0) } else { 1.0 };

        let target_spacing = wavelength.max(EPSILON) / config.particles_per_wavelength.max(1.0);
        let auto_count = ((span / target_spacing) * quality).round() as usize + 1;
        let ceiling = ((config.max_particles as f32 * quality).round() as usize)
            .max(config.min_particles);
        let mut count = count_override
            .unwrap_or_else(|| auto_count.clamp(config.min_particles, ceiling))
            .max(1);

        let auto_radius = config.base_radius_px + amplitude.max(0.0) * config.radius_per_amplitude;
        let mut radius = radius_override
            .unwrap_or(auto_radius)
            .clamp(config.min_radius_px, config.max_radius_px);

        let gap = config.min_gap_px;
        let floor = config.min_particles.min(count);

        // 1. Fewer particles, not below the floor
        if spacing_for(span, count) < 2.0 * radius + gap {
            count = fitting_count(span, 2.0 * radius + gap).clamp(floor, count);
        }

        // 2. Smaller particles
        let spacing = spacing_for(span, count);
        if count > 1 && spacing < 2.0 * radius + gap {
            radius = ((spacing - gap) * 0.5 * (1.0 - 1e-5)).max(config.min_radius_px);
        }

        // 3. Give up the floor rather than overlap
        if count > 1 && spacing_for(span, count) < 2.0 * radius + gap {
            count = fitting_count(span, 2.0 * radius + gap).min(count).max(1);
        }

        Self {
            count,
            radius,
            spacing: spacing_for(span, count),
        }
    }

    /// Rest position of particle `index` along the span
    pub fn rest_position(&self, index: usize) -> f32 {
        index as f32 * self.spacing
    }

    /// Clear space between neighbouring particle edges
    pub fn edge_gap(&self) -> f32 {
        self.spacing - 2.0 * self.radius
    }
}

/// Small per-particle offset that depends only on the particle index.
///
/// The offset is across the row only, so the spacing guaranteed by
/// [`ParticleLayout::compute`] holds for the drawn centres too.
pub struct Jitter {
    perlin: Perlin,
    amplitude_px: f32,
}

impl Jitter {
    pub fn new(seed: u32, amplitude_px: f32) -> Self {
        Self {
            perlin: Perlin::new(seed),
            amplitude_px,
        }
    }

    /// Offset for particle `index`, identical on every frame
    pub fn offset(&self, index: usize) -> Vec2 {
        // Perlin is zero on the integer lattice, so sample between lattice points
        let u = index as f64 * 0.618_034 + 0.5;
        let dy = self.perlin.get([u, 7.75]) as f32;
        Vec2::Y * dy.clamp(-1.0, 1.0) * self.amplitude_px
    }
}
