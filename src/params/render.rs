//! Rendering, layout, quality, and frame-scheduling configuration.

use std::time::Duration;

/// Rendering configuration
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Window and pixel-surface width (logical pixels)
    pub window_width: u32,

    /// Window and pixel-surface height (logical pixels)
    pub window_height: u32,

    /// Horizontal margin on each side of the visible span (pixels)
    pub margin_px: u32,

    /// Curve samples across the span at quality 1.0
    pub base_curve_samples: usize,

    /// Density band columns across the span at quality 1.0
    pub base_band_columns: usize,

    /// Density band opacity floor (0..1)
    pub band_base_opacity: f32,

    /// Band gain bounds; gain grows with A·ω between them
    pub band_gain_min: f32,
    pub band_gain_max: f32,

    /// Band gain per unit of A·ω (model units / s)
    pub band_gain_per_speed: f32,

    /// Velocity arrow length per unit of particle speed (pixels per model unit / s)
    pub arrow_scale: f32,

    /// Visible arrow length range (pixels)
    pub arrow_min_px: f32,
    pub arrow_max_px: f32,

    /// Stroboscopic refresh window around phase multiples of 2π (radians)
    pub strobe_tolerance_rad: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            window_width: 1280,
            window_height: 720,
            margin_px: 40,
            base_curve_samples: 600,
            base_band_columns: 240,
            band_base_opacity: 0.08,
            band_gain_min: 0.25,
            band_gain_max: 0.85,
            band_gain_per_speed: 0.004,
            arrow_scale: 0.35,
            arrow_min_px: 3.0,
            arrow_max_px: 36.0,
            strobe_tolerance_rad: 0.15,
        }
    }
}

/// Particle auto-layout parameters
#[derive(Debug, Clone)]
pub struct LayoutConfig {
    /// Target particles per wavelength at quality 1.0
    pub particles_per_wavelength: f32,

    /// Count floor the gap rule reduces to before shrinking radius
    pub min_particles: usize,

    /// Count ceiling at quality 1.0
    pub max_particles: usize,

    /// Radius at zero amplitude (pixels)
    pub base_radius_px: f32,

    /// Radius growth per amplitude unit (pixels per model unit)
    pub radius_per_amplitude: f32,

    /// Radius bounds (pixels)
    pub min_radius_px: f32,
    pub max_radius_px: f32,

    /// Clear space between particle edges (pixels)
    pub min_gap_px: f32,

    /// Maximum deterministic jitter offset (pixels)
    pub jitter_px: f32,

    /// Seed for the per-index jitter field
    pub jitter_seed: u32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            particles_per_wavelength: 12.0,
            min_particles: 8,
            max_particles: 160,
            base_radius_px: 2.5,
            radius_per_amplitude: 0.05,
            min_radius_px: 0.5,
            max_radius_px: 8.0,
            min_gap_px: 2.0,
            jitter_px: 1.5,
            jitter_seed: 42,
        }
    }
}

/// Frame-rate quality controller parameters
#[derive(Debug, Clone)]
pub struct QualityConfig {
    /// Quality scalar bounds
    pub min_quality: f32,
    pub max_quality: f32,

    /// Sampling window for the frame-rate estimate
    pub window: Duration,

    /// Below this rate (fps) quality steps down
    pub low_fps: f32,

    /// Above this rate (fps) quality steps up
    pub high_fps: f32,

    /// Step sizes: down is larger so smoothness recovers first
    pub step_down: f32,
    pub step_up: f32,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            min_quality: 0.6,
            max_quality: 1.0,
            window: Duration::from_millis(500),
            low_fps: 45.0,
            high_fps: 57.0,
            step_down: 0.1,
            step_up: 0.05,
        }
    }
}

/// Animation scheduler parameters
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Upper bound on a single tick's wall delta (stall protection)
    pub max_delta: Duration,

    /// Time-scale factor applied while the view is hidden
    pub hidden_throttle: f32,

    /// User speed multiplier bounds
    pub min_speed: f32,
    pub max_speed: f32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_delta: Duration::from_millis(100),
            hidden_throttle: 0.25,
            min_speed: 0.1,
            max_speed: 4.0,
        }
    }
}
