//! Per-frame wave renderer: curves, particles, density bands, and overlays.

use glam::Vec2;

use super::layout::{Jitter, ParticleLayout};
use super::surface::{Color, PixelSurface};
use crate::field::{ViewTransform, WaveField, WaveMode};
use crate::params::{LayoutConfig, RenderConfig, SimulationParameters};

const BACKGROUND: Color = [12, 14, 22];
const AXIS: Color = [60, 66, 84];
const CURVE: Color = [94, 200, 255];
const PARTICLE: Color = [255, 196, 92];
const BAND: Color = [120, 170, 255];
const ARROW: Color = [255, 110, 110];
const MARKER: Color = [180, 180, 180];

/// Particle rows drawn for the longitudinal medium
const LONGITUDINAL_ROWS: usize = 5;

/// Display toggles and manual layout overrides
#[derive(Debug, Clone)]
pub struct RenderToggles {
    pub show_curve: bool,
    pub show_particles: bool,
    pub show_density_band: bool,
    pub show_velocity_arrows: bool,
    pub show_axis: bool,
    pub show_wavelength_marker: bool,
    /// Manual particle count (still subject to the gap rule)
    pub particle_count: Option<usize>,
    /// Manual particle radius in pixels (still subject to the gap rule)
    pub particle_radius: Option<f32>,
}

impl Default for RenderToggles {
    fn default() -> Self {
        Self {
            show_curve: true,
            show_particles: true,
            show_density_band: true,
            show_velocity_arrows: false,
            show_axis: true,
            show_wavelength_marker: true,
            particle_count: None,
            particle_radius: None,
        }
    }
}

/// Everything a frame needs; the renderer never mutates any of it
pub struct FrameInput<'a> {
    pub params: &'a SimulationParameters,
    pub mode: WaveMode,
    pub view: ViewTransform,
    pub time_s: f32,
    pub quality: f32,
    pub toggles: &'a RenderToggles,
}

/// What happened to the pixel surface this frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Drawn,
    /// Stroboscopic gate closed; previous frame left in place
    Held,
}

/// Screen placement shared by the draw passes
struct Frame<'a> {
    field: WaveField<'a>,
    time_s: f32,
    origin: Vec2,
    layout: ParticleLayout,
}

impl Frame<'_> {
    fn to_screen(&self, x: f32, y: f32) -> Vec2 {
        // Screen y grows downwards
        Vec2::new(self.origin.x + x, self.origin.y - y)
    }
}

/// Software renderer writing into a [`PixelSurface`]
pub struct Renderer {
    config: RenderConfig,
    layout_config: LayoutConfig,
    jitter: Jitter,
    has_frame: bool,
}

impl Renderer {
    pub fn new(config: RenderConfig, layout_config: LayoutConfig) -> Self {
        let jitter = Jitter::new(layout_config.jitter_seed, layout_config.jitter_px);
        Self {
            config,
            layout_config,
            jitter,
            has_frame: false,
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Force the next frame to draw even if the strobe gate is closed
    pub fn invalidate(&mut self) {
        self.has_frame = false;
    }

    /// Curve samples across the span: base count × quality
    pub fn curve_samples(&self, quality: f32) -> usize {
        ((self.config.base_curve_samples as f32 * quality.clamp(0.0, 1.0)).round() as usize).max(2)
    }

    /// Density band columns across the span: base count × quality
    pub fn band_columns(&self, quality: f32) -> usize {
        ((self.config.base_band_columns as f32 * quality.clamp(0.0, 1.0)).round() as usize).max(1)
    }

    /// Auto-gain for the density band, rising with A·ω and clamped
    pub fn band_gain(&self, amplitude: f32, angular_frequency: f32) -> f32 {
        let drive = (amplitude * angular_frequency).abs();
        (self.config.band_gain_min + self.config.band_gain_per_speed * drive)
            .clamp(self.config.band_gain_min, self.config.band_gain_max)
    }

    /// Band opacity base + gain·(0.5 + 0.5·cos θ), with cos θ given directly
    pub fn band_opacity(&self, gain: f32, cos_phase: f32) -> f32 {
        (self.config.band_base_opacity + gain * (0.5 + 0.5 * cos_phase)).clamp(0.0, 1.0)
    }

    /// Arrow length for a particle speed, clamped to the visible range
    pub fn arrow_length(&self, speed: f32) -> f32 {
        (speed.abs() * self.config.arrow_scale)
            .clamp(self.config.arrow_min_px, self.config.arrow_max_px)
    }

    /// Particle layout for this frame's parameters and quality
    pub fn layout(&self, span: f32, frame: &FrameInput) -> ParticleLayout {
        ParticleLayout::compute(
            &self.layout_config,
            span,
            frame.params.wavelength(),
            frame.params.amplitude(),
            frame.quality,
            frame.toggles.particle_count,
            frame.toggles.particle_radius,
        )
    }

    /// Draw one frame.
    ///
    /// In the stroboscopic view the surface is only refreshed while the phase
    /// gate is open; otherwise the previous frame stays as it is.
    pub fn render(&mut self, surface: &mut PixelSurface, input: &FrameInput) -> FrameOutcome {
        let frame = self.frame(surface.width(), surface.height(), input);

        if input.view == ViewTransform::Stroboscopic
            && self.has_frame
            && !frame.field.strobe_open(input.time_s, self.config.strobe_tolerance_rad)
        {
            return FrameOutcome::Held;
        }

        let span = frame.field.span();
        surface.clear(BACKGROUND);
        if input.toggles.show_axis {
            let left = frame.to_screen(0.0, 0.0);
            let right = frame.to_screen(span, 0.0);
            surface.draw_line(left, right, 1.0, AXIS, 1.0);
        }

        match input.mode {
            WaveMode::Transverse => self.draw_transverse(surface, &frame, input),
            WaveMode::Longitudinal => self.draw_longitudinal(surface, &frame, input),
            WaveMode::Standing => self.draw_standing(surface, &frame, input),
        }

        if input.toggles.show_wavelength_marker {
            self.draw_wavelength_marker(surface, &frame, input.params);
        }

        self.has_frame = true;
        FrameOutcome::Drawn
    }

    /// Field, placement and layout for a `width`×`height` surface
    fn frame<'a>(&self, width: u32, height: u32, input: &FrameInput<'a>) -> Frame<'a> {
        let margin = self.config.margin_px.min(width / 4) as f32;
        let span = (width as f32 - 2.0 * margin).max(1.0);
        Frame {
            field: WaveField::new(input.params, input.mode, input.view, span),
            time_s: input.time_s,
            origin: Vec2::new(margin, height as f32 * 0.5),
            layout: self.layout(span, input),
        }
    }

    /// Drawn centres of the particle row that rides the curve
    fn row_centres(&self, frame: &Frame) -> Vec<Vec2> {
        (0..frame.layout.count)
            .map(|i| {
                let x = frame.layout.rest_position(i);
                let y = frame.field.displacement(x, frame.time_s);
                frame.to_screen(x, y) + self.jitter.offset(i)
            })
            .collect()
    }

    /// Opacity of the band column centred at `x`
    fn column_opacity(&self, field: &WaveField, gain: f32, x: f32, time_s: f32) -> f32 {
        self.band_opacity(gain, field.band_modulation(x, time_s))
    }

    fn curve_points(&self, frame: &Frame, quality: f32) -> Vec<Vec2> {
        let samples = self.curve_samples(quality);
        let span = frame.field.span();
        (0..samples)
            .map(|i| {
                let x = span * i as f32 / (samples - 1) as f32;
                frame.to_screen(x, frame.field.displacement(x, frame.time_s))
            })
            .collect()
    }

    fn draw_transverse(&self, surface: &mut PixelSurface, frame: &Frame, input: &FrameInput) {
        if input.toggles.show_curve {
            let points = self.curve_points(frame, input.quality);
            surface.draw_polyline(&points, 2.0, CURVE, 1.0);
        }

        if input.toggles.show_particles {
            for center in self.row_centres(frame) {
                surface.fill_circle(center, frame.layout.radius, PARTICLE, 1.0);
            }
        }
    }

    fn draw_standing(&self, surface: &mut PixelSurface, frame: &Frame, input: &FrameInput) {
        if input.toggles.show_curve {
            let samples = self.curve_samples(input.quality);
            let span = frame.field.span();
            let (upper, lower): (Vec<Vec2>, Vec<Vec2>) = (0..samples)
                .map(|i| {
                    let x = span * i as f32 / (samples - 1) as f32;
                    let e = frame.field.standing_envelope(x, frame.time_s);
                    (frame.to_screen(x, e), frame.to_screen(x, -e))
                })
                .unzip();
            surface.draw_polyline(&upper, 1.0, CURVE, 0.35);
            surface.draw_polyline(&lower, 1.0, CURVE, 0.35);

            let points = self.curve_points(frame, input.quality);
            surface.draw_polyline(&points, 2.0, CURVE, 1.0);
        }

        // Node ticks every half wavelength
        let half = std::f32::consts::PI / frame.field.wavenumber();
        let mut x = 0.0;
        while x <= frame.field.span() {
            let at = frame.to_screen(x, 0.0);
            surface.draw_line(at - Vec2::Y * 6.0, at + Vec2::Y * 6.0, 1.0, MARKER, 0.8);
            x += half.max(1.0);
        }

        if input.toggles.show_particles {
            for center in self.row_centres(frame) {
                surface.fill_circle(center, frame.layout.radius, PARTICLE, 1.0);
            }
        }
    }

    fn draw_longitudinal(&self, surface: &mut PixelSurface, frame: &Frame, input: &FrameInput) {
        let field = &frame.field;
        let span = field.span();
        let amplitude = field.amplitude_at(frame.time_s);
        let band_half = (surface.height() as f32 * 0.18).max(12.0);

        if input.toggles.show_density_band {
            let columns = self.band_columns(input.quality);
            let width = span / columns as f32;
            let gain = self.band_gain(amplitude, field.angular_frequency());
            for c in 0..columns {
                let x = (c as f32 + 0.5) * width;
                let opacity = self.column_opacity(field, gain, x, frame.time_s);
                let left = frame.to_screen(x - width * 0.5, band_half);
                let right = frame.to_screen(x + width * 0.5, -band_half);
                // Rounded edges so neighbouring columns never overlap
                surface.fill_rect(
                    left.x.round(),
                    left.y.round(),
                    right.x.round(),
                    right.y.round(),
                    BAND,
                    opacity,
                );
            }
        }

        if input.toggles.show_particles {
            let rows = LONGITUDINAL_ROWS;
            let middle = rows / 2;
            for row in 0..rows {
                let row_y = band_half * (1.0 - 2.0 * (row as f32 + 0.5) / rows as f32);
                for i in 0..frame.layout.count {
                    let index = row * frame.layout.count + i;
                    let x = frame.layout.rest_position(i);
                    let s = field.displacement(x, frame.time_s);
                    let center = frame.to_screen(x + s, row_y) + self.jitter.offset(index);
                    surface.fill_circle(center, frame.layout.radius, PARTICLE, 0.9);

                    if input.toggles.show_velocity_arrows && row == middle {
                        let v = field.particle_velocity(x, frame.time_s);
                        let length = self.arrow_length(v);
                        let tip = center + Vec2::X * length * v.signum();
                        surface.draw_arrow(center, tip, 1.5, ARROW, 0.9);
                    }
                }
            }
        }

        if input.toggles.show_curve {
            // Displacement plotted as a trace below the medium
            let offset = band_half + amplitude.max(10.0) + 16.0;
            let samples = self.curve_samples(input.quality);
            let points: Vec<Vec2> = (0..samples)
                .map(|i| {
                    let x = span * i as f32 / (samples - 1) as f32;
                    frame.to_screen(x, field.displacement(x, frame.time_s) - offset)
                })
                .collect();
            surface.draw_polyline(&points, 1.5, CURVE, 0.8);
        }
    }

    fn draw_wavelength_marker(
        &self,
        surface: &mut PixelSurface,
        frame: &Frame,
        params: &SimulationParameters,
    ) {
        let lambda = params.wavelength();
        if lambda > frame.field.span() {
            return;
        }
        let y = (frame.origin.y + frame.field.amplitude_at(0.0) * 2.0 + 28.0)
            .min(surface.height() as f32 - 12.0);
        let left = Vec2::new(frame.origin.x, y);
        let right = Vec2::new(frame.origin.x + lambda, y);
        surface.draw_line(left, right, 1.0, MARKER, 0.9);
        surface.draw_line(left - Vec2::Y * 5.0, left + Vec2::Y * 5.0, 1.0, MARKER, 0.9);
        surface.draw_line(right - Vec2::Y * 5.0, right + Vec2::Y * 5.0, 1.0, MARKER, 0.9);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer() -> Renderer {
        let config = RenderConfig {
            window_width: 320,
            window_height: 180,
            margin_px: 10,
            ..RenderConfig::default()
        };
        Renderer::new(config, LayoutConfig::default())
    }

    fn frame<'a>(
        params: &'a SimulationParameters,
        toggles: &'a RenderToggles,
        mode: WaveMode,
        view: ViewTransform,
        time_s: f32,
    ) -> FrameInput<'a> {
        FrameInput {
            params,
            mode,
            view,
            time_s,
            quality: 1.0,
            toggles,
        }
    }

    #[test]
    fn test_sampling_scales_with_quality() {
        let r = renderer();
        assert_eq!(r.curve_samples(1.0), 600);
        assert_eq!(r.curve_samples(0.6), 360);
        assert_eq!(r.band_columns(0.5), 120);
    }

    #[test]
    fn test_band_gain_is_clamped_and_rising() {
        let r = renderer();
        let quiet = r.band_gain(1.0, 1.0);
        let loud = r.band_gain(40.0, 6.0);
        let extreme = r.band_gain(200.0, 300.0);

        assert!(loud > quiet);
        assert!((extreme - r.config().band_gain_max).abs() < 1e-6);
        assert!(quiet >= r.config().band_gain_min);

        let peak = r.band_opacity(loud, 1.0);
        let trough = r.band_opacity(loud, -1.0);
        assert!((trough - r.config().band_base_opacity).abs() < 1e-6);
        assert!(peak > trough);
    }

    #[test]
    fn test_band_brightest_at_phase_zero() {
        let r = renderer();
        let mut params = SimulationParameters::default();
        params.set_damping(1.0);
        let field = WaveField::new(&params, WaveMode::Longitudinal, ViewTransform::Lab, 300.0);
        let gain = r.band_gain(field.amplitude_at(0.0), field.angular_frequency());

        let peak = r.column_opacity(&field, gain, 0.0, 0.0);
        let trough = r.column_opacity(&field, gain, params.wavelength() / 2.0, 0.0);
        let base = r.config().band_base_opacity;
        assert!((peak - (base + gain).min(1.0)).abs() < 1e-4, "peak {}", peak);
        assert!((trough - base).abs() < 1e-4, "trough {}", trough);
    }

    #[test]
    fn test_drawn_particles_keep_gap() {
        let r = renderer();
        let params = SimulationParameters::default();
        let gap = LayoutConfig::default().min_gap_px;
        for (count, radius) in [(500, 8.0), (40, 3.0), (200, 12.0)] {
            let toggles = RenderToggles {
                particle_count: Some(count),
                particle_radius: Some(radius),
                ..RenderToggles::default()
            };
            for mode in [WaveMode::Transverse, WaveMode::Standing] {
                let input = frame(&params, &toggles, mode, ViewTransform::Lab, 0.7);
                let placed = r.frame(320, 180, &input);
                let centres = r.row_centres(&placed);
                assert!(centres.len() > 1);
                for pair in centres.windows(2) {
                    let edge = pair[0].distance(pair[1]) - 2.0 * placed.layout.radius;
                    assert!(
                        edge + 1e-3 >= gap,
                        "count={} radius={} {:?}: edge gap {}",
                        count,
                        radius,
                        mode,
                        edge
                    );
                }
            }
        }
    }

    #[test]
    fn test_arrow_length_clamped() {
        let r = renderer();
        assert_eq!(r.arrow_length(0.0), r.config().arrow_min_px);
        assert_eq!(r.arrow_length(-1e6), r.config().arrow_max_px);
    }

    #[test]
    fn test_every_mode_draws() {
        let params = SimulationParameters::default();
        let toggles = RenderToggles {
            show_velocity_arrows: true,
            ..RenderToggles::default()
        };
        for mode in [WaveMode::Transverse, WaveMode::Longitudinal, WaveMode::Standing] {
            let mut r = renderer();
            let mut surface = PixelSurface::new(320, 180);
            let outcome = r.render(&mut surface, &frame(&params, &toggles, mode, ViewTransform::Lab, 0.3));
            assert_eq!(outcome, FrameOutcome::Drawn);

            let lit = surface
                .image()
                .pixels()
                .filter(|p| p.0[..3] != BACKGROUND[..])
                .count();
            assert!(lit > 100, "{:?} drew only {} pixels", mode, lit);
        }
    }

    #[test]
    fn test_strobe_holds_between_flashes() {
        let params = SimulationParameters::default();
        let toggles = RenderToggles::default();
        let period = 1.0 / params.frequency();
        let mut r = renderer();
        let mut surface = PixelSurface::new(320, 180);

        // The first frame is always drawn
        let first = frame(&params, &toggles, WaveMode::Transverse, ViewTransform::Stroboscopic, 0.4 * period);
        assert_eq!(r.render(&mut surface, &first), FrameOutcome::Drawn);
        let snapshot = surface.image().clone();

        let closed = frame(&params, &toggles, WaveMode::Transverse, ViewTransform::Stroboscopic, 0.5 * period);
        assert_eq!(r.render(&mut surface, &closed), FrameOutcome::Held);
        assert_eq!(surface.image(), &snapshot);

        let open = frame(&params, &toggles, WaveMode::Transverse, ViewTransform::Stroboscopic, period);
        assert_eq!(r.render(&mut surface, &open), FrameOutcome::Drawn);
    }

    #[test]
    fn test_particles_are_stable_between_identical_frames() {
        let params = SimulationParameters::default();
        let toggles = RenderToggles::default();
        let mut r = renderer();
        let mut a = PixelSurface::new(320, 180);
        let mut b = PixelSurface::new(320, 180);

        let input = frame(&params, &toggles, WaveMode::Longitudinal, ViewTransform::Lab, 1.1);
        r.render(&mut a, &input);
        r.render(&mut b, &input);
        assert_eq!(a.image(), b.image());
    }
}
