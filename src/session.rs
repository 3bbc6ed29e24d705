//! Session state container and the per-tick update order.
//!
//! The session owns every piece of mutable state (parameters, mode, view,
//! scheduler, quality controller, renderer and the audio path) and hands
//! borrows to the subsystems once per tick:
//!
//! 1. take the newest estimate from the audio channel
//! 2. let the mapper write amplitude/frequency (and maybe the view)
//! 3. resolve the speed lock
//! 4. advance the scheduler
//! 5. render and feed the quality controller

use std::time::Duration;

use tracing::{info, warn};

use crate::audio::{latest_channel, AudioCapture, CaptureSource, EstimateReceiver};
use crate::field::{ViewTransform, WaveMode};
use crate::mapper::MicMapper;
use crate::params::{
    EstimatorConfig, LayoutConfig, MapperConfig, QualityConfig, RenderConfig, SchedulerConfig,
    SimulationParameters,
};
use crate::quality::QualityController;
use crate::rendering::{FrameInput, FrameOutcome, PixelSurface, RenderToggles, Renderer};
use crate::scheduler::AnimationScheduler;
use crate::settings::ExplanationDetail;
use crate::snapshot::ParameterSnapshot;

/// Configuration for every subsystem of a session
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    pub estimator: EstimatorConfig,
    pub mapper: MapperConfig,
    pub quality: QualityConfig,
    pub scheduler: SchedulerConfig,
    pub render: RenderConfig,
    pub layout: LayoutConfig,
}

/// State of the live audio path
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureStatus {
    Off,
    Live(String),
    /// Start failed; the simulation runs on manual parameters
    Unavailable(String),
}

/// What a tick did with the pixel surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Rendered,
    /// Stroboscopic gate closed
    Held,
    /// No surface yet; retried on the next tick
    SkippedNoSurface,
}

pub struct Session {
    params: SimulationParameters,
    mode: WaveMode,
    view: ViewTransform,
    toggles: RenderToggles,
    scheduler: AnimationScheduler,
    quality: QualityController,
    renderer: Renderer,
    mapper: MicMapper,
    estimator_config: EstimatorConfig,
    receiver: Option<EstimateReceiver>,
    capture: Option<AudioCapture>,
    capture_status: CaptureStatus,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        let retention = config.estimator.history_retention_s;
        Self {
            params: SimulationParameters::default(),
            mode: WaveMode::default(),
            view: ViewTransform::default(),
            toggles: RenderToggles::default(),
            scheduler: AnimationScheduler::new(config.scheduler),
            quality: QualityController::new(config.quality),
            renderer: Renderer::new(config.render, config.layout),
            mapper: MicMapper::new(config.mapper, retention),
            estimator_config: config.estimator,
            receiver: None,
            capture: None,
            capture_status: CaptureStatus::Off,
        }
    }

    pub fn params(&self) -> &SimulationParameters {
        &self.params
    }

    /// Direct parameter edits; the speed lock resolves on the next tick
    pub fn params_mut(&mut self) -> &mut SimulationParameters {
        &mut self.params
    }

    pub fn mode(&self) -> WaveMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: WaveMode) {
        if mode != self.mode {
            self.mode = mode;
            self.renderer.invalidate();
        }
    }

    pub fn view(&self) -> ViewTransform {
        self.view
    }

    pub fn set_view(&mut self, view: ViewTransform) {
        if view != self.view {
            self.view = view;
            self.renderer.invalidate();
        }
    }

    pub fn toggles(&self) -> &RenderToggles {
        &self.toggles
    }

    pub fn toggles_mut(&mut self) -> &mut RenderToggles {
        &mut self.toggles
    }

    pub fn scheduler(&self) -> &AnimationScheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut AnimationScheduler {
        &mut self.scheduler
    }

    /// Track window visibility; the partial quality window is dropped on change
    pub fn set_visible(&mut self, visible: bool) {
        if visible != self.scheduler.visible() {
            self.scheduler.set_visible(visible);
            self.quality.reset_window();
        }
    }

    pub fn quality(&self) -> f32 {
        self.quality.quality()
    }

    pub fn mapper(&self) -> &MicMapper {
        &self.mapper
    }

    pub fn mapper_mut(&mut self) -> &mut MicMapper {
        &mut self.mapper
    }

    pub fn capture_status(&self) -> &CaptureStatus {
        &self.capture_status
    }

    /// Whether estimates currently drive the parameters
    pub fn audio_driving(&self) -> bool {
        self.receiver.is_some() || self.mapper.is_frozen()
    }

    /// Start live audio from `source`, replacing any running capture.
    ///
    /// On failure the status becomes `Unavailable` and the session keeps
    /// running on manual parameters. Returns whether capture started.
    pub fn start_audio(&mut self, source: &CaptureSource) -> bool {
        self.stop_audio();
        let (sender, receiver) = latest_channel();
        match AudioCapture::start(source, &self.estimator_config, sender) {
            Ok(capture) => {
                info!(
                    "Capture live: {} @ {}Hz",
                    capture.description(),
                    capture.sample_rate_hz()
                );
                self.capture_status = CaptureStatus::Live(capture.description().to_string());
                self.capture = Some(capture);
                self.receiver = Some(receiver);
                true
            }
            Err(e) => {
                warn!("Capture unavailable ({}): {}", source.describe(), e);
                self.capture_status = CaptureStatus::Unavailable(e.to_string());
                false
            }
        }
    }

    /// Drive the mapper from an externally owned channel (no device)
    pub fn attach_receiver(&mut self, receiver: EstimateReceiver, label: &str) {
        self.stop_audio();
        self.receiver = Some(receiver);
        self.capture_status = CaptureStatus::Live(label.to_string());
    }

    /// Stop capture synchronously and return to manual control
    pub fn stop_audio(&mut self) {
        if let Some(mut capture) = self.capture.take() {
            capture.stop();
        }
        self.receiver = None;
        self.mapper.reset();
        self.capture_status = CaptureStatus::Off;
    }

    /// One display tick at monotonic time `now`
    pub fn tick(&mut self, now: Duration, surface: Option<&mut PixelSurface>) -> TickOutcome {
        if let Some(receiver) = &self.receiver {
            if !self.mapper.is_frozen() {
                if let Some(estimate) = receiver.latest() {
                    self.mapper.ingest(estimate);
                }
            }
        }

        if self.audio_driving() {
            if let Some(view) = self.mapper.apply(&mut self.params, self.mode) {
                self.set_view(view);
            }
        }

        self.params.resolve_speed_lock();
        let tick = self.scheduler.tick(now);
        if tick.stalled {
            // A stalled loop says nothing about the render cost
            self.quality.reset_window();
        }

        let Some(surface) = surface else {
            return TickOutcome::SkippedNoSurface;
        };
        let outcome = self.render_at(surface, tick.sim_time);
        self.quality.record_frame(now);
        match outcome {
            FrameOutcome::Drawn => TickOutcome::Rendered,
            FrameOutcome::Held => TickOutcome::Held,
        }
    }

    /// Draw the current state at simulated time `time_s`
    pub fn render_at(&mut self, surface: &mut PixelSurface, time_s: f32) -> FrameOutcome {
        let input = FrameInput {
            params: &self.params,
            mode: self.mode,
            view: self.view,
            time_s,
            quality: self.quality.quality(),
            toggles: &self.toggles,
        };
        self.renderer.render(surface, &input)
    }

    pub fn snapshot(&self) -> ParameterSnapshot {
        ParameterSnapshot::capture(&self.params, self.mode, self.view)
    }

    pub fn apply_snapshot(&mut self, snapshot: &ParameterSnapshot) {
        self.params = snapshot.to_parameters();
        self.set_mode(snapshot.mode);
        self.set_view(snapshot.view);
        self.renderer.invalidate();
    }

    /// One-line explanation of what is on screen
    pub fn describe(&self, detail: ExplanationDetail) -> String {
        let p = &self.params;
        let mode = match self.mode {
            WaveMode::Transverse => "Transverse wave",
            WaveMode::Longitudinal => "Longitudinal wave",
            WaveMode::Standing => "Standing wave",
        };
        let mut text = format!(
            "{} | {} view | f={:.2} Hz, λ={:.0}",
            mode,
            self.view.name(),
            p.frequency(),
            p.wavelength()
        );
        if detail == ExplanationDetail::Brief {
            return text;
        }

        text.push_str(&format!(
            " | A={:.0}, v=fλ={:.1} | {} medium v={:.2}",
            p.amplitude(),
            p.propagation_speed(),
            p.medium().name(),
            p.medium_speed()
        ));
        if p.speed_lock() {
            text.push_str(" (locked)");
        }
        if !self.scheduler.is_running() {
            text.push_str(" | paused");
        }
        if detail == ExplanationDetail::Standard {
            return text;
        }

        text.push_str(&format!(
            " | γ={:.2}/s, D={:.0}{} | quality {:.2}",
            p.damping(),
            p.dispersion(),
            if p.pulse() { ", pulse" } else { "" },
            self.quality.quality()
        ));
        match &self.capture_status {
            CaptureStatus::Off => {}
            CaptureStatus::Live(source) => text.push_str(&format!(" | audio: {}", source)),
            CaptureStatus::Unavailable(_) => text.push_str(" | capture unavailable"),
        }
        if let Some(position) = self.mapper.scrub_position() {
            text.push_str(&format!(" | frozen @ {:.0}%", position * 100.0));
        }
        let hint = match (self.mode, self.view) {
            (_, ViewTransform::Stroboscopic) => "frames refresh only when the phase wraps",
            (WaveMode::Standing, _) => "nodes stay fixed while antinodes oscillate",
            (_, ViewTransform::CoMoving) => "the frame travels with the wave",
            (WaveMode::Longitudinal, ViewTransform::Lab) => {
                "particles oscillate along the direction of travel"
            }
            (WaveMode::Transverse, ViewTransform::Lab) => {
                "particles oscillate across the direction of travel"
            }
        };
        text.push_str(" | ");
        text.push_str(hint);
        text
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::PitchEstimate;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn estimate(timestamp_s: f64, frequency_hz: f32, loudness_rms: f32) -> PitchEstimate {
        PitchEstimate {
            frequency_hz,
            loudness_rms,
            timestamp_s,
            confidence: 0.9,
            fallback: false,
        }
    }

    #[test]
    fn test_tick_without_surface_is_skipped() {
        let mut session = Session::default();
        assert_eq!(session.tick(ms(0), None), TickOutcome::SkippedNoSurface);
        assert_eq!(session.tick(ms(16), None), TickOutcome::SkippedNoSurface);
        assert!(session.scheduler().sim_time() > 0.0);
    }

    #[test]
    fn test_tick_renders() {
        let mut session = Session::default();
        let mut surface = PixelSurface::new(320, 180);
        assert_eq!(session.tick(ms(0), Some(&mut surface)), TickOutcome::Rendered);
        assert_eq!(session.tick(ms(16), Some(&mut surface)), TickOutcome::Rendered);
    }

    #[test]
    fn test_paused_session_keeps_rendering() {
        let mut session = Session::default();
        let mut surface = PixelSurface::new(320, 180);
        session.tick(ms(0), Some(&mut surface));
        session.tick(ms(16), Some(&mut surface));
        session.scheduler_mut().pause();
        let held = session.scheduler().sim_time();

        for i in 2..6 {
            assert_eq!(session.tick(ms(i * 16), Some(&mut surface)), TickOutcome::Rendered);
            assert_eq!(session.scheduler().sim_time(), held);
        }
    }

    #[test]
    fn test_stall_does_not_lower_quality() {
        let mut session = Session::default();
        let mut surface = PixelSurface::new(160, 90);
        session.tick(ms(0), Some(&mut surface));
        session.tick(ms(16), Some(&mut surface));

        // Three seconds without a frame, then a steady 60 fps
        let mut now = 3_016;
        for _ in 0..20 {
            session.tick(ms(now), Some(&mut surface));
            now += 16;
        }
        assert_eq!(session.quality(), 1.0);
    }

    #[test]
    fn test_visibility_change_restarts_quality_window() {
        let mut session = Session::default();
        let mut surface = PixelSurface::new(160, 90);
        for i in 0..20 {
            session.tick(ms(i * 16), Some(&mut surface));
        }

        session.set_visible(false);
        assert!(!session.scheduler().visible());
        // Hidden views tick slowly but under the stall clamp
        let mut now = 320;
        for _ in 0..3 {
            now += 90;
            session.tick(ms(now), None);
        }

        session.set_visible(true);
        for _ in 0..20 {
            now += 16;
            session.tick(ms(now), Some(&mut surface));
        }
        assert!(session.scheduler().visible());
        assert_eq!(session.quality(), 1.0);
    }

    #[test]
    fn test_speed_lock_resolves_on_tick() {
        let mut session = Session::default();
        session.params_mut().set_speed_lock(true);
        session.tick(ms(0), None);
        let before = session.params().wavelength();

        let doubled = session.params().frequency() * 2.0;
        session.params_mut().set_frequency(doubled);
        session.tick(ms(16), None);
        assert!((session.params().wavelength() - before / 2.0).abs() < 1e-3);
    }

    #[test]
    fn test_attached_audio_drives_parameters() {
        let mut session = Session::default();
        session.set_mode(WaveMode::Longitudinal);
        let (tx, rx) = latest_channel();
        session.attach_receiver(rx, "test");

        tx.send(estimate(0.1, 220.0, 0.05));
        session.tick(ms(0), None);

        assert!((session.params().frequency() - 1.1).abs() < 1e-4);
        assert!((session.params().amplitude() - 34.0).abs() < 1e-3);
        assert_eq!(session.view(), ViewTransform::CoMoving);

        session.stop_audio();
        assert_eq!(session.capture_status(), &CaptureStatus::Off);
        assert!(!session.audio_driving());
    }

    #[test]
    fn test_failed_capture_keeps_running() {
        let mut session = Session::default();
        let source = CaptureSource::File("/nonexistent/input.wav".into());
        assert!(!session.start_audio(&source));
        assert!(matches!(
            session.capture_status(),
            CaptureStatus::Unavailable(_)
        ));

        let frequency = session.params().frequency();
        let mut surface = PixelSurface::new(160, 90);
        assert_eq!(session.tick(ms(0), Some(&mut surface)), TickOutcome::Rendered);
        assert_eq!(session.params().frequency(), frequency);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut session = Session::default();
        session.set_mode(WaveMode::Standing);
        session.set_view(ViewTransform::Stroboscopic);
        session.params_mut().set_amplitude(90.0);

        let snapshot = session.snapshot();
        let mut restored = Session::default();
        restored.apply_snapshot(&snapshot);
        assert_eq!(restored.snapshot(), snapshot);
        assert_eq!(restored.mode(), WaveMode::Standing);
    }

    #[test]
    fn test_describe_grows_with_detail() {
        let session = Session::default();
        let brief = session.describe(ExplanationDetail::Brief);
        let standard = session.describe(ExplanationDetail::Standard);
        let detailed = session.describe(ExplanationDetail::Detailed);
        assert!(brief.starts_with("Transverse wave"));
        assert!(standard.starts_with(&brief));
        assert!(detailed.starts_with(&standard));
        assert!(detailed.len() > standard.len());
    }
}
