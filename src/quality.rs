//! Frame-rate-aware quality controller.
//!
//! Counts frames over a fixed sampling window and nudges a single quality
//! scalar: down by a larger step when the rate is low, up by a smaller step
//! when it is high. At most one step per window.

use std::time::Duration;

use tracing::debug;

use crate::params::QualityConfig;

/// Outcome of a completed sampling window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualitySample {
    /// Measured frames per second over the window
    pub fps: f32,
    /// Quality after the adjustment
    pub quality: f32,
    /// Signed change applied this window
    pub change: f32,
}

/// Discrete-time controller owning the render quality scalar
#[derive(Debug, Clone)]
pub struct QualityController {
    config: QualityConfig,
    quality: f32,
    frames: u32,
    window_start: Option<Duration>,
}

impl QualityController {
    /// Start at full quality
    pub fn new(config: QualityConfig) -> Self {
        let quality = config.max_quality;
        Self {
            config,
            quality,
            frames: 0,
            window_start: None,
        }
    }

    /// Current quality scalar, always within the configured bounds
    pub fn quality(&self) -> f32 {
        self.quality
    }

    /// Record one rendered frame at monotonic time `now`.
    ///
    /// Returns the window result once the sampling window has elapsed.
    pub fn record_frame(&mut self, now: Duration) -> Option<QualitySample> {
        let start = *self.window_start.get_or_insert(now);
        self.frames += 1;

        let elapsed = now.saturating_sub(start);
        if elapsed < self.config.window {
            return None;
        }

        let fps = self.frames as f32 / elapsed.as_secs_f32();
        let before = self.quality;
        if fps < self.config.low_fps {
            self.quality = (self.quality - self.config.step_down).max(self.config.min_quality);
        } else if fps > self.config.high_fps {
            self.quality = (self.quality + self.config.step_up).min(self.config.max_quality);
        }

        self.frames = 0;
        self.window_start = Some(now);

        let change = self.quality - before;
        if change != 0.0 {
            debug!("Quality {:.2} -> {:.2} at {:.1} fps", before, self.quality, fps);
        }

        Some(QualitySample {
            fps,
            quality: self.quality,
            change,
        })
    }

    /// Drop the partial window, e.g. after the loop was stalled or hidden
    pub fn reset_window(&mut self) {
        self.frames = 0;
        self.window_start = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Feed `frames` evenly spaced frames across `span`, starting at `start`
    fn run(controller: &mut QualityController, start: Duration, span: Duration, frames: u32) -> Duration {
        let step = span / frames;
        let mut now = start;
        for _ in 0..frames {
            now += step;
            controller.record_frame(now);
        }
        now
    }

    #[test]
    fn test_slow_frames_lower_quality() {
        let mut controller = QualityController::new(QualityConfig::default());
        controller.record_frame(Duration::ZERO);

        // 10 fps for a second and a half
        run(&mut controller, Duration::ZERO, Duration::from_millis(1500), 15);
        assert!(controller.quality() < 1.0);
        assert!(controller.quality() >= 0.6);
    }

    #[test]
    fn test_quality_never_leaves_bounds() {
        let config = QualityConfig::default();
        let mut controller = QualityController::new(config.clone());
        let mut now = Duration::ZERO;

        // Long stretch of starvation
        for _ in 0..40 {
            now = run(&mut controller, now, Duration::from_millis(500), 5);
            assert!(controller.quality() >= config.min_quality - 1e-6);
        }
        assert!((controller.quality() - config.min_quality).abs() < 1e-6);

        // Long stretch of headroom
        for _ in 0..40 {
            now = run(&mut controller, now, Duration::from_millis(500), 60);
            assert!(controller.quality() <= config.max_quality + 1e-6);
        }
        assert!((controller.quality() - config.max_quality).abs() < 1e-6);
    }

    #[test]
    fn test_at_most_one_step_per_window() {
        let config = QualityConfig::default();
        let mut controller = QualityController::new(config.clone());
        let mut now = Duration::ZERO;
        let mut previous = controller.quality();

        for window in 0..30 {
            // Alternate starvation and headroom
            let frames = if window % 3 == 0 { 60 } else { 4 };
            let step = Duration::from_millis(500) / frames;
            let mut completed = 0;
            for _ in 0..frames {
                now += step;
                if let Some(sample) = controller.record_frame(now) {
                    completed += 1;
                    assert!(sample.change.abs() <= config.step_down + 1e-6);
                }
            }
            assert!(completed <= 1);
            assert!((controller.quality() - previous).abs() <= config.step_down + 1e-6);
            previous = controller.quality();
        }
    }

    #[test]
    fn test_steady_rate_holds_quality() {
        let mut controller = QualityController::new(QualityConfig::default());
        controller.record_frame(Duration::ZERO);
        // 50 fps sits between the thresholds
        run(&mut controller, Duration::ZERO, Duration::from_secs(3), 150);
        assert_eq!(controller.quality(), 1.0);
    }

    #[test]
    fn test_asymmetric_steps() {
        let config = QualityConfig::default();
        assert!(config.step_down > config.step_up);
    }
}
