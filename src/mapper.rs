//! Live pitch/loudness to simulation parameter mapping.

use crate::audio::{EstimateHistory, PitchEstimate};
use crate::field::{ViewTransform, WaveMode};
use crate::params::{MapperConfig, SimulationParameters};

/// Frequency/loudness pair driving the simulation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapperInput {
    pub frequency_hz: f32,
    pub loudness_rms: f32,
}

#[derive(Debug, Clone)]
struct Frozen {
    ring: EstimateHistory,
    position: f32,
}

/// Smooths estimates and maps them onto [`SimulationParameters`].
///
/// Frequency and loudness are smoothed independently with
/// `new = lerp(previous, sample, weight)`. Fallback estimates still update
/// loudness but leave the smoothed frequency alone, since their lag is only
/// a global minimum. Freezing copies the ring so the reviewed moment
/// survives further capture.
#[derive(Debug, Clone)]
pub struct MicMapper {
    config: MapperConfig,
    frequency_hz: Option<f32>,
    loudness_rms: Option<f32>,
    history: EstimateHistory,
    frozen: Option<Frozen>,
}

fn lerp(previous: f32, sample: f32, weight: f32) -> f32 {
    previous + (sample - previous) * weight
}

impl MicMapper {
    pub fn new(config: MapperConfig, retention_s: f32) -> Self {
        Self {
            config,
            frequency_hz: None,
            loudness_rms: None,
            history: EstimateHistory::new(retention_s),
            frozen: None,
        }
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    pub fn history(&self) -> &EstimateHistory {
        &self.history
    }

    /// Take one estimate from the live stream
    pub fn ingest(&mut self, estimate: PitchEstimate) {
        if !estimate.frequency_hz.is_finite() || !estimate.loudness_rms.is_finite() {
            return;
        }
        self.history.push(estimate);

        let weight = self.config.smoothing_weight.clamp(0.0, 1.0);
        self.loudness_rms = Some(match self.loudness_rms {
            Some(previous) => lerp(previous, estimate.loudness_rms, weight),
            None => estimate.loudness_rms,
        });
        if !estimate.fallback {
            self.frequency_hz = Some(match self.frequency_hz {
                Some(previous) => lerp(previous, estimate.frequency_hz, weight),
                None => estimate.frequency_hz,
            });
        }
    }

    /// Forget smoothing state and history, e.g. when the source changes
    pub fn reset(&mut self) {
        self.frequency_hz = None;
        self.loudness_rms = None;
        self.history.clear();
        self.frozen = None;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.is_some()
    }

    /// Pin the input to the retained ring, starting at the newest entry.
    ///
    /// Returns false when there is nothing to review.
    pub fn freeze(&mut self) -> bool {
        if self.history.is_empty() {
            return false;
        }
        self.frozen = Some(Frozen {
            ring: self.history.clone(),
            position: 1.0,
        });
        true
    }

    pub fn unfreeze(&mut self) {
        self.frozen = None;
    }

    /// Move the review position (0.0 oldest, 1.0 newest); ignored when live
    pub fn scrub(&mut self, position: f32) {
        if let Some(frozen) = self.frozen.as_mut() {
            if position.is_finite() {
                frozen.position = position.clamp(0.0, 1.0);
            }
        }
    }

    /// Nudge the review position by one ring entry in either direction
    pub fn step(&mut self, entries: i32) {
        if let Some(frozen) = self.frozen.as_mut() {
            let len = frozen.ring.len();
            if len > 1 {
                let delta = entries as f32 / (len - 1) as f32;
                frozen.position = (frozen.position + delta).clamp(0.0, 1.0);
            }
        }
    }

    pub fn scrub_position(&self) -> Option<f32> {
        self.frozen.as_ref().map(|f| f.position)
    }

    /// Current input: the scrubbed entry while frozen, else the smoothed stream
    pub fn input(&self) -> Option<MapperInput> {
        if let Some(frozen) = &self.frozen {
            return frozen.ring.at_position(frozen.position).map(|e| MapperInput {
                frequency_hz: e.frequency_hz,
                loudness_rms: e.loudness_rms,
            });
        }
        match (self.frequency_hz, self.loudness_rms) {
            (Some(frequency_hz), Some(loudness_rms)) => Some(MapperInput {
                frequency_hz,
                loudness_rms,
            }),
            _ => None,
        }
    }

    /// Affine clamp of loudness onto amplitude
    pub fn amplitude_for(&self, loudness_rms: f32) -> f32 {
        let c = &self.config;
        (c.amplitude_offset + loudness_rms.max(0.0) * c.loudness_gain)
            .clamp(c.amplitude_min, c.amplitude_max)
    }

    /// Linear rescale of audio Hz onto simulation Hz
    pub fn frequency_for(&self, frequency_hz: f32) -> f32 {
        let c = &self.config;
        (frequency_hz.max(0.0) * c.hz_to_sim_scale).clamp(c.sim_frequency_min, c.sim_frequency_max)
    }

    /// View to force while live audio drives `mode` at `sim_frequency`
    pub fn auto_view(&self, mode: WaveMode, sim_frequency: f32) -> Option<ViewTransform> {
        match mode {
            WaveMode::Longitudinal if sim_frequency > self.config.strobe_above_sim_hz => {
                Some(ViewTransform::Stroboscopic)
            }
            WaveMode::Longitudinal => Some(ViewTransform::CoMoving),
            WaveMode::Transverse | WaveMode::Standing => None,
        }
    }

    /// Write amplitude and frequency into `params`.
    ///
    /// Returns the view the caller should switch to, if any. Does nothing
    /// before the first estimate.
    pub fn apply(&self, params: &mut SimulationParameters, mode: WaveMode) -> Option<ViewTransform> {
        let input = self.input()?;
        let frequency = self.frequency_for(input.frequency_hz);
        params.set_amplitude(self.amplitude_for(input.loudness_rms));
        params.set_frequency(frequency);
        self.auto_view(mode, frequency)
    }
}
