//! Mapping from live pitch/loudness estimates to simulation parameters.

/// Mic-to-parameter mapping
#[derive(Debug, Clone)]
pub struct MapperConfig {
    /// Exponential smoothing weight applied per estimate (0..1, higher = snappier)
    pub smoothing_weight: f32,

    /// Amplitude per unit of RMS loudness (model units)
    /// Formula: amplitude = clamp(offset + loudness * gain, min, max)
    pub loudness_gain: f32,
    pub amplitude_offset: f32,
    pub amplitude_min: f32,
    pub amplitude_max: f32,

    /// Simulation Hz per audio Hz
    /// 0.005 maps 220 Hz to 1.1 Hz of simulated motion
    pub hz_to_sim_scale: f32,

    /// Simulation frequency bounds (Hz)
    pub sim_frequency_min: f32,
    pub sim_frequency_max: f32,

    /// Above this simulation frequency a live longitudinal view goes stroboscopic
    pub strobe_above_sim_hz: f32,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            smoothing_weight: 0.2,
            loudness_gain: 600.0,
            amplitude_offset: 4.0,
            amplitude_min: 4.0,
            amplitude_max: 120.0,
            hz_to_sim_scale: 0.005,
            sim_frequency_min: 0.05,
            sim_frequency_max: 5.0,
            strobe_above_sim_hz: 2.0,
        }
    }
}
