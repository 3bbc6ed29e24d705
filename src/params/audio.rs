//! Pitch/loudness estimator configuration and constants.

use crate::error::WaveError;

/// Pitch estimator configuration
///
/// The threshold and frequency bounds are empirical tuning values.
#[derive(Debug, Clone)]
pub struct EstimatorConfig {
    /// Audio sample rate (Hz)
    pub sample_rate_hz: u32,

    /// Lowest detectable fundamental (Hz), sets the largest lag
    pub min_frequency_hz: f32,

    /// Highest detectable fundamental (Hz), sets the smallest lag
    pub max_frequency_hz: f32,

    /// Normalized cumulative difference threshold for accepting a lag
    pub threshold: f32,

    /// Minimum interval between estimates (milliseconds of capture time)
    /// 50 = 20 Hz cadence
    pub min_interval_ms: u64,

    /// How long estimates stay in the review ring (seconds)
    pub history_retention_s: f32,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 48_000,
            min_frequency_hz: 50.0,
            max_frequency_hz: 1000.0,
            threshold: 0.15,
            min_interval_ms: 50,
            history_retention_s: 2.0,
        }
    }
}

impl EstimatorConfig {
    /// Config for a stream with a different sample rate, other settings kept
    pub fn with_sample_rate(mut self, sample_rate_hz: u32) -> Self {
        self.sample_rate_hz = sample_rate_hz;
        self
    }

    /// Smallest candidate lag (samples)
    pub fn min_lag(&self) -> usize {
        ((self.sample_rate_hz as f32 / self.max_frequency_hz).floor() as usize).max(2)
    }

    /// Largest candidate lag (samples)
    pub fn max_lag(&self) -> usize {
        ((self.sample_rate_hz as f32 / self.min_frequency_hz).ceil() as usize).max(self.min_lag())
    }

    /// Samples analysed per estimate (power of two, holds two max lags)
    pub fn analysis_size(&self) -> usize {
        (2 * self.max_lag()).next_power_of_two()
    }

    /// Minimum number of samples between two estimates
    pub fn min_interval_samples(&self) -> usize {
        (self.sample_rate_hz as u64 * self.min_interval_ms / 1000) as usize
    }

    /// Validate configuration (ranges ordered, rate positive, etc.)
    pub fn validate(&self) -> Result<(), WaveError> {
        if self.sample_rate_hz == 0 {
            return Err(WaveError::Config("sample rate must be > 0".to_string()));
        }
        if !(self.min_frequency_hz > 0.0 && self.min_frequency_hz < self.max_frequency_hz) {
            return Err(WaveError::Config(format!(
                "frequency range must satisfy 0 < min < max, got {}..{}",
                self.min_frequency_hz, self.max_frequency_hz
            )));
        }
        if self.max_frequency_hz * 2.0 > self.sample_rate_hz as f32 {
            return Err(WaveError::Config(format!(
                "max frequency {} Hz is above Nyquist for {} Hz",
                self.max_frequency_hz, self.sample_rate_hz
            )));
        }
        if !(self.threshold > 0.0 && self.threshold < 1.0) {
            return Err(WaveError::Config(format!(
                "threshold must be in (0, 1), got {}",
                self.threshold
            )));
        }
        Ok(())
    }
}

/// Audio constants (compile-time, match the Glicol engine setup)
pub mod audio_constants {
    /// Fixed block size handed to the estimator (samples)
    /// 128 = 2.7ms @ 48kHz
    pub const BLOCK_SIZE: usize = 128;
}
