//! Difference-function pitch and loudness estimator.
//!
//! Samples arrive in fixed-size blocks. Once an analysis frame is buffered
//! and the minimum interval has passed on the capture clock, the frame is
//! de-biased, its RMS measured, and the fundamental period found with a
//! cumulative-mean-normalised difference function. The difference function
//! is computed from an FFT cross-correlation plus sliding energy sums, so an
//! estimate costs two FFTs instead of a lag-by-lag scan.

use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

use crate::params::EstimatorConfig;

/// One pitch/loudness measurement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchEstimate {
    /// Fundamental frequency (Hz), best effort
    pub frequency_hz: f32,
    /// RMS of the de-biased analysis frame
    pub loudness_rms: f32,
    /// Capture-clock time at the end of the frame (seconds)
    pub timestamp_s: f64,
    /// 1 - normalised difference at the chosen lag, in [0, 1]
    pub confidence: f32,
    /// No lag fell below the threshold; the global minimum was used
    pub fallback: bool,
}

/// Streaming estimator with preallocated FFT buffers
pub struct PitchEstimator {
    config: EstimatorConfig,
    min_lag: usize,
    max_lag: usize,
    /// Frame length N
    analysis_size: usize,
    /// Integration window W = N / 2
    window: usize,
    min_interval: u64,

    buffer: Vec<f32>,
    samples_seen: u64,
    last_estimate_at: Option<u64>,

    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    head_spectrum: Vec<Complex<f32>>,
    frame_spectrum: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    frame: Vec<f32>,
    diff: Vec<f32>,
    cmnd: Vec<f32>,
}

impl PitchEstimator {
    pub fn new(config: EstimatorConfig) -> Self {
        let min_lag = config.min_lag();
        let max_lag = config.max_lag();
        let analysis_size = config.analysis_size();
        let min_interval = config.min_interval_samples() as u64;

        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(analysis_size);
        let inverse = planner.plan_fft_inverse(analysis_size);
        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());

        Self {
            config,
            min_lag,
            max_lag,
            analysis_size,
            window: analysis_size / 2,
            min_interval,
            buffer: Vec::with_capacity(analysis_size * 2),
            samples_seen: 0,
            last_estimate_at: None,
            forward,
            inverse,
            head_spectrum: vec![Complex::new(0.0, 0.0); analysis_size],
            frame_spectrum: vec![Complex::new(0.0, 0.0); analysis_size],
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
            frame: vec![0.0; analysis_size],
            diff: vec![0.0; max_lag + 1],
            cmnd: vec![1.0; max_lag + 1],
        }
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    pub fn analysis_size(&self) -> usize {
        self.analysis_size
    }

    /// Capture-clock seconds consumed so far
    pub fn clock_s(&self) -> f64 {
        self.samples_seen as f64 / self.config.sample_rate_hz.max(1) as f64
    }

    /// Feed one block of mono samples.
    ///
    /// Returns an estimate when a full frame is buffered and the minimum
    /// interval has elapsed since the previous estimate. Afterwards the
    /// buffer slides by half a frame.
    pub fn push_block(&mut self, block: &[f32]) -> Option<PitchEstimate> {
        self.buffer.extend(block.iter().map(|&s| if s.is_finite() { s } else { 0.0 }));
        self.samples_seen += block.len() as u64;

        // Only the newest frame is ever analysed
        if self.buffer.len() > self.analysis_size {
            let excess = self.buffer.len() - self.analysis_size;
            self.buffer.drain(..excess);
        }

        if self.buffer.len() < self.analysis_size {
            return None;
        }
        if let Some(last) = self.last_estimate_at {
            if self.samples_seen - last < self.min_interval {
                return None;
            }
        }

        let estimate = self.analyse();
        self.last_estimate_at = Some(self.samples_seen);
        self.buffer.drain(..self.analysis_size / 2);
        Some(estimate)
    }

    fn analyse(&mut self) -> PitchEstimate {
        let n = self.analysis_size;
        let start = self.buffer.len() - n;
        self.frame.copy_from_slice(&self.buffer[start..]);

        // DC removal, then loudness on the de-biased frame
        let mean = self.frame.iter().map(|&s| s as f64).sum::<f64>() / n as f64;
        let mut energy = 0.0f64;
        for sample in self.frame.iter_mut() {
            *sample -= mean as f32;
            energy += (*sample as f64) * (*sample as f64);
        }
        let loudness_rms = (energy / n as f64).sqrt() as f32;

        self.difference_function();
        self.normalise();
        let (tau, value, fallback) = self.pick_lag();
        let refined = self.refine(tau);

        let sample_rate = self.config.sample_rate_hz as f32;
        let mut frequency_hz = sample_rate / refined;
        if !frequency_hz.is_finite() || frequency_hz <= 0.0 {
            frequency_hz = sample_rate / tau as f32;
        }

        PitchEstimate {
            frequency_hz,
            loudness_rms,
            timestamp_s: self.clock_s(),
            confidence: (1.0 - value).clamp(0.0, 1.0),
            fallback,
        }
    }

    /// d(τ) = Σ_{j<W} (x[j] - x[j+τ])² for τ in 0..=maxLag.
    ///
    /// Expanded as e0 + e(τ) - 2·r(τ), with r the cross-correlation of the
    /// first W samples against the whole frame. W + maxLag <= N, so the
    /// circular correlation never wraps.
    fn difference_function(&mut self) {
        let n = self.analysis_size;
        let w = self.window;

        for (i, slot) in self.head_spectrum.iter_mut().enumerate() {
            let value = if i < w { self.frame[i] } else { 0.0 };
            *slot = Complex::new(value, 0.0);
        }
        for (slot, &value) in self.frame_spectrum.iter_mut().zip(self.frame.iter()) {
            *slot = Complex::new(value, 0.0);
        }
        self.forward
            .process_with_scratch(&mut self.head_spectrum, &mut self.scratch);
        self.forward
            .process_with_scratch(&mut self.frame_spectrum, &mut self.scratch);

        for (frame, head) in self.frame_spectrum.iter_mut().zip(self.head_spectrum.iter()) {
            *frame *= head.conj();
        }
        self.inverse
            .process_with_scratch(&mut self.frame_spectrum, &mut self.scratch);

        let scale = 1.0 / n as f64;
        let e0: f64 = self.frame[..w].iter().map(|&s| (s as f64) * (s as f64)).sum();
        let mut shifted = e0;
        for tau in 0..=self.max_lag {
            if tau > 0 {
                let leaving = self.frame[tau - 1] as f64;
                let entering = self.frame[tau + w - 1] as f64;
                shifted += entering * entering - leaving * leaving;
            }
            let correlation = self.frame_spectrum[tau].re as f64 * scale;
            self.diff[tau] = (e0 + shifted - 2.0 * correlation).max(0.0) as f32;
        }
    }

    /// Cumulative mean normalised difference; 1 where the running sum is zero
    fn normalise(&mut self) {
        self.cmnd[0] = 1.0;
        let mut running = 0.0f64;
        for tau in 1..=self.max_lag {
            running += self.diff[tau] as f64;
            self.cmnd[tau] = if running > 0.0 {
                (self.diff[tau] as f64 * tau as f64 / running) as f32
            } else {
                1.0
            };
        }
    }

    /// First dip below threshold walked down to its local minimum, else the
    /// global minimum over the lag range
    fn pick_lag(&self) -> (usize, f32, bool) {
        let last = self.max_lag;
        for tau in self.min_lag..=last {
            if self.cmnd[tau] < self.config.threshold {
                let mut t = tau;
                while t < last && self.cmnd[t + 1] < self.cmnd[t] {
                    t += 1;
                }
                return (t, self.cmnd[t], false);
            }
        }

        let mut best = self.min_lag;
        for tau in self.min_lag..=last {
            if self.cmnd[tau] < self.cmnd[best] {
                best = tau;
            }
        }
        (best, self.cmnd[best], true)
    }

    /// Parabolic interpolation around the chosen lag
    fn refine(&self, tau: usize) -> f32 {
        if tau == 0 || tau >= self.max_lag {
            return tau as f32;
        }
        let alpha = self.cmnd[tau - 1];
        let beta = self.cmnd[tau];
        let gamma = self.cmnd[tau + 1];
        let denom = alpha - 2.0 * beta + gamma;
        if denom.abs() > 1e-12 {
            let offset = (0.5 * (alpha - gamma) / denom).clamp(-1.0, 1.0);
            tau as f32 + offset
        } else {
            tau as f32
        }
    }
}
