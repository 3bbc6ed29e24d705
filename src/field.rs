//! Closed-form wave field: displacement, band modulation, and particle velocity.
//!
//! Every function here is pure in (parameters, mode, view, t, x). The
//! stroboscopic view never changes the field; it only exposes a gate the
//! renderer uses to decide whether to refresh.

use std::f32::consts::TAU;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::params::{SimulationParameters, EPSILON};

/// Kind of mechanical wave being simulated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum WaveMode {
    #[default]
    Transverse,
    Longitudinal,
    Standing,
}

/// Reference frame the field is displayed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ViewTransform {
    /// Raw phase
    #[default]
    Lab,
    /// Phase offset cancels bulk translation
    #[value(alias = "comoving")]
    CoMoving,
    /// Frames refresh only near phase multiples of 2π
    #[value(alias = "strobe")]
    Stroboscopic,
}

impl ViewTransform {
    pub fn name(&self) -> &'static str {
        match self {
            ViewTransform::Lab => "lab",
            ViewTransform::CoMoving => "co-moving",
            ViewTransform::Stroboscopic => "stroboscopic",
        }
    }
}

/// k = 2π/λ with the wavelength floored at epsilon
pub fn wavenumber(wavelength: f32) -> f32 {
    TAU / wavelength.max(EPSILON)
}

/// ω = 2πf, plus the illustrative dispersion term accent·k²
pub fn angular_frequency(params: &SimulationParameters) -> f32 {
    let k = wavenumber(params.wavelength());
    TAU * params.frequency().max(0.0) + params.dispersion() * k * k
}

/// e^(−γt), non-increasing in t for γ ≥ 0
pub fn damping_envelope(damping: f32, time_s: f32) -> f32 {
    (-damping.max(0.0) * time_s.max(0.0)).exp()
}

/// Distance (radians) from the temporal phase ωt + φ to the nearest multiple of 2π
pub fn strobe_phase_distance(params: &SimulationParameters, time_s: f32) -> f32 {
    let theta = (angular_frequency(params) * time_s + params.phase()).rem_euclid(TAU);
    theta.min(TAU - theta)
}

/// Field evaluator for one mode and view over a visible span `[0, span]`
#[derive(Debug, Clone, Copy)]
pub struct WaveField<'a> {
    params: &'a SimulationParameters,
    mode: WaveMode,
    view: ViewTransform,
    span: f32,
    k: f32,
    omega: f32,
}

impl<'a> WaveField<'a> {
    pub fn new(
        params: &'a SimulationParameters,
        mode: WaveMode,
        view: ViewTransform,
        span: f32,
    ) -> Self {
        Self {
            params,
            mode,
            view,
            span: span.max(EPSILON),
            k: wavenumber(params.wavelength()),
            omega: angular_frequency(params),
        }
    }

    pub fn mode(&self) -> WaveMode {
        self.mode
    }

    pub fn view(&self) -> ViewTransform {
        self.view
    }

    pub fn span(&self) -> f32 {
        self.span
    }

    pub fn wavenumber(&self) -> f32 {
        self.k
    }

    pub fn angular_frequency(&self) -> f32 {
        self.omega
    }

    /// Damped amplitude A·e^(−γt)
    pub fn amplitude_at(&self, time_s: f32) -> f32 {
        self.params.amplitude() * damping_envelope(self.params.damping(), time_s)
    }

    /// Phase added by the view; the standing pattern has no bulk translation to cancel
    pub fn view_phase_offset(&self, time_s: f32) -> f32 {
        match (self.view, self.mode) {
            (ViewTransform::CoMoving, WaveMode::Transverse | WaveMode::Longitudinal) => {
                self.omega * time_s
            }
            _ => 0.0,
        }
    }

    /// kx − ωt + φ + view offset
    pub fn travelling_phase(&self, x: f32, time_s: f32) -> f32 {
        self.k * x - self.omega * time_s + self.params.phase() + self.view_phase_offset(time_s)
    }

    /// Gaussian packet window (1.0 everywhere when pulses are off)
    ///
    /// The centre advances at f·λ and wraps across the span with room for the
    /// tails to leave; in the co-moving view it is held at mid-span.
    pub fn pulse_envelope(&self, x: f32, time_s: f32) -> f32 {
        if !self.params.pulse() || self.mode == WaveMode::Standing {
            return 1.0;
        }

        let sigma = self.params.wavelength().max(EPSILON);
        let center = match self.view {
            ViewTransform::CoMoving => self.span * 0.5,
            _ => {
                let travel = self.span + 6.0 * sigma;
                -3.0 * sigma + (self.params.propagation_speed() * time_s).rem_euclid(travel)
            }
        };
        let d = x - center;
        (-(d * d) / (2.0 * sigma * sigma)).exp()
    }

    /// Displacement at x: vertical for transverse/standing, along x for longitudinal
    pub fn displacement(&self, x: f32, time_s: f32) -> f32 {
        let amplitude = self.amplitude_at(time_s);
        match self.mode {
            WaveMode::Transverse | WaveMode::Longitudinal => {
                amplitude * self.pulse_envelope(x, time_s) * self.travelling_phase(x, time_s).sin()
            }
            WaveMode::Standing => {
                2.0 * amplitude
                    * (self.k * x).sin()
                    * (self.omega * time_s + self.params.phase()).cos()
            }
        }
    }

    /// Local standing-wave envelope 2A·e^(−γt)·|sin(kx)|
    pub fn standing_envelope(&self, x: f32, time_s: f32) -> f32 {
        2.0 * self.amplitude_at(time_s) * (self.k * x).sin().abs()
    }

    /// Density band modulation cos(phase) in [−1, 1], faded outside a pulse.
    ///
    /// Damping is left to the band gain, which already follows the decayed amplitude.
    pub fn band_modulation(&self, x: f32, time_s: f32) -> f32 {
        self.travelling_phase(x, time_s).cos() * self.pulse_envelope(x, time_s)
    }

    /// Longitudinal particle velocity ∂s/∂t = −A·ω·cos(phase)
    pub fn particle_velocity(&self, x: f32, time_s: f32) -> f32 {
        -self.amplitude_at(time_s)
            * self.pulse_envelope(x, time_s)
            * self.omega
            * self.travelling_phase(x, time_s).cos()
    }

    /// Whether a stroboscopic frame may refresh at this instant
    pub fn strobe_open(&self, time_s: f32, tolerance_rad: f32) -> bool {
        strobe_phase_distance(self.params, time_s) <= tolerance_rad
    }
}
