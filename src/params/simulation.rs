//! Wave simulation parameters, propagation media, and the speed-lock constraint.
//!
//! Spatial quantities are in model units (one unit = one logical pixel on the
//! pixel surface), time in seconds. Medium speeds are evaluated from their
//! physical formulas and read as model units per second.

use serde::{Deserialize, Serialize};

/// Floor applied to every denominator in the simulation
pub const EPSILON: f32 = 1e-6;

/// Amplitude range (model units)
pub const MAX_AMPLITUDE: f32 = 200.0;

/// Wavelength range (model units)
pub const MIN_WAVELENGTH: f32 = 1.0;
pub const MAX_WAVELENGTH: f32 = 4000.0;

/// Frequency range (Hz of simulated time)
pub const MIN_FREQUENCY: f32 = 0.01;
pub const MAX_FREQUENCY: f32 = 50.0;

/// Damping coefficient range (1/s)
pub const MAX_DAMPING: f32 = 5.0;

/// Dispersion accent range (model units² / s)
pub const MAX_DISPERSION: f32 = 5000.0;

/// Propagation speed range (model units / s)
pub const MIN_SPEED: f32 = 0.01;
pub const MAX_SPEED: f32 = 100_000.0;

/// Adiabatic index of air
const GAS_GAMMA: f32 = 1.4;
/// Universal gas constant (J / (mol·K))
const GAS_CONSTANT: f32 = 8.314;
/// Molar mass of air (kg / mol)
const AIR_MOLAR_MASS: f32 = 0.028_97;
/// Gravitational acceleration (m / s²)
const GRAVITY: f32 = 9.81;

/// Clamp to `[min, max]`, replacing non-finite input with `fallback`.
pub fn sanitize(value: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback
    }
}

/// Propagation medium that determines the wave speed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Medium {
    /// Stretched string: v = √(T / μ)
    String {
        tension_n: f32,
        linear_density_kg_per_m: f32,
    },
    /// Ideal gas (air): v = √(γ·R·T / M)
    Gas { temperature_k: f32 },
    /// Shallow liquid layer: v = √(g·h)
    Liquid { depth_m: f32 },
    /// Speed set directly
    Free { speed: f32 },
}

impl Default for Medium {
    fn default() -> Self {
        Medium::String {
            tension_n: 60.0,
            linear_density_kg_per_m: 0.025,
        }
    }
}

impl Medium {
    /// Propagation speed in model units per second, always finite and in range.
    pub fn speed(&self) -> f32 {
        let raw = match *self {
            Medium::String {
                tension_n,
                linear_density_kg_per_m,
            } => (tension_n.max(0.0) / linear_density_kg_per_m.max(EPSILON)).sqrt(),
            Medium::Gas { temperature_k } => {
                (GAS_GAMMA * GAS_CONSTANT * temperature_k.max(0.0) / AIR_MOLAR_MASS).sqrt()
            }
            Medium::Liquid { depth_m } => (GRAVITY * depth_m.max(0.0)).sqrt(),
            Medium::Free { speed } => speed,
        };
        sanitize(raw, MIN_SPEED, MAX_SPEED, MIN_SPEED)
    }

    /// Short lowercase name used by the CLI and snapshots
    pub fn name(&self) -> &'static str {
        match self {
            Medium::String { .. } => "string",
            Medium::Gas { .. } => "gas",
            Medium::Liquid { .. } => "liquid",
            Medium::Free { .. } => "free",
        }
    }
}

/// Which field was edited last while the speed lock is engaged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockEdit {
    #[default]
    Idle,
    FrequencyEdited,
    WavelengthEdited,
}

/// Continuously adjustable wave parameters for the session
///
/// Setters clamp to the documented ranges. While the speed lock is engaged,
/// edits are recorded in a small state machine and reconciled by
/// [`SimulationParameters::resolve_speed_lock`], which recomputes the
/// field that was *not* edited so that f·λ equals the medium speed. An edit
/// the other field cannot follow is pulled back to the nearest one it can.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationParameters {
    /// Peak displacement (model units)
    amplitude: f32,
    /// Spatial period (model units)
    wavelength: f32,
    /// Temporal frequency (Hz)
    frequency: f32,
    /// Phase offset (radians)
    phase: f32,
    /// Exponential damping coefficient γ (1/s)
    damping: f32,
    /// Illustrative dispersion: ω += accent·k²
    dispersion: f32,
    /// Render a Gaussian wave packet instead of an infinite train
    pulse: bool,
    medium: Medium,
    speed_lock: bool,
    pending_edit: LockEdit,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            amplitude: 40.0,
            wavelength: 360.0,
            frequency: 0.6,
            phase: 0.0,
            damping: 0.0,
            dispersion: 0.0,
            pulse: false,
            medium: Medium::default(),
            speed_lock: false,
            pending_edit: LockEdit::Idle,
        }
    }
}

impl SimulationParameters {
    pub fn amplitude(&self) -> f32 {
        self.amplitude
    }

    pub fn wavelength(&self) -> f32 {
        self.wavelength
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    pub fn damping(&self) -> f32 {
        self.damping
    }

    pub fn dispersion(&self) -> f32 {
        self.dispersion
    }

    pub fn pulse(&self) -> bool {
        self.pulse
    }

    pub fn medium(&self) -> Medium {
        self.medium
    }

    pub fn speed_lock(&self) -> bool {
        self.speed_lock
    }

    pub fn pending_edit(&self) -> LockEdit {
        self.pending_edit
    }

    pub fn set_amplitude(&mut self, amplitude: f32) {
        self.amplitude = sanitize(amplitude, 0.0, MAX_AMPLITUDE, self.amplitude);
    }

    pub fn set_phase(&mut self, phase: f32) {
        self.phase = if phase.is_finite() {
            phase.rem_euclid(std::f32::consts::TAU)
        } else {
            self.phase
        };
    }

    pub fn set_damping(&mut self, damping: f32) {
        self.damping = sanitize(damping, 0.0, MAX_DAMPING, self.damping);
    }

    pub fn set_dispersion(&mut self, dispersion: f32) {
        self.dispersion = sanitize(dispersion, 0.0, MAX_DISPERSION, self.dispersion);
    }

    pub fn set_pulse(&mut self, pulse: bool) {
        self.pulse = pulse;
    }

    /// Set the frequency; under speed lock the wavelength follows on the next resolve.
    pub fn set_frequency(&mut self, frequency: f32) {
        self.frequency = sanitize(frequency, MIN_FREQUENCY, MAX_FREQUENCY, self.frequency);
        if self.speed_lock {
            self.pending_edit = LockEdit::FrequencyEdited;
        }
    }

    /// Set the wavelength; under speed lock the frequency follows on the next resolve.
    pub fn set_wavelength(&mut self, wavelength: f32) {
        self.wavelength = sanitize(wavelength, MIN_WAVELENGTH, MAX_WAVELENGTH, self.wavelength);
        if self.speed_lock {
            self.pending_edit = LockEdit::WavelengthEdited;
        }
    }

    /// Change the medium. Under speed lock the frequency is kept and the
    /// wavelength follows.
    pub fn set_medium(&mut self, medium: Medium) {
        self.medium = medium;
        if self.speed_lock {
            self.pending_edit = LockEdit::FrequencyEdited;
        }
    }

    /// Engaging the lock keeps the current frequency and recomputes the wavelength.
    pub fn set_speed_lock(&mut self, locked: bool) {
        if locked && !self.speed_lock {
            self.pending_edit = LockEdit::FrequencyEdited;
        }
        if !locked {
            self.pending_edit = LockEdit::Idle;
        }
        self.speed_lock = locked;
    }

    /// Speed of the selected medium (model units / s)
    pub fn medium_speed(&self) -> f32 {
        self.medium.speed()
    }

    /// Kinematic phase speed f·λ of the non-dispersive wave
    pub fn propagation_speed(&self) -> f32 {
        self.frequency * self.wavelength
    }

    /// Reconcile the last edit with the speed lock, then return to idle.
    ///
    /// The edited field is kept when the other one can follow it within its
    /// range. Otherwise the edited field is pulled to the nearest value that
    /// keeps f·λ equal to the medium speed. Returns the edit that was consumed.
    pub fn resolve_speed_lock(&mut self) -> LockEdit {
        let edit = std::mem::take(&mut self.pending_edit);
        if !self.speed_lock {
            return LockEdit::Idle;
        }

        let speed = self.medium_speed();
        match edit {
            LockEdit::FrequencyEdited => {
                let (low, high) = reachable(
                    speed,
                    (MIN_FREQUENCY, MAX_FREQUENCY),
                    (MIN_WAVELENGTH, MAX_WAVELENGTH),
                );
                self.frequency = self.frequency.clamp(low, high);
                self.wavelength = (speed / self.frequency).clamp(MIN_WAVELENGTH, MAX_WAVELENGTH);
            }
            LockEdit::WavelengthEdited => {
                let (low, high) = reachable(
                    speed,
                    (MIN_WAVELENGTH, MAX_WAVELENGTH),
                    (MIN_FREQUENCY, MAX_FREQUENCY),
                );
                self.wavelength = self.wavelength.clamp(low, high);
                self.frequency = (speed / self.wavelength).clamp(MIN_FREQUENCY, MAX_FREQUENCY);
            }
            LockEdit::Idle => {}
        }
        edit
    }
}

/// Values of one factor within `range` whose partner `speed / value` stays
/// within `other`.
///
/// Non-empty for every speed in `[MIN_SPEED, MAX_SPEED]`.
fn reachable(speed: f32, range: (f32, f32), other: (f32, f32)) -> (f32, f32) {
    let low = (speed / other.1).max(range.0);
    let high = (speed / other.0).min(range.1).max(low);
    (low, high)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locked_string() -> SimulationParameters {
        let mut params = SimulationParameters::default();
        params.set_amplitude(40.0);
        params.set_wavelength(360.0);
        params.set_frequency(0.6);
        params.set_medium(Medium::String {
            tension_n: 60.0,
            linear_density_kg_per_m: 0.025,
        });
        params.set_speed_lock(true);
        params.resolve_speed_lock();
        params
    }

    #[test]
    fn test_string_speed() {
        let params = locked_string();
        assert!((params.medium_speed() - 48.99).abs() < 0.01);
    }

    #[test]
    fn test_gas_and_liquid_speeds() {
        let air = Medium::Gas {
            temperature_k: 293.15,
        };
        assert!((air.speed() - 343.2).abs() < 1.0, "air speed {}", air.speed());

        let pond = Medium::Liquid { depth_m: 10.0 };
        assert!((pond.speed() - 9.905).abs() < 0.01);
    }

    #[test]
    fn test_frequency_edit_halves_wavelength() {
        let mut params = locked_string();
        let before = params.wavelength();

        params.set_frequency(1.2);
        assert_eq!(params.pending_edit(), LockEdit::FrequencyEdited);
        params.resolve_speed_lock();

        assert!((params.wavelength() - before / 2.0).abs() < 1e-3);
        assert_eq!(params.pending_edit(), LockEdit::Idle);
    }

    #[test]
    fn test_lock_holds_product_after_either_edit() {
        for &f in &[0.2, 0.6, 1.0, 2.5] {
            let mut params = locked_string();
            params.set_frequency(f);
            params.resolve_speed_lock();
            let product = params.frequency() * params.wavelength();
            assert!(
                (product - params.medium_speed()).abs() < 1e-3,
                "f={} product={}",
                f,
                product
            );
        }

        for &lambda in &[20.0, 81.6, 150.0, 400.0] {
            let mut params = locked_string();
            params.set_wavelength(lambda);
            params.resolve_speed_lock();
            assert!((params.wavelength() - lambda).abs() < 1e-6);
            let product = params.frequency() * params.wavelength();
            assert!((product - params.medium_speed()).abs() < 1e-3);
        }
    }

    #[test]
    fn test_last_edit_wins() {
        let mut params = locked_string();
        params.set_frequency(2.0);
        params.set_wavelength(100.0);
        params.resolve_speed_lock();

        // The wavelength edit was last, so it is kept and frequency recomputed
        assert!((params.wavelength() - 100.0).abs() < 1e-6);
        assert!((params.frequency() - params.medium_speed() / 100.0).abs() < 1e-4);
    }

    #[test]
    fn test_lock_holds_product_at_range_edges() {
        let media = [
            Medium::default(),
            Medium::Gas {
                temperature_k: 293.15,
            },
            Medium::Gas {
                temperature_k: 5000.0,
            },
            Medium::Liquid { depth_m: 10.0 },
            Medium::Liquid { depth_m: 0.0 },
            Medium::Free { speed: MIN_SPEED },
            Medium::Free { speed: 343.0 },
            Medium::Free { speed: MAX_SPEED },
        ];
        let frequencies = [MIN_FREQUENCY, 0.05, 1.0, MAX_FREQUENCY];
        let wavelengths = [MIN_WAVELENGTH, 10.0, 1000.0, MAX_WAVELENGTH];

        for medium in media {
            let speed = medium.speed();
            let check = |params: &SimulationParameters, what: &str| {
                let product = params.frequency() * params.wavelength();
                assert!(
                    (product - speed).abs() / speed < 1e-4,
                    "{:?} {}: f={} λ={} f·λ={} v={}",
                    medium,
                    what,
                    params.frequency(),
                    params.wavelength(),
                    product,
                    speed
                );
                assert!((MIN_FREQUENCY..=MAX_FREQUENCY).contains(&params.frequency()));
                assert!((MIN_WAVELENGTH..=MAX_WAVELENGTH).contains(&params.wavelength()));
            };

            for f in frequencies {
                let mut params = SimulationParameters::default();
                params.set_medium(medium);
                params.set_speed_lock(true);
                params.set_frequency(f);
                params.resolve_speed_lock();
                check(&params, "frequency edit");
            }
            for lambda in wavelengths {
                let mut params = SimulationParameters::default();
                params.set_medium(medium);
                params.set_speed_lock(true);
                params.set_wavelength(lambda);
                params.resolve_speed_lock();
                check(&params, "wavelength edit");
            }
        }
    }

    #[test]
    fn test_unreachable_frequency_moves_to_nearest_valid() {
        let mut params = SimulationParameters::default();
        params.set_medium(Medium::Gas {
            temperature_k: 293.15,
        });
        params.set_speed_lock(true);
        params.set_frequency(0.05);
        params.resolve_speed_lock();

        // 343 / 4000 is the slowest frequency air can carry at the longest wavelength
        assert!((params.wavelength() - MAX_WAVELENGTH).abs() < 1e-2);
        assert!((params.frequency() - params.medium_speed() / MAX_WAVELENGTH).abs() < 1e-5);
    }

    #[test]
    fn test_unlocked_edits_are_independent() {
        let mut params = SimulationParameters::default();
        params.set_frequency(1.5);
        params.set_wavelength(200.0);
        assert_eq!(params.resolve_speed_lock(), LockEdit::Idle);
        assert_eq!(params.frequency(), 1.5);
        assert_eq!(params.wavelength(), 200.0);
    }

    #[test]
    fn test_degenerate_inputs_stay_finite() {
        let mut params = SimulationParameters::default();
        params.set_speed_lock(true);
        params.set_frequency(0.0);
        params.resolve_speed_lock();
        assert!(params.wavelength().is_finite());
        assert!(params.frequency() >= MIN_FREQUENCY);

        params.set_wavelength(f32::NAN);
        params.resolve_speed_lock();
        assert!(params.wavelength().is_finite());
        assert!(params.frequency().is_finite());

        let vacuum = Medium::String {
            tension_n: 60.0,
            linear_density_kg_per_m: 0.0,
        };
        assert!(vacuum.speed().is_finite());
    }
}
