//! Shareable parameter snapshots and their URL-safe token form.
//!
//! A token is the snapshot's JSON encoded as URL-safe base64 without
//! padding. Decoding is total: a token that cannot be read yields the
//! default snapshot, and inside a readable token every field falls back to
//! its default on its own when it is missing, mistyped or out of range.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::field::{ViewTransform, WaveMode};
use crate::params::{
    Medium, SimulationParameters, MAX_AMPLITUDE, MAX_DAMPING, MAX_DISPERSION, MAX_FREQUENCY,
    MAX_SPEED, MAX_WAVELENGTH, MIN_FREQUENCY, MIN_SPEED, MIN_WAVELENGTH,
};

/// Tokens longer than this are not decoded
const MAX_TOKEN_LEN: usize = 8 * 1024;

/// Parameter record that round-trips through a share token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSnapshot {
    pub mode: WaveMode,
    pub view: ViewTransform,
    pub medium: Medium,
    pub speed_lock: bool,
    pub amplitude: f32,
    pub wavelength: f32,
    pub frequency: f32,
    pub phase: f32,
    pub damping: f32,
    pub dispersion: f32,
    pub pulse: bool,
}

impl Default for ParameterSnapshot {
    fn default() -> Self {
        Self::capture(
            &SimulationParameters::default(),
            WaveMode::default(),
            ViewTransform::default(),
        )
    }
}

impl ParameterSnapshot {
    pub fn capture(params: &SimulationParameters, mode: WaveMode, view: ViewTransform) -> Self {
        Self {
            mode,
            view,
            medium: params.medium(),
            speed_lock: params.speed_lock(),
            amplitude: params.amplitude(),
            wavelength: params.wavelength(),
            frequency: params.frequency(),
            phase: params.phase(),
            damping: params.damping(),
            dispersion: params.dispersion(),
            pulse: params.pulse(),
        }
    }

    /// Rebuild parameters through the clamping setters.
    ///
    /// With the lock engaged the frequency is kept and the wavelength is
    /// recomputed, so a hand-edited token cannot break f·λ = v.
    pub fn to_parameters(&self) -> SimulationParameters {
        let mut params = SimulationParameters::default();
        params.set_medium(self.medium);
        params.set_amplitude(self.amplitude);
        params.set_wavelength(self.wavelength);
        params.set_frequency(self.frequency);
        params.set_phase(self.phase);
        params.set_damping(self.damping);
        params.set_dispersion(self.dispersion);
        params.set_pulse(self.pulse);
        params.set_speed_lock(self.speed_lock);
        params.resolve_speed_lock();
        params
    }

    /// Field-by-field decode of a JSON object
    pub fn from_value(value: &Value) -> Self {
        let defaults = Self::default();
        let Some(object) = value.as_object() else {
            warn!("Snapshot is not an object; using defaults");
            return defaults;
        };

        Self {
            mode: field(object, "mode", defaults.mode, |_| true),
            view: field(object, "view", defaults.view, |_| true),
            medium: field(object, "medium", defaults.medium, medium_in_range),
            speed_lock: field(object, "speed_lock", defaults.speed_lock, |_| true),
            amplitude: field(object, "amplitude", defaults.amplitude, |v| {
                in_range(*v, 0.0, MAX_AMPLITUDE)
            }),
            wavelength: field(object, "wavelength", defaults.wavelength, |v| {
                in_range(*v, MIN_WAVELENGTH, MAX_WAVELENGTH)
            }),
            frequency: field(object, "frequency", defaults.frequency, |v| {
                in_range(*v, MIN_FREQUENCY, MAX_FREQUENCY)
            }),
            phase: field(object, "phase", defaults.phase, |v: &f32| v.is_finite()),
            damping: field(object, "damping", defaults.damping, |v| {
                in_range(*v, 0.0, MAX_DAMPING)
            }),
            dispersion: field(object, "dispersion", defaults.dispersion, |v| {
                in_range(*v, 0.0, MAX_DISPERSION)
            }),
            pulse: field(object, "pulse", defaults.pulse, |_| true),
        }
    }
}

fn in_range(value: f32, min: f32, max: f32) -> bool {
    value.is_finite() && value >= min && value <= max
}

fn medium_in_range(medium: &Medium) -> bool {
    match *medium {
        Medium::String {
            tension_n,
            linear_density_kg_per_m,
        } => in_range(tension_n, 0.0, 1e6) && in_range(linear_density_kg_per_m, 1e-6, 1e3),
        Medium::Gas { temperature_k } => in_range(temperature_k, 1.0, 1e4),
        Medium::Liquid { depth_m } => in_range(depth_m, 1e-4, 1e5),
        Medium::Free { speed } => in_range(speed, MIN_SPEED, MAX_SPEED),
    }
}

fn field<T, F>(object: &Map<String, Value>, key: &str, fallback: T, valid: F) -> T
where
    T: DeserializeOwned,
    F: Fn(&T) -> bool,
{
    let Some(raw) = object.get(key) else {
        return fallback;
    };
    match serde_json::from_value::<T>(raw.clone()) {
        Ok(value) if valid(&value) => value,
        _ => {
            warn!("Snapshot field '{}' is invalid; using default", key);
            fallback
        }
    }
}

/// Encode a snapshot as a URL-safe token
pub fn encode_token(snapshot: &ParameterSnapshot) -> String {
    // Plain floats, bools and enums always serialize
    let json = serde_json::to_vec(snapshot).unwrap_or_default();
    URL_SAFE_NO_PAD.encode(json)
}

/// Decode a token; never fails
pub fn decode_token(token: &str) -> ParameterSnapshot {
    let token = token.trim();
    if token.len() > MAX_TOKEN_LEN {
        warn!("Share token too long ({} bytes); using defaults", token.len());
        return ParameterSnapshot::default();
    }

    let bytes = match URL_SAFE_NO_PAD.decode(token.trim_end_matches('=')) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Share token is not base64: {}; using defaults", e);
            return ParameterSnapshot::default();
        }
    };
    match serde_json::from_slice::<Value>(&bytes) {
        Ok(value) => ParameterSnapshot::from_value(&value),
        Err(e) => {
            warn!("Share token is not JSON: {}; using defaults", e);
            ParameterSnapshot::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn token_for(value: Value) -> String {
        URL_SAFE_NO_PAD.encode(value.to_string())
    }

    #[test]
    fn test_token_round_trip() {
        let mut params = SimulationParameters::default();
        params.set_medium(Medium::Gas { temperature_k: 300.0 });
        params.set_amplitude(75.0);
        params.set_damping(0.3);
        params.set_pulse(true);
        let snapshot =
            ParameterSnapshot::capture(&params, WaveMode::Longitudinal, ViewTransform::CoMoving);

        let token = encode_token(&snapshot);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_eq!(decode_token(&token), snapshot);
        assert_eq!(decode_token(&token).to_parameters(), params);
    }

    #[test]
    fn test_garbage_token_gives_defaults() {
        assert_eq!(decode_token("!!not a token!!"), ParameterSnapshot::default());
        assert_eq!(decode_token(""), ParameterSnapshot::default());
        assert_eq!(
            decode_token(&URL_SAFE_NO_PAD.encode("[1, 2, 3]")),
            ParameterSnapshot::default()
        );
    }

    #[test]
    fn test_fields_fall_back_individually() {
        let token = token_for(json!({
            "mode": "standing",
            "view": "sideways",
            "amplitude": 55.0,
            "wavelength": -3.0,
            "frequency": "fast",
            "damping": 0.5,
            "medium": {"kind": "liquid", "depth_m": 2.5},
        }));
        let snapshot = decode_token(&token);
        let defaults = ParameterSnapshot::default();

        assert_eq!(snapshot.mode, WaveMode::Standing);
        assert_eq!(snapshot.view, defaults.view);
        assert_eq!(snapshot.amplitude, 55.0);
        assert_eq!(snapshot.wavelength, defaults.wavelength);
        assert_eq!(snapshot.frequency, defaults.frequency);
        assert_eq!(snapshot.damping, 0.5);
        assert_eq!(snapshot.medium, Medium::Liquid { depth_m: 2.5 });
        assert_eq!(snapshot.pulse, defaults.pulse);
    }

    #[test]
    fn test_invalid_medium_falls_back() {
        let token = token_for(json!({
            "medium": {"kind": "string", "tension_n": -5.0, "linear_density_kg_per_m": 0.01},
        }));
        assert_eq!(decode_token(&token).medium, Medium::default());

        let token = token_for(json!({"medium": {"kind": "plasma"}}));
        assert_eq!(decode_token(&token).medium, Medium::default());
    }

    #[test]
    fn test_locked_snapshot_restores_constraint() {
        let token = token_for(json!({
            "speed_lock": true,
            "frequency": 2.0,
            "wavelength": 10.0,
        }));
        let params = decode_token(&token).to_parameters();
        assert!(params.speed_lock());
        let product = params.frequency() * params.wavelength();
        assert!((product - params.medium_speed()).abs() < 1e-3);
        assert_eq!(params.frequency(), 2.0);
    }
}
