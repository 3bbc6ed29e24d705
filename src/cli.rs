//! Command-line argument parsing.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing::info;

use crate::audio::CaptureSource;
use crate::error::WaveError;
use crate::field::{ViewTransform, WaveMode};
use crate::params::{Medium, RenderConfig, SimulationParameters};
use crate::snapshot::{decode_token, ParameterSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MediumArg {
    String,
    Gas,
    Liquid,
    Free,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceArg {
    None,
    Mic,
    File,
    Synth,
}

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "wavelab")]
#[command(about = "Interactive mechanical wave simulator with live audio input", long_about = None)]
pub struct Args {
    /// Wave mode
    #[arg(long, value_enum, default_value_t = WaveMode::Transverse)]
    pub mode: WaveMode,

    /// Reference frame
    #[arg(long, value_enum, default_value_t = ViewTransform::Lab)]
    pub view: ViewTransform,

    /// Propagation medium
    #[arg(long, value_enum, default_value_t = MediumArg::String)]
    pub medium: MediumArg,

    /// String tension (newtons)
    #[arg(long, value_name = "NEWTONS", default_value = "60")]
    pub tension: f32,

    /// String linear density (kg/m)
    #[arg(long, value_name = "KG_PER_M", default_value = "0.025")]
    pub linear_density: f32,

    /// Gas temperature (kelvin)
    #[arg(long, value_name = "KELVIN", default_value = "293.15")]
    pub temperature: f32,

    /// Liquid depth (meters)
    #[arg(long, value_name = "METERS", default_value = "10")]
    pub depth: f32,

    /// Speed for the free medium (model units/s)
    #[arg(long, value_name = "UNITS_PER_S", default_value = "200")]
    pub speed: f32,

    /// Peak displacement (model units)
    #[arg(long)]
    pub amplitude: Option<f32>,

    /// Spatial period (model units)
    #[arg(long)]
    pub wavelength: Option<f32>,

    /// Temporal frequency (Hz); with --lock it wins over --wavelength
    #[arg(long)]
    pub frequency: Option<f32>,

    /// Damping coefficient (1/s)
    #[arg(long)]
    pub damping: Option<f32>,

    /// Dispersion accent (ω += D·k²)
    #[arg(long)]
    pub dispersion: Option<f32>,

    /// Show a single wave packet instead of a continuous train
    #[arg(long)]
    pub pulse: bool,

    /// Lock frequency × wavelength to the medium speed
    #[arg(long)]
    pub lock: bool,

    /// Live audio source driving amplitude and frequency
    #[arg(long, value_enum, default_value_t = SourceArg::None)]
    pub source: SourceArg,

    /// WAV file for `--source file`
    #[arg(long, value_name = "PATH")]
    pub input: Option<PathBuf>,

    /// Input device index for `--source mic` (see --list-devices)
    #[arg(long, value_name = "INDEX")]
    pub device: Option<usize>,

    /// Tone frequency for `--source synth` (Hz)
    #[arg(long, value_name = "HZ", default_value = "220")]
    pub tone: f32,

    /// Shared state token; replaces the parameter flags above
    #[arg(long, value_name = "TOKEN")]
    pub state: Option<String>,

    /// Window and frame width (pixels)
    #[arg(long, default_value = "1280")]
    pub width: u32,

    /// Window and frame height (pixels)
    #[arg(long, default_value = "720")]
    pub height: u32,

    /// Render one frame to a PNG and exit (no window)
    #[arg(long, value_name = "PATH")]
    pub screenshot: Option<PathBuf>,

    /// Simulated time of the headless frame (seconds)
    #[arg(long, value_name = "SECONDS", default_value = "1.0")]
    pub screenshot_time: f32,

    /// List audio input devices and exit
    #[arg(long)]
    pub list_devices: bool,
}

impl Args {
    /// Medium with its constants from the command line
    pub fn medium(&self) -> Medium {
        match self.medium {
            MediumArg::String => Medium::String {
                tension_n: self.tension,
                linear_density_kg_per_m: self.linear_density,
            },
            MediumArg::Gas => Medium::Gas {
                temperature_k: self.temperature,
            },
            MediumArg::Liquid => Medium::Liquid {
                depth_m: self.depth,
            },
            MediumArg::Free => Medium::Free { speed: self.speed },
        }
    }

    /// Starting state: the shared token if given, otherwise the flags
    pub fn initial_snapshot(&self) -> ParameterSnapshot {
        if let Some(token) = &self.state {
            info!("Restoring shared state token");
            return decode_token(token);
        }

        let mut params = SimulationParameters::default();
        params.set_medium(self.medium());
        // Engage the lock first so the edits below are recorded against it
        params.set_speed_lock(self.lock);
        if let Some(amplitude) = self.amplitude {
            params.set_amplitude(amplitude);
        }
        if let Some(wavelength) = self.wavelength {
            params.set_wavelength(wavelength);
        }
        if let Some(frequency) = self.frequency {
            params.set_frequency(frequency);
        }
        if let Some(damping) = self.damping {
            params.set_damping(damping);
        }
        if let Some(dispersion) = self.dispersion {
            params.set_dispersion(dispersion);
        }
        params.set_pulse(self.pulse);
        params.resolve_speed_lock();

        ParameterSnapshot::capture(&params, self.mode, self.view)
    }

    /// Audio source selected on the command line, if any
    pub fn capture_source(&self) -> Result<Option<CaptureSource>, WaveError> {
        match self.source {
            SourceArg::None => Ok(None),
            SourceArg::Mic => Ok(Some(CaptureSource::Microphone {
                device_index: self.device,
            })),
            SourceArg::File => self
                .input
                .clone()
                .map(|path| Some(CaptureSource::File(path)))
                .ok_or_else(|| WaveError::Config("--source file needs --input PATH".to_string())),
            SourceArg::Synth => Ok(Some(CaptureSource::Synth {
                frequency_hz: self.tone,
            })),
        }
    }

    /// Render configuration with the requested frame size
    pub fn render_config(&self) -> Result<RenderConfig, WaveError> {
        if self.width < 64 || self.height < 64 {
            return Err(WaveError::Config(format!(
                "frame size {}x{} is too small (min 64x64)",
                self.width, self.height
            )));
        }
        Ok(RenderConfig {
            window_width: self.width,
            window_height: self.height,
            ..RenderConfig::default()
        })
    }
}
