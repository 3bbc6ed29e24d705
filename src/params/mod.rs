//! Parameter definitions with physical units and documented semantics.
//!
//! All tunables live here with:
//! - Units (model units, seconds, Hz, etc.)
//! - Documented ranges and meanings
//! - Type safety where possible

mod audio;
mod mapper;
mod render;
mod simulation;

// Re-export all types
pub use audio::{audio_constants, EstimatorConfig};
pub use mapper::MapperConfig;
pub use render::{LayoutConfig, QualityConfig, RenderConfig, SchedulerConfig};
pub use simulation::{
    sanitize, LockEdit, Medium, SimulationParameters, EPSILON, MAX_AMPLITUDE, MAX_DAMPING,
    MAX_DISPERSION, MAX_FREQUENCY, MAX_SPEED, MAX_WAVELENGTH, MIN_FREQUENCY, MIN_SPEED,
    MIN_WAVELENGTH,
};
