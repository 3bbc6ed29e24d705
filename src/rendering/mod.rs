//! Software wave renderer and GPU presentation of its pixel surface.

mod layout;
mod renderer;
mod surface;
mod system;

pub use layout::{Jitter, ParticleLayout};
pub use renderer::{FrameInput, FrameOutcome, RenderToggles, Renderer};
pub use surface::{Color, PixelSurface};
pub use system::{BlitUniforms, RenderSystem};
