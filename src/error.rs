//! Error type shared by the library modules.

use std::fmt;

#[derive(Debug)]
pub enum WaveError {
    /// Audio device, stream, or source failure
    Audio(String),
    /// Invalid configuration value
    Config(String),
    Io(std::io::Error),
    Image(image::ImageError),
    /// GPU presenter failure
    Render(String),
}

impl fmt::Display for WaveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaveError::Audio(msg) => write!(f, "Audio error: {msg}"),
            WaveError::Config(msg) => write!(f, "Invalid configuration: {msg}"),
            WaveError::Io(e) => write!(f, "I/O error: {e}"),
            WaveError::Image(e) => write!(f, "Image error: {e}"),
            WaveError::Render(msg) => write!(f, "Render error: {msg}"),
        }
    }
}

impl std::error::Error for WaveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WaveError::Io(e) => Some(e),
            WaveError::Image(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for WaveError {
    fn from(e: std::io::Error) -> Self {
        WaveError::Io(e)
    }
}

impl From<image::ImageError> for WaveError {
    fn from(e: image::ImageError) -> Self {
        WaveError::Image(e)
    }
}

pub type Result<T> = std::result::Result<T, WaveError>;
