//! Wavelab library - interactive mechanical wave simulation with live audio input

pub mod audio;
pub mod cli;
pub mod error;
pub mod field;
pub mod mapper;
pub mod params;
pub mod quality;
pub mod rendering;
pub mod scheduler;
pub mod session;
pub mod settings;
pub mod snapshot;
