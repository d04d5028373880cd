//! Adapters - Concrete implementations of ports.

pub mod delivery;
pub mod ffmpeg;
pub mod http;
pub mod process;
pub mod progress;
