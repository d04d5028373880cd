//! Application layer - Services that drive the ports.

pub mod cache;
pub mod downloader;
pub mod fallback;
pub mod primary;
