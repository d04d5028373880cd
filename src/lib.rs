//! Mediagrab - Media acquisition pipeline for chat links.
//!
//! Hexagonal Architecture:
//! - domain/: Pure logic (classification, profiles, frozen frames, slideshows)
//! - ports/: Trait definitions
//! - adapters/: Concrete implementations (processes, ffmpeg, HTTP, outbox)
//! - application/: Fetch strategies, result cache and the downloader
//! - config: Environment configuration
//!
//! # Features
//! - `ffmpeg`: decode frames in-process with ffmpeg-next for the frozen-frame
//!   check instead of shelling out to the ffmpeg CLI

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod ports;

pub use application::downloader::{Downloader, DownloaderOptions};
pub use config::Settings;
pub use domain::media::{FetchResult, MediaKind};
pub use error::PipelineError;
