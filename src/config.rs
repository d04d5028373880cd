//! Configuration loaded from the environment.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Telegram caps captions at 1024 characters.
pub const CAPTION_LIMIT: usize = 1024;
/// Telegram media groups hold at most 10 items.
pub const MAX_GROUP_SIZE: usize = 10;
pub const MAX_SLIDESHOW_IMAGES: usize = 60;

pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "webm", "mov", "avi", "flv", "wmv"];
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp", "tiff"];
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "m4a", "aac", "ogg", "opus", "wav", "flac"];

/// External binaries invoked by the pipeline.
#[derive(Clone, Debug)]
pub struct ToolPaths {
    pub yt_dlp: String,
    pub gallery_dl: String,
    pub ffmpeg: String,
    pub ffprobe: String,
}

#[derive(Clone, Debug)]
pub struct Timeouts {
    pub yt_dlp: Duration,
    pub gallery_dl: Duration,
    pub ffmpeg: Duration,
}

#[derive(Clone, Debug)]
pub struct Settings {
    /// HTTP server bind address
    pub addr: String,
    /// HTTP server port
    pub port: String,
    /// Root for per-request workspaces
    pub download_dir: PathBuf,
    /// Persisted artifact copies referenced by the result cache
    pub cache_dir: PathBuf,
    /// Where the outbox delivery adapter drops artifacts
    pub outbox_dir: PathBuf,
    pub size_limit_bytes: u64,
    pub tools: ToolPaths,
    pub timeouts: Timeouts,
    pub frozen_sample_interval: Duration,
    pub frozen_max_samples: usize,
    pub cache_capacity: usize,
    /// Concurrent subprocesses across all requests
    pub tool_workers: usize,
    pub max_concurrent_requests: usize,
    pub log_level: String,
    pub log_json: bool,
}

impl Settings {
    /// Load configuration from `.env` and environment variables.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        let download_dir =
            PathBuf::from(env::var("DOWNLOAD_DIR").unwrap_or_else(|_| String::from("./downloads")));
        let cache_dir = env::var("CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| download_dir.join("cache"));
        let outbox_dir = env::var("OUTBOX_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| download_dir.join("outbox"));

        Self {
            addr: env::var("ADDR").unwrap_or_else(|_| String::from("127.0.0.1")),
            port: env::var("PORT").unwrap_or_else(|_| String::from("3000")),
            download_dir,
            cache_dir,
            outbox_dir,
            size_limit_bytes: megabytes(env_or("MAX_UPLOAD_MB", 50)),
            tools: ToolPaths {
                yt_dlp: env::var("YTDLP_BIN").unwrap_or_else(|_| String::from("yt-dlp")),
                gallery_dl: env::var("GALLERY_DL_BIN")
                    .unwrap_or_else(|_| String::from("gallery-dl")),
                ffmpeg: env::var("FFMPEG_BIN").unwrap_or_else(|_| String::from("ffmpeg")),
                ffprobe: env::var("FFPROBE_BIN").unwrap_or_else(|_| String::from("ffprobe")),
            },
            timeouts: Timeouts {
                yt_dlp: Duration::from_secs(env_or("YTDLP_TIMEOUT_SECS", 600)),
                gallery_dl: Duration::from_secs(env_or("GALLERY_DL_TIMEOUT_SECS", 600)),
                ffmpeg: Duration::from_secs(env_or("FFMPEG_TIMEOUT_SECS", 900)),
            },
            frozen_sample_interval: Duration::from_secs(env_or("FROZEN_SAMPLE_INTERVAL_SECS", 15)),
            frozen_max_samples: env_or("FROZEN_MAX_SAMPLES", 5),
            cache_capacity: env_or("CACHE_CAPACITY", 64),
            tool_workers: env_or("TOOL_WORKERS", 4usize).max(1),
            max_concurrent_requests: env_or("MAX_CONCURRENT_REQUESTS", 8usize).max(1),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| String::from("info")),
            log_json: env::var("LOG_JSON")
                .map(|v| matches!(v.as_str(), "1" | "true" | "True"))
                .unwrap_or(false),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        let download_dir = PathBuf::from("./downloads");
        Self {
            addr: String::from("127.0.0.1"),
            port: String::from("3000"),
            cache_dir: download_dir.join("cache"),
            outbox_dir: download_dir.join("outbox"),
            download_dir,
            size_limit_bytes: 50 * 1024 * 1024,
            tools: ToolPaths {
                yt_dlp: String::from("yt-dlp"),
                gallery_dl: String::from("gallery-dl"),
                ffmpeg: String::from("ffmpeg"),
                ffprobe: String::from("ffprobe"),
            },
            timeouts: Timeouts {
                yt_dlp: Duration::from_secs(600),
                gallery_dl: Duration::from_secs(600),
                ffmpeg: Duration::from_secs(900),
            },
            frozen_sample_interval: Duration::from_secs(15),
            frozen_max_samples: 5,
            cache_capacity: 64,
            tool_workers: 4,
            max_concurrent_requests: 8,
            log_level: String::from("info"),
            log_json: false,
        }
    }
}

/// Saturates instead of overflowing on absurd limits.
fn megabytes(mb: u64) -> u64 {
    mb.saturating_mul(1024 * 1024)
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
