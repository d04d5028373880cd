//! Error taxonomy for the acquisition pipeline.
//!
//! Tool-level and file-location failures of the primary tool never reach the
//! requester directly: the downloader recovers from [`ExtractionFailed`] by
//! falling through to the generic downloader. Only [`PipelineError`] values
//! end a run, and each renders to a status line via
//! [`PipelineError::user_message`].

use std::io;
use thiserror::Error;

/// Failure to start a subprocess at all.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("tool `{0}` is not installed")]
    NotFound(String),

    #[error("failed to run `{program}`: {source}")]
    Io {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// The primary, site-aware extraction tool produced nothing usable.
#[derive(Debug, Error)]
pub enum ExtractionFailed {
    #[error("extraction tool exited with code {code:?}: {stderr}")]
    Tool { code: Option<i32>, stderr: String },

    #[error("extraction tool timed out after {0}s")]
    TimedOut(u64),

    #[error("no downloaded file could be located in the workspace")]
    NoFile,

    #[error(transparent)]
    Spawn(#[from] ToolError),
}

/// The generic downloader path produced nothing deliverable.
#[derive(Debug, Error)]
pub enum FallbackError {
    #[error("gallery-dl is not installed")]
    ToolMissing,

    #[error("gallery-dl exited with code {0:?}")]
    ToolFailed(Option<i32>),

    #[error("gallery-dl timed out")]
    ToolTimedOut,

    #[error("no media found")]
    NoMedia,

    #[error("no suitable media (video/images) to send")]
    NoSuitableMedia,

    #[error("gallery-dl error: {0}")]
    Internal(String),
}

/// A slideshow build step failed. Only ever logged: the fallback sends the
/// images instead.
#[derive(Debug, Error)]
#[error("slideshow synthesis failed at {step}: {reason}")]
pub struct SynthesisFailed {
    pub step: &'static str,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum FrameSampleError {
    #[error("video backend unavailable: {0}")]
    Unavailable(String),

    #[error("video could not be decoded: {0}")]
    Unreadable(String),
}

#[derive(Debug, Error)]
pub enum ProgressError {
    /// The status message was already removed on the chat side.
    #[error("status message is already gone")]
    Gone,

    #[error("status update failed: {0}")]
    Transport(String),
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("delivery failed: {0}")]
    Transport(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Terminal conditions of one pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("unsupported url: {0}")]
    UnsupportedUrl(String),

    #[error(transparent)]
    ExtractionFailed(#[from] ExtractionFailed),

    #[error("fallback exhausted: {0}")]
    FallbackExhausted(#[from] FallbackError),

    #[error("artifact is {size} bytes, limit is {limit}")]
    SizeLimitExceeded { size: u64, limit: u64 },

    #[error("video is still frozen after the fallback profile")]
    FrozenContent,

    #[error("workspace error: {0}")]
    Workspace(#[from] io::Error),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

impl PipelineError {
    /// Status line shown to the requester when the run ends with this error.
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::UnsupportedUrl(_) => "Unsupported or invalid URL.".to_string(),
            PipelineError::ExtractionFailed(_) => {
                "❌ Download Failed. The link might be private, broken, or from an unsupported site."
                    .to_string()
            }
            PipelineError::FallbackExhausted(FallbackError::NoMedia) => {
                "❌ No media found via gallery-dl.".to_string()
            }
            PipelineError::FallbackExhausted(FallbackError::NoSuitableMedia) => {
                "❌ No suitable media (video/images) to send.".to_string()
            }
            PipelineError::FallbackExhausted(FallbackError::ToolMissing) => {
                "❌ Download Failed. No fallback downloader is available.".to_string()
            }
            PipelineError::FallbackExhausted(FallbackError::ToolTimedOut) => {
                "❌ Download Failed. The fallback downloader timed out.".to_string()
            }
            PipelineError::FallbackExhausted(FallbackError::ToolFailed(_)) => {
                "❌ gallery-dl failed to process the link.".to_string()
            }
            PipelineError::FallbackExhausted(FallbackError::Internal(e)) => {
                format!("❌ gallery-dl error: {}", e)
            }
            PipelineError::SizeLimitExceeded { size, limit } => format!(
                "❌ Error: The video is too large ({:.2}MB). Telegram's limit for bot uploads is {}MB.",
                *size as f64 / (1024.0 * 1024.0),
                limit / (1024 * 1024)
            ),
            PipelineError::FrozenContent => {
                "❌ The downloaded video appears to be frozen (all frames identical). This may be a site limitation."
                    .to_string()
            }
            PipelineError::Workspace(_) | PipelineError::Delivery(_) => {
                "❌ An unexpected error occurred. Please try again later.".to_string()
            }
        }
    }
}
