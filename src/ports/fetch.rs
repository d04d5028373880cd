use crate::domain::classify::FallbackPurpose;
use crate::domain::extraction::VideoInfo;
use crate::domain::media::FetchResult;
use crate::domain::profiles::Profile;
use crate::error::{ExtractionFailed, FallbackError};
use crate::ports::progress::StatusLine;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub enum PrimaryOutcome {
    /// A file was produced and located in the workspace.
    Downloaded { path: PathBuf, info: VideoInfo },
    /// The metadata describes a photo-mode post; nothing usable was written.
    Slideshow { webpage_url: Option<String> },
}

/// Site-aware extraction tool.
#[async_trait]
pub trait PrimaryFetch: Send + Sync {
    async fn fetch(
        &self,
        url: &str,
        profile: &Profile,
        workspace: &Path,
    ) -> Result<PrimaryOutcome, ExtractionFailed>;
}

/// Generic, extractor-agnostic downloader.
#[async_trait]
pub trait FallbackFetch: Send + Sync {
    /// Download into `workspace` and pick what to deliver. Returned files live
    /// in `workspace`, so the caller keeps it alive until delivery.
    async fn fetch_generic(
        &self,
        url: &str,
        workspace: &Path,
        purpose: FallbackPurpose,
        status: &mut StatusLine<'_>,
    ) -> Result<FetchResult, FallbackError>;
}
