use crate::config::{CAPTION_LIMIT, MAX_GROUP_SIZE, MAX_SLIDESHOW_IMAGES};
use crate::domain::classify::FallbackPurpose;
use crate::domain::files::{
    caption_candidate, list_files, natural_cmp, partition, truncate_caption, ExtensionSets,
    FileEntry, Partition,
};
use crate::domain::media::{FetchResult, MediaKind};
use crate::domain::slideshow::SlideshowSynthesizer;
use crate::domain::status;
use crate::error::{FallbackError, ToolError};
use crate::ports::fetch::FallbackFetch;
use crate::ports::progress::StatusLine;
use crate::ports::tools::{ToolCommand, ToolRunner};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

/// gallery-dl driven download with slideshow and album assembly.
pub struct FallbackFetcher<T> {
    runner: T,
    synthesizer: SlideshowSynthesizer<T>,
    program: String,
    timeout: Duration,
    size_limit: u64,
    extensions: ExtensionSets,
}

impl<T: ToolRunner> FallbackFetcher<T> {
    pub fn new(
        runner: T,
        synthesizer: SlideshowSynthesizer<T>,
        program: &str,
        timeout: Duration,
        size_limit: u64,
    ) -> Self {
        Self {
            runner,
            synthesizer,
            program: program.to_string(),
            timeout,
            size_limit,
            extensions: ExtensionSets::default(),
        }
    }

    async fn download(&self, url: &str, workspace: &Path) -> Result<(), FallbackError> {
        let command = ToolCommand::new(&self.program, self.timeout)
            .arg("--write-metadata")
            .arg("-D")
            .arg(workspace)
            .arg(url)
            .current_dir(workspace);
        let outcome = self.runner.run(command).await.map_err(|e| match e {
            ToolError::NotFound(_) => FallbackError::ToolMissing,
            other => FallbackError::Internal(other.to_string()),
        })?;
        if outcome.timed_out {
            return Err(FallbackError::ToolTimedOut);
        }
        if !outcome.success() {
            warn!(code = ?outcome.exit_code, stderr = %outcome.stderr_tail(3), "gallery-dl failed");
            return Err(FallbackError::ToolFailed(outcome.exit_code));
        }
        Ok(())
    }

    async fn read_caption(&self, metadata: &[PathBuf]) -> Option<String> {
        let mut documents = Vec::new();
        for path in metadata {
            let Ok(bytes) = tokio::fs::read(path).await else {
                continue;
            };
            if let Ok(doc) = serde_json::from_slice::<Value>(&bytes) {
                documents.push(doc);
            }
        }
        caption_candidate(&documents).map(|c| truncate_caption(&c, CAPTION_LIMIT))
    }

    /// Video under the limit, then slideshow, then album.
    async fn choose(
        &self,
        url: &str,
        workspace: &Path,
        mut buckets: Partition,
        caption: Option<String>,
        status: &mut StatusLine<'_>,
    ) -> Result<FetchResult, FallbackError> {
        if let Some(video) = buckets
            .videos
            .iter()
            .filter(|v| v.size <= self.size_limit)
            .min_by_key(|v| v.size)
        {
            info!(url, bytes = video.size, "Fallback picked a video");
            return Ok(FetchResult::single(url, MediaKind::Video, video.path.clone()).with_title(caption));
        }

        sort_natural(&mut buckets.images);
        sort_natural(&mut buckets.audios);

        let audio = slideshow_audio(&buckets.audios).filter(|_| !buckets.images.is_empty());
        if let Some(audio) = audio {
            status.update(status::BUILDING_SLIDESHOW).await;
            let images: Vec<PathBuf> = buckets
                .images
                .iter()
                .take(MAX_SLIDESHOW_IMAGES)
                .map(|f| f.path.clone())
                .collect();
            let out = workspace.join(format!("slideshow_{}.mp4", Uuid::new_v4().simple()));
            if self.synthesizer.synthesize(&images, &audio.path, &out).await {
                let size = tokio::fs::metadata(&out)
                    .await
                    .map_err(|e| FallbackError::Internal(e.to_string()))?
                    .len();
                if size <= self.size_limit {
                    info!(url, images = images.len(), bytes = size, "Fallback built a slideshow");
                    return Ok(FetchResult::single(url, MediaKind::Slideshow, out).with_title(caption));
                }
                warn!(url, bytes = size, "Slideshow over the size limit, sending images instead");
            }
        }

        if !buckets.images.is_empty() {
            let images: Vec<PathBuf> = buckets
                .images
                .iter()
                .take(MAX_GROUP_SIZE)
                .map(|f| f.path.clone())
                .collect();
            info!(url, images = images.len(), "Fallback picked images");
            return Ok(FetchResult::images(url, images).with_title(caption));
        }

        Err(FallbackError::NoSuitableMedia)
    }
}

fn sort_natural(files: &mut [FileEntry]) {
    files.sort_by(|a, b| natural_cmp(&a.path, &b.path));
}

/// Smallest track; the first one in listing order on a tie.
fn slideshow_audio(audios: &[FileEntry]) -> Option<&FileEntry> {
    audios.iter().min_by_key(|a| a.size)
}

#[async_trait]
impl<T: ToolRunner> FallbackFetch for FallbackFetcher<T> {
    async fn fetch_generic(
        &self,
        url: &str,
        workspace: &Path,
        purpose: FallbackPurpose,
        status: &mut StatusLine<'_>,
    ) -> Result<FetchResult, FallbackError> {
        info!(url, purpose = purpose.label(), "Running gallery-dl");
        self.download(url, workspace).await?;

        let files = list_files(workspace).map_err(|e| FallbackError::Internal(e.to_string()))?;
        if files.is_empty() {
            return Err(FallbackError::NoMedia);
        }
        let buckets = partition(&files, &self.extensions);
        let caption = self.read_caption(&buckets.metadata).await;
        self.choose(url, workspace, buckets, caption, status).await
    }
}
