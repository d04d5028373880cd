//! The acquisition state machine.
//!
//! One run walks `Primary -> PostChecks -> SizeCheck -> Deliver`, with an
//! edge from `Primary` into `Fallback` on failure or slideshow metadata.
//! The frozen-frame retry and the primary to fallback hand-off each happen
//! at most once per run; both limits are carried in the state values.

use crate::application::cache::{persist_artifacts, ResultCache};
use crate::config::{Settings, CAPTION_LIMIT};
use crate::domain::classify::{classify, validate_url, FallbackPurpose, Route};
use crate::domain::extraction::VideoInfo;
use crate::domain::files::truncate_caption;
use crate::domain::frames::{FrozenFrameDetector, FrozenFrameSettings};
use crate::domain::media::{FetchResult, MediaKind};
use crate::domain::profiles::{Profile, ProfileName};
use crate::domain::status as texts;
use crate::domain::workspace::Workspace;
use crate::error::{ExtractionFailed, PipelineError};
use crate::ports::delivery::{Delivery, Outbound};
use crate::ports::fetch::{FallbackFetch, PrimaryFetch, PrimaryOutcome};
use crate::ports::frames::FrameSampler;
use crate::ports::pipeline::Pipeline;
use crate::ports::progress::{ProgressReporter, StatusLine};
use async_trait::async_trait;
use std::io;
use std::path::PathBuf;
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct DownloaderOptions {
    /// Root for per-run workspaces
    pub download_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub size_limit: u64,
    pub frozen: FrozenFrameSettings,
    pub cache_capacity: usize,
}

impl From<&Settings> for DownloaderOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            download_dir: settings.download_dir.clone(),
            cache_dir: settings.cache_dir.clone(),
            size_limit: settings.size_limit_bytes,
            frozen: FrozenFrameSettings {
                interval: settings.frozen_sample_interval,
                max_samples: settings.frozen_max_samples,
            },
            cache_capacity: settings.cache_capacity,
        }
    }
}

enum State {
    Primary {
        profile: ProfileName,
        frozen_retry: bool,
    },
    PostChecks {
        path: PathBuf,
        info: VideoInfo,
        frozen_retry: bool,
    },
    Fallback {
        purpose: FallbackPurpose,
        target: String,
    },
    SizeCheck {
        result: FetchResult,
        via_fallback: bool,
    },
    Deliver {
        result: FetchResult,
        via_fallback: bool,
    },
}

pub struct Downloader<P, F, S, D> {
    primary: P,
    fallback: F,
    frozen: FrozenFrameDetector<S>,
    delivery: D,
    cache: ResultCache,
    options: DownloaderOptions,
}

impl<P, F, S, D> Downloader<P, F, S, D>
where
    P: PrimaryFetch,
    F: FallbackFetch,
    S: FrameSampler,
    D: Delivery,
{
    pub fn new(primary: P, fallback: F, sampler: S, delivery: D, options: DownloaderOptions) -> Self {
        Self {
            primary,
            fallback,
            frozen: FrozenFrameDetector::new(sampler, options.frozen),
            delivery,
            cache: ResultCache::new(options.cache_capacity),
            options,
        }
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    async fn run(&self, url: &str, status: &mut StatusLine<'_>) -> Result<FetchResult, PipelineError> {
        if validate_url(url).is_none() {
            return Err(PipelineError::UnsupportedUrl(url.to_string()));
        }
        let signals = classify(url);
        status.update(signals.alert_text()).await;

        if let Some(hit) = self.cache.get(url) {
            info!(url, kind = ?hit.kind, "Serving from cache");
            return self.deliver(hit, false, status).await;
        }

        let workspace = Workspace::create(&self.options.download_dir, "run-").await?;
        // Created on entering the fallback; keeps its files alive until delivery.
        let mut fallback_workspace: Option<Workspace> = None;

        let mut state = match signals.route() {
            Route::Primary(profile) => State::Primary {
                profile,
                frozen_retry: false,
            },
            Route::Fallback(purpose) => State::Fallback {
                purpose,
                target: url.to_string(),
            },
        };

        loop {
            state = match state {
                State::Primary {
                    profile,
                    frozen_retry,
                } => {
                    status
                        .update(if frozen_retry {
                            texts::FROZEN_RETRY
                        } else {
                            texts::DOWNLOADING
                        })
                        .await;
                    match self
                        .primary
                        .fetch(url, &Profile::named(profile), workspace.path())
                        .await
                    {
                        Ok(PrimaryOutcome::Downloaded { path, info }) => State::PostChecks {
                            path,
                            info,
                            frozen_retry,
                        },
                        Ok(PrimaryOutcome::Slideshow { webpage_url }) => State::Fallback {
                            purpose: FallbackPurpose::Slideshow,
                            target: webpage_url.unwrap_or_else(|| url.to_string()),
                        },
                        Err(e) => {
                            warn!(url, profile = %profile, error = %e, "Primary extraction failed");
                            State::Fallback {
                                purpose: FallbackPurpose::Recovery,
                                target: url.to_string(),
                            }
                        }
                    }
                }

                State::PostChecks {
                    path,
                    info,
                    frozen_retry,
                } => {
                    status.update(texts::PROCESSING).await;
                    if self.frozen.is_frozen(&path).await {
                        warn!(url, path = ?path, frozen_retry, "Frozen frame video detected");
                        let _ = tokio::fs::remove_file(&path).await;
                        if frozen_retry {
                            return Err(PipelineError::FrozenContent);
                        }
                        State::Primary {
                            profile: ProfileName::Fallback,
                            frozen_retry: true,
                        }
                    } else {
                        State::SizeCheck {
                            result: video_result(url, path, info),
                            via_fallback: false,
                        }
                    }
                }

                State::Fallback { purpose, target } => {
                    status.update(&texts::using_fallback(purpose)).await;
                    let ws = fallback_workspace.insert(
                        Workspace::create(&self.options.download_dir, "fallback-").await?,
                    );
                    let mut result = self
                        .fallback
                        .fetch_generic(&target, ws.path(), purpose, status)
                        .await?;
                    result.source_url = url.to_string();
                    State::SizeCheck {
                        result,
                        via_fallback: true,
                    }
                }

                State::SizeCheck {
                    result,
                    via_fallback,
                } => State::Deliver {
                    result: self.finalize(url, result, true).await?,
                    via_fallback,
                },

                State::Deliver {
                    result,
                    via_fallback,
                } => return self.deliver(result, via_fallback, status).await,
            };
        }
    }

    /// Size check, then copy into the persisted cache directory.
    async fn finalize(
        &self,
        url: &str,
        mut result: FetchResult,
        remember: bool,
    ) -> Result<FetchResult, PipelineError> {
        if !result.is_deliverable() {
            return Err(ExtractionFailed::NoFile.into());
        }
        let size = result.largest_file_size().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "artifact vanished before the size check")
        })?;
        if size > self.options.size_limit {
            warn!(url, bytes = size, limit = self.options.size_limit, "Artifact too large");
            for file in &result.files {
                let _ = tokio::fs::remove_file(file).await;
            }
            return Err(PipelineError::SizeLimitExceeded {
                size,
                limit: self.options.size_limit,
            });
        }

        result.files = persist_artifacts(&self.options.cache_dir, &result.files).await?;
        if remember {
            self.cache.set(url, &result);
        }
        Ok(result)
    }

    async fn deliver(
        &self,
        result: FetchResult,
        via_fallback: bool,
        status: &mut StatusLine<'_>,
    ) -> Result<FetchResult, PipelineError> {
        status.update(texts::uploading(result.kind, via_fallback)).await;
        let outbound = Outbound {
            kind: result.kind,
            files: result.files.clone(),
            caption: result
                .title
                .as_deref()
                .map(|t| truncate_caption(t, CAPTION_LIMIT)),
        };
        self.delivery.send(&outbound).await?;
        status.clear().await;
        info!(url = %result.source_url, kind = ?result.kind, files = result.files.len(), "Delivered");
        Ok(result)
    }

    async fn run_reprocess(
        &self,
        url: &str,
        status: &mut StatusLine<'_>,
    ) -> Result<FetchResult, PipelineError> {
        if validate_url(url).is_none() {
            return Err(PipelineError::UnsupportedUrl(url.to_string()));
        }
        status.update(texts::REPROCESSING).await;

        let workspace = Workspace::create(&self.options.download_dir, "reprocess-").await?;
        let profile = Profile::named(ProfileName::TelegramReprocess);
        let (path, info) = match self.primary.fetch(url, &profile, workspace.path()).await? {
            PrimaryOutcome::Downloaded { path, info } => (path, info),
            PrimaryOutcome::Slideshow { .. } => return Err(ExtractionFailed::NoFile.into()),
        };
        let result = self
            .finalize(url, video_result(url, path, info), false)
            .await?;
        self.deliver(result, false, status).await
    }

    /// Log once and put the matching text on the status line.
    async fn report(
        &self,
        url: &str,
        outcome: &Result<FetchResult, PipelineError>,
        status: &mut StatusLine<'_>,
    ) {
        let Err(e) = outcome else {
            return;
        };
        match e {
            PipelineError::Workspace(_) | PipelineError::Delivery(_) => {
                error!(url, error = %e, details = ?e, "Pipeline run failed")
            }
            _ => info!(url, error = %e, "Pipeline run ended without media"),
        }
        status.update(&e.user_message()).await;
    }
}

fn video_result(url: &str, path: PathBuf, info: VideoInfo) -> FetchResult {
    let mut result = FetchResult::single(url, MediaKind::Video, path).with_title(info.title);
    result.duration = info.duration;
    result.width = info.width;
    result.height = info.height;
    result
}

#[async_trait]
impl<P, F, S, D> Pipeline for Downloader<P, F, S, D>
where
    P: PrimaryFetch,
    F: FallbackFetch,
    S: FrameSampler,
    D: Delivery,
{
    async fn handle(
        &self,
        url: &str,
        reporter: &dyn ProgressReporter,
    ) -> Result<FetchResult, PipelineError> {
        let mut status = StatusLine::new(reporter);
        let outcome = self.run(url, &mut status).await;
        self.report(url, &outcome, &mut status).await;
        outcome
    }

    async fn reprocess(
        &self,
        url: &str,
        reporter: &dyn ProgressReporter,
    ) -> Result<FetchResult, PipelineError> {
        let mut status = StatusLine::new(reporter);
        let outcome = self.run_reprocess(url, &mut status).await;
        self.report(url, &outcome, &mut status).await;
        outcome
    }
}
