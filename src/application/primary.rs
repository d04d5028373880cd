use crate::domain::extraction::{ExtractionOutcome, VideoInfo};
use crate::domain::files::{list_files, select_produced_file};
use crate::domain::profiles::Profile;
use crate::error::ExtractionFailed;
use crate::ports::fetch::{PrimaryFetch, PrimaryOutcome};
use crate::ports::tools::{ToolCommand, ToolRunner};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// yt-dlp driven extraction.
pub struct PrimaryFetcher<T> {
    runner: T,
    program: String,
    timeout: Duration,
}

impl<T: ToolRunner> PrimaryFetcher<T> {
    pub fn new(runner: T, program: &str, timeout: Duration) -> Self {
        Self {
            runner,
            program: program.to_string(),
            timeout,
        }
    }
}

/// Reported path, then the rendered template, then a workspace scan.
fn locate_file(workspace: &Path, profile: &Profile, info: &VideoInfo) -> Option<PathBuf> {
    if let Some(reported) = info.filepath.as_deref().map(PathBuf::from) {
        if reported.is_file() {
            return Some(reported);
        }
    }

    for ext in [Some(profile.declared_extension()), None] {
        let expected = workspace.join(info.render_template(&profile.output_template, ext));
        if expected.is_file() {
            return Some(expected);
        }
    }

    let listing = list_files(workspace).ok()?;
    select_produced_file(&listing, Some(profile.declared_extension()))
}

#[async_trait]
impl<T: ToolRunner> PrimaryFetch for PrimaryFetcher<T> {
    async fn fetch(
        &self,
        url: &str,
        profile: &Profile,
        workspace: &Path,
    ) -> Result<PrimaryOutcome, ExtractionFailed> {
        let command = ToolCommand::new(&self.program, self.timeout)
            .args(profile.to_args(workspace, url))
            .current_dir(workspace);
        info!(url, profile = %profile.name, "Running yt-dlp");
        let outcome = self.runner.run(command).await?;

        let parsed = serde_json::from_slice::<Value>(&outcome.stdout)
            .map(|raw| ExtractionOutcome::parse(&raw))
            .ok();
        if let Some(ExtractionOutcome::PlaylistOfImages { webpage_url, .. }) =
            parsed.as_ref().filter(|p| p.is_slideshow())
        {
            info!(url, "Metadata describes a slideshow");
            return Ok(PrimaryOutcome::Slideshow {
                webpage_url: webpage_url.clone(),
            });
        }

        if outcome.timed_out {
            return Err(ExtractionFailed::TimedOut(self.timeout.as_secs()));
        }
        if !outcome.success() {
            return Err(ExtractionFailed::Tool {
                code: outcome.exit_code,
                stderr: outcome.stderr_tail(5),
            });
        }

        let info = match parsed.as_ref().and_then(ExtractionOutcome::primary_info) {
            Some(info) => info.clone(),
            None => {
                debug!(url, "No usable metadata on stdout, scanning workspace");
                VideoInfo::default()
            }
        };
        let path = locate_file(workspace, profile, &info).ok_or(ExtractionFailed::NoFile)?;
        debug!(path = ?path, "Located download");
        Ok(PrimaryOutcome::Downloaded { path, info })
    }
}
