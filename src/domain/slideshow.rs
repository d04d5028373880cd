//! Slideshow synthesis: stills plus one audio track into a single mp4.

use crate::error::SynthesisFailed;
use crate::ports::tools::{ToolCommand, ToolRunner};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

pub const MIN_IMAGE_SECS: f64 = 0.5;
pub const MAX_IMAGE_SECS: f64 = 8.0;
/// Used per image when the audio duration cannot be read.
pub const DEFAULT_IMAGE_SECS: f64 = 2.0;

/// How long each still stays on screen.
pub fn per_image_duration(audio_secs: Option<f64>, image_count: usize) -> f64 {
    let count = image_count.max(1) as f64;
    let total = match audio_secs {
        Some(secs) if secs.is_finite() && secs >= 0.0 => secs,
        _ => DEFAULT_IMAGE_SECS * count,
    };
    (total / count).clamp(MIN_IMAGE_SECS, MAX_IMAGE_SECS)
}

fn is_jpeg(path: &Path) -> bool {
    matches!(
        crate::domain::files::extension_of(path).as_deref(),
        Some("jpg" | "jpeg")
    )
}

pub struct SlideshowSynthesizer<T> {
    runner: T,
    ffmpeg: String,
    ffprobe: String,
    timeout: Duration,
}

impl<T: ToolRunner> SlideshowSynthesizer<T> {
    pub fn new(runner: T, ffmpeg: &str, ffprobe: &str, timeout: Duration) -> Self {
        Self {
            runner,
            ffmpeg: ffmpeg.to_string(),
            ffprobe: ffprobe.to_string(),
            timeout,
        }
    }

    /// Build `out` from `images` in order. Failures are logged and reported
    /// as `false`; intermediates are removed either way.
    pub async fn synthesize(&self, images: &[PathBuf], audio: &Path, out: &Path) -> bool {
        match self.build(images, audio, out).await {
            Ok(()) => {
                info!(images = images.len(), out = ?out, "Slideshow built");
                true
            }
            Err(e) => {
                warn!(error = %e, "Slideshow synthesis failed");
                let _ = tokio::fs::remove_file(out).await;
                false
            }
        }
    }

    async fn build(&self, images: &[PathBuf], audio: &Path, out: &Path) -> Result<(), SynthesisFailed> {
        if images.is_empty() {
            return Err(failed("input", "no images"));
        }
        let parent = out.parent().unwrap_or_else(|| Path::new("."));
        // Dropped at the end of this call, taking the frame sequence with it.
        let scratch = tempfile::Builder::new()
            .prefix("slides_norm")
            .tempdir_in(parent)
            .map_err(|e| failed("workspace", e))?;

        let audio_secs = self.probe_duration(audio).await;
        let per_image = per_image_duration(audio_secs, images.len());
        let fps = 1.0 / per_image;

        for (i, image) in images.iter().enumerate() {
            let frame = scratch.path().join(format!("frame{:04}.jpg", i));
            if is_jpeg(image) {
                tokio::fs::copy(image, &frame)
                    .await
                    .map_err(|e| failed("normalize", e))?;
            } else {
                self.ffmpeg(
                    "normalize",
                    vec![
                        "-i".into(),
                        image.clone().into(),
                        "-frames:v".into(),
                        "1".into(),
                        "-q:v".into(),
                        "2".into(),
                        frame.clone().into(),
                    ],
                )
                .await?;
            }
            if !frame.is_file() {
                return Err(failed("normalize", format!("{:?} was not written", frame)));
            }
        }

        let silent = scratch.path().join("silent.mp4");
        self.ffmpeg(
            "render",
            vec![
                "-framerate".into(),
                format!("{:.4}", fps).into(),
                "-start_number".into(),
                "0".into(),
                "-i".into(),
                scratch.path().join("frame%04d.jpg").into(),
                "-c:v".into(),
                "libx264".into(),
                "-pix_fmt".into(),
                "yuv420p".into(),
                "-vf".into(),
                "scale=trunc(iw/2)*2:trunc(ih/2)*2".into(),
                "-movflags".into(),
                "+faststart".into(),
                silent.clone().into(),
            ],
        )
        .await?;

        self.ffmpeg(
            "mux",
            vec![
                "-i".into(),
                silent.into(),
                "-i".into(),
                audio.into(),
                "-c:v".into(),
                "copy".into(),
                "-c:a".into(),
                "aac".into(),
                "-b:a".into(),
                "128k".into(),
                "-shortest".into(),
                "-movflags".into(),
                "+faststart".into(),
                out.into(),
            ],
        )
        .await?;

        if !out.is_file() {
            return Err(failed("mux", "output was not written"));
        }
        Ok(())
    }

    async fn probe_duration(&self, audio: &Path) -> Option<f64> {
        let command = ToolCommand::new(&self.ffprobe, self.timeout).args([
            OsString::from("-v"),
            "error".into(),
            "-show_entries".into(),
            "format=duration".into(),
            "-of".into(),
            "default=noprint_wrappers=1:nokey=1".into(),
            audio.into(),
        ]);
        match self.runner.run(command).await {
            Ok(outcome) if outcome.success() => outcome.stdout_text().trim().parse().ok(),
            _ => None,
        }
    }

    async fn ffmpeg(&self, step: &'static str, args: Vec<OsString>) -> Result<(), SynthesisFailed> {
        let command = ToolCommand::new(&self.ffmpeg, self.timeout)
            .args(["-y", "-v", "error"])
            .args(args);
        let outcome = self.runner.run(command).await.map_err(|e| failed(step, e))?;
        if outcome.timed_out {
            return Err(failed(step, "timed out"));
        }
        if !outcome.success() {
            return Err(failed(
                step,
                format!("exit {:?}: {}", outcome.exit_code, outcome.stderr_tail(3)),
            ));
        }
        Ok(())
    }
}

fn failed(step: &'static str, reason: impl ToString) -> SynthesisFailed {
    SynthesisFailed {
        step,
        reason: reason.to_string(),
    }
}
