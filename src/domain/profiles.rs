//! Profile catalog: named yt-dlp invocation bundles.

use std::ffi::OsString;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

const FORMAT_720P_MP4: &str = "bestvideo[ext=mp4][height<=720]+bestaudio[ext=m4a]/best[ext=mp4]/best";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileName {
    Default,
    Shorts,
    Instagram,
    Fallback,
    TelegramReprocess,
}

impl ProfileName {
    pub const ALL: [ProfileName; 5] = [
        ProfileName::Default,
        ProfileName::Shorts,
        ProfileName::Instagram,
        ProfileName::Fallback,
        ProfileName::TelegramReprocess,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileName::Default => "default",
            ProfileName::Shorts => "shorts",
            ProfileName::Instagram => "instagram",
            ProfileName::Fallback => "fallback",
            ProfileName::TelegramReprocess => "telegram-reprocess",
        }
    }
}

impl fmt::Display for ProfileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProfileName::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown profile `{}`", s))
    }
}

/// Immutable extraction-tool configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub name: ProfileName,
    /// yt-dlp `-f` expression
    pub format: String,
    /// Output template, relative to the run's workspace
    pub output_template: String,
    pub merge_output_format: String,
    /// Re-encode arguments handed to the ffmpeg post-processor
    pub postprocessor_args: Vec<String>,
    pub extractor_args: Option<String>,
    /// Container the post-processor converts to
    pub recode_video: Option<String>,
}

impl Profile {
    pub fn named(name: ProfileName) -> Self {
        match name {
            ProfileName::Default => Self {
                name,
                format: FORMAT_720P_MP4.to_string(),
                output_template: "%(id)s.%(ext)s".to_string(),
                merge_output_format: "mp4".to_string(),
                postprocessor_args: x264_args("28", &[]),
                extractor_args: Some("youtube:skip_dash_manifest".to_string()),
                recode_video: Some("mp4".to_string()),
            },
            ProfileName::Shorts => Self {
                name,
                format: FORMAT_720P_MP4.to_string(),
                output_template: "%(id)s.%(ext)s".to_string(),
                merge_output_format: "mp4".to_string(),
                postprocessor_args: x264_args("28", &["-c:a", "aac", "-b:a", "128k"]),
                extractor_args: None,
                recode_video: Some("mp4".to_string()),
            },
            ProfileName::Instagram => Self {
                name,
                format: "bestvideo+bestaudio/best".to_string(),
                output_template: "%(id)s.%(ext)s".to_string(),
                merge_output_format: "mp4".to_string(),
                postprocessor_args: x264_args("28", &["-c:a", "aac", "-b:a", "128k"]),
                extractor_args: None,
                recode_video: Some("mp4".to_string()),
            },
            ProfileName::Fallback => Self {
                name,
                format: "best[ext=mp4]/best".to_string(),
                output_template: "%(id)s_fallback.%(ext)s".to_string(),
                merge_output_format: "mp4".to_string(),
                postprocessor_args: Vec::new(),
                extractor_args: None,
                recode_video: Some("mp4".to_string()),
            },
            ProfileName::TelegramReprocess => Self {
                name,
                format: FORMAT_720P_MP4.to_string(),
                output_template: "%(id)s_telegram.%(ext)s".to_string(),
                merge_output_format: "mp4".to_string(),
                postprocessor_args: x264_args(
                    "26",
                    &["-c:a", "aac", "-b:a", "128k", "-vf", "scale='min(720,iw)':-2"],
                ),
                extractor_args: None,
                recode_video: Some("mp4".to_string()),
            },
        }
    }

    /// Extension the output template is expected to end up with.
    pub fn declared_extension(&self) -> &str {
        self.recode_video
            .as_deref()
            .unwrap_or(&self.merge_output_format)
    }

    /// yt-dlp arguments for a download that also prints the info JSON.
    pub fn to_args(&self, workspace: &Path, url: &str) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--no-simulate".into(),
            "--dump-single-json".into(),
            "--no-progress".into(),
            "--no-warnings".into(),
            "--no-playlist".into(),
            "-f".into(),
            self.format.clone().into(),
            "-o".into(),
            workspace.join(&self.output_template).into_os_string(),
            "--merge-output-format".into(),
            self.merge_output_format.clone().into(),
        ];
        if let Some(container) = &self.recode_video {
            args.push("--remux-video".into());
            args.push(container.clone().into());
        }
        if let Some(extractor_args) = &self.extractor_args {
            args.push("--extractor-args".into());
            args.push(extractor_args.clone().into());
        }
        if !self.postprocessor_args.is_empty() {
            args.push("--postprocessor-args".into());
            args.push(format!("ffmpeg:{}", self.postprocessor_args.join(" ")).into());
        }
        args.push("--add-metadata".into());
        args.push(url.into());
        args
    }
}

fn x264_args(crf: &str, extra: &[&str]) -> Vec<String> {
    let mut args = vec!["-c:v", "libx264", "-preset", "medium", "-crf", crf];
    args.extend_from_slice(extra);
    args.extend_from_slice(&["-pix_fmt", "yuv420p", "-movflags", "+faststart"]);
    args.into_iter().map(String::from).collect()
}
