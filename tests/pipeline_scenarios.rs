//! End-to-end runs of the downloader over the real fetchers, sampler and
//! outbox, with the external programs replaced by a scripted runner.

use async_trait::async_trait;
use mediagrab::adapters::delivery::OutboxDelivery;
use mediagrab::adapters::ffmpeg::CommandFrameSampler;
use mediagrab::adapters::progress::TranscriptProgress;
use mediagrab::application::fallback::FallbackFetcher;
use mediagrab::application::primary::PrimaryFetcher;
use mediagrab::domain::classify::FallbackPurpose;
use mediagrab::domain::frames::FrozenFrameSettings;
use mediagrab::domain::slideshow::SlideshowSynthesizer;
use mediagrab::domain::status;
use mediagrab::error::{FallbackError, ToolError};
use mediagrab::ports::frames::GRID_LEN;
use mediagrab::ports::pipeline::Pipeline;
use mediagrab::ports::tools::{ToolCommand, ToolOutcome, ToolRunner};
use mediagrab::{Downloader, DownloaderOptions, MediaKind, PipelineError};
use parking_lot::Mutex;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::{tempdir, TempDir};

const MB: u64 = 1024 * 1024;

#[derive(Clone, Copy)]
enum YtDlp {
    /// Writes a video of this many bytes at the `-o` template
    Video(u64),
    /// Prints TikTok photo-mode metadata and exits non-zero
    PhotoPost,
    Fails,
}

#[derive(Clone, Copy)]
enum GalleryDl {
    Images(usize),
    ImagesWithAudio(usize),
    Nothing,
}

/// Stands in for yt-dlp, gallery-dl, ffprobe and ffmpeg.
#[derive(Clone)]
struct FakeTools {
    yt_dlp: YtDlp,
    gallery_dl: GalleryDl,
    frozen: bool,
    calls: Arc<Mutex<Vec<ToolCommand>>>,
}

impl FakeTools {
    fn new(yt_dlp: YtDlp, gallery_dl: GalleryDl) -> Self {
        Self {
            yt_dlp,
            gallery_dl,
            frozen: false,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn frozen(mut self) -> Self {
        self.frozen = true;
        self
    }

    fn calls_to(&self, program: &str) -> Vec<ToolCommand> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.program == program)
            .cloned()
            .collect()
    }
}

fn arg_after(command: &ToolCommand, flag: &str) -> PathBuf {
    let pos = command.args.iter().position(|a| a == flag).unwrap();
    PathBuf::from(&command.args[pos + 1])
}

fn exited(code: i32, stdout: Vec<u8>) -> ToolOutcome {
    ToolOutcome {
        exit_code: Some(code),
        stdout,
        ..Default::default()
    }
}

impl FakeTools {
    fn yt_dlp(&self, command: &ToolCommand) -> ToolOutcome {
        match self.yt_dlp {
            YtDlp::Video(bytes) => {
                let template = arg_after(command, "-o").to_string_lossy().into_owned();
                let path = template.replace("%(id)s", "clip1").replace("%(ext)s", "mp4");
                let file = std::fs::File::create(&path).unwrap();
                file.set_len(bytes).unwrap();
                let info = json!({"id": "clip1", "ext": "mp4", "title": "A clip", "duration": 30.0});
                exited(0, serde_json::to_vec(&info).unwrap())
            }
            YtDlp::PhotoPost => {
                let info = json!({
                    "_type": "playlist",
                    "extractor_key": "TikTok",
                    "webpage_url": "https://www.tiktok.com/@someone/photo/42",
                    "entries": [{"ext": "jpg"}, {"ext": "jpg"}]
                });
                exited(1, serde_json::to_vec(&info).unwrap())
            }
            YtDlp::Fails => ToolOutcome {
                exit_code: Some(1),
                stderr: b"ERROR: Unsupported URL".to_vec(),
                ..Default::default()
            },
        }
    }

    fn gallery_dl(&self, command: &ToolCommand) -> ToolOutcome {
        let dir = arg_after(command, "-D");
        let (images, audio) = match self.gallery_dl {
            GalleryDl::Images(n) => (n, false),
            GalleryDl::ImagesWithAudio(n) => (n, true),
            GalleryDl::Nothing => (0, false),
        };
        for i in 1..=images {
            std::fs::write(dir.join(format!("img{}.jpg", i)), b"jpeg").unwrap();
        }
        if audio {
            std::fs::write(dir.join("song.mp3"), b"mp3").unwrap();
        }
        if images > 0 {
            std::fs::write(dir.join("info.json"), br#"{"description": "Holiday pics"}"#).unwrap();
        }
        exited(0, Vec::new())
    }

    fn ffmpeg(&self, command: &ToolCommand) -> ToolOutcome {
        if command.has_arg("rawvideo") {
            let offset: f64 = arg_after(command, "-ss").to_string_lossy().parse().unwrap();
            let phase = if self.frozen { 0 } else { (offset / 15.0) as usize };
            let frame = (0..GRID_LEN)
                .map(|i| if (i + phase) % 2 == 0 { 200 } else { 10 })
                .collect();
            return exited(0, frame);
        }
        let out = command.args.last().unwrap();
        std::fs::write(out, b"mp4").unwrap();
        exited(0, Vec::new())
    }
}

#[async_trait]
impl ToolRunner for FakeTools {
    async fn run(&self, command: ToolCommand) -> Result<ToolOutcome, ToolError> {
        self.calls.lock().push(command.clone());
        let outcome = match command.program.as_str() {
            "yt-dlp" => self.yt_dlp(&command),
            "gallery-dl" => self.gallery_dl(&command),
            "ffprobe" => exited(0, b"30.0\n".to_vec()),
            "ffmpeg" => self.ffmpeg(&command),
            other => return Err(ToolError::NotFound(other.to_string())),
        };
        Ok(outcome)
    }
}

type Service = Downloader<
    PrimaryFetcher<FakeTools>,
    FallbackFetcher<FakeTools>,
    CommandFrameSampler<FakeTools>,
    OutboxDelivery,
>;

fn service(root: &TempDir, tools: &FakeTools, size_limit: u64) -> Service {
    let timeout = Duration::from_secs(60);
    let synthesizer = SlideshowSynthesizer::new(tools.clone(), "ffmpeg", "ffprobe", timeout);
    Downloader::new(
        PrimaryFetcher::new(tools.clone(), "yt-dlp", timeout),
        FallbackFetcher::new(tools.clone(), synthesizer, "gallery-dl", timeout, size_limit),
        CommandFrameSampler::new(tools.clone(), "ffmpeg", "ffprobe", timeout),
        OutboxDelivery::new(root.path().join("outbox")),
        DownloaderOptions {
            download_dir: root.path().join("downloads"),
            cache_dir: root.path().join("cache"),
            size_limit,
            frozen: FrozenFrameSettings::default(),
            cache_capacity: 16,
        },
    )
}

fn entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

fn manifests(root: &TempDir) -> Vec<serde_json::Value> {
    let Ok(dirs) = std::fs::read_dir(root.path().join("outbox")) else {
        return Vec::new();
    };
    dirs.map(|d| {
        let bytes = std::fs::read(d.unwrap().path().join("message.json")).unwrap();
        serde_json::from_slice(&bytes).unwrap()
    })
    .collect()
}

#[tokio::test]
async fn test_video_link_is_downloaded_checked_and_delivered() {
    let root = tempdir().unwrap();
    let tools = FakeTools::new(YtDlp::Video(2 * MB), GalleryDl::Nothing);
    let service = service(&root, &tools, 50 * MB);
    let progress = TranscriptProgress::new();

    let result = service.handle("https://vimeo.com/12345", &progress).await.unwrap();

    assert_eq!(result.kind, MediaKind::Video);
    assert_eq!(result.title.as_deref(), Some("A clip"));
    assert!(result.files[0].starts_with(root.path().join("cache")));
    assert_eq!(tools.calls_to("gallery-dl").len(), 0);
    assert_eq!(
        tools.calls_to("ffmpeg").iter().filter(|c| c.has_arg("rawvideo")).count(),
        2
    );
    let sent = manifests(&root);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["caption"], "A clip");
    assert_eq!(progress.current(), None);
}

#[tokio::test]
async fn test_direct_image_skips_primary_tool() {
    let root = tempdir().unwrap();
    let tools = FakeTools::new(YtDlp::Fails, GalleryDl::Images(1));
    let service = service(&root, &tools, 50 * MB);
    let progress = TranscriptProgress::new();

    let result = service
        .handle("https://foo.bar/pics/cat.jpg", &progress)
        .await
        .unwrap();

    assert_eq!(result.kind, MediaKind::Image);
    assert_eq!(result.files.len(), 1);
    assert!(tools.calls_to("yt-dlp").is_empty());
    assert_eq!(
        progress.lines(),
        vec![
            "🚨‼️ IMAGE LINK ALERT ‼️🚨".to_string(),
            status::using_fallback(FallbackPurpose::DirectImage),
            status::uploading(MediaKind::Image, true).to_string(),
        ]
    );
    assert_eq!(manifests(&root)[0]["caption"], "Holiday pics");
}

#[tokio::test]
async fn test_photo_post_becomes_slideshow_without_frame_checks() {
    let root = tempdir().unwrap();
    let tools = FakeTools::new(YtDlp::PhotoPost, GalleryDl::ImagesWithAudio(3));
    let service = service(&root, &tools, 50 * MB);
    let progress = TranscriptProgress::new();

    let result = service
        .handle("https://www.tiktok.com/@someone/video/42", &progress)
        .await
        .unwrap();

    assert_eq!(result.kind, MediaKind::Slideshow);
    assert_eq!(result.files.len(), 1);
    assert!(tools.calls_to("ffmpeg").iter().all(|c| !c.has_arg("rawvideo")));

    let gallery = tools.calls_to("gallery-dl");
    assert_eq!(gallery.len(), 1);
    assert!(gallery[0].has_arg("https://www.tiktok.com/@someone/photo/42"));

    let lines = progress.lines();
    assert!(lines.contains(&status::using_fallback(FallbackPurpose::Slideshow)));
    assert!(lines.contains(&status::BUILDING_SLIDESHOW.to_string()));
    assert_eq!(manifests(&root)[0]["kind"], "Slideshow");
}

#[tokio::test]
async fn test_oversized_video_is_rejected_and_removed() {
    let root = tempdir().unwrap();
    let tools = FakeTools::new(YtDlp::Video(51 * MB), GalleryDl::Nothing);
    let service = service(&root, &tools, 50 * MB);
    let progress = TranscriptProgress::new();

    let err = service
        .handle("https://vimeo.com/12345", &progress)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::SizeLimitExceeded { size, limit } if size == 51 * MB && limit == 50 * MB
    ));
    assert_eq!(entries(&root.path().join("cache")), 0);
    assert!(manifests(&root).is_empty());
    assert!(service.cache().is_empty());
    let shown = progress.current().unwrap();
    assert!(shown.contains("51.00MB"), "{}", shown);
}

#[tokio::test]
async fn test_frozen_video_gets_one_retry() {
    let root = tempdir().unwrap();
    let tools = FakeTools::new(YtDlp::Video(MB), GalleryDl::Images(2)).frozen();
    let service = service(&root, &tools, 50 * MB);
    let progress = TranscriptProgress::new();

    let err = service
        .handle("https://vimeo.com/12345", &progress)
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::FrozenContent));
    let runs = tools.calls_to("yt-dlp");
    assert_eq!(runs.len(), 2);
    assert!(arg_after(&runs[1], "-o").to_string_lossy().contains("_fallback"));
    assert!(tools.calls_to("gallery-dl").is_empty());
    assert!(progress.lines().contains(&status::FROZEN_RETRY.to_string()));
    assert!(manifests(&root).is_empty());
}

#[tokio::test]
async fn test_failed_primary_and_empty_fallback() {
    let root = tempdir().unwrap();
    let tools = FakeTools::new(YtDlp::Fails, GalleryDl::Nothing);
    let service = service(&root, &tools, 50 * MB);
    let progress = TranscriptProgress::new();

    let err = service
        .handle("https://vimeo.com/12345", &progress)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::FallbackExhausted(FallbackError::NoMedia)
    ));
    assert_eq!(tools.calls_to("yt-dlp").len(), 1);
    assert_eq!(tools.calls_to("gallery-dl").len(), 1);
    assert_eq!(
        progress.current().as_deref(),
        Some("❌ No media found via gallery-dl.")
    );
}

#[tokio::test]
async fn test_second_request_is_served_from_cache() {
    let root = tempdir().unwrap();
    let tools = FakeTools::new(YtDlp::Video(MB), GalleryDl::Nothing);
    let service = service(&root, &tools, 50 * MB);

    let first = service
        .handle("https://vimeo.com/12345", &TranscriptProgress::new())
        .await
        .unwrap();
    let second = service
        .handle("https://vimeo.com/12345", &TranscriptProgress::new())
        .await
        .unwrap();

    assert_eq!(first.files, second.files);
    assert_eq!(tools.calls_to("yt-dlp").len(), 1);
    assert_eq!(manifests(&root).len(), 2);
}
