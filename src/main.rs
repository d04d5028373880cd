use mediagrab::adapters::delivery::OutboxDelivery;
use mediagrab::adapters::http::{router, AppState};
use mediagrab::adapters::process::ProcessRunner;
use mediagrab::application::fallback::FallbackFetcher;
use mediagrab::application::primary::PrimaryFetcher;
use mediagrab::domain::slideshow::SlideshowSynthesizer;
use mediagrab::{logging, Downloader, DownloaderOptions, Settings};
use std::sync::Arc;
use tracing::{error, info};

#[cfg(not(feature = "ffmpeg"))]
fn frame_sampler(
    runner: ProcessRunner,
    settings: &Settings,
) -> mediagrab::adapters::ffmpeg::CommandFrameSampler<ProcessRunner> {
    mediagrab::adapters::ffmpeg::CommandFrameSampler::new(
        runner,
        &settings.tools.ffmpeg,
        &settings.tools.ffprobe,
        settings.timeouts.ffmpeg,
    )
}

#[cfg(feature = "ffmpeg")]
fn frame_sampler(
    _runner: ProcessRunner,
    _settings: &Settings,
) -> mediagrab::adapters::ffmpeg::FfmpegFrameSampler {
    mediagrab::adapters::ffmpeg::FfmpegFrameSampler
}

#[tokio::main]
async fn main() {
    let settings = Settings::from_env();
    logging::init(&settings);

    let runner = ProcessRunner::new(settings.tool_workers);
    let primary = PrimaryFetcher::new(
        runner.clone(),
        &settings.tools.yt_dlp,
        settings.timeouts.yt_dlp,
    );
    let synthesizer = SlideshowSynthesizer::new(
        runner.clone(),
        &settings.tools.ffmpeg,
        &settings.tools.ffprobe,
        settings.timeouts.ffmpeg,
    );
    let fallback = FallbackFetcher::new(
        runner.clone(),
        synthesizer,
        &settings.tools.gallery_dl,
        settings.timeouts.gallery_dl,
        settings.size_limit_bytes,
    );
    let downloader = Downloader::new(
        primary,
        fallback,
        frame_sampler(runner, &settings),
        OutboxDelivery::new(settings.outbox_dir.clone()),
        DownloaderOptions::from(&settings),
    );

    let app = router(AppState::new(
        Arc::new(downloader),
        settings.max_concurrent_requests,
    ));
    let listener =
        match tokio::net::TcpListener::bind(format!("{}:{}", settings.addr, settings.port)).await {
            Ok(listener) => listener,
            Err(e) => {
                error!("Failed to bind TCP listener: {}", e);
                return;
            }
        };
    info!("Listening at {}:{}", settings.addr, settings.port);
    if let Err(e) = axum::serve(listener, app).await {
        error!("Server stopped: {}", e);
    }
}
