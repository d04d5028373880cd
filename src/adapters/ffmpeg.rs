//! Frame samplers backing the frozen-frame check.

use crate::error::{FrameSampleError, ToolError};
use crate::ports::frames::{FrameSampler, GRID_LEN, GRID_SIDE};
use crate::ports::tools::{ToolCommand, ToolRunner};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Sample offsets in seconds: `0, interval, 2*interval, ...` below `duration`.
pub fn sample_offsets(duration: Option<f64>, interval: Duration, max_samples: usize) -> Vec<f64> {
    let step = interval.as_secs_f64();
    if step <= 0.0 {
        return if max_samples > 0 { vec![0.0] } else { Vec::new() };
    }
    (0..max_samples)
        .map(|i| i as f64 * step)
        .take_while(|t| match duration {
            Some(d) => *t < d || *t == 0.0,
            None => true,
        })
        .collect()
}

/// Drives the ffmpeg CLI: one `ffprobe` for the duration, then one short
/// `ffmpeg` call per sample writing an 8x8 gray frame to stdout.
pub struct CommandFrameSampler<T> {
    runner: T,
    ffmpeg: String,
    ffprobe: String,
    timeout: Duration,
}

impl<T: ToolRunner> CommandFrameSampler<T> {
    pub fn new(runner: T, ffmpeg: &str, ffprobe: &str, timeout: Duration) -> Self {
        Self {
            runner,
            ffmpeg: ffmpeg.to_string(),
            ffprobe: ffprobe.to_string(),
            timeout,
        }
    }

    async fn duration(&self, video: &Path) -> Result<Option<f64>, FrameSampleError> {
        let command = ToolCommand::new(&self.ffprobe, self.timeout).args([
            OsString::from("-v"),
            "error".into(),
            "-show_entries".into(),
            "format=duration".into(),
            "-of".into(),
            "default=noprint_wrappers=1:nokey=1".into(),
            video.into(),
        ]);
        let outcome = self.runner.run(command).await.map_err(unavailable)?;
        if !outcome.success() {
            return Err(FrameSampleError::Unreadable(outcome.stderr_tail(2)));
        }
        Ok(outcome.stdout_text().trim().parse().ok())
    }
}

fn unavailable(e: ToolError) -> FrameSampleError {
    FrameSampleError::Unavailable(e.to_string())
}

#[async_trait]
impl<T: ToolRunner> FrameSampler for CommandFrameSampler<T> {
    async fn sample_gray(
        &self,
        video: &Path,
        interval: Duration,
        max_samples: usize,
    ) -> Result<Vec<Vec<u8>>, FrameSampleError> {
        let duration = self.duration(video).await?;
        let scale = format!("scale={}:{},format=gray", GRID_SIDE, GRID_SIDE);

        let mut grids = Vec::new();
        for offset in sample_offsets(duration, interval, max_samples) {
            let command = ToolCommand::new(&self.ffmpeg, self.timeout).args([
                OsString::from("-v"),
                "error".into(),
                "-ss".into(),
                format!("{:.3}", offset).into(),
                "-i".into(),
                video.into(),
                "-frames:v".into(),
                "1".into(),
                "-vf".into(),
                scale.clone().into(),
                "-f".into(),
                "rawvideo".into(),
                "-".into(),
            ]);
            let outcome = self.runner.run(command).await.map_err(unavailable)?;
            if outcome.success() && outcome.stdout.len() == GRID_LEN {
                grids.push(outcome.stdout);
            } else {
                debug!(offset, bytes = outcome.stdout.len(), "Frame sample skipped");
            }
        }
        Ok(grids)
    }
}

#[cfg(feature = "ffmpeg")]
pub use self::native::FfmpegFrameSampler;

#[cfg(feature = "ffmpeg")]
mod native {
    use super::sample_offsets;
    use crate::error::FrameSampleError;
    use crate::ports::frames::{FrameSampler, GRID_SIDE};
    use async_trait::async_trait;
    use ffmpeg_next as ffmpeg;
    use std::path::Path;
    use std::time::Duration;

    /// Microseconds, the unit of container-level timestamps.
    const AV_TIME_BASE: f64 = 1_000_000.0;

    /// In-process decoding with ffmpeg-next on a blocking thread.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct FfmpegFrameSampler;

    #[async_trait]
    impl FrameSampler for FfmpegFrameSampler {
        async fn sample_gray(
            &self,
            video: &Path,
            interval: Duration,
            max_samples: usize,
        ) -> Result<Vec<Vec<u8>>, FrameSampleError> {
            let video = video.to_path_buf();
            tokio::task::spawn_blocking(move || decode_samples(&video, interval, max_samples))
                .await
                .map_err(|e| FrameSampleError::Unavailable(e.to_string()))?
        }
    }

    fn unreadable(e: ffmpeg::Error) -> FrameSampleError {
        FrameSampleError::Unreadable(e.to_string())
    }

    fn decode_samples(
        video: &Path,
        interval: Duration,
        max_samples: usize,
    ) -> Result<Vec<Vec<u8>>, FrameSampleError> {
        ffmpeg::init().map_err(|e| FrameSampleError::Unavailable(e.to_string()))?;

        let mut ictx = ffmpeg::format::input(&video).map_err(unreadable)?;
        let input_stream = ictx
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or(ffmpeg::Error::StreamNotFound)
            .map_err(unreadable)?;
        let stream_index = input_stream.index();

        let context_decoder =
            ffmpeg::codec::context::Context::from_parameters(input_stream.parameters())
                .map_err(unreadable)?;
        let mut decoder = context_decoder.decoder().video().map_err(unreadable)?;

        let mut scaler = ffmpeg::software::scaling::context::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::format::Pixel::GRAY8,
            GRID_SIDE,
            GRID_SIDE,
            ffmpeg::software::scaling::flag::Flags::AREA,
        )
        .map_err(unreadable)?;

        let duration = match ictx.duration() {
            d if d > 0 => Some(d as f64 / AV_TIME_BASE),
            _ => None,
        };

        let mut grids = Vec::new();
        let mut decoded = ffmpeg::util::frame::Video::empty();
        let mut gray = ffmpeg::util::frame::Video::empty();
        for offset in sample_offsets(duration, interval, max_samples) {
            let ts = (offset * AV_TIME_BASE) as i64;
            if ictx.seek(ts, ..ts).is_err() {
                continue;
            }
            decoder.flush();

            let mut got_frame = false;
            for (stream, packet) in ictx.packets() {
                if stream.index() != stream_index {
                    continue;
                }
                if decoder.send_packet(&packet).is_err() {
                    continue;
                }
                if decoder.receive_frame(&mut decoded).is_ok() {
                    got_frame = true;
                    break;
                }
            }
            if !got_frame || scaler.run(&decoded, &mut gray).is_err() {
                continue;
            }

            let stride = gray.stride(0);
            let data = gray.data(0);
            let side = GRID_SIDE as usize;
            let mut grid = Vec::with_capacity(side * side);
            for row in 0..side {
                grid.extend_from_slice(&data[row * stride..row * stride + side]);
            }
            grids.push(grid);
        }
        Ok(grids)
    }
}
