use crate::error::FrameSampleError;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

/// Side of the square grayscale grid each sampled frame is reduced to.
pub const GRID_SIDE: u32 = 8;
pub const GRID_LEN: usize = (GRID_SIDE * GRID_SIDE) as usize;

/// Decodes still frames out of a video file.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FrameSampler: Send + Sync {
    /// One `GRID_LEN`-byte gray grid per sample, taken every `interval` of
    /// source time starting at zero, at most `max_samples` of them.
    ///
    /// Samples that cannot be decoded are skipped, so fewer grids than
    /// requested is not an error.
    async fn sample_gray(
        &self,
        video: &Path,
        interval: Duration,
        max_samples: usize,
    ) -> Result<Vec<Vec<u8>>, FrameSampleError>;
}
