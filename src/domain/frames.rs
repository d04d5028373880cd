//! Frozen-frame detection.
//!
//! Catches extraction tools that silently hand back a placeholder clip: if
//! every sampled frame reduces to the same average hash, the video is
//! treated as frozen.

use crate::ports::frames::{FrameSampler, GRID_LEN, GRID_SIDE};
use image::{DynamicImage, GrayImage};
use image_hasher::{HashAlg, HasherConfig, ImageHash};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// Mean (average) hash of an 8x8 gray grid, `None` for a grid of the wrong size.
pub fn average_hash(gray: &[u8]) -> Option<ImageHash> {
    if gray.len() != GRID_LEN {
        return None;
    }
    let grid = GrayImage::from_raw(GRID_SIDE, GRID_SIDE, gray.to_vec())?;
    let hasher = HasherConfig::new()
        .hash_alg(HashAlg::Mean)
        .hash_size(GRID_SIDE, GRID_SIDE)
        .to_hasher();
    Some(hasher.hash_image(&DynamicImage::ImageLuma8(grid)))
}

/// At least two hashes, all bit-identical.
pub fn all_identical(hashes: &[ImageHash]) -> bool {
    match hashes.split_first() {
        Some((first, rest)) if !rest.is_empty() => rest.iter().all(|h| h == first),
        _ => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrozenFrameSettings {
    pub interval: Duration,
    pub max_samples: usize,
}

impl Default for FrozenFrameSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(15),
            max_samples: 5,
        }
    }
}

pub struct FrozenFrameDetector<S> {
    sampler: S,
    settings: FrozenFrameSettings,
}

impl<S: FrameSampler> FrozenFrameDetector<S> {
    pub fn new(sampler: S, settings: FrozenFrameSettings) -> Self {
        Self { sampler, settings }
    }

    pub fn sampler(&self) -> &S {
        &self.sampler
    }

    /// Never fails: an unusable backend or file counts as not frozen.
    pub async fn is_frozen(&self, video: &Path) -> bool {
        let grids = match self
            .sampler
            .sample_gray(video, self.settings.interval, self.settings.max_samples)
            .await
        {
            Ok(grids) => grids,
            Err(e) => {
                warn!(error = %e, path = ?video, "Skipping frozen frame check");
                return false;
            }
        };

        let hashes: Vec<ImageHash> = grids.iter().filter_map(|g| average_hash(g)).collect();
        let frozen = all_identical(&hashes);
        debug!(samples = hashes.len(), frozen, "Frozen frame check done");
        frozen
    }
}
