use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Determines how the artifact is delivered downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaKind {
    Video,
    Image,
    /// Multiple images sent as one group
    Album,
    /// Video synthesized from stills plus an audio track
    Slideshow,
    Other,
}

/// Outcome of one successful pipeline run.
///
/// Video and Slideshow carry exactly one file, Album one or more images.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult {
    pub source_url: String,
    pub kind: MediaKind,
    pub files: Vec<PathBuf>,
    pub title: Option<String>,
    pub duration: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl FetchResult {
    pub fn single(source_url: &str, kind: MediaKind, file: PathBuf) -> Self {
        Self {
            source_url: source_url.to_string(),
            kind,
            files: vec![file],
            title: None,
            duration: None,
            width: None,
            height: None,
        }
    }

    /// One image becomes `Image`, several become an `Album`.
    pub fn images(source_url: &str, files: Vec<PathBuf>) -> Self {
        let kind = if files.len() == 1 {
            MediaKind::Image
        } else {
            MediaKind::Album
        };
        Self {
            source_url: source_url.to_string(),
            kind,
            files,
            title: None,
            duration: None,
            width: None,
            height: None,
        }
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }

    /// File-count invariant for the kind, and every file present on disk.
    pub fn is_deliverable(&self) -> bool {
        let count_ok = match self.kind {
            MediaKind::Video | MediaKind::Slideshow | MediaKind::Image => self.files.len() == 1,
            MediaKind::Album | MediaKind::Other => !self.files.is_empty(),
        };
        count_ok && self.files.iter().all(|f| f.is_file())
    }

    /// Largest file size in bytes, `None` if any file cannot be stat'ed.
    pub fn largest_file_size(&self) -> Option<u64> {
        self.files
            .iter()
            .map(|f| std::fs::metadata(f).ok().map(|m| m.len()))
            .try_fold(0u64, |acc, size| size.map(|s| acc.max(s)))
    }
}

/// Serialized form of a [`FetchResult`] kept by the result cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub kind: MediaKind,
    pub files: Vec<String>,
    pub title: Option<String>,
    pub duration: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl From<&FetchResult> for CacheEntry {
    fn from(result: &FetchResult) -> Self {
        Self {
            kind: result.kind,
            files: result
                .files
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect(),
            title: result.title.clone(),
            duration: result.duration,
            width: result.width,
            height: result.height,
        }
    }
}

impl CacheEntry {
    /// Rebuild the result; `None` once any referenced file is gone.
    pub fn hydrate(&self, source_url: &str) -> Option<FetchResult> {
        let files: Vec<PathBuf> = self.files.iter().map(PathBuf::from).collect();
        if files.is_empty() || !files.iter().all(|f| f.is_file()) {
            return None;
        }
        Some(FetchResult {
            source_url: source_url.to_string(),
            kind: self.kind,
            files,
            title: self.title.clone(),
            duration: self.duration,
            width: self.width,
            height: self.height,
        })
    }
}
