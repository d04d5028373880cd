//! Workspace file listing, partitioning and caption helpers.

use serde_json::Value;
use std::cmp::Ordering;
use std::io;
use std::iter::Peekable;
use std::path::{Path, PathBuf};
use std::str::Chars;

/// Leftovers of an interrupted or in-progress tool run.
const SCRATCH_EXTENSIONS: &[&str] = &["part", "ytdl", "tmp", "temp"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: PathBuf,
    pub size: u64,
}

/// All regular files under `dir`, recursively, sorted by path.
pub fn list_files(dir: &Path) -> io::Result<Vec<FileEntry>> {
    let mut out = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in std::fs::read_dir(&current)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                pending.push(entry.path());
            } else if file_type.is_file() {
                out.push(FileEntry {
                    path: entry.path(),
                    size: entry.metadata()?.len(),
                });
            }
        }
    }
    out.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(out)
}

pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

fn has_extension(path: &Path, set: &[&str]) -> bool {
    extension_of(path).is_some_and(|e| set.contains(&e.as_str()))
}

/// Pick the file the extraction tool most likely produced.
///
/// Files with `preferred_ext` win; otherwise any non-scratch, non-JSON file.
/// Ties go to the largest file.
pub fn select_produced_file(listing: &[FileEntry], preferred_ext: Option<&str>) -> Option<PathBuf> {
    let candidates: Vec<&FileEntry> = listing
        .iter()
        .filter(|f| !has_extension(&f.path, SCRATCH_EXTENSIONS) && !has_extension(&f.path, &["json"]))
        .collect();

    let preferred: Vec<&FileEntry> = match preferred_ext {
        Some(ext) => {
            let ext = ext.trim_start_matches('.').to_ascii_lowercase();
            candidates
                .iter()
                .copied()
                .filter(|f| extension_of(&f.path).as_deref() == Some(ext.as_str()))
                .collect()
        }
        None => Vec::new(),
    };

    let pool = if preferred.is_empty() { candidates } else { preferred };
    pool.into_iter()
        .max_by(|a, b| a.size.cmp(&b.size).then_with(|| b.path.cmp(&a.path)))
        .map(|f| f.path.clone())
}

/// Extension sets used to bucket fallback output.
#[derive(Debug, Clone)]
pub struct ExtensionSets {
    pub video: Vec<String>,
    pub image: Vec<String>,
    pub audio: Vec<String>,
}

impl Default for ExtensionSets {
    fn default() -> Self {
        let own = |set: &[&str]| set.iter().map(|s| s.to_string()).collect();
        Self {
            video: own(crate::config::VIDEO_EXTENSIONS),
            image: own(crate::config::IMAGE_EXTENSIONS),
            audio: own(crate::config::AUDIO_EXTENSIONS),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partition {
    pub videos: Vec<FileEntry>,
    pub images: Vec<FileEntry>,
    pub audios: Vec<FileEntry>,
    /// JSON sidecars written by the downloader
    pub metadata: Vec<PathBuf>,
}

pub fn partition(files: &[FileEntry], sets: &ExtensionSets) -> Partition {
    let mut out = Partition::default();
    for file in files {
        let Some(ext) = extension_of(&file.path) else {
            continue;
        };
        if sets.video.contains(&ext) {
            out.videos.push(file.clone());
        } else if sets.image.contains(&ext) {
            out.images.push(file.clone());
        } else if sets.audio.contains(&ext) {
            out.audios.push(file.clone());
        } else if ext == "json" {
            out.metadata.push(file.path.clone());
        }
    }
    out
}

/// Path order that puts `img2.jpg` before `img10.jpg`.
pub fn natural_cmp(a: &Path, b: &Path) -> Ordering {
    let (left, right) = (a.to_string_lossy(), b.to_string_lossy());
    let mut l = left.chars().peekable();
    let mut r = right.chars().peekable();
    loop {
        match (l.peek().copied(), r.peek().copied()) {
            (None, None) => return left.cmp(&right),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                match take_number(&mut l).cmp(&take_number(&mut r)) {
                    Ordering::Equal => continue,
                    other => return other,
                }
            }
            (Some(x), Some(y)) => {
                l.next();
                r.next();
                if x != y {
                    return x.cmp(&y);
                }
            }
        }
    }
}

fn take_number(chars: &mut Peekable<Chars<'_>>) -> u128 {
    let mut n: u128 = 0;
    while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
        n = n.saturating_mul(10).saturating_add(d as u128);
        chars.next();
    }
    n
}

const CAPTION_FIELDS: &[&str] = &["description", "content", "caption", "title"];

/// First non-empty caption-like field, checked field by field across all
/// metadata documents.
pub fn caption_candidate(documents: &[Value]) -> Option<String> {
    CAPTION_FIELDS.iter().find_map(|field| {
        documents.iter().find_map(|doc| {
            doc.get(*field)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        })
    })
}

/// Cut to at most `limit` characters at a word boundary, appending `…`.
pub fn truncate_caption(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    if limit == 0 {
        return String::new();
    }
    let keep = limit - 1;
    let cut: String = text.chars().take(keep).collect();
    let trimmed = match cut.rfind(char::is_whitespace) {
        Some(idx) if idx > 0 => cut[..idx].trim_end(),
        _ => cut.as_str(),
    };
    format!("{}…", trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn entry(name: &str, size: u64) -> FileEntry {
        FileEntry {
            path: PathBuf::from(name),
            size,
        }
    }

    #[test]
    fn test_select_prefers_declared_extension() {
        let listing = vec![entry("a.webm", 900), entry("b.mp4", 100), entry("c.mp4", 300)];
        assert_eq!(
            select_produced_file(&listing, Some("mp4")),
            Some(PathBuf::from("c.mp4"))
        );
    }

    #[test]
    fn test_select_falls_back_to_largest_any_file() {
        let listing = vec![entry("a.webm", 900), entry("b.mkv", 100), entry("x.info.json", 5000)];
        assert_eq!(
            select_produced_file(&listing, Some("mp4")),
            Some(PathBuf::from("a.webm"))
        );
    }

    #[test]
    fn test_select_ignores_partial_downloads() {
        let listing = vec![entry("a.mp4.part", 900), entry("a.f137.ytdl", 10)];
        assert_eq!(select_produced_file(&listing, Some("mp4")), None);
        assert_eq!(select_produced_file(&[], None), None);
    }

    #[test]
    fn test_list_files_recurses() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("tiktok/user")).unwrap();
        std::fs::write(dir.path().join("tiktok/user/1.jpg"), b"123").unwrap();
        std::fs::write(dir.path().join("top.mp3"), b"1").unwrap();

        let files = list_files(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().any(|f| f.path.ends_with("tiktok/user/1.jpg") && f.size == 3));
    }

    #[test]
    fn test_partition_buckets() {
        let files = vec![
            entry("a.MP4", 1),
            entry("b.jpg", 1),
            entry("c.png", 1),
            entry("d.m4a", 1),
            entry("d.json", 1),
            entry("readme", 1),
        ];
        let p = partition(&files, &ExtensionSets::default());
        assert_eq!(p.videos.len(), 1);
        assert_eq!(p.images.len(), 2);
        assert_eq!(p.audios.len(), 1);
        assert_eq!(p.metadata, vec![PathBuf::from("d.json")]);
    }

    #[test]
    fn test_natural_order() {
        let mut names = vec![
            PathBuf::from("post_10.jpg"),
            PathBuf::from("post_2.jpg"),
            PathBuf::from("post_1.jpg"),
        ];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(
            names,
            vec![
                PathBuf::from("post_1.jpg"),
                PathBuf::from("post_2.jpg"),
                PathBuf::from("post_10.jpg")
            ]
        );
        assert_eq!(natural_cmp(Path::new("a"), Path::new("a")), Ordering::Equal);
    }

    #[test]
    fn test_caption_candidate_field_precedence() {
        let docs = vec![
            json!({"title": "Title one", "description": ""}),
            json!({"description": "  The description  "}),
        ];
        assert_eq!(caption_candidate(&docs).as_deref(), Some("The description"));
        assert_eq!(caption_candidate(&[json!({"id": 5})]), None);
    }

    #[test]
    fn test_truncate_caption_at_word_boundary() {
        let text = "one two three four";
        assert_eq!(truncate_caption(text, 100), text);
        let cut = truncate_caption(text, 10);
        assert_eq!(cut, "one two…");
        assert!(cut.chars().count() <= 10);
    }

    #[test]
    fn test_truncate_caption_without_spaces() {
        let cut = truncate_caption("abcdefghijkl", 5);
        assert_eq!(cut, "abcd…");
    }
}
