//! Typed view over the extraction tool's JSON metadata.
//!
//! The raw document is parsed once into an [`ExtractionOutcome`]; everything
//! downstream matches on the variant instead of poking at the JSON again.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Extractors known to return photo-mode posts as playlists of images.
pub const SLIDESHOW_EXTRACTORS: &[&str] = &["TikTok", "Instagram"];

const IMAGE_ENTRY_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

static TEMPLATE_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"%\((\w+)\)(?:\.(\d+))?s").expect("valid template regex"));

/// Fields of a single downloaded item used by the pipeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoInfo {
    pub id: Option<String>,
    pub ext: Option<String>,
    pub title: Option<String>,
    pub duration: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Final path reported by the tool, when it reports one
    pub filepath: Option<String>,
}

impl VideoInfo {
    fn from_value(v: &Value) -> Self {
        let filepath = v
            .get("requested_downloads")
            .and_then(Value::as_array)
            .and_then(|d| d.first())
            .and_then(|d| d.get("filepath"))
            .or_else(|| v.get("filepath"))
            .or_else(|| v.get("_filename"))
            .and_then(Value::as_str)
            .map(String::from);

        Self {
            id: v.get("id").and_then(scalar_string),
            ext: str_field(v, "ext"),
            title: str_field(v, "title"),
            duration: v.get("duration").and_then(Value::as_f64),
            width: v.get("width").and_then(Value::as_u64).map(|w| w as u32),
            height: v.get("height").and_then(Value::as_u64).map(|h| h as u32),
            filepath,
        }
    }

    /// Expand an output template the way the extraction tool does for the
    /// fields it knows; `ext` overrides the reported extension.
    pub fn render_template(&self, template: &str, ext: Option<&str>) -> String {
        TEMPLATE_FIELD
            .replace_all(template, |caps: &regex::Captures| {
                let value = match &caps[1] {
                    "id" => self.id.clone(),
                    "ext" => ext.map(String::from).or_else(|| self.ext.clone()),
                    "title" => self.title.clone(),
                    _ => None,
                }
                .unwrap_or_else(|| "NA".to_string());
                match caps.get(2).and_then(|p| p.as_str().parse::<usize>().ok()) {
                    Some(precision) => value.chars().take(precision).collect(),
                    None => value,
                }
            })
            .into_owned()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionOutcome {
    SingleVideo(VideoInfo),
    /// Every non-null entry is an image
    PlaylistOfImages {
        extractor: Option<String>,
        webpage_url: Option<String>,
        entries: usize,
    },
    PlaylistOfVideos {
        extractor: Option<String>,
        entries: Vec<VideoInfo>,
    },
    Unrecognized,
}

impl ExtractionOutcome {
    pub fn parse(raw: &Value) -> Self {
        let Some(obj) = raw.as_object() else {
            return ExtractionOutcome::Unrecognized;
        };

        let extractor = str_field(raw, "extractor_key");
        if obj.get("_type").and_then(Value::as_str) == Some("playlist") {
            let entries: Vec<&Value> = obj
                .get("entries")
                .and_then(Value::as_array)
                .map(|e| e.iter().filter(|v| v.is_object()).collect())
                .unwrap_or_default();

            let images = entries.iter().filter(|e| is_image_entry(e)).count();
            if images > 0 && images == entries.len() {
                return ExtractionOutcome::PlaylistOfImages {
                    extractor,
                    webpage_url: str_field(raw, "webpage_url")
                        .or_else(|| str_field(raw, "original_url")),
                    entries: images,
                };
            }
            if entries.is_empty() {
                return ExtractionOutcome::Unrecognized;
            }
            return ExtractionOutcome::PlaylistOfVideos {
                extractor,
                entries: entries.into_iter().map(VideoInfo::from_value).collect(),
            };
        }

        if obj.contains_key("id") || obj.contains_key("ext") {
            return ExtractionOutcome::SingleVideo(VideoInfo::from_value(raw));
        }
        ExtractionOutcome::Unrecognized
    }

    /// Photo-mode post from a platform known to emit them.
    pub fn is_slideshow(&self) -> bool {
        match self {
            ExtractionOutcome::PlaylistOfImages { extractor, .. } => extractor
                .as_deref()
                .is_some_and(|e| SLIDESHOW_EXTRACTORS.contains(&e)),
            _ => false,
        }
    }

    /// Info of the item the download file should belong to.
    pub fn primary_info(&self) -> Option<&VideoInfo> {
        match self {
            ExtractionOutcome::SingleVideo(info) => Some(info),
            ExtractionOutcome::PlaylistOfVideos { entries, .. } => entries.first(),
            _ => None,
        }
    }
}

fn is_image_entry(entry: &Value) -> bool {
    entry
        .get("ext")
        .and_then(Value::as_str)
        .map(|ext| IMAGE_ENTRY_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn str_field(v: &Value, key: &str) -> Option<String> {
    v.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn scalar_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_single_video() {
        let raw = json!({
            "id": "abc123",
            "ext": "mp4",
            "title": "A clip",
            "duration": 12.5,
            "width": 720,
            "height": 1280,
            "extractor_key": "Youtube"
        });
        match ExtractionOutcome::parse(&raw) {
            ExtractionOutcome::SingleVideo(info) => {
                assert_eq!(info.id.as_deref(), Some("abc123"));
                assert_eq!(info.ext.as_deref(), Some("mp4"));
                assert_eq!(info.duration, Some(12.5));
                assert_eq!(info.height, Some(1280));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_tiktok_photo_playlist_is_slideshow() {
        let raw = json!({
            "_type": "playlist",
            "extractor_key": "TikTok",
            "webpage_url": "https://www.tiktok.com/@u/photo/1",
            "entries": [{"ext": "jpg"}, null, {"ext": "webp"}]
        });
        let outcome = ExtractionOutcome::parse(&raw);
        assert!(outcome.is_slideshow());
        assert!(matches!(
            outcome,
            ExtractionOutcome::PlaylistOfImages { entries: 2, .. }
        ));
    }

    #[test]
    fn test_image_playlist_from_other_site_is_not_slideshow() {
        let raw = json!({
            "_type": "playlist",
            "extractor_key": "Imgur",
            "entries": [{"ext": "png"}]
        });
        let outcome = ExtractionOutcome::parse(&raw);
        assert!(matches!(outcome, ExtractionOutcome::PlaylistOfImages { .. }));
        assert!(!outcome.is_slideshow());
    }

    #[test]
    fn test_mixed_playlist_is_videos() {
        let raw = json!({
            "_type": "playlist",
            "extractor_key": "Instagram",
            "entries": [{"id": "1", "ext": "jpg"}, {"id": "2", "ext": "mp4"}]
        });
        let outcome = ExtractionOutcome::parse(&raw);
        assert!(!outcome.is_slideshow());
        assert_eq!(
            outcome.primary_info().and_then(|i| i.id.as_deref()),
            Some("1")
        );
    }

    #[test]
    fn test_empty_playlist_and_garbage_are_unrecognized() {
        let empty = json!({"_type": "playlist", "extractor_key": "TikTok", "entries": []});
        assert_eq!(ExtractionOutcome::parse(&empty), ExtractionOutcome::Unrecognized);
        assert_eq!(ExtractionOutcome::parse(&json!([1, 2])), ExtractionOutcome::Unrecognized);
    }

    #[test]
    fn test_render_template() {
        let info = VideoInfo {
            id: Some("abc".into()),
            ext: Some("webm".into()),
            title: Some("A very long title".into()),
            ..Default::default()
        };
        assert_eq!(info.render_template("%(id)s.%(ext)s", None), "abc.webm");
        assert_eq!(info.render_template("%(id)s_fallback.%(ext)s", Some("mp4")), "abc_fallback.mp4");
        assert_eq!(info.render_template("%(title).6s-%(uploader)s", None), "A very-NA");
    }

    #[test]
    fn test_requested_download_path_is_read() {
        let raw = json!({
            "id": "x",
            "ext": "mp4",
            "requested_downloads": [{"filepath": "/tmp/ws/x.mp4"}]
        });
        let info = ExtractionOutcome::parse(&raw).primary_info().cloned().unwrap();
        assert_eq!(info.filepath.as_deref(), Some("/tmp/ws/x.mp4"));
    }
}
