//! Cheap URL-pattern predicates used to pick the initial route.
//!
//! None of this touches the network, and none of it is authoritative: the
//! primary fetch re-checks the real metadata and may still hand off to the
//! fallback.

use super::profiles::ProfileName;
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static URL_IN_TEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://[^\s/$.?#]\S*").expect("valid url regex"));

static SHORT_FORM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:https?://)?(?:www\.)?(?:m\.)?(?:youtube\.com/(?:watch\?v=|shorts/)|youtu\.be/)[a-zA-Z0-9_-]{11}",
    )
    .expect("valid short-form regex")
});

static TIKTOK_PHOTO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"tiktok\.com/@[^/]+/photo/\d+").expect("valid tiktok regex"));

static VIDEO_HOST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[/.])(?:youtube|youtu|vimeo|tiktok|instagram|twitter|x|facebook|fb|snapchat|reddit)\.")
        .expect("valid video host regex")
});

const SLIDESHOW_HOSTS: &[&str] = &["tiktok.com", "instagram.com"];
const INSTAGRAM_HOSTS: &[&str] = &["instagram.com", "instagr.am"];
const DIRECT_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp", "tiff"];

/// Why the fallback tool was chosen; shown in the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackPurpose {
    /// Primary tool reported a photo-mode post
    Slideshow,
    /// Primary tool failed
    Recovery,
    TikTokPhoto,
    DirectImage,
}

impl FallbackPurpose {
    pub fn label(&self) -> &'static str {
        match self {
            FallbackPurpose::Slideshow => "slideshow",
            FallbackPurpose::Recovery => "fallback",
            FallbackPurpose::TikTokPhoto => "tiktok photo",
            FallbackPurpose::DirectImage => "image",
        }
    }
}

/// First stage of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Primary(ProfileName),
    Fallback(FallbackPurpose),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UrlSignals {
    pub short_form: bool,
    pub slideshow_platform: bool,
    pub tiktok_photo: bool,
    pub instagram: bool,
    pub direct_image: bool,
    pub video_host: bool,
}

impl UrlSignals {
    pub fn route(&self) -> Route {
        if self.tiktok_photo {
            Route::Fallback(FallbackPurpose::TikTokPhoto)
        } else if self.direct_image {
            Route::Fallback(FallbackPurpose::DirectImage)
        } else if self.short_form {
            Route::Primary(ProfileName::Shorts)
        } else if self.instagram {
            Route::Primary(ProfileName::Instagram)
        } else {
            Route::Primary(ProfileName::Default)
        }
    }

    /// First status line shown for a link.
    pub fn alert_text(&self) -> &'static str {
        if self.tiktok_photo {
            "🚨‼️ TIKTOK PHOTO ALERT ‼️🚨"
        } else if self.direct_image {
            "🚨‼️ IMAGE LINK ALERT ‼️🚨"
        } else {
            "🚨‼️ LINK ALERT ‼️🚨"
        }
    }
}

pub fn classify(url: &str) -> UrlSignals {
    let host = Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
        .unwrap_or_default();

    UrlSignals {
        short_form: is_short_form(url),
        slideshow_platform: host_matches(&host, SLIDESHOW_HOSTS),
        tiktok_photo: TIKTOK_PHOTO.is_match(url),
        instagram: host_matches(&host, INSTAGRAM_HOSTS),
        direct_image: is_direct_image(url),
        video_host: VIDEO_HOST.is_match(url) || url.contains("/video") || url.contains("?video"),
    }
}

pub fn is_short_form(url: &str) -> bool {
    SHORT_FORM.is_match(url)
}

/// Judged by the path's extension, ignoring query and fragment.
pub fn is_direct_image(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let last = path.trim_end_matches('/').rsplit('/').next().unwrap_or("");
    match last.rsplit_once('.') {
        Some((_, ext)) => DIRECT_IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()),
        None => false,
    }
}

/// First http(s) link in a chat message.
pub fn extract_url(text: &str) -> Option<&str> {
    URL_IN_TEXT.find(text).map(|m| m.as_str())
}

/// Only http(s) URLs with a host are fetched.
pub fn validate_url(url: &str) -> Option<Url> {
    let parsed = Url::parse(url).ok()?;
    let scheme_ok = matches!(parsed.scheme(), "http" | "https");
    let host_ok = parsed.host_str().is_some_and(|h| !h.is_empty());
    (scheme_ok && host_ok).then_some(parsed)
}

fn host_matches(host: &str, domains: &[&str]) -> bool {
    domains
        .iter()
        .any(|d| host == *d || host.ends_with(&format!(".{}", d)))
}
