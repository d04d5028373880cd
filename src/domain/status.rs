//! Status line texts shown while a link is processed.

use super::classify::FallbackPurpose;
use super::media::MediaKind;

pub const DOWNLOADING: &str = "📥 Downloading...";
pub const PROCESSING: &str = "⚙️ Processing...";
pub const FROZEN_RETRY: &str =
    "⚠️ Detected a frozen frame video. Retrying download with fallback settings...";
pub const BUILDING_SLIDESHOW: &str = "🛠️ Building slideshow video...";
pub const REPROCESSING: &str = "🔄 Reprocessing video for Telegram compatibility...";

pub fn using_fallback(purpose: FallbackPurpose) -> String {
    format!("🧩 Using gallery-dl ({})...", purpose.label())
}

pub fn uploading(kind: MediaKind, via_fallback: bool) -> &'static str {
    match (kind, via_fallback) {
        (MediaKind::Slideshow, _) => "⬆️ Uploading slideshow video...",
        (MediaKind::Image | MediaKind::Album, _) => "⬆️ Sending images (gallery-dl)...",
        (_, true) => "⬆️ Uploading video (gallery-dl)...",
        (_, false) => "⬆️ Uploading to Telegram...",
    }
}
