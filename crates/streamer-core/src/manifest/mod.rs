//! Manifest probing for HLS, DASH and SmoothStreaming
//!
//! Reads only what renderer selection needs: which alternate audio and
//! subtitle renditions exist, whether there is video, liveness, duration and
//! content protection. Segment scheduling stays with the media engine.

mod dash;
mod hls;
mod smooth;

pub use dash::probe_mpd;
pub use hls::probe_playlist;
pub use smooth::probe_smooth_manifest;

use crate::{error::Error, types::{ContentType, TrackKind}, Result};
use serde::Serialize;
use std::time::Duration;
use url::Url;

/// A rendition advertised next to the main stream
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaTrack {
    /// Audio or text
    pub kind: TrackKind,
    /// Group/adaptation-set/stream-index identifier
    pub id: String,
    /// Where the rendition is loaded from
    pub uri: Url,
    /// Language code, if declared
    pub language: Option<String>,
}

/// What a manifest probe found
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManifestInfo {
    /// Protocol family of the manifest
    pub content_type: ContentType,
    /// Is this a live presentation
    pub is_live: bool,
    /// Total duration (for VOD)
    pub duration: Option<Duration>,
    /// Whether any video track is declared
    pub has_video: bool,
    /// Number of main-stream variants/representations
    pub variant_count: usize,
    /// Alternate audio renditions
    pub audio_tracks: Vec<MediaTrack>,
    /// Subtitle renditions
    pub subtitle_tracks: Vec<MediaTrack>,
    /// Content protection declared
    pub protected: bool,
}

impl ManifestInfo {
    pub(crate) fn empty(content_type: ContentType) -> Self {
        Self {
            content_type,
            is_live: false,
            duration: None,
            has_video: true,
            variant_count: 0,
            audio_tracks: Vec::new(),
            subtitle_tracks: Vec::new(),
            protected: false,
        }
    }

    pub fn has_alternate_audio(&self) -> bool {
        !self.audio_tracks.is_empty()
    }

    pub fn has_subtitles(&self) -> bool {
        !self.subtitle_tracks.is_empty()
    }
}

/// Probe a fetched manifest of the given type
pub fn probe(content_type: ContentType, body: &[u8], base_url: &Url) -> Result<ManifestInfo> {
    match content_type {
        ContentType::Hls => probe_playlist(body, base_url),
        ContentType::Dash => probe_mpd(as_text(body)?, base_url),
        ContentType::SmoothStreaming => probe_smooth_manifest(as_text(body)?, base_url),
        ContentType::Progressive => Err(Error::ManifestParse(
            "Progressive sources have no manifest".to_string(),
        )),
    }
}

fn as_text(body: &[u8]) -> Result<&str> {
    let text = std::str::from_utf8(body)
        .map_err(|e| Error::ManifestParse(format!("Manifest is not UTF-8: {}", e)))?;
    Ok(text.trim_start_matches('\u{feff}'))
}

/// Extract attribute value from an XML attributes string
pub(crate) fn extract_attr(attrs: &str, name: &str) -> Option<String> {
    let pattern = format!("{}=\"", name);
    let mut search_from = 0;
    while let Some(found) = attrs[search_from..].find(&pattern) {
        let start = search_from + found;
        // Require a word boundary so `Type` does not match `SubType`
        let boundary = start == 0
            || attrs[..start]
                .chars()
                .next_back()
                .map_or(true, |c| c.is_whitespace());
        let value_start = start + pattern.len();
        if boundary {
            let end = attrs[value_start..].find('"')?;
            return Some(attrs[value_start..value_start + end].to_string());
        }
        search_from = value_start;
    }
    None
}

/// Split `content` into the bodies of every `<tag ...>...</tag>` element
pub(crate) fn elements<'a>(content: &'a str, tag: &str) -> Vec<(&'a str, &'a str)> {
    let open = format!("<{}", tag);
    let close = format!("</{}>", tag);
    let mut found = Vec::new();
    let mut rest = content;

    while let Some(start) = rest.find(&open) {
        let after = &rest[start + open.len()..];
        // Skip longer tag names sharing the prefix
        if !after.starts_with(|c: char| c.is_whitespace() || c == '>' || c == '/') {
            rest = after;
            continue;
        }
        let Some(attrs_end) = after.find('>') else { break };
        let attrs = &after[..attrs_end];
        let body_start = &after[attrs_end + 1..];
        if attrs.ends_with('/') {
            found.push((attrs, ""));
            rest = body_start;
            continue;
        }
        let body_end = body_start.find(&close).unwrap_or(body_start.len());
        found.push((attrs, &body_start[..body_end]));
        rest = &body_start[body_end..];
    }

    found
}
