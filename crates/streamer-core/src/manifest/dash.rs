//! DASH MPD probe
//!
//! Classifies AdaptationSets by `contentType`/`mimeType` (falling back to the
//! first Representation's `mimeType` and `codecs`). Simple attribute scanning
//! is enough here; representations and segment templates are the engine's
//! business.

use super::{elements, extract_attr, ManifestInfo, MediaTrack};
use crate::{
    error::Error,
    types::{ContentType, TrackKind},
    Result,
};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Probe an MPD document
pub fn probe_mpd(content: &str, base_url: &Url) -> Result<ManifestInfo> {
    let Some(root) = elements(content, "MPD").into_iter().next() else {
        return Err(Error::ManifestParse("Missing MPD root element".to_string()));
    };
    let (mpd_attrs, _) = root;

    let mut info = ManifestInfo::empty(ContentType::Dash);
    info.is_live = extract_attr(mpd_attrs, "type").as_deref() == Some("dynamic");
    info.duration = extract_attr(mpd_attrs, "mediaPresentationDuration")
        .and_then(|d| parse_iso8601_duration(&d));
    info.protected = content.contains("<ContentProtection");
    info.has_video = false;

    let mut audio_sets = Vec::new();
    for (idx, (attrs, body)) in elements(content, "AdaptationSet").into_iter().enumerate() {
        let id = extract_attr(attrs, "id").unwrap_or_else(|| format!("set_{}", idx));
        let language = extract_attr(attrs, "lang");

        match adaptation_kind(attrs, body) {
            Some(TrackKind::Video) => {
                info.has_video = true;
                info.variant_count += elements(body, "Representation").len().max(1);
            }
            Some(kind @ (TrackKind::Audio | TrackKind::Text)) => {
                let track = MediaTrack {
                    kind,
                    id,
                    uri: base_url.clone(),
                    language,
                };
                if kind == TrackKind::Audio {
                    audio_sets.push((is_main_role(body), track));
                } else {
                    info.subtitle_tracks.push(track);
                }
            }
            _ => {}
        }
    }

    // The main-role set (or else the first) plays with the main stream
    let main = audio_sets.iter().position(|(main, _)| *main).unwrap_or(0);
    info.audio_tracks = audio_sets
        .into_iter()
        .enumerate()
        .filter(|(idx, _)| *idx != main)
        .map(|(_, (_, track))| track)
        .collect();

    debug!(
        live = info.is_live,
        audio = info.audio_tracks.len(),
        subtitles = info.subtitle_tracks.len(),
        "MPD probed"
    );

    Ok(info)
}

fn adaptation_kind(attrs: &str, body: &str) -> Option<TrackKind> {
    if let Some(content_type) = extract_attr(attrs, "contentType") {
        return kind_from_type(&content_type);
    }

    let representation = elements(body, "Representation").into_iter().next();
    let mime = extract_attr(attrs, "mimeType")
        .or_else(|| representation.and_then(|(a, _)| extract_attr(a, "mimeType")));
    let codecs = extract_attr(attrs, "codecs")
        .or_else(|| representation.and_then(|(a, _)| extract_attr(a, "codecs")))
        .unwrap_or_default();

    match mime.as_deref() {
        Some(m) if m.starts_with("video/") => Some(TrackKind::Video),
        Some(m) if m.starts_with("audio/") => Some(TrackKind::Audio),
        Some(m) if m.starts_with("text/") || m == "application/ttml+xml" => Some(TrackKind::Text),
        // Fragmented-MP4 text tracks
        Some("application/mp4") if codecs.starts_with("stpp") || codecs.starts_with("wvtt") => {
            Some(TrackKind::Text)
        }
        _ => None,
    }
}

fn is_main_role(body: &str) -> bool {
    elements(body, "Role")
        .into_iter()
        .any(|(attrs, _)| extract_attr(attrs, "value").as_deref() == Some("main"))
}

fn kind_from_type(content_type: &str) -> Option<TrackKind> {
    match content_type {
        "video" => Some(TrackKind::Video),
        "audio" => Some(TrackKind::Audio),
        "text" => Some(TrackKind::Text),
        _ => None,
    }
}

/// Parse an `xs:duration` (`P1DT2H3M4.5S`).
///
/// Calendar years and months have no fixed length and are rejected, as are
/// values that do not fit a [`Duration`].
fn parse_iso8601_duration(s: &str) -> Option<Duration> {
    let rest = s.trim().strip_prefix('P')?;
    let (date, time) = rest.split_once('T').unwrap_or((rest, ""));

    let mut total_seconds = 0.0;
    for (value, unit) in components(date)? {
        total_seconds += value
            * match unit {
                'W' => 604_800.0,
                'D' => 86_400.0,
                _ => return None,
            };
    }
    for (value, unit) in components(time)? {
        total_seconds += value
            * match unit {
                'H' => 3600.0,
                'M' => 60.0,
                'S' => 1.0,
                _ => return None,
            };
    }

    if total_seconds > 0.0 {
        Duration::try_from_secs_f64(total_seconds).ok()
    } else {
        None
    }
}

/// Split `1H30M` into `[(1.0, 'H'), (30.0, 'M')]`
fn components(s: &str) -> Option<Vec<(f64, char)>> {
    let mut parsed = Vec::new();
    let mut start = 0;
    for (idx, c) in s.char_indices() {
        if c.is_ascii_alphabetic() {
            parsed.push((s[start..idx].parse::<f64>().ok()?, c));
            start = idx + c.len_utf8();
        }
    }
    (start == s.len()).then_some(parsed)
}
