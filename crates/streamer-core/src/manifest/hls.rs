//! HLS playlist probe
//!
//! Handles both entry points:
//! - Master playlists: variants plus EXT-X-MEDIA alternate audio/subtitles
//! - Media playlists: a single rendition, live unless EXT-X-ENDLIST

use super::{ManifestInfo, MediaTrack};
use crate::{
    error::Error,
    types::{ContentType, TrackKind},
    Result,
};
use m3u8_rs::{
    AlternativeMedia, AlternativeMediaType, MasterPlaylist, MediaPlaylist, MediaSegment, Playlist,
};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Probe an HLS playlist
pub fn probe_playlist(body: &[u8], base_url: &Url) -> Result<ManifestInfo> {
    match m3u8_rs::parse_playlist_res(body) {
        Ok(Playlist::MasterPlaylist(master)) => probe_master(&master, base_url),
        Ok(Playlist::MediaPlaylist(media)) => Ok(probe_media(&media)),
        Err(e) => Err(Error::ManifestParse(format!("Failed to parse HLS playlist: {:?}", e))),
    }
}

fn probe_master(master: &MasterPlaylist, base_url: &Url) -> Result<ManifestInfo> {
    let mut info = ManifestInfo::empty(ContentType::Hls);
    info.variant_count = master.variants.iter().filter(|v| !v.is_i_frame).count();
    info.protected = !master.session_key.is_empty();

    // Audio-only ladders declare no video codec anywhere
    info.has_video = master.variants.iter().any(|v| {
        v.resolution.is_some()
            || v.codecs.as_deref().map_or(true, has_video_codec)
    });

    for alternative in &master.alternatives {
        let kind = match alternative.media_type {
            AlternativeMediaType::Audio => TrackKind::Audio,
            AlternativeMediaType::Subtitles => TrackKind::Text,
            _ => continue,
        };
        // Renditions without a URI are muxed into the variant stream
        let Some(track) = media_track(kind, alternative, base_url)? else { continue };
        match kind {
            TrackKind::Audio => info.audio_tracks.push(track),
            _ => info.subtitle_tracks.push(track),
        }
    }

    debug!(
        variants = info.variant_count,
        audio = info.audio_tracks.len(),
        subtitles = info.subtitle_tracks.len(),
        "HLS master playlist probed"
    );

    Ok(info)
}

fn media_track(kind: TrackKind, alternative: &AlternativeMedia, base_url: &Url) -> Result<Option<MediaTrack>> {
    let Some(uri) = alternative.uri.as_deref() else {
        return Ok(None);
    };
    let uri = base_url
        .join(uri)
        .map_err(|e| Error::ManifestParse(format!("Invalid URI '{}': {}", uri, e)))?;

    Ok(Some(MediaTrack {
        kind,
        id: alternative.group_id.clone(),
        uri,
        language: alternative.language.clone(),
    }))
}

fn probe_media(media: &MediaPlaylist) -> ManifestInfo {
    let mut info = ManifestInfo::empty(ContentType::Hls);
    info.variant_count = 1;
    info.is_live = !media.end_list;
    info.duration = if media.end_list {
        playlist_duration(&media.segments)
    } else {
        None
    };
    info.protected = media.segments.iter().any(|s| s.key.is_some());
    info
}

/// Sum of segment durations; `None` when the sum is not a valid duration
fn playlist_duration(segments: &[MediaSegment]) -> Option<Duration> {
    Duration::try_from_secs_f32(segments.iter().map(|s| s.duration).sum()).ok()
}

fn has_video_codec(codecs: &str) -> bool {
    let codecs = codecs.to_lowercase();
    ["avc1", "avc3", "hvc1", "hev1", "vp09", "vp9", "av01", "dvh1", "dvhe"]
        .iter()
        .any(|codec| codecs.contains(codec))
}
