//! SmoothStreaming client manifest probe

use super::{elements, extract_attr, ManifestInfo, MediaTrack};
use crate::{
    error::Error,
    types::{ContentType, TrackKind},
    Result,
};
use std::time::Duration;
use url::Url;

/// Default SmoothStreaming timescale (100ns ticks)
const DEFAULT_TIMESCALE: u64 = 10_000_000;

/// Probe a SmoothStreaming client manifest
pub fn probe_smooth_manifest(content: &str, base_url: &Url) -> Result<ManifestInfo> {
    let Some((attrs, _)) = elements(content, "SmoothStreamingMedia").into_iter().next() else {
        return Err(Error::ManifestParse(
            "Missing SmoothStreamingMedia root element".to_string(),
        ));
    };

    let mut info = ManifestInfo::empty(ContentType::SmoothStreaming);
    info.is_live = extract_attr(attrs, "IsLive")
        .map_or(false, |v| v.eq_ignore_ascii_case("true"));
    info.protected = content.contains("<Protection");
    info.has_video = false;

    let timescale = extract_attr(attrs, "TimeScale")
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_TIMESCALE);
    info.duration = extract_attr(attrs, "Duration")
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|ticks| *ticks > 0 && !info.is_live)
        .map(|ticks| ticks_to_duration(ticks, timescale));

    // The first audio stream plays with the main stream
    let mut main_audio_seen = false;

    for (idx, (attrs, _)) in elements(content, "StreamIndex").into_iter().enumerate() {
        let kind = match extract_attr(attrs, "Type").as_deref() {
            Some("video") => TrackKind::Video,
            Some("audio") => TrackKind::Audio,
            Some("text") => TrackKind::Text,
            _ => continue,
        };

        if kind == TrackKind::Video {
            info.has_video = true;
            info.variant_count += extract_attr(attrs, "QualityLevels")
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(1);
            continue;
        }

        let track = MediaTrack {
            kind,
            id: extract_attr(attrs, "Name").unwrap_or_else(|| format!("stream_{}", idx)),
            uri: base_url.clone(),
            language: extract_attr(attrs, "Language"),
        };
        if kind == TrackKind::Audio {
            if main_audio_seen {
                info.audio_tracks.push(track);
            }
            main_audio_seen = true;
        } else {
            info.subtitle_tracks.push(track);
        }
    }

    Ok(info)
}

fn ticks_to_duration(ticks: u64, timescale: u64) -> Duration {
    let nanos = u128::from(ticks % timescale) * 1_000_000_000 / u128::from(timescale);
    Duration::new(ticks / timescale, nanos as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://media.example.com/bbb.ism/Manifest").unwrap()
    }

    #[test]
    fn test_probe_vod() {
        let manifest = r#"<?xml version="1.0" encoding="utf-8"?>
<SmoothStreamingMedia MajorVersion="2" MinorVersion="0" Duration="6000000000">
  <StreamIndex Type="video" Name="video" QualityLevels="3" Chunks="300" Url="QualityLevels({bitrate})/Fragments(video={start time})">
    <QualityLevel Index="0" Bitrate="2962000" FourCC="H264"/>
  </StreamIndex>
  <StreamIndex Type="audio" Name="audio_eng" Language="eng" QualityLevels="1" Url="QualityLevels({bitrate})/Fragments(audio_eng={start time})"/>
  <StreamIndex Type="text" Subtype="CAPT" Name="captions" Language="eng" Url="QualityLevels({bitrate})/Fragments(captions={start time})"/>
</SmoothStreamingMedia>"#;

        let info = probe_smooth_manifest(manifest, &base()).unwrap();
        assert!(!info.is_live);
        assert_eq!(info.duration, Some(Duration::from_secs(600)));
        assert!(info.has_video);
        assert_eq!(info.variant_count, 3);
        assert!(!info.has_alternate_audio());
        assert_eq!(info.subtitle_tracks[0].language.as_deref(), Some("eng"));
        assert!(!info.protected);
    }

    #[test]
    fn test_probe_live_protected() {
        let manifest = r#"<SmoothStreamingMedia MajorVersion="2" IsLive="TRUE" Duration="0">
<Protection><ProtectionHeader SystemID="9a04f079-9840-4286-ab92-e65be0885f95">AAAA</ProtectionHeader></Protection>
<StreamIndex Type="video" QualityLevels="2"/>
</SmoothStreamingMedia>"#;

        let info = probe_smooth_manifest(manifest, &base()).unwrap();
        assert!(info.is_live);
        assert!(info.protected);
        assert_eq!(info.duration, None);
        assert!(!info.has_alternate_audio());
    }

    #[test]
    fn test_second_audio_stream_is_alternate() {
        let manifest = r#"<SmoothStreamingMedia MajorVersion="2" Duration="10000000">
<StreamIndex Type="video" QualityLevels="1"/>
<StreamIndex Type="audio" Name="audio_eng" Language="eng"/>
<StreamIndex Type="audio" Name="audio_spa" Language="spa"/>
</SmoothStreamingMedia>"#;

        let info = probe_smooth_manifest(manifest, &base()).unwrap();
        assert_eq!(info.audio_tracks.len(), 1);
        assert_eq!(info.audio_tracks[0].id, "audio_spa");
    }

    #[test]
    fn test_extreme_duration_does_not_overflow() {
        let manifest = format!(
            r#"<SmoothStreamingMedia MajorVersion="2" TimeScale="1" Duration="{}"/>"#,
            u64::MAX
        );
        let info = probe_smooth_manifest(&manifest, &base()).unwrap();
        assert_eq!(info.duration, Some(Duration::from_secs(u64::MAX)));
        assert_eq!(ticks_to_duration(15_000_000, DEFAULT_TIMESCALE), Duration::from_millis(1500));
    }

    #[test]
    fn test_missing_root() {
        assert!(probe_smooth_manifest("<MPD/>", &base()).is_err());
    }
}
