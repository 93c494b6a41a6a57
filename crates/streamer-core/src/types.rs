//! Core types for Streamer

use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Number of renderer slots in every renderer set (video, audio, text, metadata)
pub const TRACK_RENDERER_COUNT: usize = 4;

/// Unique identifier for a playback session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Playback status reported to the embedding application.
///
/// Serializes to the upper-case strings carried by the status-changed event
/// (`"STOPPED"`, `"BUFFERING"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlaybackStatus {
    /// No source, or the source was removed
    Stopped,
    /// Loading the source or waiting for data
    Buffering,
    /// Ready and playing
    Playing,
    /// Ready but not playing
    Paused,
    /// Reached the end of the source
    Finished,
    /// A build or engine failure occurred
    Error,
}

impl PlaybackStatus {
    /// Wire string for this status
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackStatus::Stopped => "STOPPED",
            PlaybackStatus::Buffering => "BUFFERING",
            PlaybackStatus::Playing => "PLAYING",
            PlaybackStatus::Paused => "PAUSED",
            PlaybackStatus::Finished => "FINISHED",
            PlaybackStatus::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Streaming protocol family of a source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentType {
    Dash,
    Hls,
    SmoothStreaming,
    Progressive,
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentType::Dash => write!(f, "DASH"),
            ContentType::Hls => write!(f, "HLS"),
            ContentType::SmoothStreaming => write!(f, "SmoothStreaming"),
            ContentType::Progressive => write!(f, "Progressive"),
        }
    }
}

/// Track kind, one renderer slot each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    Video,
    Audio,
    Text,
    Metadata,
}

impl TrackKind {
    /// All kinds in renderer slot order
    pub const ALL: [TrackKind; TRACK_RENDERER_COUNT] = [
        TrackKind::Video,
        TrackKind::Audio,
        TrackKind::Text,
        TrackKind::Metadata,
    ];

    /// Renderer slot index
    pub fn index(&self) -> usize {
        match self {
            TrackKind::Video => 0,
            TrackKind::Audio => 1,
            TrackKind::Text => 2,
            TrackKind::Metadata => 3,
        }
    }
}

impl std::fmt::Display for TrackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackKind::Video => write!(f, "video"),
            TrackKind::Audio => write!(f, "audio"),
            TrackKind::Text => write!(f, "text"),
            TrackKind::Metadata => write!(f, "metadata"),
        }
    }
}

/// A text cue emitted by the text renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextCue {
    /// Cue text
    pub text: String,
    /// Presentation start
    pub start: Duration,
    /// Presentation end
    pub end: Duration,
    /// Line position as a fraction of the viewport, if given
    pub line: Option<f32>,
    /// Horizontal position as a fraction of the viewport, if given
    pub position: Option<f32>,
}

impl TextCue {
    pub fn new(text: impl Into<String>, start: Duration, end: Duration) -> Self {
        Self {
            text: text.into(),
            start,
            end,
            line: None,
            position: None,
        }
    }
}

/// A timed metadata frame (ID3 style) emitted by the metadata renderer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataFrame {
    /// Frame identifier, e.g. `TIT2`
    pub id: String,
    /// Raw frame payload
    pub data: Vec<u8>,
}

impl MetadataFrame {
    /// Payload as text, when it is valid UTF-8
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_strings() {
        assert_eq!(PlaybackStatus::Playing.as_str(), "PLAYING");
        assert_eq!(PlaybackStatus::Finished.to_string(), "FINISHED");
        assert_eq!(
            serde_json::to_value(PlaybackStatus::Buffering).unwrap(),
            serde_json::json!("BUFFERING")
        );
    }

    #[test]
    fn test_track_kind_slots() {
        for (slot, kind) in TrackKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), slot);
        }
    }

    #[test]
    fn test_metadata_text() {
        let frame = MetadataFrame { id: "TIT2".into(), data: b"Morning Show".to_vec() };
        assert_eq!(frame.text(), Some("Morning Show"));
    }
}
