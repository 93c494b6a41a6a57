//! Controller configuration
//!
//! Buffer budgets are expressed in segments of `buffer_segment_size` bytes,
//! the way the renderer builders allocate sample-source memory.

use crate::engine::PlayerSpec;
use crate::error::{Error, Result};
use crate::types::TRACK_RENDERER_COUNT;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Controller and builder configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamerConfig {
    /// User agent sent by the HTTP transport
    pub user_agent: String,
    /// Transport request timeout in milliseconds
    pub request_timeout_ms: u64,
    /// Size of one buffer segment in bytes
    pub buffer_segment_size: usize,
    /// Segments for the main source of HLS and progressive content
    pub main_buffer_segments: usize,
    /// Segments for the video source of DASH and SmoothStreaming content
    pub video_buffer_segments: usize,
    /// Segments for a dedicated audio source
    pub audio_buffer_segments: usize,
    /// Segments for a dedicated text source
    pub text_buffer_segments: usize,
    /// Media the player buffers before starting playback (milliseconds)
    pub min_buffer_ms: u64,
    /// Media the player buffers before resuming after a stall (milliseconds)
    pub min_rebuffer_ms: u64,
}

impl Default for StreamerConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("streamer/{}", crate::VERSION),
            request_timeout_ms: 10000,
            buffer_segment_size: 64 * 1024,
            main_buffer_segments: 256,
            video_buffer_segments: 200,
            audio_buffer_segments: 54,
            text_buffer_segments: 2,
            min_buffer_ms: 1000,
            min_rebuffer_ms: 1000,
        }
    }
}

impl StreamerConfig {
    /// Parse a JSON configuration; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Reject configurations no builder can work with
    pub fn validate(&self) -> Result<()> {
        if self.user_agent.trim().is_empty() {
            return Err(Error::InvalidConfig("user_agent must not be empty".into()));
        }
        if self.buffer_segment_size == 0 {
            return Err(Error::InvalidConfig("buffer_segment_size must be positive".into()));
        }
        if self.main_buffer_segments == 0 || self.video_buffer_segments == 0 {
            return Err(Error::InvalidConfig("main and video buffers need at least one segment".into()));
        }
        Ok(())
    }

    /// Bytes for a buffer of `segments` segments
    pub fn buffer_bytes(&self, segments: usize) -> usize {
        segments.saturating_mul(self.buffer_segment_size)
    }

    /// Player construction parameters handed to the media engine
    pub fn player_spec(&self) -> PlayerSpec {
        PlayerSpec {
            renderer_count: TRACK_RENDERER_COUNT,
            min_buffer: Duration::from_millis(self.min_buffer_ms),
            min_rebuffer: Duration::from_millis(self.min_rebuffer_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StreamerConfig::default();
        assert_eq!(config.buffer_segment_size, 65536);
        assert_eq!(config.buffer_bytes(config.main_buffer_segments), 256 * 65536);
        assert_eq!(config.audio_buffer_segments, 54);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = StreamerConfig::from_json(r#"{"user_agent": "radio/2.1", "min_buffer_ms": 2500}"#)
            .unwrap();
        assert_eq!(config.user_agent, "radio/2.1");
        assert_eq!(config.player_spec().min_buffer, Duration::from_millis(2500));
        assert_eq!(config.text_buffer_segments, 2);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = StreamerConfig::from_json(r#"{"buffer_segment_size": 0}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));

        let err = StreamerConfig::from_json("not json").unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_player_spec() {
        let spec = StreamerConfig::default().player_spec();
        assert_eq!(spec.renderer_count, 4);
        assert_eq!(spec.min_rebuffer, Duration::from_secs(1));
    }
}
