//! Error types for Streamer Core

use thiserror::Error;

/// Result type alias for controller operations
pub type Result<T> = std::result::Result<T, Error>;

/// Controller error types
#[derive(Error, Debug)]
pub enum Error {
    // Classification errors
    #[error("Unsupported content type: {uri}")]
    UnsupportedContentType { uri: String },

    #[error("Invalid URI '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    // Builder errors
    #[error("Failed to fetch manifest: {0}")]
    ManifestFetch(String),

    #[error("Failed to parse manifest: {0}")]
    ManifestParse(String),

    #[error("Renderer build failed: {0}")]
    BuildFailed(String),

    // Engine errors
    #[error("Decoder initialization failed: {0}")]
    DecoderInitialization(String),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Audio write failed: {0}")]
    AudioWrite(String),

    #[error("Playback error: {0}")]
    Playback(String),

    // Network errors
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Internal errors
    #[error("Controller is no longer running")]
    ControllerClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an unsupported content type error
    pub fn unsupported(uri: impl Into<String>) -> Self {
        Error::UnsupportedContentType { uri: uri.into() }
    }

    /// Returns true if the media engine raised this error
    pub fn is_engine_failure(&self) -> bool {
        matches!(
            self,
            Error::DecoderInitialization(_)
                | Error::Crypto(_)
                | Error::AudioWrite(_)
                | Error::Playback(_)
        )
    }

    /// Returns the error code reported to the embedding application
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::UnsupportedContentType { .. } => "UNSUPPORTED_CONTENT_TYPE",
            Error::InvalidUri { .. } => "INVALID_URI",
            Error::ManifestFetch(_) => "MANIFEST_FETCH",
            Error::ManifestParse(_) => "MANIFEST_PARSE",
            Error::BuildFailed(_) => "BUILD_FAILED",
            Error::DecoderInitialization(_) => "DECODER_INIT",
            Error::Crypto(_) => "CRYPTO",
            Error::AudioWrite(_) => "AUDIO_WRITE",
            Error::Playback(_) => "PLAYBACK",
            Error::Network(_) => "NETWORK",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::ControllerClosed => "CONTROLLER_CLOSED",
            Error::Io(_) => "IO",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_failures() {
        assert!(Error::DecoderInitialization("no decoder for avc1".into()).is_engine_failure());
        assert!(Error::Crypto("bad key".into()).is_engine_failure());
        assert!(Error::AudioWrite("underflow".into()).is_engine_failure());
        assert!(!Error::ManifestFetch("404".into()).is_engine_failure());
        assert!(!Error::unsupported("clip.xyz").is_engine_failure());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::unsupported("clip.xyz").error_code(), "UNSUPPORTED_CONTENT_TYPE");
        assert_eq!(Error::ManifestParse("eof".into()).error_code(), "MANIFEST_PARSE");
        assert_eq!(Error::ControllerClosed.error_code(), "CONTROLLER_CLOSED");
    }

    #[test]
    fn test_display_keeps_cause() {
        let err = Error::ManifestFetch("HTTP 404 Not Found".into());
        assert_eq!(err.to_string(), "Failed to fetch manifest: HTTP 404 Not Found");
    }
}
