//! Content-type classification
//!
//! Decides the protocol family of a source from its URI alone. Bare
//! filesystem paths are turned into `file://` URLs first.

use crate::{error::Error, types::ContentType, Result};
use std::path::Path;
use url::Url;

/// Container extensions played through the progressive (extractor) pipeline
const PROGRESSIVE_EXTENSIONS: &[&str] = &[
    "mp4", "m4a", "m4v", "mp3", "aac", "webm", "mkv", "ogg", "oga", "opus", "flac", "wav",
    "ts", "3gp", "mov", "amr",
];

/// Extensions whose containers carry audio only
const AUDIO_ONLY_EXTENSIONS: &[&str] = &["m4a", "mp3", "aac", "oga", "opus", "flac", "wav", "amr"];

/// Normalize a caller-supplied URI or path into a URL
pub fn normalize_uri(input: &str) -> Result<Url> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidUri {
            uri: input.to_string(),
            reason: "empty".to_string(),
        });
    }

    match Url::parse(trimmed) {
        // Single-letter schemes are Windows drive letters
        Ok(url) if url.scheme().len() > 1 => Ok(url),
        Ok(_) | Err(url::ParseError::RelativeUrlWithoutBase) => file_url(trimmed),
        Err(e) => Err(Error::InvalidUri {
            uri: trimmed.to_string(),
            reason: e.to_string(),
        }),
    }
}

fn file_url(path: &str) -> Result<Url> {
    let path = Path::new(path);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    Url::from_file_path(&absolute).map_err(|_| Error::InvalidUri {
        uri: path.display().to_string(),
        reason: "not a representable file path".to_string(),
    })
}

/// Infer the content type from the URL's trailing path segment
pub fn infer_content_type(url: &Url) -> Option<ContentType> {
    let path = url.path().to_ascii_lowercase();
    let path = path.trim_end_matches('/');

    if path.ends_with(".ism/manifest") || path.ends_with(".isml/manifest") {
        return Some(ContentType::SmoothStreaming);
    }

    match extension(path)? {
        "mpd" => Some(ContentType::Dash),
        "m3u8" | "m3u" => Some(ContentType::Hls),
        "ism" | "isml" => Some(ContentType::SmoothStreaming),
        ext if PROGRESSIVE_EXTENSIONS.contains(&ext) => Some(ContentType::Progressive),
        _ => None,
    }
}

/// Whether a progressive URL names an audio-only container
pub fn is_audio_only(url: &Url) -> bool {
    let path = url.path().to_ascii_lowercase();
    extension(&path).map_or(false, |ext| AUDIO_ONLY_EXTENSIONS.contains(&ext))
}

fn extension(path: &str) -> Option<&str> {
    let segment = path.rsplit('/').next()?;
    segment.rsplit_once('.').map(|(_, ext)| ext)
}

/// Normalize and classify a source
pub fn classify(input: &str) -> Result<(Url, ContentType)> {
    let url = normalize_uri(input)?;
    match infer_content_type(&url) {
        Some(content_type) => Ok((url, content_type)),
        None => Err(Error::unsupported(input)),
    }
}
