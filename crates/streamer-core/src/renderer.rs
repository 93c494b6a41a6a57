//! Renderer sets
//!
//! A renderer set describes, per track kind, which decode pipeline the media
//! engine should run and which sample sources feed it. Every slot is always
//! populated: kinds a builder did not produce hold a placeholder.

use crate::{
    manifest::ManifestInfo,
    types::{TrackKind, TRACK_RENDERER_COUNT},
};
use serde::Serialize;
use std::ops::Index;
use std::time::Duration;
use url::Url;

/// Which tracks a sample source selects from its URI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackSelection {
    /// Adaptive main stream (muxed or video)
    Main,
    /// Audio renditions
    Audio,
    /// Subtitle renditions
    Subtitles,
    /// Whole file through a container extractor
    Extractor,
}

/// A sample source feeding one or more renderers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleSource {
    /// Source location
    pub uri: Url,
    /// Tracks selected from it
    pub selection: TrackSelection,
    /// Buffer budget in bytes
    pub buffer_bytes: usize,
}

impl SampleSource {
    pub fn new(uri: Url, selection: TrackSelection, buffer_bytes: usize) -> Self {
        Self { uri, selection, buffer_bytes }
    }
}

/// A decode pipeline for one track kind
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "renderer", rename_all = "snake_case")]
pub enum Renderer {
    /// Video decoder
    Video { source: SampleSource, protected: bool },
    /// Audio decoder; multiple sources are multiplexed
    Audio { sources: Vec<SampleSource> },
    /// Dedicated subtitle pipeline
    Subtitles { source: SampleSource },
    /// CEA-608 captions embedded in the main stream
    EmbeddedCaptions { source: SampleSource },
    /// ID3 timed metadata
    Id3Metadata { source: SampleSource },
    /// No-op stand-in for an absent track
    Placeholder { kind: TrackKind },
}

impl Renderer {
    /// Track kind this renderer serves
    pub fn kind(&self) -> TrackKind {
        match self {
            Renderer::Video { .. } => TrackKind::Video,
            Renderer::Audio { .. } => TrackKind::Audio,
            Renderer::Subtitles { .. } | Renderer::EmbeddedCaptions { .. } => TrackKind::Text,
            Renderer::Id3Metadata { .. } => TrackKind::Metadata,
            Renderer::Placeholder { kind } => *kind,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Renderer::Placeholder { .. })
    }

    /// Sample sources feeding this renderer
    pub fn sources(&self) -> Vec<&SampleSource> {
        match self {
            Renderer::Video { source, .. }
            | Renderer::Subtitles { source }
            | Renderer::EmbeddedCaptions { source }
            | Renderer::Id3Metadata { source } => vec![source],
            Renderer::Audio { sources } => sources.iter().collect(),
            Renderer::Placeholder { .. } => Vec::new(),
        }
    }
}

/// The four renderers handed to a player, indexed by track kind
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RendererSet {
    renderers: [Renderer; TRACK_RENDERER_COUNT],
    duration: Option<Duration>,
    #[serde(skip)]
    manifest: Option<ManifestInfo>,
}

impl RendererSet {
    /// Assemble a set, filling absent kinds with placeholders.
    ///
    /// A renderer offered for the wrong slot is replaced by a placeholder.
    pub fn new(
        video: Option<Renderer>,
        audio: Option<Renderer>,
        text: Option<Renderer>,
        metadata: Option<Renderer>,
    ) -> Self {
        let slot = |kind: TrackKind, renderer: Option<Renderer>| match renderer {
            Some(r) if r.kind() == kind => r,
            _ => Renderer::Placeholder { kind },
        };

        Self {
            renderers: [
                slot(TrackKind::Video, video),
                slot(TrackKind::Audio, audio),
                slot(TrackKind::Text, text),
                slot(TrackKind::Metadata, metadata),
            ],
            duration: None,
            manifest: None,
        }
    }

    /// Attach the manifest the set was built from; its duration becomes the set's
    pub fn with_manifest(mut self, manifest: ManifestInfo) -> Self {
        self.duration = manifest.duration;
        self.manifest = Some(manifest);
        self
    }

    /// Manifest probed while building, for adaptive sources
    pub fn manifest(&self) -> Option<&ManifestInfo> {
        self.manifest.as_ref()
    }

    /// Presentation duration, when the source declares one
    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    pub fn get(&self, kind: TrackKind) -> &Renderer {
        &self.renderers[kind.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Renderer> {
        self.renderers.iter()
    }

    /// Number of non-placeholder renderers
    pub fn active_count(&self) -> usize {
        self.renderers.iter().filter(|r| !r.is_placeholder()).count()
    }

    /// Whether every kind has a real renderer
    pub fn is_complete(&self) -> bool {
        self.active_count() == TRACK_RENDERER_COUNT
    }
}

impl Index<TrackKind> for RendererSet {
    type Output = Renderer;

    fn index(&self, kind: TrackKind) -> &Renderer {
        self.get(kind)
    }
}
