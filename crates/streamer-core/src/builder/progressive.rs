//! Progressive (single file) renderer builder

use super::RendererBuilder;
use crate::{
    classifier::is_audio_only,
    config::StreamerConfig,
    renderer::{Renderer, RendererSet, SampleSource, TrackSelection},
    transport::Transport,
    types::ContentType,
    Result,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument};
use url::Url;

/// One extractor-backed source shared by every renderer.
///
/// The container is only probed here; its tracks are discovered by the
/// engine's extractor once playback prepares.
pub struct ProgressiveRendererBuilder {
    transport: Arc<dyn Transport>,
    config: Arc<StreamerConfig>,
}

impl ProgressiveRendererBuilder {
    pub fn new(transport: Arc<dyn Transport>, config: Arc<StreamerConfig>) -> Self {
        Self { transport, config }
    }
}

#[async_trait]
impl RendererBuilder for ProgressiveRendererBuilder {
    fn content_type(&self) -> ContentType {
        ContentType::Progressive
    }

    #[instrument(skip(self, uri), fields(uri = %uri))]
    async fn build(&self, uri: &Url) -> Result<RendererSet> {
        let probe = self.transport.probe(uri).await?;
        let audio_only = probe.is_audio() || is_audio_only(uri);

        debug!(
            content_length = ?probe.content_length,
            mime = ?probe.mime_type,
            audio_only,
            "Progressive source probed"
        );

        let source = SampleSource::new(
            uri.clone(),
            TrackSelection::Extractor,
            self.config.buffer_bytes(self.config.main_buffer_segments),
        );

        let video = (!audio_only).then(|| Renderer::Video {
            source: source.clone(),
            protected: false,
        });
        let audio = Renderer::Audio { sources: vec![source.clone()] };
        let text = Renderer::EmbeddedCaptions { source: source.clone() };
        let metadata = Renderer::Id3Metadata { source };

        Ok(RendererSet::new(video, Some(audio), Some(text), Some(metadata)))
    }
}
