//! HLS renderer builder

use super::{adaptive_renderers, BufferBudget, RendererBuilder};
use crate::{
    config::StreamerConfig,
    manifest,
    renderer::RendererSet,
    transport::Transport,
    types::ContentType,
    Result,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument};
use url::Url;

/// Fetches the playlist, then builds renderers over the main stream and any
/// advertised alternate renditions
pub struct HlsRendererBuilder {
    transport: Arc<dyn Transport>,
    config: Arc<StreamerConfig>,
}

impl HlsRendererBuilder {
    pub fn new(transport: Arc<dyn Transport>, config: Arc<StreamerConfig>) -> Self {
        Self { transport, config }
    }
}

#[async_trait]
impl RendererBuilder for HlsRendererBuilder {
    fn content_type(&self) -> ContentType {
        ContentType::Hls
    }

    #[instrument(skip(self, uri), fields(uri = %uri))]
    async fn build(&self, uri: &Url) -> Result<RendererSet> {
        let body = self.transport.fetch(uri).await?;
        let info = manifest::probe(ContentType::Hls, &body, uri)?;

        debug!(
            variants = info.variant_count,
            live = info.is_live,
            alternate_audio = info.has_alternate_audio(),
            "Playlist loaded"
        );

        let budget = BufferBudget {
            main: self.config.buffer_bytes(self.config.main_buffer_segments),
            audio: self.config.buffer_bytes(self.config.audio_buffer_segments),
            text: self.config.buffer_bytes(self.config.text_buffer_segments),
        };
        Ok(adaptive_renderers(uri, info, budget))
    }
}
