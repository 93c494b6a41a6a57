//! SmoothStreaming renderer builder

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

pub struct SmoothStreamingRendererBuilder {
    transport: Arc<dyn Transport>,
    config: Arc<StreamerConfig>,
}

impl SmoothStreamingRendererBuilder {
    pub fn new(transport: Arc<dyn Transport>, config: Arc<StreamerConfig>) -> Self {
        Self { transport, config }
    }
}

#[async_trait]
impl RendererBuilder for SmoothStreamingRendererBuilder {
    fn content_type(&self) -> ContentType {
        ContentType::SmoothStreaming
    }

    #[instrument(skip(self, uri), fields(uri = %uri))]
    async fn build(&self, uri: &Url) -> Result<RendererSet> {
        let body = self.transport.fetch(uri).await?;
        let info = manifest::probe(ContentType::SmoothStreaming, &body, uri)?;
        debug!(live = info.is_live, "Client manifest loaded");

        let budget = BufferBudget {
            main: self.config.buffer_bytes(self.config.video_buffer_segments),
            audio: self.config.buffer_bytes(self.config.audio_buffer_segments),
            text: self.config.buffer_bytes(self.config.text_buffer_segments),
        };
        Ok(adaptive_renderers(uri, info, budget))
    }
}
