//! DASH renderer builder

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

pub struct DashRendererBuilder {
    transport: Arc<dyn Transport>,
    config: Arc<StreamerConfig>,
}

impl DashRendererBuilder {
    pub fn new(transport: Arc<dyn Transport>, config: Arc<StreamerConfig>) -> Self {
        Self { transport, config }
    }
}

#[async_trait]
impl RendererBuilder for DashRendererBuilder {
    fn content_type(&self) -> ContentType {
        ContentType::Dash
    }

    #[instrument(skip(self, uri), fields(uri = %uri))]
    async fn build(&self, uri: &Url) -> Result<RendererSet> {
        let body = self.transport.fetch(uri).await?;
        let info = manifest::probe(ContentType::Dash, &body, uri)?;

        debug!(
            representations = info.variant_count,
            protected = info.protected,
            "MPD loaded"
        );

        // Audio and text adaptation sets are selected from the same MPD
        let budget = BufferBudget {
            main: self.config.buffer_bytes(self.config.video_buffer_segments),
            audio: self.config.buffer_bytes(self.config.audio_buffer_segments),
            text: self.config.buffer_bytes(self.config.text_buffer_segments),
        };
        Ok(adaptive_renderers(uri, info, budget))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::renderer::{Renderer, TrackSelection};
    use crate::transport::MemoryTransport;
    use crate::types::TrackKind;

    const MPD_URI: &str = "https://cdn.example.com/film/manifest.mpd";

    fn builder(transport: MemoryTransport) -> DashRendererBuilder {
        DashRendererBuilder::new(Arc::new(transport), Arc::new(StreamerConfig::default()))
    }

    #[tokio::test]
    async fn test_protected_vod() {
        let transport = MemoryTransport::new();
        transport.insert(
            MPD_URI,
            r#"<MPD type="static" mediaPresentationDuration="PT10M"><Period>
<AdaptationSet contentType="video"><ContentProtection schemeIdUri="urn:mpeg:dash:mp4protection:2011"/>
<Representation id="v1" bandwidth="1000000"/></AdaptationSet>
<AdaptationSet contentType="audio" lang="de"><Representation id="a1" bandwidth="96000"/></AdaptationSet>
<AdaptationSet contentType="text" lang="de"><Representation id="t1" bandwidth="1000"/></AdaptationSet>
</Period></MPD>"#,
            Some("application/dash+xml"),
        );

        let set = builder(transport).build(&Url::parse(MPD_URI).unwrap()).await.unwrap();
        match &set[TrackKind::Video] {
            Renderer::Video { source, protected } => {
                assert!(*protected);
                assert_eq!(source.buffer_bytes, 200 * 64 * 1024);
            }
            other => panic!("unexpected video renderer {:?}", other),
        }

        let audio = set[TrackKind::Audio].sources();
        assert_eq!(audio.len(), 1);
        assert_eq!(audio[0].selection, TrackSelection::Main);
        assert!(matches!(set[TrackKind::Text], Renderer::Subtitles { .. }));
        assert_eq!(set.duration(), Some(std::time::Duration::from_secs(600)));
    }

    #[tokio::test]
    async fn test_second_audio_set_is_multiplexed() {
        let transport = MemoryTransport::new();
        transport.insert(
            MPD_URI,
            r#"<MPD type="static" mediaPresentationDuration="PT10M"><Period>
<AdaptationSet contentType="video"><Representation id="v1" bandwidth="1000000"/></AdaptationSet>
<AdaptationSet contentType="audio" lang="en"><Representation id="a1" bandwidth="96000"/></AdaptationSet>
<AdaptationSet contentType="audio" lang="de"><Representation id="a2" bandwidth="96000"/></AdaptationSet>
</Period></MPD>"#,
            None,
        );

        let set = builder(transport).build(&Url::parse(MPD_URI).unwrap()).await.unwrap();
        let audio = set[TrackKind::Audio].sources();
        assert_eq!(audio.len(), 2);
        assert_eq!(audio[0].selection, TrackSelection::Main);
        assert_eq!(audio[1].selection, TrackSelection::Audio);
        assert_eq!(audio[1].uri.as_str(), MPD_URI);
    }

    #[tokio::test]
    async fn test_audio_only_presentation() {
        let transport = MemoryTransport::new();
        transport.insert(
            MPD_URI,
            r#"<MPD type="dynamic"><Period><AdaptationSet mimeType="audio/mp4"/></Period></MPD>"#,
            None,
        );

        let set = builder(transport).build(&Url::parse(MPD_URI).unwrap()).await.unwrap();
        assert!(set[TrackKind::Video].is_placeholder());
        assert!(!set[TrackKind::Audio].is_placeholder());
        assert_eq!(set.duration(), None);
    }

    #[tokio::test]
    async fn test_malformed_manifest() {
        let transport = MemoryTransport::new();
        transport.insert(MPD_URI, "not xml at all", None);

        let err = builder(transport).build(&Url::parse(MPD_URI).unwrap()).await.unwrap_err();
        assert!(matches!(err, Error::ManifestParse(_)));
    }
}
