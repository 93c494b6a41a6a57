//! Renderer pipeline builders
//!
//! One builder per content type. A builder fetches/probes the source and
//! produces a [`RendererSet`]; [`BuildTask`] runs it in the background with
//! cancellation and delivers the outcome at most once.

mod dash;
mod hls;
mod progressive;
mod smooth;

pub use dash::DashRendererBuilder;
pub use hls::HlsRendererBuilder;
pub use progressive::ProgressiveRendererBuilder;
pub use smooth::SmoothStreamingRendererBuilder;

use crate::{
    config::StreamerConfig,
    error::Error,
    manifest::ManifestInfo,
    renderer::{Renderer, RendererSet, SampleSource, TrackSelection},
    transport::Transport,
    types::ContentType,
    Result,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::{sync::CancellationToken, task::AbortOnDropHandle};
use tracing::{debug, error};
use url::Url;

/// Builds the renderer set for one content type
#[async_trait]
pub trait RendererBuilder: Send + Sync {
    /// Content type this builder handles
    fn content_type(&self) -> ContentType;

    /// Fetch/probe `uri` and construct its renderers. Never retries.
    async fn build(&self, uri: &Url) -> Result<RendererSet>;
}

/// Selects the builder variant for a content type
pub trait BuilderFactory: Send + Sync {
    fn create(&self, content_type: ContentType) -> Box<dyn RendererBuilder>;
}

/// Builders backed by a transport and the controller configuration
pub struct DefaultBuilderFactory {
    transport: Arc<dyn Transport>,
    config: Arc<StreamerConfig>,
}

impl DefaultBuilderFactory {
    pub fn new(transport: Arc<dyn Transport>, config: Arc<StreamerConfig>) -> Self {
        Self { transport, config }
    }
}

impl BuilderFactory for DefaultBuilderFactory {
    fn create(&self, content_type: ContentType) -> Box<dyn RendererBuilder> {
        create_builder(content_type, self.transport.clone(), self.config.clone())
    }
}

/// Create the builder variant for a content type
pub fn create_builder(
    content_type: ContentType,
    transport: Arc<dyn Transport>,
    config: Arc<StreamerConfig>,
) -> Box<dyn RendererBuilder> {
    match content_type {
        ContentType::Dash => Box::new(DashRendererBuilder::new(transport, config)),
        ContentType::Hls => Box::new(HlsRendererBuilder::new(transport, config)),
        ContentType::SmoothStreaming => {
            Box::new(SmoothStreamingRendererBuilder::new(transport, config))
        }
        ContentType::Progressive => Box::new(ProgressiveRendererBuilder::new(transport, config)),
    }
}

/// Buffer budgets, in bytes, for the sources of an adaptive presentation
#[derive(Debug, Clone, Copy)]
pub(crate) struct BufferBudget {
    pub main: usize,
    pub audio: usize,
    pub text: usize,
}

/// Renderers for a manifest-based presentation.
///
/// Video, embedded captions and metadata read the main stream. Audio reads
/// the main stream, multiplexed with the first alternate rendition when one is
/// advertised. Advertised subtitles get a dedicated pipeline in place of the
/// embedded captions.
pub(crate) fn adaptive_renderers(uri: &Url, info: ManifestInfo, budget: BufferBudget) -> RendererSet {
    let main = SampleSource::new(uri.clone(), TrackSelection::Main, budget.main);

    let video = info.has_video.then(|| Renderer::Video {
        source: main.clone(),
        protected: info.protected,
    });

    let mut audio_sources = vec![main.clone()];
    if let Some(track) = info.audio_tracks.first() {
        audio_sources.push(SampleSource::new(track.uri.clone(), TrackSelection::Audio, budget.audio));
    }
    let audio = Renderer::Audio { sources: audio_sources };

    let text = match info.subtitle_tracks.first() {
        Some(track) => Renderer::Subtitles {
            source: SampleSource::new(track.uri.clone(), TrackSelection::Subtitles, budget.text),
        },
        None => Renderer::EmbeddedCaptions { source: main.clone() },
    };

    let metadata = Renderer::Id3Metadata { source: main };

    RendererSet::new(video, Some(audio), Some(text), Some(metadata)).with_manifest(info)
}

/// Outcome receiver of a build
pub type Delivery = Box<dyn FnOnce(Result<RendererSet>) + Send>;

/// A builder running on a background task.
///
/// After [`BuildTask::cancel`] returns, the delivery is guaranteed never to
/// run: the delivery slot is emptied under the same lock the task holds while
/// delivering.
pub struct BuildTask {
    token: CancellationToken,
    delivery: Arc<Mutex<Option<Delivery>>>,
    handle: JoinHandle<()>,
}

impl BuildTask {
    /// Spawn `builder` for `uri` on the current runtime.
    ///
    /// The build itself runs on an inner task so a panicking builder is
    /// delivered as [`Error::BuildFailed`] instead of never delivering.
    pub fn spawn(builder: Box<dyn RendererBuilder>, uri: Url, deliver: Delivery) -> Self {
        let token = CancellationToken::new();
        let delivery = Arc::new(Mutex::new(Some(deliver)));

        let handle = tokio::spawn({
            let token = token.clone();
            let delivery = delivery.clone();
            async move {
                let content_type = builder.content_type();
                let build = AbortOnDropHandle::new(tokio::spawn({
                    let uri = uri.clone();
                    async move { builder.build(&uri).await }
                }));

                let outcome = tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        debug!(%uri, %content_type, "Build cancelled");
                        return;
                    }
                    joined = build => match joined {
                        Ok(outcome) => outcome,
                        Err(e) if e.is_panic() => {
                            error!(%uri, %content_type, "Renderer builder panicked");
                            Err(Error::BuildFailed(format!(
                                "{} builder panicked for {}",
                                content_type, uri
                            )))
                        }
                        Err(_) => return,
                    },
                };

                let mut slot = delivery.lock();
                if let Some(deliver) = slot.take() {
                    deliver(outcome);
                }
            }
        });

        Self { token, delivery, handle }
    }

    /// Cancel the build; no outcome is delivered afterwards
    pub fn cancel(&self) {
        self.delivery.lock().take();
        self.token.cancel();
        self.handle.abort();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Whether the background task has exited
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for BuildTask {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TrackKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Completes when released
    struct GatedBuilder {
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl RendererBuilder for GatedBuilder {
        fn content_type(&self) -> ContentType {
            ContentType::Hls
        }

        async fn build(&self, _uri: &Url) -> Result<RendererSet> {
            self.gate.notified().await;
            Ok(RendererSet::new(None, None, None, None))
        }
    }

    struct FailingBuilder;

    #[async_trait]
    impl RendererBuilder for FailingBuilder {
        fn content_type(&self) -> ContentType {
            ContentType::Dash
        }

        async fn build(&self, _uri: &Url) -> Result<RendererSet> {
            Err(Error::ManifestFetch("HTTP 503".into()))
        }
    }

    struct PanickingBuilder;

    #[async_trait]
    impl RendererBuilder for PanickingBuilder {
        fn content_type(&self) -> ContentType {
            ContentType::Dash
        }

        async fn build(&self, _uri: &Url) -> Result<RendererSet> {
            panic!("segment timeline out of range")
        }
    }

    fn uri() -> Url {
        Url::parse("https://cdn.example.com/live.m3u8").unwrap()
    }

    fn counting_delivery(count: &Arc<AtomicUsize>) -> Delivery {
        let count = count.clone();
        Box::new(move |_| {
            count.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test]
    async fn test_delivers_once() {
        let gate = Arc::new(Notify::new());
        let delivered = Arc::new(AtomicUsize::new(0));
        let task = BuildTask::spawn(
            Box::new(GatedBuilder { gate: gate.clone() }),
            uri(),
            counting_delivery(&delivered),
        );

        gate.notify_one();
        while !task.is_finished() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(delivered.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelled_build_never_delivers() {
        let gate = Arc::new(Notify::new());
        let delivered = Arc::new(AtomicUsize::new(0));
        let task = BuildTask::spawn(
            Box::new(GatedBuilder { gate: gate.clone() }),
            uri(),
            counting_delivery(&delivered),
        );

        task.cancel();
        gate.notify_one();
        while !task.is_finished() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        assert!(task.is_cancelled());
        assert_eq!(delivered.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_error_is_delivered() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let _task = BuildTask::spawn(
            Box::new(FailingBuilder),
            uri(),
            Box::new(move |outcome| {
                let _ = tx.send(outcome);
            }),
        );

        let outcome = rx.await.unwrap();
        assert!(matches!(outcome, Err(Error::ManifestFetch(_))));
    }

    #[tokio::test]
    async fn test_panicking_builder_delivers_error() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let _task = BuildTask::spawn(
            Box::new(PanickingBuilder),
            uri(),
            Box::new(move |outcome| {
                let _ = tx.send(outcome);
            }),
        );

        let outcome = tokio::time::timeout(Duration::from_secs(2), rx)
            .await
            .expect("no outcome delivered")
            .unwrap();
        assert!(matches!(outcome, Err(Error::BuildFailed(_))));
    }

    #[tokio::test]
    async fn test_cancel_aborts_inner_build() {
        struct DropFlag(Arc<AtomicUsize>);
        impl Drop for DropFlag {
            fn drop(&mut self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        struct PendingBuilder(Arc<AtomicUsize>);

        #[async_trait]
        impl RendererBuilder for PendingBuilder {
            fn content_type(&self) -> ContentType {
                ContentType::Hls
            }

            async fn build(&self, _uri: &Url) -> Result<RendererSet> {
                let _flag = DropFlag(self.0.clone());
                std::future::pending().await
            }
        }

        let dropped = Arc::new(AtomicUsize::new(0));
        let delivered = Arc::new(AtomicUsize::new(0));
        let task = BuildTask::spawn(
            Box::new(PendingBuilder(dropped.clone())),
            uri(),
            counting_delivery(&delivered),
        );
        tokio::time::sleep(Duration::from_millis(20)).await;

        task.cancel();
        let started = tokio::time::Instant::now();
        while dropped.load(Ordering::SeqCst) == 0 && started.elapsed() < Duration::from_secs(2) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(dropped.load(Ordering::SeqCst), 1);
        assert_eq!(delivered.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_adaptive_renderers_fallback_captions() {
        let mut info = ManifestInfo::empty(ContentType::Hls);
        info.duration = Some(Duration::from_secs(30));
        let budget = BufferBudget { main: 100, audio: 10, text: 1 };

        let set = adaptive_renderers(&uri(), info, budget);
        assert!(set.is_complete());
        assert!(matches!(set[TrackKind::Text], Renderer::EmbeddedCaptions { .. }));
        assert_eq!(set[TrackKind::Audio].sources().len(), 1);
        assert_eq!(set.duration(), Some(Duration::from_secs(30)));
        assert_eq!(set.manifest().map(|m| m.content_type), Some(ContentType::Hls));
    }
}
