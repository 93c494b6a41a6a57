//! Transport layer for manifests and progressive sources
//!
//! Builders only see "fetch succeeded" or "fetch failed"; timeouts belong to
//! the transport implementation.

use crate::{config::StreamerConfig, error::Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use reqwest::{header, Client};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, instrument};
use url::Url;

/// What a probe learned about a source without downloading it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeInfo {
    /// Size in bytes, when reported
    pub content_length: Option<u64>,
    /// MIME type, when reported
    pub mime_type: Option<String>,
}

impl ProbeInfo {
    /// Whether the reported MIME type is an audio type
    pub fn is_audio(&self) -> bool {
        self.mime_type
            .as_deref()
            .map_or(false, |mime| mime.starts_with("audio/"))
    }
}

/// URI-based fetch of manifests and probe of media sources
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch a whole resource (manifests)
    async fn fetch(&self, uri: &Url) -> Result<Bytes>;

    /// Check that a resource is reachable and report what is known about it
    async fn probe(&self, uri: &Url) -> Result<ProbeInfo>;
}

/// HTTP(S) transport backed by reqwest, with `file://` support
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(config: &StreamerConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;
        Ok(Self { client })
    }
}

fn file_path(uri: &Url) -> Result<std::path::PathBuf> {
    uri.to_file_path()
        .map_err(|_| Error::ManifestFetch(format!("Not a local file path: {}", uri)))
}

fn unsupported_scheme(uri: &Url) -> Error {
    Error::ManifestFetch(format!("Unsupported scheme '{}' in {}", uri.scheme(), uri))
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self))]
    async fn fetch(&self, uri: &Url) -> Result<Bytes> {
        match uri.scheme() {
            "http" | "https" => {
                debug!("Fetching {}", uri);

                let response = self
                    .client
                    .get(uri.clone())
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(|e| Error::ManifestFetch(e.to_string()))?;

                response
                    .bytes()
                    .await
                    .map_err(|e| Error::ManifestFetch(e.to_string()))
            }
            "file" => {
                let path = file_path(uri)?;
                let data = tokio::fs::read(&path)
                    .await
                    .map_err(|e| Error::ManifestFetch(format!("{}: {}", path.display(), e)))?;
                Ok(Bytes::from(data))
            }
            _ => Err(unsupported_scheme(uri)),
        }
    }

    #[instrument(skip(self))]
    async fn probe(&self, uri: &Url) -> Result<ProbeInfo> {
        match uri.scheme() {
            "http" | "https" => {
                let response = self
                    .client
                    .head(uri.clone())
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(|e| Error::ManifestFetch(e.to_string()))?;

                let headers = response.headers();
                let content_length = headers
                    .get(header::CONTENT_LENGTH)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok());
                let mime_type = headers
                    .get(header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .map(|v| v.split(';').next().unwrap_or(v).trim().to_string());

                Ok(ProbeInfo { content_length, mime_type })
            }
            "file" => {
                let path = file_path(uri)?;
                let metadata = tokio::fs::metadata(&path)
                    .await
                    .map_err(|e| Error::ManifestFetch(format!("{}: {}", path.display(), e)))?;
                Ok(ProbeInfo {
                    content_length: Some(metadata.len()),
                    mime_type: None,
                })
            }
            _ => Err(unsupported_scheme(uri)),
        }
    }
}

/// In-memory transport serving registered bodies.
///
/// Used for bundled offline manifests and for exercising builders without a
/// network. A resource can be held back until explicitly released.
#[derive(Default)]
pub struct MemoryTransport {
    resources: Mutex<HashMap<String, Resource>>,
}

#[derive(Clone)]
struct Resource {
    body: Option<(Bytes, Option<String>)>,
    gate: Option<Arc<Notify>>,
    requests: usize,
}

impl Resource {
    fn empty() -> Self {
        Self { body: None, gate: None, requests: 0 }
    }
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` at `uri`
    pub fn insert(&self, uri: &str, body: impl Into<Bytes>, mime_type: Option<&str>) {
        let mut resources = self.resources.lock();
        let entry = resources.entry(uri.to_string()).or_insert_with(Resource::empty);
        entry.body = Some((body.into(), mime_type.map(str::to_string)));
    }

    /// Hold requests for `uri` until the returned notifier fires
    pub fn hold(&self, uri: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        let mut resources = self.resources.lock();
        let entry = resources.entry(uri.to_string()).or_insert_with(Resource::empty);
        entry.gate = Some(gate.clone());
        gate
    }

    /// Number of fetches and probes made for `uri`
    pub fn requests(&self, uri: &str) -> usize {
        self.resources.lock().get(uri).map_or(0, |r| r.requests)
    }

    async fn resolve(&self, uri: &Url) -> Result<(Bytes, Option<String>)> {
        let resource = self.resources.lock().get_mut(uri.as_str()).map(|r| {
            r.requests += 1;
            r.clone()
        });
        let Some(resource) = resource else {
            return Err(Error::ManifestFetch(format!("HTTP 404 Not Found: {}", uri)));
        };
        if let Some(gate) = resource.gate {
            gate.notified().await;
        }
        resource
            .body
            .ok_or_else(|| Error::ManifestFetch(format!("HTTP 404 Not Found: {}", uri)))
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn fetch(&self, uri: &Url) -> Result<Bytes> {
        self.resolve(uri).await.map(|(body, _)| body)
    }

    async fn probe(&self, uri: &Url) -> Result<ProbeInfo> {
        let (body, mime_type) = self.resolve(uri).await?;
        Ok(ProbeInfo {
            content_length: Some(body.len() as u64),
            mime_type,
        })
    }
}
