//! Command surface for the embedding application
//!
//! [`ControllerHandle`] is the inbound side: every command is queued to the
//! control task and awaits its acknowledgement, so by the time `set_url` or
//! `remove` returns the previous session is gone. The outbound side is a
//! single status-changed event delivered through an [`EventEmitter`].

use crate::{
    controller::ControlMessage,
    error::{Error, Result},
    events::{EventForwarder, ListenerId},
    types::{MetadataFrame, PlaybackStatus, TextCue},
};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::{oneshot, watch};

/// Name of the outbound status event
pub const STATUS_CHANGED_EVENT: &str = "StreamerStatusChanged";

/// Delivers named events to the embedding application
pub trait EventEmitter: Send + Sync {
    fn emit(&self, event: &str, payload: serde_json::Value);
}

/// Cloneable handle to a running controller
#[derive(Clone)]
pub struct ControllerHandle {
    tx: UnboundedSender<ControlMessage>,
    events: Arc<EventForwarder>,
}

impl ControllerHandle {
    pub(crate) fn new(tx: UnboundedSender<ControlMessage>, events: Arc<EventForwarder>) -> Self {
        Self { tx, events }
    }

    async fn request<T>(&self, message: impl FnOnce(oneshot::Sender<T>) -> ControlMessage) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(message(reply_tx))
            .map_err(|_| Error::ControllerClosed)?;
        reply_rx.await.map_err(|_| Error::ControllerClosed)
    }

    /// Replace the current source.
    ///
    /// Classification and build failures are reported through the error
    /// event, not the return value.
    pub async fn set_url(&self, uri: impl Into<String>) -> Result<()> {
        let uri = uri.into();
        self.request(|ack| ControlMessage::SetUrl { uri, ack }).await
    }

    pub async fn play(&self) -> Result<()> {
        self.request(|ack| ControlMessage::Play { ack }).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.request(|ack| ControlMessage::Pause { ack }).await
    }

    /// Tear down the current session
    pub async fn remove(&self) -> Result<()> {
        self.request(|ack| ControlMessage::Remove { ack }).await
    }

    /// Seek to a position in seconds; out-of-range values are the player's concern
    pub async fn seek_to_time(&self, seconds: f64) -> Result<()> {
        self.request(|ack| ControlMessage::SeekTo { seconds, ack }).await
    }

    /// Playback position in seconds, 0 without a player
    pub async fn current_time(&self) -> Result<f64> {
        self.request(|reply| ControlMessage::CurrentTime { reply }).await
    }

    /// Media duration in seconds, 0 when unknown or without a player
    pub async fn duration(&self) -> Result<f64> {
        self.request(|reply| ControlMessage::Duration { reply }).await
    }

    /// Tear down and stop the control task
    pub async fn shutdown(&self) -> Result<()> {
        self.request(|ack| ControlMessage::Shutdown { ack }).await
    }

    /// Whether the control task is still running
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Last reported status
    pub fn status(&self) -> PlaybackStatus {
        self.events.status()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<PlaybackStatus> {
        self.events.subscribe_status()
    }

    pub fn on_status<F>(&self, handler: F) -> ListenerId
    where
        F: Fn(PlaybackStatus) + Send + Sync + 'static,
    {
        self.events.on_status(handler)
    }

    pub fn on_error<F>(&self, handler: F) -> ListenerId
    where
        F: Fn(&Arc<Error>) + Send + Sync + 'static,
    {
        self.events.on_error(handler)
    }

    pub fn on_cues<F>(&self, handler: F) -> ListenerId
    where
        F: Fn(&[TextCue]) + Send + Sync + 'static,
    {
        self.events.on_cues(handler)
    }

    pub fn on_metadata<F>(&self, handler: F) -> ListenerId
    where
        F: Fn(&[MetadataFrame]) + Send + Sync + 'static,
    {
        self.events.on_metadata(handler)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.events.remove(id)
    }

    /// Forward every status change to `emitter` as a `StreamerStatusChanged` event
    pub fn attach_emitter(&self, emitter: Arc<dyn EventEmitter>) -> ListenerId {
        self.events.on_status(move |status| {
            emitter.emit(STATUS_CHANGED_EVENT, status_payload(status));
        })
    }
}

/// Payload of the status-changed event: the bare status string
pub fn status_payload(status: PlaybackStatus) -> serde_json::Value {
    json!(status.as_str())
}
