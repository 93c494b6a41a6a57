//! Event forwarding
//!
//! Per-kind handler tables replace a single all-purpose listener. Handlers
//! may be registered and removed from any thread; notification iterates a
//! snapshot, so a handler can unregister itself without deadlocking.

use crate::{
    error::Error,
    types::{MetadataFrame, PlaybackStatus, TextCue},
};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// Handle returned by a registration, used to remove it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub type StatusHandler = Arc<dyn Fn(PlaybackStatus) + Send + Sync>;
pub type ErrorHandler = Arc<dyn Fn(&Arc<Error>) + Send + Sync>;
pub type CuesHandler = Arc<dyn Fn(&[TextCue]) + Send + Sync>;
pub type MetadataHandler = Arc<dyn Fn(&[MetadataFrame]) + Send + Sync>;

struct HandlerTable<H> {
    entries: RwLock<Vec<(ListenerId, H)>>,
}

impl<H: Clone> HandlerTable<H> {
    fn new() -> Self {
        Self { entries: RwLock::new(Vec::new()) }
    }

    fn add(&self, id: ListenerId, handler: H) {
        self.entries.write().push((id, handler));
    }

    fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|(entry, _)| *entry != id);
        entries.len() != before
    }

    fn snapshot(&self) -> Vec<H> {
        self.entries.read().iter().map(|(_, h)| h.clone()).collect()
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }
}

/// Fans out controller events to registered handlers
pub struct EventForwarder {
    next_id: AtomicU64,
    status: HandlerTable<StatusHandler>,
    errors: HandlerTable<ErrorHandler>,
    cues: HandlerTable<CuesHandler>,
    metadata: HandlerTable<MetadataHandler>,
    status_tx: watch::Sender<PlaybackStatus>,
}

impl EventForwarder {
    pub fn new() -> Self {
        let (status_tx, _) = watch::channel(PlaybackStatus::Stopped);
        Self {
            next_id: AtomicU64::new(1),
            status: HandlerTable::new(),
            errors: HandlerTable::new(),
            cues: HandlerTable::new(),
            metadata: HandlerTable::new(),
            status_tx,
        }
    }

    fn next_id(&self) -> ListenerId {
        ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn on_status<F>(&self, handler: F) -> ListenerId
    where
        F: Fn(PlaybackStatus) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.status.add(id, Arc::new(handler));
        id
    }

    pub fn on_error<F>(&self, handler: F) -> ListenerId
    where
        F: Fn(&Arc<Error>) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.errors.add(id, Arc::new(handler));
        id
    }

    pub fn on_cues<F>(&self, handler: F) -> ListenerId
    where
        F: Fn(&[TextCue]) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.cues.add(id, Arc::new(handler));
        id
    }

    pub fn on_metadata<F>(&self, handler: F) -> ListenerId
    where
        F: Fn(&[MetadataFrame]) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.metadata.add(id, Arc::new(handler));
        id
    }

    /// Remove a registration of any kind. Returns false if it was unknown.
    pub fn remove(&self, id: ListenerId) -> bool {
        let removed = self.status.remove(id)
            || self.errors.remove(id)
            || self.cues.remove(id)
            || self.metadata.remove(id);
        if removed {
            debug!(listener = id.0, remaining = self.listener_count(), "Listener removed");
        }
        removed
    }

    /// Number of live registrations across all kinds
    pub fn listener_count(&self) -> usize {
        self.status.len() + self.errors.len() + self.cues.len() + self.metadata.len()
    }

    /// Last published status
    pub fn status(&self) -> PlaybackStatus {
        *self.status_tx.borrow()
    }

    /// Watch status changes
    pub fn subscribe_status(&self) -> watch::Receiver<PlaybackStatus> {
        self.status_tx.subscribe()
    }

    /// Publish a status and invoke every status handler
    pub fn notify_status(&self, status: PlaybackStatus) {
        self.status_tx.send_replace(status);
        debug!(%status, "Status changed");

        for handler in self.status.snapshot() {
            handler(status);
        }
    }

    /// Invoke every error handler, then publish `Error` status
    pub fn notify_error(&self, error: Arc<Error>) {
        for handler in self.errors.snapshot() {
            handler(&error);
        }
        self.notify_status(PlaybackStatus::Error);
    }

    pub fn notify_cues(&self, cues: &[TextCue]) {
        for handler in self.cues.snapshot() {
            handler(cues);
        }
    }

    pub fn notify_metadata(&self, frames: &[MetadataFrame]) {
        for handler in self.metadata.snapshot() {
            handler(frames);
        }
    }
}

impl Default for EventForwarder {
    fn default() -> Self {
        Self::new()
    }
}
