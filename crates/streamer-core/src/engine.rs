//! Media engine interface
//!
//! The controller drives playback only through this narrow contract. An
//! engine constructs players; a player consumes a renderer set and reports
//! its lifecycle through an [`EngineEventSink`]. Decoding, buffering and
//! bitrate adaptation all happen behind it.

use crate::{
    controller::ControlMessage,
    error::{Error, Result},
    renderer::RendererSet,
    types::{MetadataFrame, SessionId, TextCue},
};
use std::time::Duration;
use tokio::sync::mpsc::WeakUnboundedSender;
use tracing::trace;

/// Player construction parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerSpec {
    /// Renderer slots the player must accept
    pub renderer_count: usize,
    /// Media buffered before playback starts
    pub min_buffer: Duration,
    /// Media buffered before playback resumes after a stall
    pub min_rebuffer: Duration,
}

/// Lifecycle state reported by a player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Loading or waiting for data
    Buffering,
    /// Able to play immediately
    Ready,
    /// Reached the end of the media
    Ended,
}

/// Failure raised by a player during or after prepare
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    DecoderInitialization(String),
    Crypto(String),
    AudioWrite(String),
    Playback(String),
}

impl From<EngineError> for Error {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::DecoderInitialization(msg) => Error::DecoderInitialization(msg),
            EngineError::Crypto(msg) => Error::Crypto(msg),
            EngineError::AudioWrite(msg) => Error::AudioWrite(msg),
            EngineError::Playback(msg) => Error::Playback(msg),
        }
    }
}

/// Callback reported by a player
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    StateChanged {
        play_when_ready: bool,
        state: EngineState,
    },
    Error(EngineError),
    Cues(Vec<TextCue>),
    Metadata(Vec<MetadataFrame>),
    DroppedFrames {
        count: u32,
        elapsed: Duration,
    },
}

/// Constructs players
pub trait MediaEngine: Send + Sync {
    /// Create a player; lifecycle callbacks go to `events`
    fn create_player(&self, spec: PlayerSpec, events: EngineEventSink) -> Result<Box<dyn Player>>;
}

/// A single player instance
pub trait Player: Send {
    /// Install the renderer set and start preparing
    fn prepare(&mut self, renderers: RendererSet);

    /// Set the play-when-ready intent
    fn set_play_when_ready(&mut self, play_when_ready: bool);

    /// Current play-when-ready intent
    fn play_when_ready(&self) -> bool;

    /// Seek to a position in milliseconds; the player clamps out-of-range values
    fn seek_to(&mut self, position_ms: i64);

    /// Current playback position
    fn current_position(&self) -> Duration;

    /// Media duration, if known
    fn duration(&self) -> Option<Duration>;

    /// Stop playback
    fn stop(&mut self);

    /// Release decoders and output devices
    fn release(&mut self);
}

/// Where a player posts its callbacks.
///
/// Callbacks may be reported from any thread; they are queued for the
/// controller's task and tagged with the session that created the player,
/// so events from a replaced player are discarded.
#[derive(Clone)]
pub struct EngineEventSink {
    session: SessionId,
    tx: WeakUnboundedSender<ControlMessage>,
}

impl EngineEventSink {
    pub(crate) fn new(session: SessionId, tx: WeakUnboundedSender<ControlMessage>) -> Self {
        Self { session, tx }
    }

    /// Session this sink reports for
    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn state_changed(&self, play_when_ready: bool, state: EngineState) {
        self.send(EngineEvent::StateChanged { play_when_ready, state });
    }

    pub fn error(&self, error: EngineError) {
        self.send(EngineEvent::Error(error));
    }

    pub fn cues(&self, cues: Vec<TextCue>) {
        self.send(EngineEvent::Cues(cues));
    }

    pub fn metadata(&self, frames: Vec<MetadataFrame>) {
        self.send(EngineEvent::Metadata(frames));
    }

    pub fn dropped_frames(&self, count: u32, elapsed: Duration) {
        self.send(EngineEvent::DroppedFrames { count, elapsed });
    }

    /// Post an event; dropped once the controller has shut down
    pub fn send(&self, event: EngineEvent) {
        match self.tx.upgrade() {
            Some(tx) => {
                let _ = tx.send(ControlMessage::Engine {
                    session: self.session,
                    event,
                });
            }
            None => trace!(session = %self.session, "Controller gone, dropping engine event"),
        }
    }
}
