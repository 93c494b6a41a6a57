//! Playback session controller
//!
//! The controller runs on a single tokio task and is the only writer of the
//! session and the controller state. Commands from handles, builder
//! completions and engine callbacks all arrive on one queue, so they are
//! applied strictly in order.
//!
//! ```text
//!   ControllerHandle ──┐
//!   BuildTask ─────────┼──▶ ControlMessage queue ──▶ Controller ──▶ EventForwarder
//!   EngineEventSink ───┘                               │
//!                                                      └──▶ Session { BuildTask, Player }
//! ```

use crate::{
    bridge::ControllerHandle,
    builder::{BuildTask, BuilderFactory},
    classifier,
    config::StreamerConfig,
    engine::{EngineEvent, EngineEventSink, EngineState, MediaEngine},
    error::{Error, Result},
    events::EventForwarder,
    renderer::RendererSet,
    session::Session,
    types::{PlaybackStatus, SessionId},
};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, WeakUnboundedSender};
use tokio::sync::oneshot;
use tracing::{debug, error, info, instrument, warn};

/// Controller lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerState {
    /// No session
    Stopped,
    /// Renderers are being built
    Preparing,
    /// The player is loading or waiting for data
    Buffering,
    Playing,
    Paused,
    Finished,
    Error,
}

impl ControllerState {
    pub const ALL: [ControllerState; 7] = [
        ControllerState::Stopped,
        ControllerState::Preparing,
        ControllerState::Buffering,
        ControllerState::Playing,
        ControllerState::Paused,
        ControllerState::Finished,
        ControllerState::Error,
    ];

    /// Next state for a signal. Every signal is accepted in every state.
    pub fn next(self, signal: Signal) -> ControllerState {
        match signal {
            Signal::Prepare => ControllerState::Preparing,
            Signal::Buffering => ControllerState::Buffering,
            Signal::Ready { play_when_ready: true } => ControllerState::Playing,
            Signal::Ready { play_when_ready: false } => ControllerState::Paused,
            Signal::Ended => ControllerState::Finished,
            Signal::Failure => ControllerState::Error,
            Signal::Teardown => ControllerState::Stopped,
        }
    }

    /// Status reported to the embedding application.
    ///
    /// Preparing has no status of its own; the source is loading, which the
    /// application sees as buffering.
    pub fn status(self) -> PlaybackStatus {
        match self {
            ControllerState::Stopped => PlaybackStatus::Stopped,
            ControllerState::Preparing | ControllerState::Buffering => PlaybackStatus::Buffering,
            ControllerState::Playing => PlaybackStatus::Playing,
            ControllerState::Paused => PlaybackStatus::Paused,
            ControllerState::Finished => PlaybackStatus::Finished,
            ControllerState::Error => PlaybackStatus::Error,
        }
    }
}

impl std::fmt::Display for ControllerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// Input driving a state transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// A new source was set and its build started
    Prepare,
    /// Engine reported buffering
    Buffering,
    /// Engine reported ready
    Ready { play_when_ready: bool },
    /// Engine reported end of media
    Ended,
    /// Classification, build, player construction or engine failure
    Failure,
    /// Session torn down
    Teardown,
}

impl Signal {
    pub const ALL: [Signal; 7] = [
        Signal::Prepare,
        Signal::Buffering,
        Signal::Ready { play_when_ready: true },
        Signal::Ready { play_when_ready: false },
        Signal::Ended,
        Signal::Failure,
        Signal::Teardown,
    ];
}

impl From<EngineState> for Signal {
    fn from(state: EngineState) -> Self {
        match state {
            EngineState::Buffering => Signal::Buffering,
            EngineState::Ready => Signal::Ready { play_when_ready: false },
            EngineState::Ended => Signal::Ended,
        }
    }
}

/// Messages processed by the control task
pub(crate) enum ControlMessage {
    SetUrl { uri: String, ack: oneshot::Sender<()> },
    Play { ack: oneshot::Sender<()> },
    Pause { ack: oneshot::Sender<()> },
    Remove { ack: oneshot::Sender<()> },
    SeekTo { seconds: f64, ack: oneshot::Sender<()> },
    CurrentTime { reply: oneshot::Sender<f64> },
    Duration { reply: oneshot::Sender<f64> },
    Shutdown { ack: oneshot::Sender<()> },
    BuildFinished { session: SessionId, outcome: Result<RendererSet> },
    Engine { session: SessionId, event: EngineEvent },
}

/// Owns the single active session and drives the lifecycle state machine
pub struct Controller {
    engine: Arc<dyn MediaEngine>,
    builders: Arc<dyn BuilderFactory>,
    config: Arc<StreamerConfig>,
    events: Arc<EventForwarder>,
    /// Weak so the loop ends once every handle is dropped
    tx: WeakUnboundedSender<ControlMessage>,
    state: ControllerState,
    session: Option<Session>,
}

impl Controller {
    /// Start a controller on the current tokio runtime
    pub fn spawn(
        engine: Arc<dyn MediaEngine>,
        builders: Arc<dyn BuilderFactory>,
        config: StreamerConfig,
    ) -> ControllerHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let events = Arc::new(EventForwarder::new());

        let controller = Controller {
            engine,
            builders,
            config: Arc::new(config),
            events: events.clone(),
            tx: tx.downgrade(),
            state: ControllerState::Stopped,
            session: None,
        };
        tokio::spawn(controller.run(rx));

        ControllerHandle::new(tx, events)
    }

    async fn run(mut self, mut rx: UnboundedReceiver<ControlMessage>) {
        info!("Controller started");

        while let Some(message) = rx.recv().await {
            if let ControlMessage::Shutdown { ack } = message {
                self.teardown();
                let _ = ack.send(());
                break;
            }
            self.handle(message);
        }

        if let Some(mut session) = self.session.take() {
            session.teardown();
        }
        info!("Controller stopped");
    }

    fn handle(&mut self, message: ControlMessage) {
        match message {
            ControlMessage::SetUrl { uri, ack } => {
                self.set_url(&uri);
                let _ = ack.send(());
            }
            ControlMessage::Play { ack } => {
                self.set_play_when_ready(true);
                let _ = ack.send(());
            }
            ControlMessage::Pause { ack } => {
                self.set_play_when_ready(false);
                let _ = ack.send(());
            }
            ControlMessage::Remove { ack } => {
                self.teardown();
                let _ = ack.send(());
            }
            ControlMessage::SeekTo { seconds, ack } => {
                self.seek_to(seconds);
                let _ = ack.send(());
            }
            ControlMessage::CurrentTime { reply } => {
                let _ = reply.send(self.current_time());
            }
            ControlMessage::Duration { reply } => {
                let _ = reply.send(self.duration());
            }
            ControlMessage::BuildFinished { session, outcome } => {
                self.on_build_finished(session, outcome);
            }
            ControlMessage::Engine { session, event } => {
                self.on_engine_event(session, event);
            }
            // Handled by the run loop
            ControlMessage::Shutdown { ack } => {
                let _ = ack.send(());
            }
        }
    }

    fn transition(&mut self, signal: Signal) {
        let from = self.state;
        self.state = from.next(signal);
        debug!(%from, to = %self.state, ?signal, "State transition");
        self.events.notify_status(self.state.status());
    }

    fn fail(&mut self, error: Error) {
        if error.is_engine_failure() {
            error!(code = error.error_code(), state = %self.state, "{}", error);
        } else {
            warn!(code = error.error_code(), state = %self.state, "{}", error);
        }
        self.state = self.state.next(Signal::Failure);
        self.events.notify_error(Arc::new(error));
    }

    /// Tear down the session, reporting `Stopped` unless already idle
    fn teardown(&mut self) {
        let had_session = match self.session.take() {
            Some(mut session) => {
                session.teardown();
                true
            }
            None => false,
        };

        if had_session || self.state != ControllerState::Stopped {
            self.transition(Signal::Teardown);
        }
    }

    #[instrument(skip(self))]
    fn set_url(&mut self, input: &str) {
        self.teardown();

        let (uri, content_type) = match classifier::classify(input) {
            Ok(classified) => classified,
            Err(e) => {
                self.fail(e);
                return;
            }
        };

        let mut session = Session::new(uri.clone(), content_type);
        let id = session.id();
        let builder = self.builders.create(content_type);

        let tx = self.tx.clone();
        let build = BuildTask::spawn(
            builder,
            uri.clone(),
            Box::new(move |outcome| {
                if let Some(tx) = tx.upgrade() {
                    let _ = tx.send(ControlMessage::BuildFinished { session: id, outcome });
                }
            }),
        );
        session.set_build(build);
        self.session = Some(session);

        info!(session = %id, %uri, %content_type, "Preparing source");
        self.transition(Signal::Prepare);
    }

    fn set_play_when_ready(&mut self, play_when_ready: bool) {
        match self.session.as_mut() {
            Some(session) => session.set_play_when_ready(play_when_ready),
            None => debug!(play_when_ready, "No session, ignoring"),
        }
    }

    fn seek_to(&mut self, seconds: f64) {
        if let Some(player) = self.session.as_mut().and_then(|s| s.player_mut()) {
            player.seek_to((seconds * 1000.0) as i64);
        }
    }

    fn current_time(&self) -> f64 {
        self.session
            .as_ref()
            .and_then(|s| s.player())
            .map_or(0.0, |p| p.current_position().as_secs_f64())
    }

    fn duration(&self) -> f64 {
        self.session
            .as_ref()
            .and_then(|s| s.player())
            .and_then(|p| p.duration())
            .map_or(0.0, |d| d.as_secs_f64())
    }

    /// Whether `id` names the live session; stale messages are logged
    fn is_current(&self, id: SessionId, what: &str) -> bool {
        let current = self.session.as_ref().map(Session::id) == Some(id);
        if !current {
            debug!(session = %id, "Discarding stale {}", what);
        }
        current
    }

    fn on_build_finished(&mut self, id: SessionId, outcome: Result<RendererSet>) {
        if !self.is_current(id, "build completion") {
            return;
        }

        let renderers = match outcome {
            Ok(renderers) => renderers,
            Err(e) => {
                if let Some(session) = self.session.as_mut() {
                    session.build_finished();
                }
                self.fail(e);
                return;
            }
        };

        let sink = EngineEventSink::new(id, self.tx.clone());
        let created = self.engine.create_player(self.config.player_spec(), sink);

        let Some(session) = self.session.as_mut() else { return };
        session.build_finished();

        match created {
            Ok(player) => {
                info!(
                    session = %id,
                    renderers = renderers.active_count(),
                    "Renderers built, preparing player"
                );
                session.install_player(player).prepare(renderers);
            }
            Err(e) => self.fail(e),
        }
    }

    fn on_engine_event(&mut self, id: SessionId, event: EngineEvent) {
        if !self.is_current(id, "engine event") {
            return;
        }

        match event {
            EngineEvent::StateChanged { play_when_ready, state } => {
                let signal = match Signal::from(state) {
                    Signal::Ready { .. } => Signal::Ready { play_when_ready },
                    signal => signal,
                };
                self.transition(signal);
            }
            EngineEvent::Error(e) => self.fail(e.into()),
            EngineEvent::Cues(cues) => self.events.notify_cues(&cues),
            EngineEvent::Metadata(frames) => self.events.notify_metadata(&frames),
            EngineEvent::DroppedFrames { count, elapsed } => {
                debug!(session = %id, count, ?elapsed, "Dropped frames");
            }
        }
    }
}
