//! Playback session
//!
//! One session per `set_url`. It owns the in-flight build and, once built,
//! the player. Dropping a session tears both down.

use crate::{
    builder::BuildTask,
    engine::Player,
    types::{ContentType, SessionId},
};
use tracing::debug;
use url::Url;

/// A single playback attempt
pub struct Session {
    /// Unique session ID
    id: SessionId,
    /// Normalized source URI
    uri: Url,
    /// Content type, fixed for the session's lifetime
    content_type: ContentType,
    /// Desired-playing flag, applied to the player once it exists
    play_when_ready: bool,
    /// Renderer build, until it delivers or is cancelled
    build: Option<BuildTask>,
    /// Player, once the renderers are built
    player: Option<Box<dyn Player>>,
}

impl Session {
    pub fn new(uri: Url, content_type: ContentType) -> Self {
        Self {
            id: SessionId::new(),
            uri,
            content_type,
            play_when_ready: false,
            build: None,
            player: None,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Record the play-when-ready intent and forward it to the player
    pub fn set_play_when_ready(&mut self, play_when_ready: bool) {
        self.play_when_ready = play_when_ready;
        if let Some(player) = self.player.as_mut() {
            player.set_play_when_ready(play_when_ready);
        }
    }

    pub fn set_build(&mut self, build: BuildTask) {
        self.build = Some(build);
    }

    /// Drop the finished build task
    pub fn build_finished(&mut self) {
        self.build = None;
    }

    pub fn is_building(&self) -> bool {
        self.build.is_some()
    }

    /// Install the player; the session's intent is applied to it
    pub fn install_player(&mut self, mut player: Box<dyn Player>) -> &mut Box<dyn Player> {
        player.set_play_when_ready(self.play_when_ready);
        self.player.insert(player)
    }

    pub fn player(&self) -> Option<&dyn Player> {
        self.player.as_deref()
    }

    pub fn player_mut(&mut self) -> Option<&mut Box<dyn Player>> {
        self.player.as_mut()
    }

    /// Cancel the build and stop and release the player
    pub fn teardown(&mut self) {
        if let Some(build) = self.build.take() {
            build.cancel();
        }
        if let Some(mut player) = self.player.take() {
            player.stop();
            player.release();
        }
        debug!(
            session = %self.id,
            uri = %self.uri,
            content_type = %self.content_type,
            "Session torn down"
        );
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.is_building() || self.player.is_some() {
            self.teardown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::RendererSet;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Default)]
    struct Calls {
        log: Vec<&'static str>,
        play_when_ready: bool,
    }

    struct RecordingPlayer(Arc<Mutex<Calls>>);

    impl Player for RecordingPlayer {
        fn prepare(&mut self, _renderers: RendererSet) {
            self.0.lock().log.push("prepare");
        }
        fn set_play_when_ready(&mut self, play_when_ready: bool) {
            self.0.lock().play_when_ready = play_when_ready;
        }
        fn play_when_ready(&self) -> bool {
            self.0.lock().play_when_ready
        }
        fn seek_to(&mut self, _position_ms: i64) {}
        fn current_position(&self) -> Duration {
            Duration::ZERO
        }
        fn duration(&self) -> Option<Duration> {
            None
        }
        fn stop(&mut self) {
            self.0.lock().log.push("stop");
        }
        fn release(&mut self) {
            self.0.lock().log.push("release");
        }
    }

    fn session() -> Session {
        Session::new(
            Url::parse("https://cdn.example.com/a.m3u8").unwrap(),
            ContentType::Hls,
        )
    }

    #[test]
    fn test_intent_applied_on_install() {
        let calls = Arc::new(Mutex::new(Calls::default()));
        let mut session = session();
        session.set_play_when_ready(true);
        session.install_player(Box::new(RecordingPlayer(calls.clone())));

        assert!(calls.lock().play_when_ready);
        session.set_play_when_ready(false);
        assert!(!session.player().unwrap().play_when_ready());
    }

    #[test]
    fn test_teardown_stops_then_releases() {
        let calls = Arc::new(Mutex::new(Calls::default()));
        let mut session = session();
        session.install_player(Box::new(RecordingPlayer(calls.clone())));

        session.teardown();
        assert!(session.player().is_none());
        assert_eq!(calls.lock().log, vec!["stop", "release"]);

        drop(session);
        assert_eq!(calls.lock().log.len(), 2);
    }

    #[test]
    fn test_drop_releases_player() {
        let calls = Arc::new(Mutex::new(Calls::default()));
        let mut session = session();
        session.install_player(Box::new(RecordingPlayer(calls.clone())));
        drop(session);
        assert_eq!(calls.lock().log, vec!["stop", "release"]);
    }
}
