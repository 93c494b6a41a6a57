//! Test doubles for the media engine

#![allow(dead_code)]

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use streamer_core::{
    builder::DefaultBuilderFactory, Controller, ControllerHandle, EngineError, EngineEventSink,
    EngineState, MediaEngine, MemoryTransport, PlaybackStatus, Player, PlayerSpec, RendererSet,
    Result, StreamerConfig,
};

/// Observable side of a fake player
#[derive(Default)]
pub struct PlayerLog {
    pub spec: Option<PlayerSpec>,
    pub prepared: Vec<RendererSet>,
    pub play_when_ready: bool,
    pub state: Option<EngineState>,
    pub seeks: Vec<i64>,
    pub position: Duration,
    pub duration: Option<Duration>,
    pub stopped: bool,
    pub released: bool,
}

/// Handle a test uses to drive a player the controller owns
#[derive(Clone)]
pub struct PlayerProbe {
    pub sink: EngineEventSink,
    pub log: Arc<Mutex<PlayerLog>>,
}

impl PlayerProbe {
    /// Report a lifecycle state with the player's current intent
    pub fn report(&self, state: EngineState) {
        let play_when_ready = {
            let mut log = self.log.lock();
            log.state = Some(state);
            log.play_when_ready
        };
        self.sink.state_changed(play_when_ready, state);
    }

    pub fn fail(&self, error: EngineError) {
        self.sink.error(error);
    }

    pub fn prepared_count(&self) -> usize {
        self.log.lock().prepared.len()
    }
}

struct FakePlayer {
    sink: EngineEventSink,
    log: Arc<Mutex<PlayerLog>>,
}

impl Player for FakePlayer {
    fn prepare(&mut self, renderers: RendererSet) {
        let mut log = self.log.lock();
        log.duration = renderers.duration();
        log.prepared.push(renderers);
    }

    fn set_play_when_ready(&mut self, play_when_ready: bool) {
        let state = {
            let mut log = self.log.lock();
            let changed = log.play_when_ready != play_when_ready;
            log.play_when_ready = play_when_ready;
            log.state.filter(|_| changed)
        };
        // Like a real player, only an actual change is re-reported
        if let Some(state) = state {
            self.sink.state_changed(play_when_ready, state);
        }
    }

    fn play_when_ready(&self) -> bool {
        self.log.lock().play_when_ready
    }

    fn seek_to(&mut self, position_ms: i64) {
        let mut log = self.log.lock();
        log.seeks.push(position_ms);
        log.position = Duration::from_millis(position_ms.max(0) as u64);
    }

    fn current_position(&self) -> Duration {
        self.log.lock().position
    }

    fn duration(&self) -> Option<Duration> {
        self.log.lock().duration
    }

    fn stop(&mut self) {
        self.log.lock().stopped = true;
    }

    fn release(&mut self) {
        self.log.lock().released = true;
    }
}

/// Engine producing fake players
#[derive(Default)]
pub struct FakeEngine {
    players: Mutex<Vec<PlayerProbe>>,
    refuse: Mutex<bool>,
}

impl FakeEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make player construction fail
    pub fn refuse_players(&self) {
        *self.refuse.lock() = true;
    }

    pub fn players(&self) -> Vec<PlayerProbe> {
        self.players.lock().clone()
    }

    pub fn last_player(&self) -> Option<PlayerProbe> {
        self.players.lock().last().cloned()
    }
}

impl MediaEngine for FakeEngine {
    fn create_player(&self, spec: PlayerSpec, events: EngineEventSink) -> Result<Box<dyn Player>> {
        if *self.refuse.lock() {
            return Err(EngineError::DecoderInitialization("no decoder available".into()).into());
        }

        let log = Arc::new(Mutex::new(PlayerLog {
            spec: Some(spec),
            ..Default::default()
        }));
        self.players.lock().push(PlayerProbe {
            sink: events.clone(),
            log: log.clone(),
        });
        Ok(Box::new(FakePlayer { sink: events, log }))
    }
}

pub const HLS_URI: &str = "https://host.example.com/video.m3u8";
pub const DASH_URI: &str = "https://host.example.com/video.mpd";

pub const HLS_MASTER: &str = r#"#EXTM3U
#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID="aud",NAME="English",LANGUAGE="en",URI="audio/en.m3u8"
#EXT-X-MEDIA:TYPE=SUBTITLES,GROUP-ID="subs",NAME="English",LANGUAGE="en",URI="subs/en.m3u8"
#EXT-X-STREAM-INF:BANDWIDTH=2000000,RESOLUTION=1280x720,CODECS="avc1.64001f,mp4a.40.2",AUDIO="aud",SUBTITLES="subs"
720p.m3u8
"#;

pub const DASH_MPD: &str = r#"<MPD type="static" mediaPresentationDuration="PT2M"><Period>
<AdaptationSet contentType="video"><Representation id="v" bandwidth="1000000"/></AdaptationSet>
</Period></MPD>"#;

pub struct Harness {
    pub handle: ControllerHandle,
    pub engine: Arc<FakeEngine>,
    pub transport: Arc<MemoryTransport>,
    pub statuses: Arc<Mutex<Vec<PlaybackStatus>>>,
}

impl Harness {
    pub fn new() -> Self {
        let transport = Arc::new(MemoryTransport::new());
        transport.insert(HLS_URI, HLS_MASTER, Some("application/vnd.apple.mpegurl"));
        transport.insert(DASH_URI, DASH_MPD, Some("application/dash+xml"));

        let config = StreamerConfig::default();
        let engine = FakeEngine::new();
        let builders = Arc::new(DefaultBuilderFactory::new(
            transport.clone(),
            Arc::new(config.clone()),
        ));
        let handle = Controller::spawn(engine.clone(), builders, config);

        let statuses = Arc::new(Mutex::new(Vec::new()));
        let recorded = statuses.clone();
        handle.on_status(move |status| recorded.lock().push(status));

        Self {
            handle,
            engine,
            transport,
            statuses,
        }
    }

    pub fn statuses(&self) -> Vec<PlaybackStatus> {
        self.statuses.lock().clone()
    }

    pub fn clear_statuses(&self) {
        self.statuses.lock().clear();
    }

    /// Wait for the `n`th player to be created
    pub async fn player(&self, n: usize) -> PlayerProbe {
        let engine = self.engine.clone();
        wait_until(|| engine.players().len() > n).await;
        self.engine.players()[n].clone()
    }

    /// Wait until the status handler has seen `status`
    pub async fn status_seen(&self, status: PlaybackStatus) {
        let statuses = self.statuses.clone();
        wait_until(move || statuses.lock().contains(&status)).await;
    }
}

/// Poll `condition` until it holds, failing the test after two seconds
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    let polled = async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    };
    tokio::time::timeout(Duration::from_secs(2), polled)
        .await
        .expect("condition not reached in time");
}

/// Let queued control messages drain
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}
