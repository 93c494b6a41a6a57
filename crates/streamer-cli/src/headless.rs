//! Clock-driven media engine
//!
//! Decodes nothing. A headless player walks a virtual clock through the
//! renderer set's duration and reports the lifecycle a real engine would:
//! buffering, ready, then ended. Live sources (no duration) run until stopped.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use streamer_core::{
    EngineEventSink, EngineState, MediaEngine, Player, PlayerSpec, RendererSet, Result,
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Engine producing [`HeadlessPlayer`]s
pub struct HeadlessEngine {
    tick: Duration,
    speed: f64,
}

impl HeadlessEngine {
    /// `speed` is media time advanced per unit of wall time
    pub fn new(tick: Duration, speed: f64) -> Self {
        Self { tick, speed }
    }
}

impl MediaEngine for HeadlessEngine {
    fn create_player(&self, spec: PlayerSpec, events: EngineEventSink) -> Result<Box<dyn Player>> {
        debug!(session = %events.session(), ?spec, "Creating headless player");
        Ok(Box::new(HeadlessPlayer {
            clock: Arc::new(Mutex::new(Clock::default())),
            spec,
            tick: self.tick,
            speed: self.speed,
            events,
            token: CancellationToken::new(),
        }))
    }
}

#[derive(Debug, Default)]
struct Clock {
    position: Duration,
    duration: Option<Duration>,
    play_when_ready: bool,
    state: Option<EngineState>,
}

pub struct HeadlessPlayer {
    clock: Arc<Mutex<Clock>>,
    spec: PlayerSpec,
    tick: Duration,
    speed: f64,
    events: EngineEventSink,
    token: CancellationToken,
}

impl HeadlessPlayer {
    fn report(clock: &Mutex<Clock>, events: &EngineEventSink, state: EngineState) {
        let play_when_ready = {
            let mut clock = clock.lock();
            clock.state = Some(state);
            clock.play_when_ready
        };
        events.state_changed(play_when_ready, state);
    }
}

/// `duration * factor`, saturating instead of panicking on overflow
fn scaled(duration: Duration, factor: f64) -> Duration {
    match Duration::try_from_secs_f64(duration.as_secs_f64() * factor) {
        Ok(scaled) => scaled,
        Err(_) if factor > 0.0 => Duration::MAX,
        Err(_) => Duration::ZERO,
    }
}

impl Player for HeadlessPlayer {
    fn prepare(&mut self, renderers: RendererSet) {
        self.clock.lock().duration = renderers.duration();

        let clock = self.clock.clone();
        let events = self.events.clone();
        let token = self.token.clone();
        let (tick, speed, preroll) = (self.tick, self.speed, self.spec.min_buffer);

        tokio::spawn(async move {
            Self::report(&clock, &events, EngineState::Buffering);

            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(scaled(preroll, speed.recip())) => {}
            }
            Self::report(&clock, &events, EngineState::Ready);

            let mut ticker = tokio::time::interval(tick);
            loop {
                tokio::select! {
                    _ = token.cancelled() => return,
                    _ = ticker.tick() => {}
                }

                let ended = {
                    let mut clock = clock.lock();
                    if clock.play_when_ready && clock.state == Some(EngineState::Ready) {
                        clock.position = clock.position.saturating_add(scaled(tick, speed));
                    }
                    match clock.duration {
                        Some(duration) if clock.position >= duration => {
                            clock.position = duration;
                            true
                        }
                        _ => false,
                    }
                };

                if ended {
                    Self::report(&clock, &events, EngineState::Ended);
                    return;
                }
            }
        });
    }

    fn set_play_when_ready(&mut self, play_when_ready: bool) {
        let state = {
            let mut clock = self.clock.lock();
            let changed = clock.play_when_ready != play_when_ready;
            clock.play_when_ready = play_when_ready;
            clock.state.filter(|_| changed)
        };
        if let Some(state) = state {
            self.events.state_changed(play_when_ready, state);
        }
    }

    fn play_when_ready(&self) -> bool {
        self.clock.lock().play_when_ready
    }

    fn seek_to(&mut self, position_ms: i64) {
        let mut clock = self.clock.lock();
        let target = Duration::from_millis(position_ms.max(0) as u64);
        clock.position = match clock.duration {
            Some(duration) => target.min(duration),
            None => target,
        };
    }

    fn current_position(&self) -> Duration {
        self.clock.lock().position
    }

    fn duration(&self) -> Option<Duration> {
        self.clock.lock().duration
    }

    fn stop(&mut self) {
        self.token.cancel();
    }

    fn release(&mut self) {
        self.token.cancel();
        debug!(session = %self.events.session(), "Headless player released");
    }
}

impl Drop for HeadlessPlayer {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
