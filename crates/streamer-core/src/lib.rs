//! Streamer Core - playback session controller
//!
//! This crate drives a pluggable media engine for DASH, HLS, SmoothStreaming
//! and progressive sources:
//! - Content-type classification of URIs and paths
//! - Manifest probing (alternate audio, subtitles, protection, liveness)
//! - Renderer set construction per content type, cancellable in flight
//! - Session lifecycle state machine fed by engine callbacks
//! - Status, error, cue and metadata event forwarding
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Streamer Core                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐           │
//! │  │  Classifier  │  │   Renderer   │  │   Manifest   │           │
//! │  │              │  │   Builders   │──│    Probe     │           │
//! │  └──────┬───────┘  └──────┬───────┘  └──────┬───────┘           │
//! │         │                 │                 │                   │
//! │         └─────────────────┼──────────── Transport               │
//! │                           │                                     │
//! │                    ┌──────┴──────┐                              │
//! │                    │  Controller │◀──── ControllerHandle        │
//! │                    │  + Session  │                              │
//! │                    └──────┬──────┘                              │
//! │                           │                                     │
//! │  ┌──────────────┐  ┌──────┴──────┐  ┌──────────────┐            │
//! │  │    Media     │  │    Event    │  │    Event     │            │
//! │  │    Engine    │  │  Forwarder  │──│   Emitter    │            │
//! │  └──────────────┘  └─────────────┘  └──────────────┘            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod types;
pub mod config;
pub mod classifier;
pub mod transport;
pub mod manifest;
pub mod renderer;
pub mod builder;
pub mod engine;
pub mod events;
pub mod session;
pub mod controller;
pub mod bridge;

pub use error::{Error, Result};
pub use types::*;
pub use config::StreamerConfig;
pub use classifier::classify;
pub use transport::{HttpTransport, MemoryTransport, ProbeInfo, Transport};
pub use manifest::{ManifestInfo, MediaTrack};
pub use renderer::{Renderer, RendererSet, SampleSource, TrackSelection};
pub use builder::{BuildTask, BuilderFactory, DefaultBuilderFactory, RendererBuilder};
pub use engine::{EngineError, EngineEvent, EngineEventSink, EngineState, MediaEngine, Player, PlayerSpec};
pub use events::{EventForwarder, ListenerId};
pub use controller::{Controller, ControllerState, Signal};
pub use bridge::{ControllerHandle, EventEmitter, STATUS_CHANGED_EVENT};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the library
pub fn init() {
    tracing::info!(version = VERSION, "Streamer Core initialized");
}
