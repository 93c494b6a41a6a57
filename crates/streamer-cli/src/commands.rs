//! CLI command implementations

use crate::headless::HeadlessEngine;
use crate::output::{print_json, print_json_line, OutputFormat};
use anyhow::Context;
use serde::Serialize;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use streamer_core::{
    builder::{create_builder, DefaultBuilderFactory},
    classifier, ContentType, Controller, EventEmitter, HttpTransport, ManifestInfo, PlaybackStatus,
    RendererSet, StreamerConfig, Transport,
};
use tracing::{info, warn};

/// Load the configuration file, or defaults
pub fn load_config(path: Option<&Path>) -> anyhow::Result<StreamerConfig> {
    match path {
        Some(path) => StreamerConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(StreamerConfig::default()),
    }
}

#[derive(Serialize)]
struct Classification {
    input: String,
    uri: Option<String>,
    content_type: Option<ContentType>,
    error: Option<String>,
}

/// Classify sources by content type
pub fn classify(inputs: &[String], format: OutputFormat) -> anyhow::Result<()> {
    let results: Vec<Classification> = inputs
        .iter()
        .map(|input| match classifier::classify(input) {
            Ok((uri, content_type)) => Classification {
                input: input.clone(),
                uri: Some(uri.to_string()),
                content_type: Some(content_type),
                error: None,
            },
            Err(e) => Classification {
                input: input.clone(),
                uri: None,
                content_type: None,
                error: Some(e.to_string()),
            },
        })
        .collect();

    if format.is_json() {
        return print_json(&results);
    }

    for result in &results {
        match (&result.content_type, &result.error) {
            (Some(content_type), _) => println!("{:<18} {}", content_type.to_string(), result.input),
            (None, Some(error)) => println!("{:<18} {} ({})", "unsupported", result.input, error),
            (None, None) => {}
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct ProbeReport {
    uri: String,
    content_type: ContentType,
    manifest: Option<ManifestInfo>,
    renderers: RendererSet,
}

/// Build the renderer plan for a source; the manifest is fetched once
async fn probe_report(
    input: &str,
    transport: Arc<dyn Transport>,
    config: StreamerConfig,
) -> anyhow::Result<ProbeReport> {
    let (uri, content_type) = classifier::classify(input)?;
    let builder = create_builder(content_type, transport, Arc::new(config));
    let renderers = builder.build(&uri).await?;

    Ok(ProbeReport {
        uri: uri.to_string(),
        content_type,
        manifest: renderers.manifest().cloned(),
        renderers,
    })
}

/// Probe a source and print the renderer plan
pub async fn probe(input: &str, config: StreamerConfig, format: OutputFormat) -> anyhow::Result<()> {
    let transport = Arc::new(HttpTransport::new(&config)?);
    let report = probe_report(input, transport, config).await?;

    if format.is_json() {
        return print_json(&report);
    }

    println!("Source: {}", report.uri);
    println!("  Type: {}", report.content_type);
    if let Some(info) = &report.manifest {
        println!("  Live: {}", info.is_live);
        println!("  Duration: {:?}", info.duration);
        println!("  Variants: {}", info.variant_count);
        println!("  Protected: {}", info.protected);
        for track in info.audio_tracks.iter().chain(&info.subtitle_tracks) {
            println!(
                "  {:?} rendition: {} [{}] {}",
                track.kind,
                track.id,
                track.language.as_deref().unwrap_or("und"),
                track.uri
            );
        }
    }

    println!("\nRenderers:");
    for renderer in report.renderers.iter() {
        let sources = renderer.sources();
        if sources.is_empty() {
            println!("  {:?}: placeholder", renderer.kind());
            continue;
        }
        for source in sources {
            println!(
                "  {:?}: {:?} {} ({} KiB)",
                renderer.kind(),
                source.selection,
                source.uri,
                source.buffer_bytes / 1024
            );
        }
    }

    Ok(())
}

/// Headless playback options
pub struct PlayOptions {
    pub speed: f64,
    pub tick: Duration,
    pub start_paused: bool,
    pub seek: Option<f64>,
    pub limit: Option<Duration>,
}

/// Prints status events
struct StdoutEmitter {
    format: OutputFormat,
}

impl EventEmitter for StdoutEmitter {
    fn emit(&self, event: &str, payload: serde_json::Value) {
        if self.format.is_json() {
            print_json_line(&json!({ "event": event, "payload": payload }));
        } else {
            println!("{} {}", event, payload);
        }
    }
}

/// Drive a source through the controller with a headless engine
pub async fn play(
    input: &str,
    config: StreamerConfig,
    options: PlayOptions,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let transport = Arc::new(HttpTransport::new(&config)?);
    let builders = Arc::new(DefaultBuilderFactory::new(transport, Arc::new(config.clone())));
    let engine = Arc::new(HeadlessEngine::new(options.tick, options.speed));
    let handle = Controller::spawn(engine, builders, config);

    handle.attach_emitter(Arc::new(StdoutEmitter { format }));
    handle.on_error(|e| warn!(code = e.error_code(), "{}", e));
    handle.on_cues(|cues| {
        for cue in cues {
            info!(start = ?cue.start, "Cue: {}", cue.text);
        }
    });

    let mut status = handle.subscribe_status();
    handle.set_url(input).await?;
    if !options.start_paused {
        handle.play().await?;
    }
    if let Some(seconds) = options.seek {
        handle.seek_to_time(seconds).await?;
    }

    let limit = async {
        match options.limit {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(limit);

    let terminal = |s: &PlaybackStatus| matches!(s, PlaybackStatus::Finished | PlaybackStatus::Error);
    let last = tokio::select! {
        reached = status.wait_for(terminal) => reached.map(|s| *s).ok(),
        _ = &mut limit => None,
        _ = tokio::signal::ctrl_c() => None,
    };

    let position = handle.current_time().await?;
    let duration = handle.duration().await?;
    info!(position, duration, "Playback ended");
    handle.shutdown().await?;

    if last == Some(PlaybackStatus::Error) {
        anyhow::bail!("Playback failed for {}", input);
    }
    Ok(())
}
