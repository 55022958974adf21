use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Result;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use stagehand_common::{load_sequence, Config, LogFormat, StepKind};
use stagehand_engine::{EngineSettings, SequenceConfig, SequenceEngine};

mod renderer;

use renderer::{render_feed, CompletionLatch};

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();
    let config = Config::from_env()?;

    // Initialize logging
    let filter = EnvFilter::from_default_env().add_directive("stagehand=info".parse()?);
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    info!("Stagehand runner starting...");
    if let Some(e) = dotenv_problem(&dotenv) {
        warn!(error = %e, "Failed to load .env");
    }
    config.log_summary();

    // Optional path argument overrides STAGEHAND_SEQUENCE
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| config.sequence_path.clone());
    let file = load_sequence(&path)?;
    let steps = file.steps()?;

    info!(
        sequence = %path.display(),
        steps = steps.len(),
        reversed = file.reversed,
        animate = file.animate,
        "Loaded sequence"
    );

    let kinds: HashMap<String, StepKind> = steps
        .iter()
        .map(|s| (s.id().clone(), s.kind()))
        .collect();

    let (latch, mut done) = CompletionLatch::channel();
    let engine: SequenceEngine<String, String> =
        SequenceEngine::builder(EngineSettings::from(&config))
            .with_observer(latch)
            .build();
    engine.configure(
        SequenceConfig::new(steps)
            .reversed(file.reversed)
            .animate(file.animate),
    );

    let renderer = tokio::spawn(render_feed(engine.subscribe(), kinds));

    // Raise the start signal and lower it once the run has ended
    let (signal, signal_rx) = watch::channel(false);
    let follower = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.follow_signal(signal_rx).await })
    };
    signal.send(true)?;

    let summary = done
        .wait_for(|s| s.is_some())
        .await?
        .clone();
    signal.send(false)?;
    drop(signal);
    follower.await?;

    // The renderer drains the feed and exits once the engine's sender is gone
    drop(engine);
    renderer.await?;

    if let Some(summary) = summary {
        info!("Sequence complete. {summary}");
    }
    Ok(())
}

/// A missing `.env` is normal; anything else is worth a warning.
fn dotenv_problem(result: &dotenvy::Result<PathBuf>) -> Option<&dotenvy::Error> {
    match result {
        Err(e) if !e.not_found() => Some(e),
        _ => None,
    }
}
