use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use mosaic_frame::canvas::RasterCanvas;
use mosaic_frame::config::Configuration;
use mosaic_frame::events::EngineEvent;
use mosaic_frame::processing::layout::canvas_size;
use mosaic_frame::tasks::engine::Engine;
use mosaic_frame::tasks::input::{self, HostRequest};

#[derive(Debug, Parser)]
#[command(
    name = "mosaic-frame",
    version,
    about = "animated pointillist mosaic slideshow"
)]
struct Args {
    /// Path to YAML config; built-in defaults are used when omitted
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,
    /// Theme folder to play (`<library>/<theme>_dominant`)
    #[arg(long)]
    theme: Option<String>,
    /// Deterministic RNG seed for jitter and shuffling
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,
    /// Stop after this long (e.g. "30s", "2m")
    #[arg(long = "run-for", value_name = "DURATION", value_parser = humantime::parse_duration)]
    run_for: Option<Duration>,
    /// Raise log verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let Args {
        config,
        theme,
        seed,
        run_for,
        verbose,
    } = Args::parse();

    // init tracing (RUST_LOG controls level, default = info)
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_target(false)
        .compact()
        .init();

    let mut cfg = match &config {
        Some(path) => Configuration::from_yaml_file(path)
            .with_context(|| format!("failed to parse config at {}", path.display()))?,
        None => Configuration::default(),
    };
    if let Some(theme) = theme {
        cfg.theme = theme;
    }
    if seed.is_some() {
        cfg.seed = seed;
    }
    let cfg = cfg.validated().context("invalid configuration")?;
    info!(
        library = %cfg.library_path.display(),
        theme = %cfg.theme,
        "config loaded"
    );

    let cancel = CancellationToken::new();
    let (req_tx, req_rx) = mpsc::channel::<HostRequest>(16);
    let (cmd_tx, cmd_rx) = mpsc::channel(16);
    let (events_tx, mut events_rx) = mpsc::unbounded_channel::<EngineEvent>();

    let mut tasks = JoinSet::new();

    // Ctrl-C → cancel
    {
        let cancel = cancel.clone();
        tasks.spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            cancel.cancel();
            Ok(())
        });
    }

    if let Some(limit) = run_for {
        let cancel = cancel.clone();
        tasks.spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(limit) => {
                    info!(?limit, "run-for elapsed; shutting down");
                    cancel.cancel();
                }
            }
            Ok(())
        });
    }

    // stdin controls
    {
        std::thread::spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                match input::parse_request(&line) {
                    Some(req) => {
                        if req_tx.blocking_send(req).is_err() {
                            break;
                        }
                    }
                    None if line.trim().is_empty() => {}
                    None => warn!(line = %line.trim(), "unrecognised command"),
                }
            }
        });
    }

    {
        let export_dir = cfg.export_dir.clone().unwrap_or_else(|| PathBuf::from("."));
        let dpr = cfg.viewport.device_pixel_ratio;
        let cancel = cancel.clone();
        tasks.spawn(async move {
            input::forward(req_rx, cmd_tx, export_dir, dpr, cancel)
                .await
                .context("input task failed")
        });
    }

    tasks.spawn(async move {
        while let Some(event) = events_rx.recv().await {
            match event {
                EngineEvent::Loaded { count, path } => {
                    debug!(count, path = %path.display(), "image loaded")
                }
                EngineEvent::Processing { index, total } => {
                    debug!(index, total, "generating mosaic")
                }
                EngineEvent::Ready { sessions } => info!(sessions, "mosaic ready"),
                EngineEvent::Switched { index } => info!(index, "switched image"),
                EngineEvent::ModeChanged(mode) => info!(?mode, "mode changed"),
            }
        }
        Ok(())
    });

    let (width, height) = canvas_size(&cfg.viewport);
    let theme = cfg.theme.clone();
    let engine_cancel = cancel.clone();
    let engine = async move {
        let mut engine = Engine::start(
            cfg,
            &theme,
            RasterCanvas::new(width, height),
            Some(events_tx),
            &engine_cancel,
        )
        .await?;
        engine.run(cmd_rx, engine_cancel).await
    };

    let result = engine.await;
    cancel.cancel();
    tasks.abort_all();
    while let Some(res) = tasks.join_next().await {
        match res {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::error!("task error: {err:?}"),
            Err(err) if err.is_cancelled() => {}
            Err(err) => tracing::error!("join error: {err:?}"),
        }
    }
    result
}
