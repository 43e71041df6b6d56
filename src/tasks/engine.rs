use anyhow::{Context, Result};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::select;
use tokio::sync::mpsc::{Receiver, UnboundedReceiver, UnboundedSender};
use tokio::time::{Instant, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::canvas::Canvas;
use crate::config::{Configuration, Viewport};
use crate::error::MosaicError;
use crate::events::{DecayTick, EngineCommand, EngineEvent};
use crate::playback::{DecayTimer, Mode, PlaybackController};
use crate::processing::layout::canvas_size;
use crate::session::ImageSession;
use crate::tasks::{files, loader};

/// A started engine: controller plus the decay ticks addressed to it.
pub struct Engine<C: Canvas> {
    controller: PlaybackController<C>,
    decay_rx: UnboundedReceiver<DecayTick>,
    cfg: Configuration,
}

impl<C: Canvas> Engine<C> {
    /// List, load and generate the image sequence for `theme`, then reveal the
    /// first image statically.
    ///
    /// `canvas` is resized to the configured viewport before generation.
    #[instrument(skip_all, fields(theme = %theme))]
    pub async fn start(
        cfg: Configuration,
        theme: &str,
        mut canvas: C,
        events: Option<UnboundedSender<EngineEvent>>,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        let dir = cfg.theme_dir(theme);
        let paths = files::list_images(&dir);
        let opts = surface_options(&cfg, &cfg.viewport);
        let loaded = loader::load_sequence(&paths, opts, events.as_ref()).await;
        if loaded.is_empty() {
            return Err(MosaicError::NoImagesAvailable {
                theme: theme.to_string(),
            }
            .into());
        }

        let sessions = into_sessions(loaded);

        let (width, height) = canvas_size(&cfg.viewport);
        canvas.resize(width, height);

        let rng = match cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let (decay, decay_rx) =
            DecayTimer::channel(cfg.playback.decay_interval, cancel.child_token());
        let mut controller = PlaybackController::new(
            canvas,
            sessions,
            cfg.mosaic.clone(),
            cfg.playback.clone(),
            rng,
            decay,
            theme,
        )?;
        if let Some(tx) = events {
            controller = controller.with_events(tx);
        }
        controller
            .regenerate_all()
            .await
            .context("generating mosaic sessions")?;
        controller.start(Instant::now());
        info!(
            sessions = controller.sessions().len(),
            width, height, "engine started"
        );
        Ok(Self {
            controller,
            decay_rx,
            cfg,
        })
    }

    pub fn controller(&self) -> &PlaybackController<C> {
        &self.controller
    }

    /// Drive playback until cancelled, the command channel closes, or a
    /// `Shutdown` command arrives.
    ///
    /// Frames, decay ticks, auto-skip checks and commands are all handled on
    /// this one task; none of them runs concurrently with another.
    pub async fn run(
        &mut self,
        mut commands: Receiver<EngineCommand>,
        cancel: CancellationToken,
    ) -> Result<()> {
        let mut frames = interval(self.cfg.playback.frame_interval);
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut auto_skip = interval(self.cfg.playback.auto_skip_check);
        auto_skip.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let looping = self.controller.mode() == Mode::Loop;
            select! {
                _ = cancel.cancelled() => {
                    info!("cancel received; exiting engine");
                    break;
                }

                _ = frames.tick(), if looping => {
                    self.controller.on_frame(Instant::now());
                }

                Some(tick) = self.decay_rx.recv() => {
                    self.controller.on_decay_tick(tick);
                }

                _ = auto_skip.tick() => {
                    self.controller.check_auto_skip(Instant::now());
                }

                cmd = commands.recv() => match cmd {
                    Some(EngineCommand::Shutdown) | None => {
                        info!("command channel finished; exiting engine");
                        break;
                    }
                    Some(cmd) => self.handle(cmd).await?,
                }
            }
        }
        Ok(())
    }

    async fn handle(&mut self, cmd: EngineCommand) -> Result<()> {
        debug!(?cmd, "command");
        let now = Instant::now();
        match cmd {
            EngineCommand::ToggleMode => self.controller.toggle_mode(now),
            EngineCommand::SkipToNext => self.controller.skip_to_next(now),
            EngineCommand::SkipTo(index) => {
                if let Err(err) = self.controller.skip_to(index, now) {
                    warn!(%err, "skip ignored");
                }
            }
            EngineCommand::Resize(viewport) => {
                if let Err(err) = viewport.validate() {
                    warn!(error = %err, "resize ignored");
                    return Ok(());
                }
                let (w, h) = canvas_size(&viewport);
                if (viewport.aspect() - self.cfg.viewport.aspect()).abs() > f32::EPSILON {
                    self.reload_surfaces(&viewport).await?;
                }
                self.cfg.viewport = viewport;
                self.controller
                    .on_resize(w, h, now)
                    .await
                    .with_context(|| format!("regenerating for {w}x{h}"))?;
            }
            EngineCommand::Export(reply) => {
                let _ = reply.send(self.controller.export_current_frame());
            }
            EngineCommand::Shutdown => {}
        }
        Ok(())
    }

    /// Surfaces are cropped to the viewport aspect, so a new aspect means
    /// decoding the sequence again.
    ///
    /// If any image no longer loads, the current surfaces are kept and only
    /// regenerated for the new geometry.
    async fn reload_surfaces(&mut self, viewport: &Viewport) -> Result<()> {
        let paths: Vec<PathBuf> = self
            .controller
            .sessions()
            .iter()
            .map(|s| s.id().clone())
            .collect();
        let opts = surface_options(&self.cfg, viewport);
        let loaded = loader::load_sequence(&paths, opts, None).await;
        if loaded.len() < paths.len() {
            warn!(
                loaded = loaded.len(),
                sessions = paths.len(),
                "reload incomplete; keeping current surfaces"
            );
            return Ok(());
        }
        info!(loaded = loaded.len(), "surfaces reloaded for new aspect");
        self.controller.replace_sessions(into_sessions(loaded))?;
        Ok(())
    }
}

fn surface_options(cfg: &Configuration, viewport: &Viewport) -> loader::SurfaceOptions {
    loader::SurfaceOptions {
        aspect: viewport.aspect(),
        blur_sigma: cfg.mosaic.source_blur_sigma,
        tint: cfg.mosaic.tint,
    }
}

fn into_sessions(loaded: Vec<loader::LoadedImage>) -> Vec<ImageSession> {
    loaded
        .into_iter()
        .map(|img| ImageSession::new(img.path, Arc::new(img.surface)))
        .collect()
}
