//! Playback controller: mode state machine, radius decay and image rotation.

mod timer;

pub use timer::DecayTimer;

use rand::rngs::StdRng;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::canvas::Canvas;
use crate::config::{MosaicOptions, PlaybackOptions};
use crate::error::{MosaicError, Result};
use crate::events::{DecayTick, EngineEvent};
use crate::session::{Geometry, ImageSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Whole mosaic drawn at once, nothing animates.
    Static,
    /// Records trickle in every frame at a decaying radius.
    Loop,
}

#[derive(Debug, Clone)]
pub struct PlaybackState {
    pub mode: Mode,
    pub radius: f32,
    pub active: usize,
    pub last_frame: Instant,
    pub last_switch: Instant,
    /// False while sessions are being generated.
    pub visible: bool,
    pub started: bool,
}

pub struct PlaybackController<C: Canvas> {
    canvas: C,
    sessions: Vec<ImageSession>,
    state: PlaybackState,
    mosaic: MosaicOptions,
    options: PlaybackOptions,
    rng: StdRng,
    decay: DecayTimer,
    events: Option<UnboundedSender<EngineEvent>>,
    theme: String,
}

impl<C: Canvas> PlaybackController<C> {
    /// # Errors
    /// Returns [`MosaicError::NoImagesAvailable`] when `sessions` is empty.
    pub fn new(
        canvas: C,
        sessions: Vec<ImageSession>,
        mosaic: MosaicOptions,
        options: PlaybackOptions,
        rng: StdRng,
        decay: DecayTimer,
        theme: &str,
    ) -> Result<Self> {
        if sessions.is_empty() {
            return Err(MosaicError::NoImagesAvailable {
                theme: theme.to_string(),
            });
        }
        let now = Instant::now();
        let state = PlaybackState {
            mode: Mode::Static,
            radius: mosaic.floor_radius,
            active: 0,
            last_frame: now,
            last_switch: now,
            visible: false,
            started: false,
        };
        Ok(Self {
            canvas,
            sessions,
            state,
            mosaic,
            options,
            rng,
            decay,
            events: None,
            theme: theme.to_string(),
        })
    }

    pub fn with_events(mut self, events: UnboundedSender<EngineEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn mode(&self) -> Mode {
        self.state.mode
    }

    pub fn radius(&self) -> f32 {
        self.state.radius
    }

    pub fn active_index(&self) -> usize {
        self.state.active
    }

    pub fn is_visible(&self) -> bool {
        self.state.visible
    }

    pub fn is_decaying(&self) -> bool {
        self.decay.is_running()
    }

    pub fn sessions(&self) -> &[ImageSession] {
        &self.sessions
    }

    pub fn active_session(&self) -> &ImageSession {
        &self.sessions[self.state.active]
    }

    pub fn canvas(&self) -> &C {
        &self.canvas
    }

    /// Current canvas geometry as seen by the sampler.
    pub fn geometry(&self) -> Geometry {
        let (width, height) = self.canvas.dimensions();
        Geometry {
            width,
            height,
            step: self.mosaic.step(),
            jitter: self.mosaic.jitter,
        }
    }

    /// Rebuild every session for the current canvas, one at a time.
    ///
    /// The canvas is cleared and stays hidden until the last session is ready;
    /// control returns to the runtime between sessions.
    pub async fn regenerate_all(&mut self) -> Result<()> {
        self.state.visible = false;
        self.canvas.clear();
        for session in &mut self.sessions {
            session.invalidate();
        }
        let geometry = self.geometry();
        let total = self.sessions.len();
        for (index, session) in self.sessions.iter_mut().enumerate() {
            emit(&self.events, EngineEvent::Processing { index, total });
            session.generate(&geometry, &mut self.rng)?;
            tokio::task::yield_now().await;
        }
        info!(
            sessions = total,
            width = geometry.width,
            height = geometry.height,
            "sessions ready"
        );
        self.state.visible = true;
        emit(&self.events, EngineEvent::Ready { sessions: total });
        Ok(())
    }

    /// Begin presenting: static reveal of the first session.
    pub fn start(&mut self, now: Instant) {
        self.state.started = true;
        self.state.active = 0;
        self.enter_static(now);
    }

    pub fn toggle_mode(&mut self, now: Instant) {
        match self.state.mode {
            Mode::Static => self.enter_loop(now),
            Mode::Loop => self.enter_static(now),
        }
    }

    pub fn skip_to_next(&mut self, now: Instant) {
        let next = (self.state.active + 1) % self.sessions.len();
        self.activate(next, now);
    }

    /// # Errors
    /// Returns [`MosaicError::SessionIndex`] when `index` names no session.
    pub fn skip_to(&mut self, index: usize, now: Instant) -> Result<()> {
        if index >= self.sessions.len() {
            return Err(MosaicError::SessionIndex {
                index,
                count: self.sessions.len(),
            });
        }
        self.activate(index, now);
        Ok(())
    }

    /// Draw the next batch while looping. Returns the number of records drawn.
    pub fn on_frame(&mut self, now: Instant) -> usize {
        if !self.state.started || self.state.mode != Mode::Loop {
            return 0;
        }
        let drawn = self.draw_records(self.options.draws_per_frame, self.state.radius);
        if drawn > 0 {
            self.state.last_frame = now;
        }
        drawn
    }

    /// Apply one decay step if `tick` belongs to the running schedule.
    pub fn on_decay_tick(&mut self, tick: DecayTick) -> bool {
        if !self.decay.accepts(tick) {
            debug!(epoch = tick.epoch, current = self.decay.epoch(), "stale decay tick");
            return false;
        }
        let floor = self.mosaic.floor_radius;
        self.state.radius = (self.state.radius * self.options.decay_factor).max(floor);
        if self.state.radius <= floor {
            self.state.radius = floor;
            self.decay.stop();
            debug!(radius = floor, "radius settled");
        }
        true
    }

    /// Skip when idle for too long or when the current image has had its turn.
    pub fn check_auto_skip(&mut self, now: Instant) -> bool {
        if !self.state.started {
            return false;
        }
        let idle = now.duration_since(self.state.last_frame) >= self.options.inactivity_timeout;
        let expired = self.state.visible
            && now.duration_since(self.state.last_switch) >= self.options.auto_skip_interval;
        if idle || expired {
            info!(idle, expired, from = self.state.active, "auto-skip");
            self.skip_to_next(now);
            return true;
        }
        false
    }

    /// Swap in freshly loaded sessions; they stay unloaded until the next
    /// [`on_resize`](Self::on_resize).
    ///
    /// # Errors
    /// Returns [`MosaicError::NoImagesAvailable`] when `sessions` is empty.
    pub fn replace_sessions(&mut self, sessions: Vec<ImageSession>) -> Result<()> {
        if sessions.is_empty() {
            return Err(MosaicError::NoImagesAvailable {
                theme: self.theme.clone(),
            });
        }
        self.decay.stop();
        self.state.visible = false;
        self.state.active = self.state.active.min(sessions.len() - 1);
        self.sessions = sessions;
        Ok(())
    }

    /// Adopt new canvas geometry and rebuild every session for it.
    pub async fn on_resize(&mut self, width: u32, height: u32, now: Instant) -> Result<()> {
        let same_size = self.canvas.dimensions() == (width, height);
        if same_size && self.sessions.iter().all(ImageSession::is_ready) {
            return Ok(());
        }
        self.decay.stop();
        if !same_size {
            self.canvas.resize(width, height);
        }
        self.regenerate_all().await?;
        if self.state.started {
            match self.state.mode {
                Mode::Static => self.enter_static(now),
                Mode::Loop => self.restart_burst(now),
            }
        }
        Ok(())
    }

    pub fn export_current_frame(&self) -> Result<Vec<u8>> {
        self.canvas.export_png()
    }

    fn enter_loop(&mut self, now: Instant) {
        self.set_mode(Mode::Loop);
        self.restart_burst(now);
    }

    fn enter_static(&mut self, now: Instant) {
        self.set_mode(Mode::Static);
        self.decay.stop();
        self.state.radius = self.mosaic.floor_radius;
        self.state.last_switch = now;
        self.state.last_frame = now;
        self.paint_backdrop();
        let count = self.sessions[self.state.active].record_count();
        let drawn = self.draw_records(count, self.state.radius);
        debug!(session = self.state.active, drawn, "static reveal");
    }

    fn activate(&mut self, index: usize, now: Instant) {
        self.state.active = index;
        emit(&self.events, EngineEvent::Switched { index });
        self.set_mode(Mode::Loop);
        self.paint_backdrop();
        self.restart_burst(now);
    }

    /// Every burst goes through here so the old decay schedule is always
    /// cancelled before the new one starts.
    fn restart_burst(&mut self, now: Instant) {
        self.state.radius = self.options.burst_radius;
        self.state.last_switch = now;
        self.state.last_frame = now;
        let epoch = self.decay.restart();
        debug!(epoch, radius = self.state.radius, session = self.state.active, "burst");
    }

    fn set_mode(&mut self, mode: Mode) {
        if self.state.mode != mode {
            self.state.mode = mode;
            info!(?mode, "mode changed");
            emit(&self.events, EngineEvent::ModeChanged(mode));
        }
    }

    fn paint_backdrop(&mut self) {
        let Some(sigma) = self.mosaic.backdrop_blur_sigma else {
            return;
        };
        let session = &self.sessions[self.state.active];
        if !self.state.visible || !session.is_ready() {
            return;
        }
        self.canvas.draw_image(session.surface());
        self.canvas.blur(sigma);
    }

    fn draw_records(&mut self, count: usize, radius: f32) -> usize {
        if !self.state.visible {
            return 0;
        }
        let session = &mut self.sessions[self.state.active];
        if !session.is_ready() {
            return 0;
        }
        let mut drawn = 0;
        for _ in 0..count {
            let Some(sample) = session.next_record() else {
                warn!(session = self.state.active, "ready session yielded no record");
                break;
            };
            self.canvas
                .fill_circle(f32::from(sample.x), f32::from(sample.y), radius, sample.rgb);
            drawn += 1;
        }
        drawn
    }
}

fn emit(events: &Option<UnboundedSender<EngineEvent>>, event: EngineEvent) {
    if let Some(tx) = events {
        let _ = tx.send(event);
    }
}
