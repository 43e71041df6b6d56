use image::{Rgb, RgbImage};
use mosaic_frame::canvas::{Canvas, RasterCanvas};
use mosaic_frame::config::{MosaicOptions, PlaybackOptions};
use mosaic_frame::events::{DecayTick, EngineEvent};
use mosaic_frame::playback::{DecayTimer, Mode, PlaybackController};
use mosaic_frame::session::ImageSession;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const W: u32 = 120;
const H: u32 = 90;

fn sessions(n: usize) -> Vec<ImageSession> {
    (0..n)
        .map(|i| {
            let surface = RgbImage::from_fn(W, H, |x, y| {
                Rgb([(x * 2) as u8, (y * 2) as u8, (i * 70 + 30) as u8])
            });
            ImageSession::new(PathBuf::from(format!("img-{i}.png")), Arc::new(surface))
        })
        .collect()
}

/// Canvas that records draw calls instead of rasterizing them.
struct RecordingCanvas {
    size: (u32, u32),
    circles: Vec<(f32, f32, f32)>,
    clears: usize,
}

impl RecordingCanvas {
    fn new(width: u32, height: u32) -> Self {
        Self {
            size: (width, height),
            circles: Vec::new(),
            clears: 0,
        }
    }
}

impl Canvas for RecordingCanvas {
    fn dimensions(&self) -> (u32, u32) {
        self.size
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
        self.circles.clear();
    }

    fn clear(&mut self) {
        self.clears += 1;
    }

    fn fill_circle(&mut self, x: f32, y: f32, radius: f32, _rgb: [u8; 3]) {
        self.circles.push((x, y, radius));
    }

    fn blur(&mut self, _sigma: f32) {}

    fn draw_image(&mut self, _image: &RgbImage) {}

    fn export_png(&self) -> mosaic_frame::error::Result<Vec<u8>> {
        Ok(Vec::new())
    }
}

async fn setup_on<C: Canvas>(
    canvas: C,
    n: usize,
) -> (
    PlaybackController<C>,
    UnboundedReceiver<DecayTick>,
    UnboundedReceiver<EngineEvent>,
) {
    let options = PlaybackOptions::default();
    let (decay, ticks) = DecayTimer::channel(options.decay_interval, CancellationToken::new());
    let (tx, events) = mpsc::unbounded_channel();
    let mut ctl = PlaybackController::new(
        canvas,
        sessions(n),
        MosaicOptions::default(),
        options,
        StdRng::seed_from_u64(99),
        decay,
        "green",
    )
    .unwrap()
    .with_events(tx);
    ctl.regenerate_all().await.unwrap();
    (ctl, ticks, events)
}

async fn setup(
    n: usize,
) -> (
    PlaybackController<RasterCanvas>,
    UnboundedReceiver<DecayTick>,
    UnboundedReceiver<EngineEvent>,
) {
    setup_on(RasterCanvas::new(W, H), n).await
}

fn drawn_positions(circles: &[(f32, f32, f32)]) -> Vec<(u16, u16)> {
    let mut out: Vec<_> = circles.iter().map(|c| (c.0 as u16, c.1 as u16)).collect();
    out.sort_unstable();
    out
}

fn stored_positions(session: &ImageSession) -> Vec<(u16, u16)> {
    let mut out: Vec<_> = session.buffer().unwrap().iter().map(|s| (s.x, s.y)).collect();
    out.sort_unstable();
    out
}

fn drain(events: &mut UnboundedReceiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut out = Vec::new();
    while let Ok(ev) = events.try_recv() {
        out.push(ev);
    }
    out
}

/// Feed ticks to the controller until decay settles, returning the radii seen.
async fn run_decay(
    ctl: &mut PlaybackController<RasterCanvas>,
    ticks: &mut UnboundedReceiver<DecayTick>,
) -> Vec<f32> {
    let mut radii = vec![ctl.radius()];
    while ctl.is_decaying() {
        let tick = ticks.recv().await.unwrap();
        if ctl.on_decay_tick(tick) {
            radii.push(ctl.radius());
        }
    }
    radii
}

#[tokio::test(start_paused = true)]
async fn generation_reports_progress_then_ready() {
    let (_ctl, _ticks, mut events) = setup(3).await;
    let seen = drain(&mut events);
    assert_eq!(
        seen,
        vec![
            EngineEvent::Processing { index: 0, total: 3 },
            EngineEvent::Processing { index: 1, total: 3 },
            EngineEvent::Processing { index: 2, total: 3 },
            EngineEvent::Ready { sessions: 3 },
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn static_start_reveals_every_record_once() {
    let (mut ctl, _ticks, _events) = setup(2).await;
    ctl.start(Instant::now());
    assert_eq!(ctl.mode(), Mode::Static);
    assert!(!ctl.is_decaying());
    assert!((ctl.radius() - 17.0).abs() < f32::EPSILON);
    // one full pass leaves the cursor where it began
    assert_eq!(ctl.active_session().cursor(), 0);
    let painted = ctl
        .canvas()
        .pixels()
        .pixels()
        .filter(|p| p.0 != [0, 0, 0])
        .count();
    assert!(painted > (W * H) as usize / 2);
}

#[tokio::test(start_paused = true)]
async fn static_reveal_draws_each_record_once_at_the_floor_radius() {
    let (mut ctl, _ticks, _events) = setup_on(RecordingCanvas::new(W, H), 2).await;
    assert_eq!(ctl.canvas().clears, 1);
    assert!(ctl.canvas().circles.is_empty());

    ctl.start(Instant::now());
    let count = ctl.active_session().record_count();
    let circles = &ctl.canvas().circles;
    assert_eq!(circles.len(), count);
    assert!(circles.iter().all(|c| c.2 == 17.0));
    assert_eq!(drawn_positions(circles), stored_positions(ctl.active_session()));
}

#[tokio::test(start_paused = true)]
async fn returning_to_static_redraws_one_full_pass() {
    let (mut ctl, _ticks, _events) = setup_on(RecordingCanvas::new(W, H), 1).await;
    let t0 = Instant::now();
    ctl.start(t0);
    ctl.toggle_mode(t0);
    let revealed = ctl.canvas().circles.len();
    for _ in 0..3 {
        assert_eq!(ctl.on_frame(t0), 20);
    }
    let looped = &ctl.canvas().circles[revealed..];
    assert_eq!(looped.len(), 60);
    assert!(looped.iter().all(|c| c.2 == 100.0));

    // the cursor sits mid-buffer; the static pass still covers every record once
    let before = ctl.canvas().circles.len();
    ctl.toggle_mode(t0);
    assert_eq!(ctl.mode(), Mode::Static);
    let pass = &ctl.canvas().circles[before..];
    assert_eq!(pass.len(), ctl.active_session().record_count());
    assert!(pass.iter().all(|c| c.2 == 17.0));
    assert_eq!(drawn_positions(pass), stored_positions(ctl.active_session()));
}

#[tokio::test(start_paused = true)]
async fn loop_burst_decays_monotonically_to_the_floor() {
    let (mut ctl, mut ticks, _events) = setup(1).await;
    let t0 = Instant::now();
    ctl.start(t0);
    ctl.toggle_mode(t0);
    assert_eq!(ctl.mode(), Mode::Loop);
    assert!((ctl.radius() - 100.0).abs() < f32::EPSILON);

    let radii = run_decay(&mut ctl, &mut ticks).await;
    assert!(radii.windows(2).all(|w| w[1] <= w[0]));
    assert!((radii.last().copied().unwrap() - 17.0).abs() < f32::EPSILON);
    // 100 * 0.9^17 < 17 <= 100 * 0.9^16
    assert_eq!(radii.len() - 1, 17);
    assert!(t0.elapsed() >= Duration::from_millis(200 * 17));

    // settled radius is never touched again
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(ticks.try_recv().is_err());
    assert!((ctl.radius() - 17.0).abs() < f32::EPSILON);
}

#[tokio::test(start_paused = true)]
async fn loop_frames_draw_at_the_current_radius() {
    let (mut ctl, _ticks, _events) = setup(1).await;
    let t0 = Instant::now();
    ctl.start(t0);
    ctl.toggle_mode(t0);
    let count = ctl.active_session().record_count();
    let frames = count / 20 + 1;
    for i in 0..frames {
        assert_eq!(ctl.on_frame(t0 + Duration::from_millis(16 * i as u64)), 20);
    }
    assert_eq!(ctl.active_session().cursor(), (frames * 20) % count);
}

#[tokio::test(start_paused = true)]
async fn auto_skip_moves_to_the_next_image_with_a_fresh_burst() {
    let (mut ctl, mut ticks, mut events) = setup(3).await;
    let t0 = Instant::now();
    ctl.start(t0);
    drain(&mut events);

    assert!(!ctl.check_auto_skip(t0 + Duration::from_secs(59)));
    assert!(ctl.check_auto_skip(t0 + Duration::from_secs(60)));
    assert_eq!(ctl.active_index(), 1);
    assert_eq!(ctl.mode(), Mode::Loop);
    assert!((ctl.radius() - 100.0).abs() < f32::EPSILON);
    assert_eq!(
        drain(&mut events),
        vec![
            EngineEvent::Switched { index: 1 },
            EngineEvent::ModeChanged(Mode::Loop),
        ]
    );

    let radii = run_decay(&mut ctl, &mut ticks).await;
    assert!((radii[1] - 90.0).abs() < 1e-3);

    // wraps after the last image
    let t1 = t0 + Duration::from_secs(120);
    assert!(ctl.check_auto_skip(t1));
    assert!(ctl.check_auto_skip(t1 + Duration::from_secs(60)));
    assert_eq!(ctl.active_index(), 0);
}

#[tokio::test(start_paused = true)]
async fn wall_clock_skip_fires_even_while_frames_draw() {
    let (mut ctl, _ticks, _events) = setup(2).await;
    let t0 = Instant::now();
    ctl.start(t0);
    ctl.toggle_mode(t0);
    ctl.on_frame(t0 + Duration::from_secs(50));
    assert!(!ctl.check_auto_skip(t0 + Duration::from_secs(59)));
    assert!(ctl.check_auto_skip(t0 + Duration::from_secs(61)));
    assert_eq!(ctl.active_index(), 1);
}

#[tokio::test(start_paused = true)]
async fn skipping_mid_decay_restarts_a_single_schedule() {
    let (mut ctl, mut ticks, _events) = setup(2).await;
    let t0 = Instant::now();
    ctl.start(t0);
    ctl.toggle_mode(t0);

    for _ in 0..3 {
        let tick = ticks.recv().await.unwrap();
        assert!(ctl.on_decay_tick(tick));
    }
    assert!((ctl.radius() - 72.9).abs() < 1e-3);

    let skipped_at = Instant::now();
    ctl.skip_to_next(skipped_at);
    assert!((ctl.radius() - 100.0).abs() < f32::EPSILON);

    // the first accepted tick after the skip is one step below the burst
    let tick = loop {
        let tick = ticks.recv().await.unwrap();
        if ctl.on_decay_tick(tick) {
            break tick;
        }
    };
    assert!((ctl.radius() - 90.0).abs() < 1e-3);
    assert!(skipped_at.elapsed() >= Duration::from_millis(200));

    // exactly one schedule remains: the next tick shares its epoch
    let next = ticks.recv().await.unwrap();
    assert_eq!(next.epoch, tick.epoch);
    assert!(ctl.on_decay_tick(next));
    assert!((ctl.radius() - 81.0).abs() < 1e-3);
}

#[tokio::test(start_paused = true)]
async fn toggling_back_to_static_stops_decay() {
    let (mut ctl, mut ticks, _events) = setup(1).await;
    let t0 = Instant::now();
    ctl.start(t0);
    ctl.toggle_mode(t0);
    let tick = ticks.recv().await.unwrap();
    assert!(ctl.on_decay_tick(tick));

    ctl.toggle_mode(Instant::now());
    assert_eq!(ctl.mode(), Mode::Static);
    assert!(!ctl.is_decaying());
    assert!((ctl.radius() - 17.0).abs() < f32::EPSILON);
    assert_eq!(ctl.on_frame(Instant::now()), 0);
}

#[tokio::test(start_paused = true)]
async fn resize_keeps_the_mode_and_restarts_the_burst() {
    let (mut ctl, _ticks, mut events) = setup(2).await;
    let t0 = Instant::now();
    ctl.start(t0);
    ctl.skip_to_next(t0);
    drain(&mut events);

    ctl.on_resize(160, 120, t0).await.unwrap();
    assert_eq!(ctl.canvas().dimensions(), (160, 120));
    assert_eq!(ctl.mode(), Mode::Loop);
    assert_eq!(ctl.active_index(), 1);
    assert!(ctl.is_decaying());
    assert!((ctl.radius() - 100.0).abs() < f32::EPSILON);
    assert_eq!(drain(&mut events).last(), Some(&EngineEvent::Ready { sessions: 2 }));

    // same size with every session ready is a no-op
    ctl.on_resize(160, 120, t0).await.unwrap();
    assert!(drain(&mut events).is_empty());
}
