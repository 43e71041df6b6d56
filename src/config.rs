use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Result, ensure};
use serde::Deserialize;

use crate::mosaic::sampler::MAX_CANVAS_EXTENT;
use crate::processing::layout::canvas_size;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Configuration {
    /// Root directory holding one `<theme>_dominant` folder per theme.
    pub library_path: PathBuf,
    /// Theme selected when none is given on the command line.
    pub theme: String,
    /// Optional deterministic seed for sampling jitter and shuffling.
    pub seed: Option<u64>,
    /// Directory receiving exported frames.
    pub export_dir: Option<PathBuf>,
    pub viewport: Viewport,
    pub mosaic: MosaicOptions,
    pub playback: PlaybackOptions,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        ensure!(!self.theme.trim().is_empty(), "theme must not be empty");
        self.viewport.validate()?;
        self.mosaic.validate()?;
        self.playback.validate()?;
        ensure!(
            self.playback.burst_radius >= self.mosaic.floor_radius,
            "playback.burst-radius must be at least mosaic.floor-radius"
        );
        Ok(self)
    }

    /// Directory holding the images for `theme`.
    pub fn theme_dir(&self, theme: &str) -> PathBuf {
        self.library_path.join(format!("{theme}_dominant"))
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            library_path: PathBuf::from("public"),
            theme: "green".to_string(),
            seed: None,
            export_dir: None,
            viewport: Viewport::default(),
            mosaic: MosaicOptions::default(),
            playback: PlaybackOptions::default(),
        }
    }
}

/// Most elongated viewport accepted, in either orientation.
pub const MAX_ASPECT_RATIO: f32 = 16.0;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub device_pixel_ratio: f32,
}

impl Viewport {
    pub const fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            device_pixel_ratio: 1.0,
        }
    }

    #[must_use]
    pub fn aspect(&self) -> f32 {
        self.width.max(1) as f32 / self.height.max(1) as f32
    }

    /// Reject geometry the record format or surface preparation cannot serve.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.width > 0 && self.height > 0,
            "viewport dimensions must be non-zero"
        );
        ensure!(
            self.device_pixel_ratio > 0.0,
            "viewport.device-pixel-ratio must be positive"
        );
        let aspect = self.aspect();
        ensure!(
            (1.0 / MAX_ASPECT_RATIO..=MAX_ASPECT_RATIO).contains(&aspect),
            "viewport aspect {aspect:.4} is outside 1:{MAX_ASPECT_RATIO} .. {MAX_ASPECT_RATIO}:1"
        );
        let (w, h) = canvas_size(self);
        ensure!(
            w <= MAX_CANVAS_EXTENT && h <= MAX_CANVAS_EXTENT,
            "canvas {w}x{h} exceeds the {MAX_CANVAS_EXTENT}px record range"
        );
        Ok(())
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1920, 1080)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct MosaicOptions {
    /// Resting circle radius; also sets the grid pitch.
    pub floor_radius: f32,
    /// Grid pitch as a fraction of `floor_radius`.
    pub step_factor: f32,
    /// Maximum per-axis displacement of a grid point, in canvas pixels.
    pub jitter: f32,
    /// Blur applied to each source surface before sampling.
    pub source_blur_sigma: f32,
    /// Optional hue override applied to every source pixel.
    pub tint: Option<[u8; 3]>,
    /// When set, each reveal starts from a blurred copy of the image.
    pub backdrop_blur_sigma: Option<f32>,
}

impl MosaicOptions {
    #[must_use]
    pub fn step(&self) -> f32 {
        self.floor_radius * self.step_factor
    }

    fn validate(&self) -> Result<()> {
        ensure!(self.floor_radius > 0.0, "mosaic.floor-radius must be positive");
        ensure!(self.step_factor > 0.0, "mosaic.step-factor must be positive");
        ensure!(self.jitter >= 0.0, "mosaic.jitter must not be negative");
        ensure!(
            self.source_blur_sigma >= 0.0,
            "mosaic.source-blur-sigma must not be negative"
        );
        if let Some(sigma) = self.backdrop_blur_sigma {
            ensure!(sigma >= 0.0, "mosaic.backdrop-blur-sigma must not be negative");
        }
        Ok(())
    }
}

impl Default for MosaicOptions {
    fn default() -> Self {
        Self {
            floor_radius: 17.0,
            step_factor: 0.8,
            jitter: 5.0,
            source_blur_sigma: 1.0,
            tint: None,
            backdrop_blur_sigma: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PlaybackOptions {
    /// Records drawn per frame while looping.
    pub draws_per_frame: usize,
    /// Radius applied right after a skip or a switch into loop mode.
    pub burst_radius: f32,
    /// Multiplier applied to the radius on each decay tick.
    pub decay_factor: f32,
    #[serde(with = "humantime_serde")]
    pub decay_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub frame_interval: Duration,
    /// Wall-clock period after which a visible image is replaced.
    #[serde(with = "humantime_serde")]
    pub auto_skip_interval: Duration,
    /// Skip when no frame has been drawn for this long.
    #[serde(with = "humantime_serde")]
    pub inactivity_timeout: Duration,
    /// How often the auto-skip conditions are evaluated.
    #[serde(with = "humantime_serde")]
    pub auto_skip_check: Duration,
}

impl PlaybackOptions {
    fn validate(&self) -> Result<()> {
        ensure!(
            self.draws_per_frame > 0,
            "playback.draws-per-frame must be greater than zero"
        );
        ensure!(
            self.decay_factor > 0.0 && self.decay_factor < 1.0,
            "playback.decay-factor must lie strictly between 0 and 1"
        );
        for (name, d) in [
            ("decay-interval", self.decay_interval),
            ("frame-interval", self.frame_interval),
            ("auto-skip-interval", self.auto_skip_interval),
            ("inactivity-timeout", self.inactivity_timeout),
            ("auto-skip-check", self.auto_skip_check),
        ] {
            ensure!(!d.is_zero(), "playback.{name} must be positive");
        }
        Ok(())
    }
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            draws_per_frame: 20,
            burst_radius: 100.0,
            decay_factor: 0.9,
            decay_interval: Duration::from_millis(200),
            frame_interval: Duration::from_millis(16),
            auto_skip_interval: Duration::from_secs(60),
            inactivity_timeout: Duration::from_secs(60),
            auto_skip_check: Duration::from_secs(1),
        }
    }
}
