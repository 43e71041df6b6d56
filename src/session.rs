//! Per-image mosaic state: packed records plus a circular playback cursor.

use std::path::PathBuf;
use std::sync::Arc;

use image::RgbImage;
use rand::Rng;
use tracing::debug;

use crate::error::Result;
use crate::mosaic::record::{PackedBuffer, Sample};
use crate::mosaic::sampler::{GridSpec, sample_grid};
use crate::mosaic::shuffle::shuffle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unloaded,
    Generating,
    Ready,
}

/// Canvas geometry a session is generated against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
    pub step: f32,
    pub jitter: f32,
}

#[derive(Debug)]
pub struct ImageSession {
    id: PathBuf,
    surface: Arc<RgbImage>,
    buffer: Option<PackedBuffer>,
    cursor: usize,
    scale: f32,
    state: SessionState,
}

impl ImageSession {
    pub fn new(id: PathBuf, surface: Arc<RgbImage>) -> Self {
        Self {
            id,
            surface,
            buffer: None,
            cursor: 0,
            scale: 1.0,
            state: SessionState::Unloaded,
        }
    }

    pub fn id(&self) -> &PathBuf {
        &self.id
    }

    pub fn surface(&self) -> &Arc<RgbImage> {
        &self.surface
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == SessionState::Ready
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn buffer(&self) -> Option<&PackedBuffer> {
        self.buffer.as_ref()
    }

    /// Records available for playback; zero unless ready.
    pub fn record_count(&self) -> usize {
        self.buffer.as_ref().map_or(0, PackedBuffer::record_count)
    }

    /// Drop the buffer; the geometry it was built for no longer holds.
    pub fn invalidate(&mut self) {
        self.buffer = None;
        self.cursor = 0;
        self.state = SessionState::Unloaded;
    }

    /// Sample, shuffle and pack this image for `geometry`.
    ///
    /// On failure the session is left `Unloaded`.
    pub fn generate<R: Rng>(&mut self, geometry: &Geometry, rng: &mut R) -> Result<()> {
        self.state = SessionState::Generating;
        self.buffer = None;
        self.scale = self.surface.width() as f32 / geometry.width.max(1) as f32;

        let spec = GridSpec {
            width: geometry.width,
            height: geometry.height,
            step: geometry.step,
            jitter: geometry.jitter,
            scale: self.scale,
        };
        let samples: Vec<Sample> = shuffle(sample_grid(&spec, self.surface.as_ref(), rng), rng);
        match PackedBuffer::encode_all(&samples) {
            Ok(buffer) => {
                debug!(
                    session = %self.id.display(),
                    records = buffer.record_count(),
                    bytes = buffer.byte_len(),
                    scale = self.scale,
                    "session generated"
                );
                self.buffer = Some(buffer);
                self.cursor = 0;
                self.state = SessionState::Ready;
                Ok(())
            }
            Err(err) => {
                self.state = SessionState::Unloaded;
                Err(err)
            }
        }
    }

    /// Return the record under the cursor and step forward, wrapping at the end.
    pub fn next_record(&mut self) -> Option<Sample> {
        let buffer = self.buffer.as_ref()?;
        let sample = buffer.get(self.cursor)?;
        self.cursor = (self.cursor + 1) % buffer.record_count();
        Some(sample)
    }

    /// Move the cursor `n` records forward without reading.
    pub fn advance(&mut self, n: usize) {
        let count = self.record_count();
        if count > 0 {
            self.cursor = (self.cursor + n % count) % count;
        }
    }
}
