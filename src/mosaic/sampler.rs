//! Jittered grid sampling over the target canvas.

use image::RgbImage;
use rand::Rng;

use super::record::{MAX_COORD, Sample};

/// Largest canvas extent whose clamped coordinates still fit a record.
pub const MAX_CANVAS_EXTENT: u32 = MAX_COORD as u32 + 3;

/// Read access to a source surface at canvas-scaled coordinates.
pub trait PixelSource {
    /// Color of the pixel covering `(x, y)` in the surface's native space.
    fn sample(&self, x: f32, y: f32) -> [u8; 3];
}

impl PixelSource for RgbImage {
    fn sample(&self, x: f32, y: f32) -> [u8; 3] {
        let (w, h) = self.dimensions();
        if w == 0 || h == 0 {
            return [0; 3];
        }
        let px = (x.max(0.0) as u32).min(w - 1);
        let py = (y.max(0.0) as u32).min(h - 1);
        self.get_pixel(px, py).0
    }
}

/// Parameters for one sampling pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSpec {
    pub width: u32,
    pub height: u32,
    pub step: f32,
    pub jitter: f32,
    /// Canvas → source surface factor.
    pub scale: f32,
}

impl GridSpec {
    /// Number of grid points along each axis.
    #[must_use]
    pub fn dims(&self) -> (usize, usize) {
        (axis_len(self.width, self.step), axis_len(self.height, self.step))
    }
}

fn axis_len(extent: u32, step: f32) -> usize {
    if step <= 0.0 || !step.is_finite() {
        return 0;
    }
    (extent as f32 / step).ceil() as usize
}

/// Sample every grid point, in column-major scan order.
///
/// Points are jittered by up to `spec.jitter` on each axis, then clamped to
/// `[0, width - 3] × [0, height - 3]`.
pub fn sample_grid<S, R>(spec: &GridSpec, source: &S, rng: &mut R) -> Vec<Sample>
where
    S: PixelSource + ?Sized,
    R: Rng,
{
    let (cols, rows) = spec.dims();
    let mut out = Vec::with_capacity(cols * rows);
    let max_x = clamp_bound(spec.width);
    let max_y = clamp_bound(spec.height);

    for ci in 0..cols {
        let i = ci as f32 * spec.step;
        for rj in 0..rows {
            let j = rj as f32 * spec.step;
            let x = jittered(i, spec.jitter, max_x, rng);
            let y = jittered(j, spec.jitter, max_y, rng);
            let rgb = source.sample(x as f32 * spec.scale, y as f32 * spec.scale);
            out.push(Sample::new(x, y, rgb));
        }
    }
    out
}

fn clamp_bound(extent: u32) -> u16 {
    extent.saturating_sub(3).min(u32::from(u16::MAX)) as u16
}

fn jittered<R: Rng>(base: f32, jitter: f32, max: u16, rng: &mut R) -> u16 {
    let offset = if jitter > 0.0 {
        rng.random_range(-jitter..=jitter)
    } else {
        0.0
    };
    (base + offset).round().clamp(0.0, f32::from(max)) as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn spec(width: u32, height: u32, step: f32) -> GridSpec {
        GridSpec {
            width,
            height,
            step,
            jitter: 5.0,
            scale: 1.0,
        }
    }

    #[test]
    fn hundred_square_with_step_eight_yields_at_least_144() {
        let img = RgbImage::from_pixel(100, 100, Rgb([9, 8, 7]));
        let mut rng = StdRng::seed_from_u64(1);
        let samples = sample_grid(&spec(100, 100, 8.0), &img, &mut rng);
        assert_eq!(samples.len(), 13 * 13);
        assert!(samples.len() >= 144);
        assert!(samples.iter().all(|s| s.rgb == [9, 8, 7]));
    }

    #[test]
    fn clamps_into_canvas_margin() {
        let img = RgbImage::new(40, 30);
        let mut rng = StdRng::seed_from_u64(7);
        let mut s = spec(40, 30, 2.0);
        s.jitter = 25.0;
        for sample in sample_grid(&s, &img, &mut rng) {
            assert!(sample.x <= 37);
            assert!(sample.y <= 27);
        }
    }

    #[test]
    fn colors_follow_the_scaled_source() {
        // Left half red, right half blue on a surface twice the canvas size.
        let img = RgbImage::from_fn(200, 100, |x, _| {
            if x < 100 {
                Rgb([255, 0, 0])
            } else {
                Rgb([0, 0, 255])
            }
        });
        let mut rng = StdRng::seed_from_u64(3);
        let s = GridSpec {
            width: 100,
            height: 50,
            step: 10.0,
            jitter: 0.0,
            scale: 2.0,
        };
        for sample in sample_grid(&s, &img, &mut rng) {
            let expected = if sample.x < 50 {
                [255, 0, 0]
            } else {
                [0, 0, 255]
            };
            assert_eq!(sample.rgb, expected, "at {},{}", sample.x, sample.y);
        }
    }

    #[test]
    fn degenerate_step_produces_nothing() {
        let img = RgbImage::new(4, 4);
        let mut rng = StdRng::seed_from_u64(0);
        assert!(sample_grid(&spec(100, 100, 0.0), &img, &mut rng).is_empty());
    }

    #[test]
    fn sample_clamps_outside_surface() {
        let img = RgbImage::from_pixel(2, 2, Rgb([1, 2, 3]));
        assert_eq!(PixelSource::sample(&img, -4.0, 10.0), [1, 2, 3]);
    }
}
