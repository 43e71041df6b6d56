use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::RgbImage;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::events::EngineEvent;
use crate::processing::blur::apply_blur;
use crate::processing::color::retint;
use crate::processing::layout::cover_to_aspect;

/// How a decoded image is turned into a sampling surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceOptions {
    /// Viewport width / height the surface is cropped to.
    pub aspect: f32,
    pub blur_sigma: f32,
    pub tint: Option<[u8; 3]>,
}

#[derive(Debug)]
pub struct LoadedImage {
    pub path: PathBuf,
    pub surface: RgbImage,
}

// Decodes an image to RGB8 and applies EXIF orientation if available.
fn decode_rgb8_apply_exif(path: &Path) -> Result<RgbImage> {
    let img = image::ImageReader::open(path)?
        .with_guessed_format()?
        .decode()?;
    let mut img = img.to_rgb8();

    let orientation: u16 = read_orientation(path).unwrap_or(1);
    match orientation {
        2 => img = image::imageops::flip_horizontal(&img),
        3 => img = image::imageops::rotate180(&img),
        4 => img = image::imageops::flip_vertical(&img),
        5 => {
            img = image::imageops::rotate90(&img);
            img = image::imageops::flip_horizontal(&img);
        }
        6 => img = image::imageops::rotate90(&img),
        7 => {
            img = image::imageops::rotate270(&img);
            img = image::imageops::flip_horizontal(&img);
        }
        8 => img = image::imageops::rotate270(&img),
        _ => {}
    }
    Ok(img)
}

fn read_orientation(path: &Path) -> Option<u16> {
    let file = File::open(path).ok()?;
    let mut buf = BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut buf).ok()?;
    let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
    let o = field.value.get_uint(0)? as u16;
    debug!("exif orientation {} for {}", o, path.display());
    Some(o)
}

/// Crop to the viewport aspect, then optionally retint and soften.
pub fn prepare_surface(img: &RgbImage, opts: &SurfaceOptions) -> RgbImage {
    let mut surface = cover_to_aspect(img, opts.aspect);
    if let Some(tint) = opts.tint {
        retint(&mut surface, tint);
    }
    apply_blur(&surface, opts.blur_sigma)
}

pub fn load_image(path: &Path, opts: &SurfaceOptions) -> Result<RgbImage> {
    let img = decode_rgb8_apply_exif(path)
        .with_context(|| format!("failed to decode {}", path.display()))?;
    Ok(prepare_surface(&img, opts))
}

/// Load `paths` in order, stopping at the first image that fails.
///
/// Decoding runs on the blocking pool; the sequence stays ordered.
pub async fn load_sequence(
    paths: &[PathBuf],
    opts: SurfaceOptions,
    events: Option<&UnboundedSender<EngineEvent>>,
) -> Vec<LoadedImage> {
    let mut loaded = Vec::with_capacity(paths.len());
    for path in paths {
        let p = path.clone();
        let res = tokio::task::spawn_blocking(move || load_image(&p, &opts)).await;
        let surface = match res {
            Ok(Ok(surface)) => surface,
            Ok(Err(err)) => {
                warn!(
                    path = %path.display(),
                    error = %format!("{err:#}"),
                    "load failed; truncating sequence"
                );
                break;
            }
            Err(err) => {
                warn!(path = %path.display(), %err, "decode task failed; truncating sequence");
                break;
            }
        };
        debug!(
            path = %path.display(),
            width = surface.width(),
            height = surface.height(),
            "loaded"
        );
        loaded.push(LoadedImage {
            path: path.clone(),
            surface,
        });
        if let Some(tx) = events {
            let _ = tx.send(EngineEvent::Loaded {
                count: loaded.len(),
                path: path.clone(),
            });
        }
    }
    info!(loaded = loaded.len(), listed = paths.len(), "image sequence loaded");
    loaded
}
