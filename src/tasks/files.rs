use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

/// Image files directly inside `dir`, ordered by file name.
///
/// A missing directory yields an empty list; the caller decides whether that
/// is fatal.
#[instrument(skip_all, fields(dir = %dir.display()))]
pub fn list_images(dir: &Path) -> Vec<PathBuf> {
    if !dir.is_dir() {
        warn!("theme directory missing");
        return Vec::new();
    }
    let mut found: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| is_image(p))
        .collect();
    found.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    for path in &found {
        debug!(path = %path.display(), "listed");
    }
    info!(count = found.len(), "theme listing complete");
    found
}

#[inline]
pub fn is_image(p: &Path) -> bool {
    matches!(
        p.extension()
            .and_then(OsStr::to_str)
            .map(|s| s.to_ascii_lowercase()),
        Some(ref e) if ["jpg", "jpeg", "png", "webp", "gif"].contains(&e.as_str())
    )
}
