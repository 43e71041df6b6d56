use image::{RgbImage, imageops};

/// Gaussian blur; a non-positive sigma returns an untouched copy.
pub fn apply_blur(image: &RgbImage, sigma: f32) -> RgbImage {
    if sigma <= 0.0 || !sigma.is_finite() {
        return image.clone();
    }
    imageops::blur(image, sigma)
}
