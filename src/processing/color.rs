use image::RgbImage;
use palette::{Hsl, IntoColor, Srgb};

/// Replace every pixel's hue with the hue of `target`, keeping saturation and
/// lightness.
pub fn retint(img: &mut RgbImage, target: [u8; 3]) {
    let target: Hsl = Srgb::new(target[0], target[1], target[2])
        .into_format::<f32>()
        .into_color();
    for pixel in img.pixels_mut() {
        let [r, g, b] = pixel.0;
        let mut hsl: Hsl = Srgb::new(r, g, b).into_format::<f32>().into_color();
        hsl.hue = target.hue;
        let out: Srgb<f32> = hsl.into_color();
        let out: Srgb<u8> = out.into_format();
        pixel.0 = [out.red, out.green, out.blue];
    }
}
