// Preprocessing applied before the Gleitzsch pass: bring the image to a target
// long edge, then brighten it through a gamma lookup table.

use image::imageops::{self, FilterType};
use image::RgbImage;
use tracing::debug;

pub const DEFAULT_IMAGE_SIZE: u32 = 1024;
pub const DEFAULT_GAMMA: f64 = 10.0;

/// Extents of `(width, height)` scaled so the longer side equals `size`.
///
/// Each side is truncated and never drops below one pixel.
pub fn target_extent(width: u32, height: u32, size: u32) -> (u32, u32) {
    let scale = size as f64 / width.max(height).max(1) as f64;
    let new_width = ((width as f64 * scale) as u32).max(1);
    let new_height = ((height as f64 * scale) as u32).max(1);
    (new_width, new_height)
}

/// Resamples `image` so its longer side is `size` pixels.
pub fn rescale_to_long_edge(image: &RgbImage, size: u32) -> RgbImage {
    let (width, height) = target_extent(image.width(), image.height(), size);
    debug!(
        "rescaling {}x{} -> {width}x{height}",
        image.width(),
        image.height()
    );
    if (width, height) == image.dimensions() {
        return image.clone();
    }
    imageops::resize(image, width, height, FilterType::Lanczos3)
}

/// `lut[i] = 255 * (i / 255)^(1 / gamma)`, truncated.
pub fn gamma_lut(gamma: f64) -> [u8; 256] {
    let mut lut = [0u8; 256];
    for (i, slot) in lut.iter_mut().enumerate() {
        *slot = (255.0 * (i as f64 / 255.0).powf(1.0 / gamma)) as u8;
    }
    lut
}

/// Runs every RGB component through the gamma table.
pub fn adjust_gamma(image: &RgbImage, gamma: f64) -> RgbImage {
    let lut = gamma_lut(gamma);
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        for component in pixel.0.iter_mut() {
            *component = lut[*component as usize];
        }
    }
    out
}

/// Rescale followed by gamma correction.
pub fn preprocess(image: &RgbImage, size: u32, gamma: f64) -> RgbImage {
    adjust_gamma(&rescale_to_long_edge(image, size), gamma)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn long_edge_matches_target() {
        assert_eq!(target_extent(2000, 1000, 1024), (1024, 512));
        assert_eq!(target_extent(300, 900, 100), (33, 100));
        assert_eq!(target_extent(5000, 1, 100), (100, 1));
    }

    #[test]
    fn rescale_produces_target_extent() {
        let image = RgbImage::from_pixel(40, 20, Rgb([90, 90, 90]));
        let out = rescale_to_long_edge(&image, 10);
        assert_eq!(out.dimensions(), (10, 5));
    }

    #[test]
    fn unit_gamma_is_near_identity() {
        let lut = gamma_lut(1.0);
        assert_eq!(lut[0], 0);
        assert_eq!(lut[255], 255);
        for (i, v) in lut.iter().enumerate() {
            assert!((*v as i32 - i as i32).abs() <= 1);
        }
    }

    #[test]
    fn large_gamma_brightens_but_keeps_endpoints() {
        let lut = gamma_lut(DEFAULT_GAMMA);
        assert_eq!(lut[0], 0);
        assert_eq!(lut[255], 255);
        assert!(lut[16] > 16);
        assert!(lut.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn gamma_applies_to_each_component() {
        let image = RgbImage::from_pixel(2, 2, Rgb([0, 64, 255]));
        let out = adjust_gamma(&image, 2.0);
        let lut = gamma_lut(2.0);
        assert_eq!(out.get_pixel(1, 1).0, [0, lut[64], 255]);
    }
}
