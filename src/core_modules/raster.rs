// THEORY:
// The raster adapter is the only place that knows about `image` buffers. It
// unpacks decoded RGB pixels into an `IntensityArray` and packs them back, and it
// lets a single `ChannelArray` borrow the image crate's geometry primitives by
// round-tripping through a grayscale buffer. Alpha is dropped on the way in and
// the output is always opaque RGB.

use crate::core_modules::intensity::intensity::{ChannelArray, IntensityArray};
use image::{GrayImage, Luma, Rgb, RgbImage};

/// Unpacks every pixel of `image` into an `[x][y][channel]` array.
pub fn to_intensity_array(image: &RgbImage) -> IntensityArray {
    IntensityArray::from_fn(image.width(), image.height(), |x, y, c| {
        image.get_pixel(x, y).0[c]
    })
}

/// Packs an intensity array back into an opaque RGB image.
pub fn to_image(array: &IntensityArray) -> RgbImage {
    RgbImage::from_fn(array.width(), array.height(), |x, y| {
        Rgb([array.get(x, y, 0), array.get(x, y, 1), array.get(x, y, 2)])
    })
}

/// Renders a single plane as a grayscale image with the same extent.
pub fn channel_to_grayscale_image(channel: &ChannelArray) -> GrayImage {
    GrayImage::from_fn(channel.width(), channel.height(), |x, y| {
        Luma([channel.get(x, y)])
    })
}

/// Reads a grayscale image back into a plane.
pub fn image_to_channel(image: &GrayImage) -> ChannelArray {
    ChannelArray::from_fn(image.width(), image.height(), |x, y| image.get_pixel(x, y).0[0])
}
