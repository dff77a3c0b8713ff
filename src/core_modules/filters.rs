// THEORY:
// Artistic filters that sit around the Gleitzsch pass.
//
// - `spatial_shift` stretches a single plane a few pixels past its own border
//   and crops the top-left back out. Applied with a different amount per
//   channel, the planes drift apart towards the bottom-right and the image
//   picks up a chromatic-aberration fringe.
// - `apply_rgb_shift` is the same idea applied to a whole image as an optional
//   preprocessing step.
// - `interlace` darkens alternating bands of rows for a CRT-like look.

use crate::core_modules::channel_codec::merge_channels;
use crate::core_modules::intensity::intensity::ChannelArray;
use crate::core_modules::operator::map_channels;
use crate::core_modules::raster::{
    channel_to_grayscale_image, image_to_channel, to_image, to_intensity_array,
};
use crate::error::{GleitzschError, Result};
use image::imageops::{self, FilterType};
use image::RgbImage;
use std::sync::Arc;
use tracing::debug;

/// Rows in the darkened bands are divided by this factor.
const INTERLACE_DARKENING: f32 = 1.35;

/// Shifts a plane's content by stretching it over a canvas padded by `pixels`
/// on every side and cropping the original top-left region back out.
///
/// `pixels == 0` hands the plane back untouched. A padded canvas that does not
/// fit in `u32` is an `InvalidConfig` error.
pub fn spatial_shift(channel: ChannelArray, pixels: u32) -> Result<ChannelArray> {
    if pixels == 0 || channel.is_empty() {
        return Ok(channel);
    }
    let (width, height) = channel.extent();
    let padded = |side: u32| {
        pixels
            .checked_mul(2)
            .and_then(|pad| side.checked_add(pad))
            .ok_or_else(|| {
                GleitzschError::InvalidConfig(format!("shift of {pixels}px overflows the canvas"))
            })
    };
    let (canvas_width, canvas_height) = (padded(width)?, padded(height)?);
    let gray = channel_to_grayscale_image(&channel);

    // The stretched plane covers the whole padded canvas, so no unpainted
    // border survives into the crop.
    let canvas = imageops::resize(&gray, canvas_width, canvas_height, FilterType::Triangle);
    let cropped = imageops::crop_imm(&canvas, 0, 0, width, height).to_image();
    Ok(image_to_channel(&cropped))
}

/// Shift applied to `channel` for a per-channel `step`: `step * channel`.
pub(crate) fn channel_shift_amount(step: u32, channel: usize) -> Result<u32> {
    u32::try_from(channel)
        .ok()
        .and_then(|c| step.checked_mul(c))
        .ok_or_else(|| {
            GleitzschError::InvalidConfig(format!(
                "shift step {step} overflows for channel {channel}"
            ))
        })
}

/// Shifts channel `c` of `image` by `degree * c` pixels, all three concurrently.
pub async fn apply_rgb_shift(image: RgbImage, degree: u32) -> Result<RgbImage> {
    if degree == 0 {
        return Ok(image);
    }
    let array = Arc::new(to_intensity_array(&image));
    let planes = map_channels(array, move |channel, plane| {
        let amount = channel_shift_amount(degree, channel)?;
        debug!("rgb shift filter: channel {channel} by {amount}px");
        spatial_shift(plane, amount)
    })
    .await?;
    Ok(to_image(&merge_channels(&planes)?))
}

/// Darkens every other band of `coeff` rows, starting with the first band.
pub fn interlace(image: &RgbImage, coeff: u32) -> RgbImage {
    let coeff = coeff.max(1);
    let mut out = image.clone();
    for (_, y, pixel) in out.enumerate_pixels_mut() {
        if (y / coeff) % 2 != 0 {
            continue;
        }
        for component in pixel.0.iter_mut() {
            *component = (*component as f32 / INTERLACE_DARKENING).clamp(0.0, 255.0) as u8;
        }
    }
    out
}
