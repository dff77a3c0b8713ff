// THEORY:
// The round trip through the codec leaves the image washed out: most values
// crowd into a narrow band around the codec's idea of silence. The contrast
// enhancer stretches that band back over the full display range. It takes the
// value distribution of the whole image (all channels together), finds a low
// and a high percentile, and maps `low..=high` linearly onto `0..=255`,
// clamping everything outside.

use crate::core_modules::intensity::intensity::IntensityArray;
use tracing::{debug, warn};

pub const DEFAULT_LEFT_PERCENTILE: f64 = 5.0;
pub const DEFAULT_RIGHT_PERCENTILE: f64 = 95.0;

/// Value at index `floor(percentile / 100 * len)` of the sorted values.
///
/// `sorted` must be sorted ascending and non-empty. Percentile 100 maps to the
/// last element.
pub fn percentile(sorted: &[u8], percentile: f64) -> u8 {
    let index = ((percentile / 100.0) * sorted.len() as f64).floor() as usize;
    sorted[index.min(sorted.len() - 1)]
}

/// Low and high bounds of `array` at the two percentiles. `None` for an empty array.
pub fn percentile_bounds(array: &IntensityArray, left: f64, right: f64) -> Option<(u8, u8)> {
    if array.is_empty() {
        return None;
    }
    let mut values = array.values().to_vec();
    values.sort_unstable();
    Some((percentile(&values, left), percentile(&values, right)))
}

/// Maps `low..=high` onto `0..=255` with rounding and clamping.
///
/// When `high <= low` there is no range to stretch and the array is returned
/// unchanged.
pub fn rescale_intensity(array: &IntensityArray, low: u8, high: u8) -> IntensityArray {
    if high <= low {
        warn!("degenerate contrast range [{low}, {high}], leaving intensities unchanged");
        return array.clone();
    }
    let low = low as f64;
    let span = high as f64 - low;
    array.map(|v| ((v as f64 - low) * 255.0 / span).round().clamp(0.0, 255.0) as u8)
}

/// Stretches the image between its `left` and `right` percentiles.
pub fn enhance(array: &IntensityArray, left: f64, right: f64) -> IntensityArray {
    match percentile_bounds(array, left, right) {
        Some((low, high)) => {
            debug!("contrast bounds: low = {low}, high = {high}");
            rescale_intensity(array, low, high)
        }
        None => array.clone(),
    }
}
