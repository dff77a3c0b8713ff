// THEORY:
// The `GleitzschOperator` is the orchestrator of the effect. It is not a
// transformation itself; it wires the channel codec bridge, the spatial shift
// filter and the contrast enhancer together and decides what runs in parallel.
//
// Key architectural principles:
// 1.  **Fixed fan-out**: Every color plane goes through the codec on its own
//     blocking task. There are exactly three, they share nothing mutable, and
//     each hands its plane back through its join handle. The join is the only
//     synchronization point.
// 2.  **Chromatic offset**: Channel `c` is spatially shifted by
//     `channel_shift_step * c` before the round trip, so red stays put and
//     green and blue drift progressively further.
// 3.  **Offset correction**: The round trip leaves the merged image displaced
//     along its outer axis. A circular shift by `width - round(width / 8)`
//     puts it back. This must stay bit-exact.
// 4.  **Final stretch**: The decoded image is dim and flat; the contrast
//     enhancer stretches it before it leaves the operator.

use crate::core_modules::channel_codec::{extract_channel, flatten, merge_channels, reassemble};
use crate::core_modules::contrast::{DEFAULT_LEFT_PERCENTILE, DEFAULT_RIGHT_PERCENTILE, enhance};
use crate::core_modules::filters::{channel_shift_amount, spatial_shift};
use crate::core_modules::intensity::intensity::{CHANNELS, ChannelArray, IntensityArray};
use crate::core_modules::lame::LossyRoundTrip;
use crate::error::{GleitzschError, Result};
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::info;

pub const DEFAULT_RGB_SHIFT: u32 = 8;
const SHIFT_DENOMINATOR: u32 = 8;

/// Runs `f` over each color plane of `array` on its own blocking task and
/// collects the results in channel order.
pub(crate) async fn map_channels<F>(
    array: Arc<IntensityArray>,
    f: F,
) -> Result<[ChannelArray; CHANNELS]>
where
    F: Fn(usize, ChannelArray) -> Result<ChannelArray> + Send + Sync + 'static,
{
    let f = Arc::new(f);
    let tasks = (0..CHANNELS).map(|channel| {
        let array = Arc::clone(&array);
        let f = Arc::clone(&f);
        tokio::task::spawn_blocking(move || {
            let plane = extract_channel(&array, channel)?;
            f(channel, plane)
        })
    });

    let planes = try_join_all(tasks)
        .await
        .map_err(|e| GleitzschError::TaskFailed(e.to_string()))?
        .into_iter()
        .collect::<Result<Vec<_>>>()?;

    planes
        .try_into()
        .map_err(|_| GleitzschError::TaskFailed("expected one plane per channel".to_string()))
}

/// Circularly shifts the outer axis: cell `x` moves to `(x + shift) % width`.
///
/// In image space this moves every column `shift` pixels to the right, wrapping
/// around the edge.
pub fn shift_rows(array: &IntensityArray, shift: u32) -> IntensityArray {
    let width = array.width();
    if width == 0 {
        return array.clone();
    }
    let mut shifted = IntensityArray::new(width, array.height());
    for x in 0..width {
        let target = ((x as u64 + shift as u64) % width as u64) as u32;
        for y in 0..array.height() {
            for c in 0..CHANNELS {
                shifted.set(target, y, c, array.get(x, y, c));
            }
        }
    }
    shifted
}

/// `extent - round(extent / 8)`, rounding halves up.
pub fn correction_shift(extent: u32) -> u32 {
    extent - (extent + SHIFT_DENOMINATOR / 2) / SHIFT_DENOMINATOR
}

/// Applies the Gleitzsch effect to intensity arrays.
pub struct GleitzschOperator {
    codec: Arc<dyn LossyRoundTrip>,
    /// Per-channel spatial shift step; channel `c` is shifted by `step * c`.
    channel_shift_step: u32,
    left_percentile: f64,
    right_percentile: f64,
}

impl GleitzschOperator {
    pub fn new(codec: Arc<dyn LossyRoundTrip>) -> Self {
        Self {
            codec,
            channel_shift_step: DEFAULT_RGB_SHIFT,
            left_percentile: DEFAULT_LEFT_PERCENTILE,
            right_percentile: DEFAULT_RIGHT_PERCENTILE,
        }
    }

    pub fn with_channel_shift_step(mut self, step: u32) -> Self {
        self.channel_shift_step = step;
        self
    }

    pub fn with_percentiles(mut self, left: f64, right: f64) -> Self {
        self.left_percentile = left;
        self.right_percentile = right;
        self
    }

    /// Full operator: codec distortion, offset correction, contrast stretch.
    pub async fn apply(&self, array: IntensityArray) -> Result<IntensityArray> {
        let distorted = self.distort(array).await?;
        Ok(enhance(&distorted, self.left_percentile, self.right_percentile))
    }

    /// Sends each channel through the codec concurrently, merges the planes and
    /// applies the circular offset correction. No contrast stretch.
    pub async fn distort(&self, array: IntensityArray) -> Result<IntensityArray> {
        if array.is_empty() {
            return Err(GleitzschError::EmptyImage);
        }
        info!(
            "original array shape: ({}, {}, {CHANNELS})",
            array.width(),
            array.height()
        );

        let codec = Arc::clone(&self.codec);
        let step = self.channel_shift_step;
        let planes = map_channels(Arc::new(array), move |channel, plane| {
            let amount = channel_shift_amount(step, channel)?;
            info!("channel {channel}: applying shift {amount}");
            let extent = plane.extent();
            let samples = flatten(&spatial_shift(plane, amount)?);
            let decoded = codec.round_trip(&samples)?;
            reassemble(&decoded, extent)
        })
        .await?;

        let merged = merge_channels(&planes)?;
        Ok(shift_rows(&merged, correction_shift(merged.width())))
    }
}
