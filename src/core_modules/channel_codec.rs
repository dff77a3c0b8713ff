// THEORY:
// The channel codec bridge is the array half of the codec round trip. It turns a
// color plane into the byte stream the codec sees and turns the codec's answer
// back into a plane. The process half (temp files, the LAME invocation) lives in
// `lame`; the two meet at `recover_samples`.
//
// Key architectural principles:
// 1.  **Traversal order**: Planes are serialized with the outer loop over the
//     inner `y` axis and the inner loop over `x`. Consecutive samples therefore
//     run along `x`, and the codec's smearing shows up as horizontal streaks.
//     `reassemble` is the exact inverse of `flatten`.
// 2.  **Sample width**: Each value goes out as one 8-bit PCM sample. The codec
//     reads them as signed, so a value of 200 travels as -56; the bit pattern is
//     unchanged and comes back masked to `0..=255` because we store `u8`.
// 3.  **Even-byte recovery**: The decoder emits 16-bit samples, two bytes per
//     input byte. Keeping the first byte of each pair, for the first
//     `2 * original_len` bytes, gives back exactly `original_len` samples.

use crate::core_modules::intensity::intensity::{CHANNELS, ChannelArray, IntensityArray};
use crate::error::{GleitzschError, Result};

/// Bytes the decoder emits per input sample.
pub const DECODED_BYTES_PER_SAMPLE: usize = 2;

/// Copies one color plane out of `array`.
pub fn extract_channel(array: &IntensityArray, channel: usize) -> Result<ChannelArray> {
    if channel >= CHANNELS {
        return Err(GleitzschError::InvalidChannel(channel));
    }
    Ok(ChannelArray::from_fn(array.width(), array.height(), |x, y| {
        array.get(x, y, channel)
    }))
}

/// Puts three planes back together, plane `i` becoming channel `i`.
pub fn merge_channels(planes: &[ChannelArray; CHANNELS]) -> Result<IntensityArray> {
    let extent = planes[0].extent();
    if let Some(other) = planes.iter().find(|p| p.extent() != extent) {
        return Err(GleitzschError::DimensionMismatch {
            expected: extent,
            got: other.extent(),
        });
    }
    Ok(IntensityArray::from_fn(extent.0, extent.1, |x, y, c| {
        planes[c].get(x, y)
    }))
}

/// Serializes a plane into codec samples, `y` outer and `x` inner.
pub fn flatten(channel: &ChannelArray) -> Vec<u8> {
    let mut samples = Vec::with_capacity(channel.len());
    for y in 0..channel.height() {
        for x in 0..channel.width() {
            samples.push(channel.get(x, y));
        }
    }
    samples
}

/// Scatters samples back into a plane of the given extent. Inverse of [`flatten`].
pub fn reassemble(samples: &[u8], extent: (u32, u32)) -> Result<ChannelArray> {
    let (width, height) = extent;
    let expected = width as usize * height as usize;
    if samples.len() < expected {
        return Err(GleitzschError::CodecOutputTooShort {
            expected,
            actual: samples.len(),
        });
    }

    let mut channel = ChannelArray::new(width, height);
    let mut index = 0;
    for y in 0..height {
        for x in 0..width {
            channel.set(x, y, samples[index]);
            index += 1;
        }
    }
    Ok(channel)
}

/// Maps the decoder's 16-bit output back onto the original 8-bit samples by
/// keeping the first byte of every pair.
pub fn recover_samples(decoded: &[u8], original_len: usize) -> Result<Vec<u8>> {
    let needed = original_len * DECODED_BYTES_PER_SAMPLE;
    if decoded.len() < needed {
        return Err(GleitzschError::CodecOutputTooShort {
            expected: needed,
            actual: decoded.len(),
        });
    }
    Ok(decoded[..needed]
        .chunks_exact(DECODED_BYTES_PER_SAMPLE)
        .map(|pair| pair[0])
        .collect())
}
