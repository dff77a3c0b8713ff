// THEORY:
// The `intensity` module holds the two "dumb" data containers the whole effect
// is built on. Like a decoded image, they only know their extents and how to
// address a value; every transformation lives in the modules that consume them.
//
// Key architectural principles:
// 1.  **Fixed addressing**: Both containers are indexed `[x][y]` (plus a channel
//     for `IntensityArray`), with `x` as the outer axis. Every traversal in the
//     crate (flattening, reassembly, the circular shift) is written against this
//     layout, so it must never change silently.
// 2.  **8-bit storage**: Values are stored as `u8`. The codec works on raw bytes,
//     so keeping the storage at byte width makes the signed/unsigned
//     reinterpretation around the round trip a no-op.
// 3.  **Stage isolation**: Each pipeline stage takes an array and returns a new
//     one. Nothing mutates an array it did not create.

pub mod intensity {
    /// Number of color channels carried through the effect (red, green, blue).
    pub const CHANNELS: usize = 3;

    /// A 3D array of 8-bit intensities addressed as `[x][y][channel]`.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct IntensityArray {
        /// The spatial extent along the outer axis.
        width: u32,
        /// The spatial extent along the inner axis.
        height: u32,
        /// `width * height * CHANNELS` values, laid out x-major.
        data: Vec<u8>,
    }

    impl IntensityArray {
        /// Creates a zero-filled array of the given extent.
        pub fn new(width: u32, height: u32) -> Self {
            Self {
                width,
                height,
                data: vec![0; width as usize * height as usize * CHANNELS],
            }
        }

        /// Wraps an x-major buffer. Returns `None` when the buffer length does not
        /// match the extent.
        pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
            if data.len() != width as usize * height as usize * CHANNELS {
                return None;
            }
            Some(Self { width, height, data })
        }

        /// Builds an array by evaluating `f(x, y, channel)` for every cell.
        pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32, usize) -> u8) -> Self {
            let mut array = Self::new(width, height);
            for x in 0..width {
                for y in 0..height {
                    for c in 0..CHANNELS {
                        array.set(x, y, c, f(x, y, c));
                    }
                }
            }
            array
        }

        pub fn width(&self) -> u32 {
            self.width
        }

        pub fn height(&self) -> u32 {
            self.height
        }

        pub fn is_empty(&self) -> bool {
            self.data.is_empty()
        }

        #[inline]
        fn index(&self, x: u32, y: u32, channel: usize) -> usize {
            (x as usize * self.height as usize + y as usize) * CHANNELS + channel
        }

        #[inline]
        pub fn get(&self, x: u32, y: u32, channel: usize) -> u8 {
            self.data[self.index(x, y, channel)]
        }

        #[inline]
        pub fn set(&mut self, x: u32, y: u32, channel: usize, value: u8) {
            let i = self.index(x, y, channel);
            self.data[i] = value;
        }

        /// All values of all channels, in storage order.
        pub fn values(&self) -> &[u8] {
            &self.data
        }

        /// Applies `f` to every value, producing a new array of the same extent.
        pub fn map(&self, f: impl Fn(u8) -> u8) -> Self {
            Self {
                width: self.width,
                height: self.height,
                data: self.data.iter().map(|&v| f(v)).collect(),
            }
        }
    }

    /// A single color plane addressed as `[x][y]`.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ChannelArray {
        /// The spatial extent along the outer axis.
        width: u32,
        /// The spatial extent along the inner axis.
        height: u32,
        /// `width * height` values, laid out x-major.
        data: Vec<u8>,
    }

    impl ChannelArray {
        pub fn new(width: u32, height: u32) -> Self {
            Self {
                width,
                height,
                data: vec![0; width as usize * height as usize],
            }
        }

        pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> u8) -> Self {
            let mut plane = Self::new(width, height);
            for x in 0..width {
                for y in 0..height {
                    plane.set(x, y, f(x, y));
                }
            }
            plane
        }

        pub fn width(&self) -> u32 {
            self.width
        }

        pub fn height(&self) -> u32 {
            self.height
        }

        /// The `(width, height)` pair, used to reassemble a plane after the round trip.
        pub fn extent(&self) -> (u32, u32) {
            (self.width, self.height)
        }

        pub fn len(&self) -> usize {
            self.data.len()
        }

        pub fn is_empty(&self) -> bool {
            self.data.is_empty()
        }

        #[inline]
        pub fn get(&self, x: u32, y: u32) -> u8 {
            self.data[x as usize * self.height as usize + y as usize]
        }

        #[inline]
        pub fn set(&mut self, x: u32, y: u32, value: u8) {
            let i = x as usize * self.height as usize + y as usize;
            self.data[i] = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::intensity::*;

    #[test]
    fn from_raw_rejects_wrong_length() {
        assert!(IntensityArray::from_raw(2, 2, vec![0; 11]).is_none());
        assert!(IntensityArray::from_raw(2, 2, vec![0; 12]).is_some());
    }

    #[test]
    fn addressing_is_x_major() {
        let array = IntensityArray::from_fn(3, 2, |x, y, c| (x * 100 + y * 10) as u8 + c as u8);
        assert_eq!(array.get(2, 1, 2), 212);
        // x = 1, y = 0 starts right after the two y-cells of x = 0.
        assert_eq!(array.values()[2 * CHANNELS], 100);
    }

    #[test]
    fn channel_array_round_trips_cells() {
        let mut plane = ChannelArray::new(4, 3);
        plane.set(3, 2, 77);
        assert_eq!(plane.get(3, 2), 77);
        assert_eq!(plane.extent(), (4, 3));
        assert_eq!(plane.len(), 12);
    }
}
