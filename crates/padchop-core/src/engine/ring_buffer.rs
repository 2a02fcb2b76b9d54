//! Fixed-capacity circular store of interleaved multichannel frames
//!
//! Owned and touched exclusively by the render callback, so there are no
//! atomics here: it is a plain single-threaded FIFO. Unlike the command
//! queues (`rtrb`), writes and reads are all-or-nothing:
//!
//! - `write` rejects the whole block if it does not fit
//! - `read` returns 0 unless the full request is available
//!
//! Storage is allocated once in `new` and never resized.

use crate::types::Sample;

pub struct FrameRing {
    /// Interleaved storage, `capacity * channels` samples
    storage: Box<[Sample]>,
    /// Capacity in frames
    capacity: usize,
    channels: usize,
    /// Next frame slot to write
    write_index: usize,
    /// Next frame slot to read
    read_index: usize,
    /// Frames currently stored (0..=capacity)
    available: usize,
    /// Writes refused for lack of space, over the ring's lifetime
    rejected_writes: u64,
}

impl FrameRing {
    /// Allocate a ring holding `capacity` frames of `channels` samples each
    pub fn new(capacity: usize, channels: usize) -> Self {
        let channels = channels.max(1);
        Self {
            storage: vec![0.0; capacity * channels].into_boxed_slice(),
            capacity,
            channels,
            write_index: 0,
            read_index: 0,
            available: 0,
            rejected_writes: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Frames ready to read
    #[inline]
    pub fn available(&self) -> usize {
        self.available
    }

    /// Frames that can still be written
    #[inline]
    pub fn free(&self) -> usize {
        self.capacity - self.available
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.available == 0
    }

    /// Number of overflowing writes rejected so far (not reset by `clear`)
    pub fn rejected_writes(&self) -> u64 {
        self.rejected_writes
    }

    /// Append interleaved frames
    ///
    /// Returns false and leaves the ring untouched if `frames` is not a whole
    /// number of frames or would push `available` past `capacity`.
    pub fn write(&mut self, frames: &[Sample]) -> bool {
        if frames.len() % self.channels != 0 {
            return false;
        }
        let count = frames.len() / self.channels;
        if count > self.free() {
            self.rejected_writes += 1;
            return false;
        }
        if count == 0 {
            return true;
        }

        // At most two contiguous copies: up to the end of storage, then from the start
        let first = count.min(self.capacity - self.write_index);
        let ch = self.channels;
        let start = self.write_index * ch;
        self.storage[start..start + first * ch].copy_from_slice(&frames[..first * ch]);
        let rest = count - first;
        if rest > 0 {
            self.storage[..rest * ch].copy_from_slice(&frames[first * ch..]);
        }

        self.write_index = (self.write_index + count) % self.capacity;
        self.available += count;
        true
    }

    /// Remove `count` frames into `out` (interleaved)
    ///
    /// Returns `count` on success, or 0 with the ring untouched when fewer
    /// than `count` frames are stored or `out` is too small.
    pub fn read(&mut self, out: &mut [Sample], count: usize) -> usize {
        if count == 0 || count > self.available || out.len() < count * self.channels {
            return 0;
        }

        let first = count.min(self.capacity - self.read_index);
        let ch = self.channels;
        let start = self.read_index * ch;
        out[..first * ch].copy_from_slice(&self.storage[start..start + first * ch]);
        let rest = count - first;
        if rest > 0 {
            out[first * ch..count * ch].copy_from_slice(&self.storage[..rest * ch]);
        }

        self.read_index = (self.read_index + count) % self.capacity;
        self.available -= count;
        count
    }

    /// Forget all stored frames
    ///
    /// Storage contents are left as they are; `available` gates every read.
    pub fn clear(&mut self) {
        self.write_index = 0;
        self.read_index = 0;
        self.available = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(count: usize, channels: usize, offset: usize) -> Vec<Sample> {
        (0..count * channels).map(|i| (offset * channels + i) as Sample).collect()
    }

    #[test]
    fn test_overflowing_write_is_rejected() {
        let mut ring = FrameRing::new(100, 2);
        assert!(ring.write(&frames(60, 2, 0)));
        assert_eq!(ring.available(), 60);

        // 60 + 50 > 100: rejected, nothing written
        assert!(!ring.write(&frames(50, 2, 60)));
        assert_eq!(ring.available(), 60);
        assert_eq!(ring.free(), 40);
        assert_eq!(ring.rejected_writes(), 1);
    }

    #[test]
    fn test_short_read_is_rejected() {
        let mut ring = FrameRing::new(16, 2);
        assert!(ring.write(&frames(4, 2, 0)));
        let mut out = vec![0.0; 32];
        assert_eq!(ring.read(&mut out, 5), 0);
        assert_eq!(ring.available(), 4);
        assert_eq!(ring.read(&mut out, 4), 4);
        assert_eq!(&out[..8], &frames(4, 2, 0)[..]);
        assert!(ring.is_empty());
    }

    #[test]
    fn test_partial_frame_write_is_rejected() {
        let mut ring = FrameRing::new(16, 2);
        assert!(!ring.write(&[1.0, 2.0, 3.0]));
        assert_eq!(ring.available(), 0);
    }

    #[test]
    fn test_wraparound_preserves_order() {
        let mut ring = FrameRing::new(10, 2);
        let mut out = vec![0.0; 20];

        assert!(ring.write(&frames(7, 2, 0)));
        assert_eq!(ring.read(&mut out, 5), 5);
        // write index at 7, read index at 5: this write wraps past the end
        assert!(ring.write(&frames(6, 2, 7)));
        assert_eq!(ring.available(), 8);
        assert_eq!(ring.read(&mut out, 8), 8);
        assert_eq!(&out[..16], &frames(8, 2, 5)[..]);
    }

    #[test]
    fn test_clear_resets_counts() {
        let mut ring = FrameRing::new(8, 1);
        assert!(ring.write(&[1.0, 2.0, 3.0]));
        ring.clear();
        assert_eq!(ring.available(), 0);
        assert_eq!(ring.free(), 8);
        let mut out = [0.0; 3];
        assert_eq!(ring.read(&mut out, 1), 0);
        assert!(ring.write(&[9.0]));
        assert_eq!(ring.read(&mut out, 1), 1);
        assert_eq!(out[0], 9.0);
    }

    #[test]
    fn test_mixed_sequence_matches_fifo_model() {
        // Deterministic pseudo-random sequence of writes and reads checked
        // against a VecDeque model.
        let mut ring = FrameRing::new(37, 2);
        let mut model: std::collections::VecDeque<Sample> = std::collections::VecDeque::new();
        let mut seed: u32 = 0x1234_5678;
        let mut next = move || {
            seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            seed >> 16
        };
        let mut counter = 0usize;
        let mut out = vec![0.0; 128];

        for _ in 0..2000 {
            let n = (next() % 20) as usize;
            if next() % 2 == 0 {
                let block = frames(n, 2, counter);
                let fits = model.len() / 2 + n <= 37;
                assert_eq!(ring.write(&block), fits);
                if fits {
                    model.extend(block.iter().copied());
                    counter += n;
                }
            } else {
                let enough = n > 0 && model.len() / 2 >= n;
                let got = ring.read(&mut out, n);
                if enough {
                    assert_eq!(got, n);
                    for s in &out[..n * 2] {
                        assert_eq!(Some(*s), model.pop_front());
                    }
                } else {
                    assert_eq!(got, 0);
                }
            }
            assert!(ring.available() <= ring.capacity());
            assert_eq!(ring.available(), model.len() / 2);
        }
    }
}
