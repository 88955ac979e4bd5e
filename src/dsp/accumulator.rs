use crate::error::{Error, Result};

use super::fft::FftSize;

/// Circular buffer holding the most recent `len` samples.
///
/// Storage is sized for the largest transform at construction; switching
/// size only changes the active length.
pub struct SampleAccumulator {
    buffer: Vec<f32>,
    len: usize,
    cursor: usize,
    pending: usize,
}

impl SampleAccumulator {
    pub fn new(capacity: usize, size: FftSize) -> Self {
        let capacity = capacity.max(size.len());
        Self {
            buffer: vec![0.0; capacity],
            len: size.len(),
            cursor: 0,
            pending: 0,
        }
    }

    pub fn push(&mut self, sample: f32) {
        // NaN/Inf would poison every bin of the next pass
        let sample = if sample.is_finite() { sample } else { 0.0 };

        if self.cursor >= self.len {
            self.cursor = 0;
        }
        self.buffer[self.cursor] = sample;
        self.cursor += 1;
        if self.cursor == self.len {
            self.cursor = 0;
        }
        self.pending = self.pending.saturating_add(1);
    }

    /// Samples oldest first, starting at the write cursor.
    pub fn ordered(&self) -> impl Iterator<Item = f32> + '_ {
        let active = &self.buffer[..self.len];
        active[self.cursor..].iter().chain(active[..self.cursor].iter()).copied()
    }

    /// Samples pushed since the last call to [`Self::mark_analyzed`].
    pub fn pending(&self) -> usize {
        self.pending
    }

    pub fn mark_analyzed(&mut self) {
        self.pending = 0;
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Moves the cursor, resetting it to zero when out of range.
    pub fn set_cursor(&mut self, cursor: usize) {
        if self.try_set_cursor(cursor).is_err() {
            self.cursor = 0;
        }
    }

    pub fn try_set_cursor(&mut self, cursor: usize) -> Result<()> {
        if cursor >= self.len {
            return Err(Error::CursorOutOfRange {
                cursor,
                capacity: self.len,
            });
        }
        self.cursor = cursor;
        Ok(())
    }

    /// Switches the active length and refills it with silence.
    pub fn resize(&mut self, size: FftSize) {
        self.len = size.len().min(self.buffer.len());
        self.buffer[..self.len].fill(0.0);
        self.cursor = 0;
        self.pending = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_silent_and_full() {
        let acc = SampleAccumulator::new(2048, FftSize::S256);
        assert_eq!(acc.len(), 256);
        assert_eq!(acc.ordered().count(), 256);
        assert!(acc.ordered().all(|s| s == 0.0));
    }

    #[test]
    fn test_wraps_and_orders_oldest_first() {
        let mut acc = SampleAccumulator::new(256, FftSize::S256);
        for i in 0..300 {
            acc.push(i as f32);
        }

        assert_eq!(acc.cursor(), 300 % 256);
        assert_eq!(acc.pending(), 300);

        let ordered: Vec<f32> = acc.ordered().collect();
        assert_eq!(ordered.len(), 256);
        assert_eq!(ordered[0], 44.0);
        assert_eq!(ordered[255], 299.0);
        assert!(ordered.windows(2).all(|w| w[1] == w[0] + 1.0));
    }

    #[test]
    fn test_non_finite_samples_become_silence() {
        let mut acc = SampleAccumulator::new(256, FftSize::S256);
        acc.push(f32::NAN);
        acc.push(f32::INFINITY);
        assert!(acc.ordered().all(|s| s == 0.0));
        assert_eq!(acc.pending(), 2);
    }

    #[test]
    fn test_cursor_out_of_range() {
        let mut acc = SampleAccumulator::new(2048, FftSize::S512);
        acc.push(1.0);

        assert_eq!(
            acc.try_set_cursor(512),
            Err(Error::CursorOutOfRange {
                cursor: 512,
                capacity: 512
            })
        );
        assert_eq!(acc.cursor(), 1);

        acc.set_cursor(4000);
        assert_eq!(acc.cursor(), 0);

        acc.set_cursor(100);
        assert_eq!(acc.cursor(), 100);
    }

    #[test]
    fn test_resize_clears_state() {
        let mut acc = SampleAccumulator::new(2048, FftSize::S1024);
        for _ in 0..700 {
            acc.push(0.5);
        }

        acc.resize(FftSize::S2048);

        assert_eq!(acc.len(), 2048);
        assert_eq!(acc.cursor(), 0);
        assert_eq!(acc.pending(), 0);
        assert!(acc.ordered().all(|s| s == 0.0));
    }
}
