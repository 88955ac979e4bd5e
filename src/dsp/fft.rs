//! Fixed-size complex FFT over real input.
//!
//! Two engines sit behind [`Transform`]: a table-driven in-place radix-2
//! ([`Radix2Fft`]) and a wrapper around rustfft plans ([`PlannedFft`]).
//! Both are sized once for the largest transform and never allocate in
//! `process`.

use std::f64::consts::PI;
use std::fmt;
use std::sync::Arc;

use rustfft::{Fft, FftPlanner, num_complex::Complex32};

use crate::config::MAX_FFT_SIZE;
use crate::error::{Error, Result};

/// Transform sizes the pipeline can switch between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FftSize {
    S256,
    S512,
    #[default]
    S1024,
    S2048,
}

impl FftSize {
    pub const ALL: [FftSize; 4] = [FftSize::S256, FftSize::S512, FftSize::S1024, FftSize::S2048];

    pub fn len(self) -> usize {
        match self {
            FftSize::S256 => 256,
            FftSize::S512 => 512,
            FftSize::S1024 => 1024,
            FftSize::S2048 => 2048,
        }
    }

    /// Number of half-spectrum magnitude bins (DC up to, not including, Nyquist).
    pub fn bins(self) -> usize {
        self.len() / 2
    }

    pub fn index(self) -> usize {
        match self {
            FftSize::S256 => 0,
            FftSize::S512 => 1,
            FftSize::S1024 => 2,
            FftSize::S2048 => 3,
        }
    }

    pub fn from_len(len: usize) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|size| size.len() == len)
            .ok_or(Error::UnsupportedFftSize(len))
    }

    /// Next size up, wrapping from the largest back to the smallest.
    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl fmt::Display for FftSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.len())
    }
}

pub trait Transform {
    /// Largest buffer length `process` accepts.
    fn max_size(&self) -> usize;

    /// Forward transform in place. Buffers whose length is not a power of
    /// two, or exceeds `max_size`, are left untouched.
    fn process(&mut self, buffer: &mut [Complex32]);
}

pub struct Radix2Fft {
    twiddles: Vec<Complex32>,
    max_size: usize,
}

impl Radix2Fft {
    pub fn new(max_size: usize) -> Self {
        let max_size = max_size.max(2).next_power_of_two();

        // e^(-2πi k / max) for k in [0, max/2); smaller sizes stride through it
        let twiddles = (0..max_size / 2)
            .map(|k| {
                let angle = -2.0 * PI * k as f64 / max_size as f64;
                Complex32::new(angle.cos() as f32, angle.sin() as f32)
            })
            .collect();

        Self { twiddles, max_size }
    }
}

impl Default for Radix2Fft {
    fn default() -> Self {
        Self::new(MAX_FFT_SIZE)
    }
}

impl Transform for Radix2Fft {
    fn max_size(&self) -> usize {
        self.max_size
    }

    fn process(&mut self, buffer: &mut [Complex32]) {
        let n = buffer.len();
        if n < 2 || !n.is_power_of_two() || n > self.max_size {
            return;
        }

        bit_reverse(buffer);

        let mut len = 2;
        while len <= n {
            let half = len / 2;
            let stride = self.max_size / len;

            for start in (0..n).step_by(len) {
                for j in 0..half {
                    let w = self.twiddles[j * stride];
                    let a = buffer[start + j];
                    let b = buffer[start + j + half] * w;
                    buffer[start + j] = a + b;
                    buffer[start + j + half] = a - b;
                }
            }

            len <<= 1;
        }
    }
}

fn bit_reverse(data: &mut [Complex32]) {
    let n = data.len();
    let mut j = 0;
    for i in 1..n {
        let mut bit = n >> 1;
        while j & bit != 0 {
            j ^= bit;
            bit >>= 1;
        }
        j ^= bit;
        if i < j {
            data.swap(i, j);
        }
    }
}

/// rustfft plans for every [`FftSize`], planned up front.
pub struct PlannedFft {
    plans: Vec<Arc<dyn Fft<f32>>>,
    scratch: Vec<Complex32>,
}

impl PlannedFft {
    pub fn new() -> Self {
        let mut planner = FftPlanner::new();
        let plans: Vec<Arc<dyn Fft<f32>>> = FftSize::ALL
            .iter()
            .map(|size| planner.plan_fft_forward(size.len()))
            .collect();

        let scratch_len = plans
            .iter()
            .map(|plan| plan.get_inplace_scratch_len())
            .max()
            .unwrap_or(0);

        Self {
            plans,
            scratch: vec![Complex32::new(0.0, 0.0); scratch_len],
        }
    }
}

impl Default for PlannedFft {
    fn default() -> Self {
        Self::new()
    }
}

impl Transform for PlannedFft {
    fn max_size(&self) -> usize {
        MAX_FFT_SIZE
    }

    fn process(&mut self, buffer: &mut [Complex32]) {
        let Some(plan) = self.plans.iter().find(|plan| plan.len() == buffer.len()) else {
            return;
        };
        let scratch_len = plan.get_inplace_scratch_len();
        plan.process_with_scratch(buffer, &mut self.scratch[..scratch_len]);
    }
}
