use apodize::hanning_iter;

use super::fft::FftSize;

/// Hann window for one transform size together with the gains used to
/// calibrate extracted band energy.
pub struct Window {
    coeffs: Vec<f32>,
    coherent_sum: f32,
    rms_gain: f32,
}

impl Window {
    pub fn hann(len: usize) -> Self {
        // 0.5 * (1 - cos(2πi / (N - 1)))
        let coeffs: Vec<f32> = hanning_iter(len).map(|x| x as f32).collect();

        let coherent_sum = coeffs.iter().map(|&w| w as f64).sum::<f64>() as f32;
        let power_sum = coeffs.iter().map(|&w| (w as f64) * (w as f64)).sum::<f64>();
        let rms_gain = if len > 0 {
            (power_sum / len as f64).sqrt() as f32
        } else {
            0.0
        };

        Self {
            coeffs,
            coherent_sum,
            rms_gain,
        }
    }

    pub fn coeffs(&self) -> &[f32] {
        &self.coeffs
    }

    pub fn len(&self) -> usize {
        self.coeffs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coeffs.is_empty()
    }

    /// Sum of the coefficients.
    pub fn coherent_sum(&self) -> f32 {
        self.coherent_sum
    }

    /// sqrt(mean(w²)).
    pub fn rms_gain(&self) -> f32 {
        self.rms_gain
    }
}

/// One precomputed [`Window`] per [`FftSize`], so a size switch never
/// recomputes or allocates.
pub struct WindowBank {
    windows: Vec<Window>,
}

impl WindowBank {
    pub fn new() -> Self {
        Self {
            windows: FftSize::ALL.iter().map(|size| Window::hann(size.len())).collect(),
        }
    }

    pub fn get(&self, size: FftSize) -> &Window {
        &self.windows[size.index()]
    }
}

impl Default for WindowBank {
    fn default() -> Self {
        Self::new()
    }
}
