use specenv::config::{BANDS, MAX_FFT_SIZE, SPECTRUM_FLOOR};
use specenv::dsp::Transform;
use specenv::{FftSize, SpectralEnvelopePipeline};

/// Copy of the pipeline's display-facing state, published by the audio
/// callback and read by the UI.
pub struct SpectrumView {
    pub magnitudes: Vec<f32>,
    pub bins: usize,
    pub center_bins: [f32; BANDS],
    pub sample_rate: f32,
    pub fft_size: FftSize,
    pub passes: u64,
}

impl Default for SpectrumView {
    fn default() -> Self {
        let fft_size = FftSize::default();
        Self {
            magnitudes: vec![SPECTRUM_FLOOR; MAX_FFT_SIZE / 2],
            bins: fft_size.bins(),
            center_bins: [0.0; BANDS],
            sample_rate: 0.0,
            fft_size,
            passes: 0,
        }
    }
}

impl SpectrumView {
    pub fn update_from<T: Transform>(&mut self, pipeline: &SpectralEnvelopePipeline<T>) {
        if pipeline.passes() == self.passes && pipeline.fft_size() == self.fft_size {
            return;
        }
        let spectrum = pipeline.spectrum();
        let bins = spectrum.len().min(self.magnitudes.len());
        self.magnitudes[..bins].copy_from_slice(&spectrum[..bins]);
        self.bins = bins;
        self.center_bins = pipeline.center_bins();
        self.sample_rate = pipeline.sample_rate();
        self.fft_size = pipeline.fft_size();
        self.passes = pipeline.passes();
    }

    pub fn spectrum(&self) -> &[f32] {
        &self.magnitudes[..self.bins]
    }

    pub fn bin_hz(&self) -> f32 {
        if self.sample_rate > 0.0 {
            self.sample_rate / self.fft_size.len() as f32
        } else {
            0.0
        }
    }
}
