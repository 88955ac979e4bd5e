use std::f32::consts::SQRT_2;

use serde::{Deserialize, Serialize};

use crate::config::{MAX_FREQ, MIN_FREQ};

use super::window::Window;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionMode {
    /// Power summed over the band, reported as RMS amplitude.
    #[default]
    Power,
    /// Largest single bin in the band.
    Peak,
}

impl DetectionMode {
    pub fn name(self) -> &'static str {
        match self {
            DetectionMode::Power => "Power (RMS)",
            DetectionMode::Peak => "Peak",
        }
    }
}

/// Inclusive range of half-spectrum bins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinRange {
    pub lo: usize,
    pub hi: usize,
}

impl BinRange {
    pub fn len(&self) -> usize {
        (self.hi + 1).saturating_sub(self.lo)
    }

    pub fn is_empty(&self) -> bool {
        self.hi < self.lo
    }
}

/// Bins `[round(c - w/2), round(c + w/2)]` for a band `octaves` wide around
/// `center_freq`, clamped to `[0, bins - 1]`.
///
/// Returns `None` when nothing of the band falls inside the spectrum.
pub fn bin_range(center_freq: f32, octaves: f32, bin_hz: f32, bins: usize) -> Option<BinRange> {
    if bins == 0 || !(bin_hz > 0.0) || !center_freq.is_finite() || !octaves.is_finite() {
        return None;
    }

    let center_bin = center_freq / bin_hz;
    let bandwidth_hz = center_freq * (2f32.powf(octaves.max(0.0)) - 1.0);
    let half_width = bandwidth_hz / bin_hz / 2.0;

    let lo = (center_bin - half_width).round();
    let hi = (center_bin + half_width).round();
    let last = (bins - 1) as f32;

    if !lo.is_finite() || !hi.is_finite() || hi < 0.0 || lo > last || hi < lo {
        return None;
    }

    Some(BinRange {
        lo: lo.clamp(0.0, last) as usize,
        hi: hi.clamp(0.0, last) as usize,
    })
}

/// Scale factors turning raw magnitudes into full-scale amplitudes for one
/// window.
#[derive(Debug, Clone, Copy)]
pub struct Calibration {
    len: usize,
    peak_edge: f32,
    peak_interior: f32,
    rms_scale: f32,
}

impl Calibration {
    pub fn new(window: &Window) -> Self {
        let len = window.len();
        let sum = window.coherent_sum();
        let rms = window.rms_gain() * len as f32;

        Self {
            len,
            // DC and Nyquist have no mirrored partner
            peak_edge: if sum > 0.0 { 1.0 / sum } else { 0.0 },
            peak_interior: if sum > 0.0 { 2.0 / sum } else { 0.0 },
            rms_scale: if rms > 0.0 { 1.0 / rms } else { 0.0 },
        }
    }

    fn is_edge(&self, bin: usize) -> bool {
        bin == 0 || bin == self.len / 2
    }

    pub fn peak(&self, spectrum: &[f32], range: BinRange) -> f32 {
        let Some(bins) = spectrum.get(range.lo..=range.hi) else {
            return 0.0;
        };

        let mut max_mag = 0.0f32;
        let mut max_bin = range.lo;
        for (offset, &mag) in bins.iter().enumerate() {
            if mag > max_mag {
                max_mag = mag;
                max_bin = range.lo + offset;
            }
        }

        if max_mag <= 0.0 {
            return 0.0;
        }

        let scale = if self.is_edge(max_bin) {
            self.peak_edge
        } else {
            self.peak_interior
        };
        max_mag * scale
    }

    pub fn rms(&self, spectrum: &[f32], range: BinRange) -> f32 {
        let Some(bins) = spectrum.get(range.lo..=range.hi) else {
            return 0.0;
        };

        let mut sum = 0.0f32;
        for (offset, &mag) in bins.iter().enumerate() {
            // interior bins stand in for their negative-frequency mirror too
            let weight = if self.is_edge(range.lo + offset) { 1.0 } else { 2.0 };
            sum += mag * mag * weight;
        }

        if sum <= 0.0 {
            return 0.0;
        }

        // sine crest factor so a full-scale sine reads 1.0
        sum.sqrt() * self.rms_scale * SQRT_2
    }

    pub fn energy(&self, spectrum: &[f32], range: BinRange, mode: DetectionMode) -> f32 {
        let energy = match mode {
            DetectionMode::Peak => self.peak(spectrum, range),
            DetectionMode::Power => self.rms(spectrum, range),
        };

        if energy.is_finite() {
            energy.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// One analysis band.
#[derive(Debug, Clone)]
pub struct Band {
    frequency: f32,
    bandwidth_octaves: f32,
    center_bin: f32,
    detection: DetectionMode,
}

impl Band {
    pub fn new(frequency: f32, bandwidth_octaves: f32, detection: DetectionMode, bin_hz: f32) -> Self {
        let mut band = Self {
            frequency: MIN_FREQ,
            bandwidth_octaves: bandwidth_octaves.max(0.0),
            center_bin: 0.0,
            detection,
        };
        band.set_frequency(frequency, bin_hz);
        band
    }

    pub fn set_frequency(&mut self, frequency: f32, bin_hz: f32) {
        if frequency.is_finite() {
            self.frequency = frequency.clamp(MIN_FREQ, MAX_FREQ);
        }
        self.retune(bin_hz);
    }

    /// Recompute the cached centre bin after a sample rate or size change.
    pub fn retune(&mut self, bin_hz: f32) {
        if bin_hz > 0.0 {
            self.center_bin = self.frequency / bin_hz;
        }
    }

    pub fn set_bandwidth_octaves(&mut self, octaves: f32) {
        if octaves.is_finite() {
            self.bandwidth_octaves = octaves.max(0.0);
        }
    }

    pub fn set_detection(&mut self, detection: DetectionMode) {
        self.detection = detection;
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn bandwidth_octaves(&self) -> f32 {
        self.bandwidth_octaves
    }

    pub fn center_bin(&self) -> f32 {
        self.center_bin
    }

    pub fn detection(&self) -> DetectionMode {
        self.detection
    }

    pub fn range(&self, bin_hz: f32, bins: usize) -> Option<BinRange> {
        bin_range(self.frequency, self.bandwidth_octaves, bin_hz, bins)
    }

    /// Calibrated energy in [0, 1]; zero when the band misses the spectrum.
    pub fn energy(&self, spectrum: &[f32], bin_hz: f32, calibration: &Calibration) -> f32 {
        match self.range(bin_hz, spectrum.len()) {
            Some(range) => calibration.energy(spectrum, range, self.detection),
            None => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_third_octave_at_1k() {
        // 512-point at 48 kHz: 93.75 Hz bins, centre bin 10.67
        let range = bin_range(1000.0, 0.33, 93.75, 256).unwrap();
        assert_eq!(range, BinRange { lo: 9, hi: 12 });

        // 1024-point: 46.875 Hz bins, centre bin 21.33
        let range = bin_range(1000.0, 0.33, 46.875, 512).unwrap();
        assert_eq!(range, BinRange { lo: 19, hi: 24 });
    }

    #[test]
    fn test_zero_bandwidth_is_single_bin() {
        let range = bin_range(1000.0, 0.0, 93.75, 256).unwrap();
        assert_eq!(range, BinRange { lo: 11, hi: 11 });
        assert_eq!(range.len(), 1);
    }

    #[test]
    fn test_band_above_spectrum_is_none() {
        // 8 kHz sample rate, Nyquist 4 kHz
        assert_eq!(bin_range(10000.0, 0.33, 8000.0 / 512.0, 256), None);
    }

    #[test]
    fn test_band_straddling_top_is_clamped() {
        let range = bin_range(3900.0, 1.0, 8000.0 / 512.0, 256).unwrap();
        assert_eq!(range.hi, 255);
        assert!(range.lo < 255);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert_eq!(bin_range(1000.0, 0.33, 0.0, 256), None);
        assert_eq!(bin_range(f32::NAN, 0.33, 93.75, 256), None);
        assert_eq!(bin_range(1000.0, 0.33, 93.75, 0), None);
    }

    #[test]
    fn test_zero_spectrum_gives_zero() {
        let window = Window::hann(512);
        let cal = Calibration::new(&window);
        let spectrum = vec![0.0; 256];
        let range = BinRange { lo: 3, hi: 9 };
        assert_eq!(cal.energy(&spectrum, range, DetectionMode::Peak), 0.0);
        assert_eq!(cal.energy(&spectrum, range, DetectionMode::Power), 0.0);
    }

    #[test]
    fn test_peak_edge_bin_uses_single_sided_scale() {
        let window = Window::hann(512);
        let cal = Calibration::new(&window);
        let mut spectrum = vec![0.0; 256];

        spectrum[0] = window.coherent_sum() * 0.5;
        let dc = cal.peak(&spectrum, BinRange { lo: 0, hi: 2 });
        assert!((dc - 0.5).abs() < 1e-5);

        spectrum[0] = 0.0;
        spectrum[5] = window.coherent_sum() * 0.25;
        let interior = cal.peak(&spectrum, BinRange { lo: 0, hi: 10 });
        assert!((interior - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_energy_is_clamped_to_unity() {
        let window = Window::hann(256);
        let cal = Calibration::new(&window);
        let spectrum = vec![1.0e6; 128];
        let range = BinRange { lo: 0, hi: 127 };
        assert_eq!(cal.energy(&spectrum, range, DetectionMode::Peak), 1.0);
        assert_eq!(cal.energy(&spectrum, range, DetectionMode::Power), 1.0);
    }

    #[test]
    fn test_band_frequency_clamped_and_center_bin_cached() {
        let mut band = Band::new(5.0, 0.33, DetectionMode::Power, 46.875);
        assert_eq!(band.frequency(), MIN_FREQ);

        band.set_frequency(1000.0, 46.875);
        assert!((band.center_bin() - 21.333).abs() < 1e-2);

        band.retune(93.75);
        assert!((band.center_bin() - 10.667).abs() < 1e-2);
    }

    proptest! {
        #[test]
        fn prop_energy_is_finite_and_bounded(
            freq in 20.0f32..20000.0,
            octaves in 0.0f32..2.0,
            sample_rate in 8000.0f32..192000.0,
            level in 0.0f32..1.0e4,
        ) {
            let window = Window::hann(512);
            let cal = Calibration::new(&window);
            let spectrum = vec![level; 256];
            let band = Band::new(freq, octaves, DetectionMode::Power, sample_rate / 512.0);

            let energy = band.energy(&spectrum, sample_rate / 512.0, &cal);
            prop_assert!(energy.is_finite());
            prop_assert!((0.0..=1.0).contains(&energy));

            if let Some(range) = band.range(sample_rate / 512.0, 256) {
                prop_assert!(range.lo <= range.hi);
                prop_assert!(range.hi < 256);
            }
        }
    }
}
