//! User-facing parameters and the lock-free handoff from the UI thread to the
//! audio callback.

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

use atomic_float::AtomicF32;
use serde::{Deserialize, Serialize};

use crate::config::{
    BANDS, DEFAULT_ATTACK_MS, DEFAULT_BANDWIDTH_PERCENT, DEFAULT_FREQUENCIES, DEFAULT_RELEASE_MS,
    MAX_ATTACK_MS, MAX_BANDWIDTH_PERCENT, MAX_FREQ, MAX_RELEASE_MS, MIN_ATTACK_MS,
    MIN_BANDWIDTH_PERCENT, MIN_FREQ, MIN_RELEASE_MS,
};
use crate::dsp::{DetectionMode, FftSize, OutputMode};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    pub frequencies: [f32; BANDS],
    pub bandwidth_percent: f32,
    pub attack_ms: f32,
    pub release_ms: f32,
    pub detection: DetectionMode,
    pub output_modes: [OutputMode; BANDS],
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            frequencies: DEFAULT_FREQUENCIES,
            bandwidth_percent: DEFAULT_BANDWIDTH_PERCENT,
            attack_ms: DEFAULT_ATTACK_MS,
            release_ms: DEFAULT_RELEASE_MS,
            detection: DetectionMode::Power,
            output_modes: [OutputMode::Replace; BANDS],
        }
    }
}

fn clamp_or(value: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback
    }
}

fn check(name: &'static str, value: f32, min: f32, max: f32) -> Result<()> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(Error::ParameterOutOfRange {
            name,
            value,
            min,
            max,
        })
    }
}

impl Parameters {
    /// Bandwidth as a fraction of an octave.
    pub fn bandwidth_octaves(&self) -> f32 {
        self.bandwidth_percent / 100.0
    }

    pub fn clamped(mut self) -> Self {
        for (freq, default) in self.frequencies.iter_mut().zip(DEFAULT_FREQUENCIES) {
            *freq = clamp_or(*freq, MIN_FREQ, MAX_FREQ, default);
        }
        self.bandwidth_percent = clamp_or(
            self.bandwidth_percent,
            MIN_BANDWIDTH_PERCENT,
            MAX_BANDWIDTH_PERCENT,
            DEFAULT_BANDWIDTH_PERCENT,
        );
        self.attack_ms = clamp_or(self.attack_ms, MIN_ATTACK_MS, MAX_ATTACK_MS, DEFAULT_ATTACK_MS);
        self.release_ms = clamp_or(
            self.release_ms,
            MIN_RELEASE_MS,
            MAX_RELEASE_MS,
            DEFAULT_RELEASE_MS,
        );
        self
    }

    pub fn validate(&self) -> Result<()> {
        for freq in self.frequencies {
            check("frequency", freq, MIN_FREQ, MAX_FREQ)?;
        }
        check(
            "bandwidth_percent",
            self.bandwidth_percent,
            MIN_BANDWIDTH_PERCENT,
            MAX_BANDWIDTH_PERCENT,
        )?;
        check("attack_ms", self.attack_ms, MIN_ATTACK_MS, MAX_ATTACK_MS)?;
        check("release_ms", self.release_ms, MIN_RELEASE_MS, MAX_RELEASE_MS)?;
        Ok(())
    }
}

/// Map a 0-1 pot position to a frequency, log-spaced over the band range.
pub fn pot_to_freq(norm: f32) -> f32 {
    let min_log = MIN_FREQ.ln();
    let max_log = MAX_FREQ.ln();
    (min_log + norm.clamp(0.0, 1.0) * (max_log - min_log)).exp()
}

/// Inverse of [`pot_to_freq`], clamped to [0, 1].
pub fn freq_to_pot(freq: f32) -> f32 {
    let min_log = MIN_FREQ.ln();
    let max_log = MAX_FREQ.ln();
    ((freq.max(MIN_FREQ).ln() - min_log) / (max_log - min_log)).clamp(0.0, 1.0)
}

fn detection_to_u8(mode: DetectionMode) -> u8 {
    match mode {
        DetectionMode::Power => 0,
        DetectionMode::Peak => 1,
    }
}

fn detection_from_u8(value: u8) -> DetectionMode {
    match value {
        1 => DetectionMode::Peak,
        _ => DetectionMode::Power,
    }
}

fn output_mode_to_u8(mode: OutputMode) -> u8 {
    match mode {
        OutputMode::Replace => 0,
        OutputMode::Add => 1,
    }
}

fn output_mode_from_u8(value: u8) -> OutputMode {
    match value {
        1 => OutputMode::Add,
        _ => OutputMode::Replace,
    }
}

/// Parameters written by the UI thread and read by the audio callback.
///
/// Every field is an independent relaxed word store, so neither side ever
/// waits on the other.
pub struct SharedParameters {
    frequencies: [AtomicF32; BANDS],
    bandwidth_percent: AtomicF32,
    attack_ms: AtomicF32,
    release_ms: AtomicF32,
    detection: AtomicU8,
    output_modes: [AtomicU8; BANDS],
    fft_size: AtomicUsize,
}

impl SharedParameters {
    pub fn new(params: &Parameters, fft_size: FftSize) -> Self {
        let params = params.clamped();
        Self {
            frequencies: params.frequencies.map(AtomicF32::new),
            bandwidth_percent: AtomicF32::new(params.bandwidth_percent),
            attack_ms: AtomicF32::new(params.attack_ms),
            release_ms: AtomicF32::new(params.release_ms),
            detection: AtomicU8::new(detection_to_u8(params.detection)),
            output_modes: params.output_modes.map(|m| AtomicU8::new(output_mode_to_u8(m))),
            fft_size: AtomicUsize::new(fft_size.len()),
        }
    }

    pub fn snapshot(&self) -> Parameters {
        Parameters {
            frequencies: std::array::from_fn(|i| self.frequencies[i].load(Ordering::Relaxed)),
            bandwidth_percent: self.bandwidth_percent.load(Ordering::Relaxed),
            attack_ms: self.attack_ms.load(Ordering::Relaxed),
            release_ms: self.release_ms.load(Ordering::Relaxed),
            detection: detection_from_u8(self.detection.load(Ordering::Relaxed)),
            output_modes: std::array::from_fn(|i| {
                output_mode_from_u8(self.output_modes[i].load(Ordering::Relaxed))
            }),
        }
    }

    pub fn set_frequency(&self, band: usize, freq: f32) {
        if let Some(cell) = self.frequencies.get(band) {
            cell.store(
                clamp_or(freq, MIN_FREQ, MAX_FREQ, DEFAULT_FREQUENCIES[band]),
                Ordering::Relaxed,
            );
        }
    }

    pub fn set_bandwidth_percent(&self, percent: f32) {
        self.bandwidth_percent.store(
            clamp_or(
                percent,
                MIN_BANDWIDTH_PERCENT,
                MAX_BANDWIDTH_PERCENT,
                DEFAULT_BANDWIDTH_PERCENT,
            ),
            Ordering::Relaxed,
        );
    }

    pub fn set_attack_ms(&self, ms: f32) {
        self.attack_ms.store(
            clamp_or(ms, MIN_ATTACK_MS, MAX_ATTACK_MS, DEFAULT_ATTACK_MS),
            Ordering::Relaxed,
        );
    }

    pub fn set_release_ms(&self, ms: f32) {
        self.release_ms.store(
            clamp_or(ms, MIN_RELEASE_MS, MAX_RELEASE_MS, DEFAULT_RELEASE_MS),
            Ordering::Relaxed,
        );
    }

    pub fn set_detection(&self, mode: DetectionMode) {
        self.detection.store(detection_to_u8(mode), Ordering::Relaxed);
    }

    pub fn set_output_mode(&self, band: usize, mode: OutputMode) {
        if let Some(cell) = self.output_modes.get(band) {
            cell.store(output_mode_to_u8(mode), Ordering::Relaxed);
        }
    }

    pub fn fft_size(&self) -> FftSize {
        FftSize::from_len(self.fft_size.load(Ordering::Relaxed)).unwrap_or_default()
    }

    pub fn set_fft_size(&self, size: FftSize) {
        self.fft_size.store(size.len(), Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pot_mapping_round_trips_and_spans_range() {
        assert!((pot_to_freq(0.0) - MIN_FREQ).abs() < 1e-3);
        assert!((pot_to_freq(1.0) - MAX_FREQ).abs() < 1.0);
        assert!((freq_to_pot(pot_to_freq(0.37)) - 0.37).abs() < 1e-4);

        assert_eq!(freq_to_pot(1.0), 0.0);
        assert_eq!(freq_to_pot(1.0e6), 1.0);
        assert!(pot_to_freq(0.2) < pot_to_freq(0.3));
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        assert!(Parameters::default().validate().is_ok());

        let params = Parameters {
            release_ms: 1.0,
            ..Default::default()
        };
        assert_eq!(
            params.validate(),
            Err(Error::ParameterOutOfRange {
                name: "release_ms",
                value: 1.0,
                min: MIN_RELEASE_MS,
                max: MAX_RELEASE_MS,
            })
        );
    }

    #[test]
    fn test_clamped_replaces_nan_with_default() {
        let params = Parameters {
            frequencies: [f32::NAN, 50000.0, 1.0],
            bandwidth_percent: 500.0,
            ..Default::default()
        }
        .clamped();

        assert_eq!(params.frequencies, [DEFAULT_FREQUENCIES[0], MAX_FREQ, MIN_FREQ]);
        assert_eq!(params.bandwidth_percent, MAX_BANDWIDTH_PERCENT);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_shared_parameters_snapshot() {
        let shared = SharedParameters::new(&Parameters::default(), FftSize::S512);

        shared.set_frequency(1, 440.0);
        shared.set_frequency(7, 440.0);
        shared.set_bandwidth_percent(1000.0);
        shared.set_detection(DetectionMode::Peak);
        shared.set_output_mode(2, OutputMode::Add);
        shared.set_fft_size(FftSize::S2048);

        let snapshot = shared.snapshot();
        assert_eq!(snapshot.frequencies[1], 440.0);
        assert_eq!(snapshot.bandwidth_percent, MAX_BANDWIDTH_PERCENT);
        assert_eq!(snapshot.detection, DetectionMode::Peak);
        assert_eq!(snapshot.output_modes[2], OutputMode::Add);
        assert_eq!(shared.fft_size(), FftSize::S2048);
    }

    #[test]
    fn test_shared_parameters_clamp_float_stores() {
        let shared = SharedParameters::new(&Parameters::default(), FftSize::S1024);

        shared.set_attack_ms(0.0);
        shared.set_release_ms(f32::NAN);
        shared.set_frequency(0, f32::INFINITY);

        let snapshot = shared.snapshot();
        assert_eq!(snapshot.attack_ms, MIN_ATTACK_MS);
        assert_eq!(snapshot.release_ms, DEFAULT_RELEASE_MS);
        assert_eq!(snapshot.frequencies[0], DEFAULT_FREQUENCIES[0]);
        assert!(snapshot.validate().is_ok());
    }
}
