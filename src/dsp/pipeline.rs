//! The three-band spectral envelope follower.
//!
//! Samples flow one way per block: accumulator, then (when the scheduler
//! fires) window, transform, magnitude, band extraction and smoothing. The
//! envelopes are held and written out for every sample of the block.
//!
//! Everything is sized at construction; `analyze`, `process` and the output
//! writers never allocate, lock or fail loudly.

use rustfft::num_complex::Complex32;
use tracing::{debug, trace};

use crate::config::{
    BANDS, DEFAULT_ANALYSIS_RATE_HZ, DEFAULT_SAMPLE_RATE, MAX_FFT_SIZE, SPECTRUM_FLOOR,
};
use crate::params::Parameters;

use super::accumulator::SampleAccumulator;
use super::band::{Band, BinRange, Calibration, DetectionMode};
use super::envelope::{EnvelopeFollower, SmoothingCoefficients};
use super::fft::{FftSize, Radix2Fft, Transform};
use super::output::{OutputMode, envelope_to_volts, write_block};
use super::scheduler::AnalysisScheduler;
use super::window::WindowBank;

// ~10 s at the default rate
const TRACE_EVERY_PASSES: u64 = 600;

/// Read-only host state handed to every audio call.
#[derive(Debug, Clone, Copy)]
pub struct ProcessContext {
    pub sample_rate: f32,
}

impl ProcessContext {
    pub fn new(sample_rate: f32) -> Self {
        Self { sample_rate }
    }

    /// The host rate, or 48 kHz when the host reports nothing usable.
    pub fn sample_rate(&self) -> f32 {
        if self.sample_rate.is_finite() && self.sample_rate > 0.0 {
            self.sample_rate
        } else {
            DEFAULT_SAMPLE_RATE
        }
    }
}

impl Default for ProcessContext {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE)
    }
}

/// Progress of a transform size change.
///
/// `Draining` is entered from the UI side; the next audio call discards the
/// in-flight window and moves to `Resized`; the first pass at the new size
/// returns to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeState {
    Idle,
    Draining(FftSize),
    Resized,
}

pub struct SpectralEnvelopePipeline<T: Transform = Radix2Fft> {
    transform: T,
    windows: WindowBank,
    calibrations: Vec<Calibration>,
    accumulator: SampleAccumulator,
    scheduler: AnalysisScheduler,
    scratch: Vec<Complex32>,
    spectrum: Vec<f32>,
    bands: [Band; BANDS],
    envelopes: [EnvelopeFollower; BANDS],
    output_modes: [OutputMode; BANDS],
    coeffs: SmoothingCoefficients,
    params: Parameters,
    analysis_rate_hz: f32,
    sample_rate: f32,
    size: FftSize,
    resize: ResizeState,
    passes: u64,
}

impl SpectralEnvelopePipeline<Radix2Fft> {
    pub fn new(size: FftSize, analysis_rate_hz: f32, params: &Parameters) -> Self {
        Self::with_transform(Radix2Fft::new(MAX_FFT_SIZE), size, analysis_rate_hz, params)
    }
}

impl Default for SpectralEnvelopePipeline<Radix2Fft> {
    fn default() -> Self {
        Self::new(FftSize::default(), DEFAULT_ANALYSIS_RATE_HZ, &Parameters::default())
    }
}

impl<T: Transform> SpectralEnvelopePipeline<T> {
    pub fn with_transform(
        transform: T,
        size: FftSize,
        analysis_rate_hz: f32,
        params: &Parameters,
    ) -> Self {
        let params = params.clamped();
        let analysis_rate_hz = if analysis_rate_hz.is_finite() && analysis_rate_hz > 0.0 {
            analysis_rate_hz
        } else {
            DEFAULT_ANALYSIS_RATE_HZ
        };
        let sample_rate = DEFAULT_SAMPLE_RATE;
        let bin_hz = sample_rate / size.len() as f32;

        let windows = WindowBank::new();
        let calibrations = FftSize::ALL
            .iter()
            .map(|&s| Calibration::new(windows.get(s)))
            .collect();

        let bands = std::array::from_fn(|i| {
            Band::new(
                params.frequencies[i],
                params.bandwidth_octaves(),
                params.detection,
                bin_hz,
            )
        });

        debug!(
            fft_size = size.len(),
            analysis_rate_hz,
            max_transform = transform.max_size(),
            "spectral envelope pipeline created"
        );

        Self {
            transform,
            windows,
            calibrations,
            accumulator: SampleAccumulator::new(MAX_FFT_SIZE, size),
            scheduler: AnalysisScheduler::new(analysis_rate_hz, sample_rate, size.len()),
            scratch: vec![Complex32::new(0.0, 0.0); MAX_FFT_SIZE],
            spectrum: vec![SPECTRUM_FLOOR; MAX_FFT_SIZE / 2],
            bands,
            envelopes: [EnvelopeFollower::new(); BANDS],
            output_modes: params.output_modes,
            coeffs: SmoothingCoefficients::new(params.attack_ms, params.release_ms, analysis_rate_hz),
            params,
            analysis_rate_hz,
            sample_rate,
            size,
            resize: ResizeState::Idle,
            passes: 0,
        }
    }

    // --- parameter path --------------------------------------------------

    /// Apply a full parameter set, recomputing only what changed.
    ///
    /// Shared bandwidth and detection are compared against the bands
    /// themselves, so a per-band override is undone by the next full set.
    pub fn set_parameters(&mut self, params: &Parameters) {
        let params = params.clamped();
        if params == self.params && !self.bands_overridden(&params) {
            return;
        }

        for band in 0..BANDS {
            if params.frequencies[band] != self.params.frequencies[band] {
                self.set_band_frequency(band, params.frequencies[band]);
            }
            if params.output_modes[band] != self.params.output_modes[band] {
                self.set_output_mode(band, params.output_modes[band]);
            }
        }
        if params.bandwidth_percent != self.params.bandwidth_percent
            || self
                .bands
                .iter()
                .any(|b| b.bandwidth_octaves() != params.bandwidth_octaves())
        {
            self.set_bandwidth_percent(params.bandwidth_percent);
        }
        if params.attack_ms != self.params.attack_ms || params.release_ms != self.params.release_ms
        {
            self.set_times(params.attack_ms, params.release_ms);
        }
        if params.detection != self.params.detection
            || self.bands.iter().any(|b| b.detection() != params.detection)
        {
            self.set_detection_mode(params.detection);
        }
    }

    fn bands_overridden(&self, params: &Parameters) -> bool {
        self.bands.iter().any(|b| {
            b.detection() != params.detection
                || b.bandwidth_octaves() != params.bandwidth_octaves()
        })
    }

    /// The last shared values. Per-band overrides from
    /// `set_band_bandwidth_octaves` and `set_band_detection_mode` show up
    /// through [`band`](Self::band), not here.
    pub fn parameters(&self) -> &Parameters {
        &self.params
    }

    pub fn set_band_frequency(&mut self, band: usize, freq: f32) {
        let bin_hz = self.bin_hz();
        if let Some(b) = self.bands.get_mut(band) {
            b.set_frequency(freq, bin_hz);
            self.params.frequencies[band] = b.frequency();
            debug!(band, freq = b.frequency(), center_bin = b.center_bin(), "band frequency");
        }
    }

    /// Shared bandwidth, as a percentage of an octave.
    pub fn set_bandwidth_percent(&mut self, percent: f32) {
        let params = Parameters {
            bandwidth_percent: percent,
            ..self.params
        }
        .clamped();
        self.params.bandwidth_percent = params.bandwidth_percent;
        for band in &mut self.bands {
            band.set_bandwidth_octaves(params.bandwidth_octaves());
        }
    }

    pub fn set_band_bandwidth_octaves(&mut self, band: usize, octaves: f32) {
        if let Some(b) = self.bands.get_mut(band) {
            b.set_bandwidth_octaves(octaves);
        }
    }

    pub fn set_attack_ms(&mut self, attack_ms: f32) {
        self.set_times(attack_ms, self.params.release_ms);
    }

    pub fn set_release_ms(&mut self, release_ms: f32) {
        self.set_times(self.params.attack_ms, release_ms);
    }

    fn set_times(&mut self, attack_ms: f32, release_ms: f32) {
        let params = Parameters {
            attack_ms,
            release_ms,
            ..self.params
        }
        .clamped();
        self.params.attack_ms = params.attack_ms;
        self.params.release_ms = params.release_ms;
        self.coeffs =
            SmoothingCoefficients::new(params.attack_ms, params.release_ms, self.analysis_rate_hz);
        debug!(
            attack_ms = params.attack_ms,
            release_ms = params.release_ms,
            attack = self.coeffs.attack,
            release = self.coeffs.release,
            "smoothing coefficients"
        );
    }

    /// Detection law for every band.
    pub fn set_detection_mode(&mut self, mode: DetectionMode) {
        self.params.detection = mode;
        for band in &mut self.bands {
            band.set_detection(mode);
        }
    }

    pub fn set_band_detection_mode(&mut self, band: usize, mode: DetectionMode) {
        if let Some(b) = self.bands.get_mut(band) {
            b.set_detection(mode);
        }
    }

    pub fn set_output_mode(&mut self, band: usize, mode: OutputMode) {
        if let Some(slot) = self.output_modes.get_mut(band) {
            *slot = mode;
            self.params.output_modes[band] = mode;
        }
    }

    pub fn set_analysis_rate(&mut self, analysis_rate_hz: f32) {
        if !(analysis_rate_hz.is_finite() && analysis_rate_hz > 0.0) {
            return;
        }
        self.analysis_rate_hz = analysis_rate_hz;
        self.scheduler.set_target_rate(analysis_rate_hz);
        self.scheduler.configure(self.sample_rate, self.size.len());
        self.set_times(self.params.attack_ms, self.params.release_ms);
    }

    /// Ask for a new transform size; applied at the start of the next audio call.
    pub fn request_resize(&mut self, size: FftSize) {
        match self.resize {
            ResizeState::Draining(_) => self.resize = ResizeState::Draining(size),
            _ if size != self.size => {
                debug!(from = self.size.len(), to = size.len(), "transform resize requested");
                self.resize = ResizeState::Draining(size);
            }
            _ => {}
        }
    }

    // --- audio path ------------------------------------------------------

    /// Ingest one block and hold the envelopes on every output.
    pub fn process(
        &mut self,
        ctx: &ProcessContext,
        input: &[f32],
        outputs: [Option<&mut [f32]>; BANDS],
    ) {
        if input.is_empty() {
            return;
        }
        self.analyze(ctx, input);
        for (band, dest) in outputs.into_iter().enumerate() {
            if let Some(dest) = dest {
                let len = dest.len().min(input.len());
                self.write_output(band, &mut dest[..len]);
            }
        }
    }

    /// Push a block through the accumulator, running every pass it triggers.
    pub fn analyze(&mut self, ctx: &ProcessContext, input: &[f32]) {
        if input.is_empty() {
            return;
        }

        self.sync_sample_rate(ctx.sample_rate());
        self.apply_resize();

        for &sample in input {
            self.accumulator.push(sample);
            if self.scheduler.should_fire(self.accumulator.pending()) {
                self.run_pass();
            }
        }
    }

    /// Write one band's held voltage according to its output mode.
    pub fn write_output(&self, band: usize, dest: &mut [f32]) {
        if let (Some(env), Some(&mode)) = (self.envelopes.get(band), self.output_modes.get(band)) {
            write_block(dest, envelope_to_volts(env.value()), mode);
        }
    }

    fn sync_sample_rate(&mut self, sample_rate: f32) {
        if (sample_rate - self.sample_rate).abs() < 1e-3 {
            return;
        }
        self.sample_rate = sample_rate;
        self.scheduler.configure(sample_rate, self.size.len());
        self.retune();
        debug!(sample_rate, interval = self.scheduler.interval(), "sample rate changed");
    }

    fn apply_resize(&mut self) {
        let ResizeState::Draining(target) = self.resize else {
            return;
        };

        self.size = target;
        self.accumulator.resize(target);
        self.scheduler.reset();
        self.scheduler.configure(self.sample_rate, target.len());
        self.spectrum.fill(SPECTRUM_FLOOR);
        self.retune();
        self.resize = ResizeState::Resized;
        debug!(fft_size = target.len(), "transform resized");
    }

    fn retune(&mut self) {
        let bin_hz = self.bin_hz();
        for band in &mut self.bands {
            band.retune(bin_hz);
        }
    }

    fn run_pass(&mut self) {
        let n = self.size.len();
        let bins = self.size.bins();
        let window = self.windows.get(self.size);

        let frame = &mut self.scratch[..n];
        for ((slot, sample), &w) in frame
            .iter_mut()
            .zip(self.accumulator.ordered())
            .zip(window.coeffs())
        {
            *slot = Complex32::new(sample * w, 0.0);
        }

        self.transform.process(frame);

        for (mag, c) in self.spectrum[..bins].iter_mut().zip(frame.iter()) {
            *mag = c.norm();
        }

        let bin_hz = self.sample_rate / n as f32;
        let calibration = &self.calibrations[self.size.index()];
        let spectrum = &self.spectrum[..bins];
        for (band, env) in self.bands.iter().zip(self.envelopes.iter_mut()) {
            let energy = band.energy(spectrum, bin_hz, calibration);
            env.update(energy, &self.coeffs);
        }

        self.accumulator.mark_analyzed();
        self.scheduler.fired();
        self.passes += 1;
        if self.resize == ResizeState::Resized {
            self.resize = ResizeState::Idle;
        }

        if self.passes % TRACE_EVERY_PASSES == 0 {
            trace!(
                passes = self.passes,
                envelopes = ?self.envelopes(),
                "analysis"
            );
        }
    }

    // --- read side (display, meters, tests) ------------------------------

    /// Magnitudes of the last pass, `fft_size / 2` bins.
    pub fn spectrum(&self) -> &[f32] {
        &self.spectrum[..self.size.bins()]
    }

    pub fn center_bins(&self) -> [f32; BANDS] {
        std::array::from_fn(|i| self.bands[i].center_bin())
    }

    pub fn bin_ranges(&self) -> [Option<BinRange>; BANDS] {
        let bin_hz = self.bin_hz();
        let bins = self.size.bins();
        std::array::from_fn(|i| self.bands[i].range(bin_hz, bins))
    }

    pub fn envelopes(&self) -> [f32; BANDS] {
        std::array::from_fn(|i| self.envelopes[i].value())
    }

    pub fn voltages(&self) -> [f32; BANDS] {
        std::array::from_fn(|i| envelope_to_volts(self.envelopes[i].value()))
    }

    pub fn band(&self, band: usize) -> Option<&Band> {
        self.bands.get(band)
    }

    pub fn coefficients(&self) -> SmoothingCoefficients {
        self.coeffs
    }

    pub fn fft_size(&self) -> FftSize {
        self.size
    }

    pub fn resize_state(&self) -> ResizeState {
        self.resize
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn bin_hz(&self) -> f32 {
        self.sample_rate / self.size.len() as f32
    }

    pub fn analysis_interval(&self) -> usize {
        self.scheduler.interval()
    }

    pub fn passes(&self) -> u64 {
        self.passes
    }

    pub fn accumulator(&self) -> &SampleAccumulator {
        &self.accumulator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::PlannedFft;
    use std::f32::consts::PI;

    fn tone(freq: f32, sample_rate: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI * freq * i as f32 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn test_spectrum_seeded_before_first_pass() {
        let pipeline = SpectralEnvelopePipeline::default();
        assert_eq!(pipeline.spectrum().len(), 512);
        assert!(pipeline.spectrum().iter().all(|&m| m > 0.0 && m < 1e-6));
        assert_eq!(pipeline.envelopes(), [0.0; BANDS]);
    }

    #[test]
    fn test_context_falls_back_to_48k() {
        assert_eq!(ProcessContext::new(0.0).sample_rate(), 48000.0);
        assert_eq!(ProcessContext::new(-1.0).sample_rate(), 48000.0);
        assert_eq!(ProcessContext::new(f32::NAN).sample_rate(), 48000.0);
        assert_eq!(ProcessContext::new(44100.0).sample_rate(), 44100.0);
    }

    #[test]
    fn test_first_pass_within_one_window() {
        let mut pipeline = SpectralEnvelopePipeline::new(FftSize::S512, 60.0, &Parameters::default());
        let ctx = ProcessContext::new(48000.0);

        pipeline.analyze(&ctx, &vec![0.0; 511]);
        assert_eq!(pipeline.passes(), 0);
        pipeline.analyze(&ctx, &[0.0]);
        assert_eq!(pipeline.passes(), 1);
    }

    #[test]
    fn test_sample_rate_change_retunes_bands() {
        let mut pipeline = SpectralEnvelopePipeline::new(FftSize::S1024, 60.0, &Parameters::default());
        let before = pipeline.center_bins();

        pipeline.analyze(&ProcessContext::new(96000.0), &[0.0; 16]);

        let after = pipeline.center_bins();
        for (a, b) in after.iter().zip(before.iter()) {
            assert!((a * 2.0 - b).abs() < 1e-3);
        }
        assert_eq!(pipeline.analysis_interval(), 1600);
    }

    #[test]
    fn test_rustfft_backend_agrees() {
        let params = Parameters::default();
        let mut radix2 = SpectralEnvelopePipeline::new(FftSize::S1024, 60.0, &params);
        let mut planned =
            SpectralEnvelopePipeline::with_transform(PlannedFft::new(), FftSize::S1024, 60.0, &params);
        let ctx = ProcessContext::new(48000.0);
        let input = tone(1000.0, 48000.0, 9600);

        radix2.analyze(&ctx, &input);
        planned.analyze(&ctx, &input);

        for (a, b) in radix2.envelopes().iter().zip(planned.envelopes().iter()) {
            assert!((a - b).abs() < 1e-3);
        }
    }

    #[test]
    fn test_set_parameters_updates_only_changes() {
        let mut pipeline = SpectralEnvelopePipeline::default();
        let coeffs = pipeline.coefficients();

        let params = Parameters {
            frequencies: [200.0, 1000.0, 8000.0],
            detection: DetectionMode::Peak,
            ..Default::default()
        };
        pipeline.set_parameters(&params);

        assert_eq!(pipeline.band(0).unwrap().frequency(), 200.0);
        assert_eq!(pipeline.band(2).unwrap().detection(), DetectionMode::Peak);
        assert_eq!(pipeline.coefficients(), coeffs);

        pipeline.set_parameters(&Parameters {
            attack_ms: 500.0,
            ..params
        });
        assert!(pipeline.coefficients().attack < coeffs.attack);
    }

    #[test]
    fn test_full_parameter_set_undoes_band_overrides() {
        let mut pipeline = SpectralEnvelopePipeline::default();
        let params = *pipeline.parameters();

        pipeline.set_band_detection_mode(1, DetectionMode::Peak);
        pipeline.set_band_bandwidth_octaves(2, 1.5);
        assert_eq!(pipeline.parameters().detection, DetectionMode::Power);

        // same shared values as before the overrides
        pipeline.set_parameters(&params);

        assert_eq!(pipeline.band(1).unwrap().detection(), DetectionMode::Power);
        assert_eq!(
            pipeline.band(2).unwrap().bandwidth_octaves(),
            params.bandwidth_octaves()
        );
    }

    #[test]
    fn test_resize_requests_collapse_and_noop() {
        let mut pipeline = SpectralEnvelopePipeline::new(FftSize::S512, 60.0, &Parameters::default());

        pipeline.request_resize(FftSize::S512);
        assert_eq!(pipeline.resize_state(), ResizeState::Idle);

        pipeline.request_resize(FftSize::S1024);
        pipeline.request_resize(FftSize::S2048);
        assert_eq!(pipeline.resize_state(), ResizeState::Draining(FftSize::S2048));
    }
}
