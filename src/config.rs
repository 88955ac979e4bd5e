use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::dsp::FftSize;
use crate::error::{Error, Result};
use crate::params::Parameters;

pub const BANDS: usize = 3;
pub const DEFAULT_FREQUENCIES: [f32; BANDS] = [100.0, 1000.0, 8000.0];

pub const MIN_FREQ: f32 = 20.0;
pub const MAX_FREQ: f32 = 20000.0;

pub const MIN_BANDWIDTH_PERCENT: f32 = 10.0;
pub const MAX_BANDWIDTH_PERCENT: f32 = 200.0;
pub const DEFAULT_BANDWIDTH_PERCENT: f32 = 33.0;

pub const MIN_ATTACK_MS: f32 = 1.0;
pub const MAX_ATTACK_MS: f32 = 1000.0;
pub const DEFAULT_ATTACK_MS: f32 = 10.0;

pub const MIN_RELEASE_MS: f32 = 10.0;
pub const MAX_RELEASE_MS: f32 = 5000.0;
pub const DEFAULT_RELEASE_MS: f32 = 200.0;

pub const DEFAULT_SAMPLE_RATE: f32 = 48000.0;
pub const DEFAULT_ANALYSIS_RATE_HZ: f32 = 60.0;
pub const MIN_ANALYSIS_RATE_HZ: f32 = 1.0;
pub const MAX_ANALYSIS_RATE_HZ: f32 = 1000.0;

pub const MAX_FFT_SIZE: usize = 2048;
pub const DEFAULT_FFT_SIZE: FftSize = FftSize::S1024;

// 10 V full scale
pub const REFERENCE_VOLTAGE: f32 = 10.0;

// Near-zero seed so the display has something to draw before the first pass
pub const SPECTRUM_FLOOR: f32 = 1e-9;

pub const MIN_Y_SCALE: f32 = 0.125;
pub const MAX_Y_SCALE: f32 = 8.0;

// Host bus
pub const BUS_CHANNELS: usize = 28;

/// Runtime configuration of the desktop host, read from a TOML file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub analysis_rate_hz: f32,
    pub fft_size: usize,
    pub input_device: Option<String>,
    pub parameters: Parameters,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            analysis_rate_hz: DEFAULT_ANALYSIS_RATE_HZ,
            fft_size: DEFAULT_FFT_SIZE.len(),
            input_device: None,
            parameters: Parameters::default(),
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_toml_str(&text)?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let mut config: AppConfig =
            toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        // Rejects sizes we cannot run rather than silently picking another
        FftSize::from_len(config.fft_size)?;
        config.analysis_rate_hz = config
            .analysis_rate_hz
            .clamp(MIN_ANALYSIS_RATE_HZ, MAX_ANALYSIS_RATE_HZ);
        config.parameters = config.parameters.clamped();
        Ok(config)
    }

    pub fn fft_size(&self) -> FftSize {
        FftSize::from_len(self.fft_size).unwrap_or(DEFAULT_FFT_SIZE)
    }
}
