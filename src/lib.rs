//! Three-band spectral envelope follower.
//!
//! A continuous sample stream is windowed and transformed at a fixed
//! analysis rate; the energy in three configurable bands is smoothed with
//! separate attack and release times and held as control voltages.

pub mod config;
pub mod dsp;
pub mod error;
pub mod params;

pub use dsp::{
    DetectionMode, FftSize, OutputMode, ProcessContext, ResizeState, SpectralEnvelopePipeline,
};
pub use error::{Error, Result};
pub use params::{Parameters, SharedParameters};
