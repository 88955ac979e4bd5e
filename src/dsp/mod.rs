pub mod accumulator;
pub mod band;
pub mod bus;
pub mod envelope;
pub mod fft;
pub mod output;
pub mod pipeline;
pub mod scheduler;
pub mod window;

pub use accumulator::SampleAccumulator;
pub use band::{Band, BinRange, Calibration, DetectionMode};
pub use bus::{BusRouting, process_bus, try_process_bus};
pub use envelope::{EnvelopeFollower, SmoothingCoefficients};
pub use fft::{FftSize, PlannedFft, Radix2Fft, Transform};
pub use output::OutputMode;
pub use pipeline::{ProcessContext, ResizeState, SpectralEnvelopePipeline};
pub use scheduler::AnalysisScheduler;
pub use window::{Window, WindowBank};
