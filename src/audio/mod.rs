pub mod devices;
pub mod engine;
pub mod state;

pub use engine::AnalyzerEngine;
pub use state::SpectrumView;
