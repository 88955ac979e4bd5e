use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by the checked entry points.
///
/// The audio path itself never surfaces these; it skips the offending work
/// instead. Tests and the host use the checked variants to see why.
#[derive(Debug, Error, PartialEq)]
pub enum Error {
    #[error("channel index {index} is outside the bus")]
    InvalidChannel { index: usize },

    #[error("bus holds {actual} samples, routing needs {needed}")]
    BusTooShort { needed: usize, actual: usize },

    #[error("block has no frames")]
    EmptyBlock,

    #[error("unsupported FFT size {0}")]
    UnsupportedFftSize(usize),

    #[error("{name} = {value} is outside [{min}, {max}]")]
    ParameterOutOfRange {
        name: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },

    #[error("cursor {cursor} is outside a buffer of {capacity}")]
    CursorOutOfRange { cursor: usize, capacity: usize },

    #[error("config: {0}")]
    Config(String),

    #[error("audio: {0}")]
    Audio(String),
}
