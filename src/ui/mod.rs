pub mod bands;
pub mod spectrum;

pub use bands::*;
pub use spectrum::*;
