use serde::{Deserialize, Serialize};

use crate::config::REFERENCE_VOLTAGE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Overwrite the destination block.
    #[default]
    Replace,
    /// Sum onto whatever the destination already holds.
    Add,
}

/// Envelope level to output voltage, 0 V to full scale.
pub fn envelope_to_volts(envelope: f32) -> f32 {
    let envelope = if envelope.is_finite() {
        envelope.clamp(0.0, 1.0)
    } else {
        0.0
    };
    envelope * REFERENCE_VOLTAGE
}

/// Holds `volts` across the whole block.
pub fn write_block(dest: &mut [f32], volts: f32, mode: OutputMode) {
    match mode {
        OutputMode::Replace => dest.fill(volts),
        OutputMode::Add => {
            for sample in dest.iter_mut() {
                *sample += volts;
            }
        }
    }
}
