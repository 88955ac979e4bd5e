use std::ops::Range;

use crate::config::{BANDS, BUS_CHANNELS};
use crate::error::{Error, Result};

use super::fft::Transform;
use super::pipeline::{ProcessContext, SpectralEnvelopePipeline};

/// Which host bus channels (1-based) feed and receive the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusRouting {
    pub input: usize,
    pub outputs: [Option<usize>; BANDS],
}

impl Default for BusRouting {
    fn default() -> Self {
        Self {
            input: 1,
            outputs: [Some(13), Some(14), Some(15)],
        }
    }
}

fn channel_range(index: usize, frames: usize, bus_len: usize) -> Result<Range<usize>> {
    if frames == 0 {
        return Err(Error::EmptyBlock);
    }
    if index == 0 || index > BUS_CHANNELS {
        return Err(Error::InvalidChannel { index });
    }
    let end = index * frames;
    if end > bus_len {
        return Err(Error::BusTooShort {
            needed: end,
            actual: bus_len,
        });
    }
    Ok((index - 1) * frames..end)
}

/// Run one block from a contiguous channel bus.
///
/// A bad input route skips the block; a bad output route skips that band.
pub fn process_bus<T: Transform>(
    pipeline: &mut SpectralEnvelopePipeline<T>,
    ctx: &ProcessContext,
    bus: &mut [f32],
    frames: usize,
    routing: &BusRouting,
) {
    let Ok(input) = channel_range(routing.input, frames, bus.len()) else {
        return;
    };
    pipeline.analyze(ctx, &bus[input]);

    for (band, output) in routing.outputs.iter().enumerate() {
        if let Some(index) = *output {
            if let Ok(range) = channel_range(index, frames, bus.len()) {
                pipeline.write_output(band, &mut bus[range]);
            }
        }
    }
}

/// Same as [`process_bus`] but validates every route up front and reports
/// the first problem instead of skipping work.
pub fn try_process_bus<T: Transform>(
    pipeline: &mut SpectralEnvelopePipeline<T>,
    ctx: &ProcessContext,
    bus: &mut [f32],
    frames: usize,
    routing: &BusRouting,
) -> Result<()> {
    let input = channel_range(routing.input, frames, bus.len())?;

    let mut outputs: [Option<Range<usize>>; BANDS] = std::array::from_fn(|_| None);
    for (slot, output) in outputs.iter_mut().zip(routing.outputs.iter()) {
        if let Some(index) = *output {
            *slot = Some(channel_range(index, frames, bus.len())?);
        }
    }

    pipeline.analyze(ctx, &bus[input]);
    for (band, range) in outputs.into_iter().enumerate() {
        if let Some(range) = range {
            pipeline.write_output(band, &mut bus[range]);
        }
    }
    Ok(())
}
