use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream};
use ringbuf::HeapRb;
use ringbuf::traits::{Consumer, Producer, Split};
use tracing::{error, info};

use specenv::config::BANDS;
use specenv::{Error, ProcessContext, Result, SharedParameters, SpectralEnvelopePipeline};

use super::devices::create_stream_config;
use super::state::SpectrumView;

// Mono scratch per chunk; larger host buffers are split
const CHUNK_FRAMES: usize = 1024;
const LEVEL_QUEUE: usize = 64;

/// Live input stream driving one pipeline from the device callback.
pub struct AnalyzerEngine {
    _stream: Stream,
    levels: ringbuf::HeapCons<[f32; BANDS]>,
    latest: [f32; BANDS],
    pub sample_rate: u32,
}

impl AnalyzerEngine {
    pub fn start(
        device: &Device,
        params: Arc<SharedParameters>,
        view: Arc<Mutex<SpectrumView>>,
        analysis_rate_hz: f32,
    ) -> Result<Self> {
        let input_config = device
            .default_input_config()
            .map_err(|e| Error::Audio(format!("Failed to get input config: {}", e)))?;

        if input_config.sample_format() != SampleFormat::F32 {
            return Err(Error::Audio("Input device doesn't support F32 format".to_string()));
        }

        let sample_rate = input_config.sample_rate();
        let channels = input_config.channels().max(1);
        let stream_config = create_stream_config(channels, sample_rate);

        let (mut producer, consumer) = HeapRb::<[f32; BANDS]>::new(LEVEL_QUEUE).split();

        let mut pipeline =
            SpectralEnvelopePipeline::new(params.fft_size(), analysis_rate_hz, &params.snapshot());
        let ctx = ProcessContext::new(sample_rate.0 as f32);
        let mut mono = vec![0.0f32; CHUNK_FRAMES];
        let channels = channels as usize;

        let stream = device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    pipeline.set_parameters(&params.snapshot());
                    pipeline.request_resize(params.fft_size());

                    // first channel only
                    for chunk in data.chunks(channels * CHUNK_FRAMES) {
                        let mut frames = 0;
                        for (dst, frame) in mono.iter_mut().zip(chunk.chunks_exact(channels)) {
                            *dst = frame[0];
                            frames += 1;
                        }
                        pipeline.analyze(&ctx, &mono[..frames]);
                    }

                    // meters are best effort; a full queue just drops this block
                    let _ = producer.try_push(pipeline.voltages());

                    if let Ok(mut view) = view.try_lock() {
                        view.update_from(&pipeline);
                    }
                },
                |err| error!("Input stream error: {}", err),
                None,
            )
            .map_err(|e| Error::Audio(format!("Failed to build input stream: {}", e)))?;

        stream
            .play()
            .map_err(|e| Error::Audio(format!("Failed to start input stream: {}", e)))?;

        info!(sample_rate = sample_rate.0, channels, "input stream started");

        Ok(Self {
            _stream: stream,
            levels: consumer,
            latest: [0.0; BANDS],
            sample_rate: sample_rate.0,
        })
    }

    /// Most recent band voltages published by the audio thread.
    pub fn levels(&mut self) -> [f32; BANDS] {
        while let Some(levels) = self.levels.try_pop() {
            self.latest = levels;
        }
        self.latest
    }
}
