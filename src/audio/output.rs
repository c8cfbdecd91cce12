use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use anyhow::Context;
use ringbuf::traits::*;
use ringbuf::{HeapCons, HeapProd, HeapRb};
use tracing::{debug, info};

/// Default output device wrapped behind an SPSC sample queue.
///
/// The render loop pushes interleaved stereo frames into the producer; the
/// device callback pops them and maps onto however many channels the
/// device actually has. Underruns emit silence.
pub struct AudioOutput {
    stream: Option<cpal::Stream>,
    capacity: usize,
    pub config: cpal::StreamConfig,
}

impl AudioOutput {
    /// Open the default device and start the stream. Returns the producer
    /// half for the render loop.
    pub fn new(latency_ms: f32) -> anyhow::Result<(Self, HeapProd<f32>)> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .context("No default output device")?;

        let supported_config = device
            .default_output_config()
            .context("No default config")?;
        let sample_rate = supported_config.sample_rate().0;
        let channels = supported_config.channels();

        let config = cpal::StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        // Queue capacity in stereo samples, floored at twice the device's
        // minimum buffer so the callback cannot starve immediately.
        let target = (sample_rate as f32 * latency_ms / 1000.0).round().max(1.0) as usize * 2;
        let min_samples = match supported_config.buffer_size() {
            cpal::SupportedBufferSize::Range { min, .. } => (*min as usize) * 4,
            cpal::SupportedBufferSize::Unknown => 1024,
        };
        let capacity = (target * 2).max(min_samples);
        info!(
            "Audio output: sr={} ch={} queue_capacity={} samples",
            sample_rate, channels, capacity
        );

        let rb = HeapRb::<f32>::new(capacity);
        let (prod, mut cons): (HeapProd<f32>, HeapCons<f32>) = rb.split();

        let out_channels = channels as usize;
        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let n_frames = data.len() / out_channels;
                    for frame in 0..n_frames {
                        let l = cons.try_pop().unwrap_or(0.0);
                        let r = cons.try_pop().unwrap_or(0.0);
                        let slot = &mut data[frame * out_channels..(frame + 1) * out_channels];
                        match out_channels {
                            1 => slot[0] = 0.5 * (l + r),
                            _ => {
                                slot[0] = l;
                                slot[1] = r;
                                for s in slot[2..].iter_mut() {
                                    *s = 0.0;
                                }
                            }
                        }
                    }
                },
                |err| eprintln!("Stream error: {err:?}"),
                None,
            )
            .context("Failed to build output stream")?;
        stream.play().context("Failed to start output stream")?;

        Ok((
            Self {
                stream: Some(stream),
                capacity,
                config,
            },
            prod,
        ))
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stop(&mut self) {
        self.stream.take();
    }

    /// Push a block from the render loop, sleeping briefly when the queue
    /// is full; the device drains it at its own pace.
    pub fn push_samples(prod: &mut HeapProd<f32>, samples: &[f32]) {
        let mut offset = 0;
        while offset < samples.len() {
            let written = prod.push_slice(&samples[offset..]);
            offset += written;

            if offset < samples.len() {
                std::thread::sleep(std::time::Duration::from_micros(200));
            }
        }
    }
}

impl Drop for AudioOutput {
    fn drop(&mut self) {
        if self.stream.is_some() {
            debug!("AudioOutput drop: stopping stream.");
        }
        self.stream.take();
    }
}
