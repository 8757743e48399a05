use std::collections::VecDeque;
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SampleRate, Stream, StreamConfig};
use parking_lot::Mutex;

use crate::audio::graph::{AudioSink, OUTPUT_CHANNELS};
use crate::foundation::error::{StoryreelError, StoryreelResult};

type SharedQueue = Arc<Mutex<VecDeque<f32>>>;

/// Handle to an open output stream on the default device.
///
/// Keep it alive for as long as audio should be heard; the paired [`DeviceMonitor`] feeds it.
pub struct DeviceOutput {
    stream: Stream,
}

impl DeviceOutput {
    /// Open the default output device at `sample_rate` stereo.
    pub fn open(sample_rate: u32) -> StoryreelResult<(Self, DeviceMonitor)> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| StoryreelError::validation("no audio output device available"))?;
        let supported = device
            .default_output_config()
            .map_err(|e| StoryreelError::validation(format!("output config: {e}")))?;
        let config = StreamConfig {
            channels: OUTPUT_CHANNELS,
            sample_rate: SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let queue: SharedQueue = Arc::new(Mutex::new(VecDeque::new()));
        let stream = match supported.sample_format() {
            SampleFormat::F32 => build_stream::<f32>(&device, &config, Arc::clone(&queue))?,
            SampleFormat::I16 => build_stream::<i16>(&device, &config, Arc::clone(&queue))?,
            SampleFormat::U16 => build_stream::<u16>(&device, &config, Arc::clone(&queue))?,
            other => {
                return Err(StoryreelError::validation(format!(
                    "unsupported output sample format {other:?}"
                )));
            }
        };
        stream
            .play()
            .map_err(|e| StoryreelError::validation(format!("start output stream: {e}")))?;
        tracing::info!(sample_rate, "audio output device opened");
        Ok((
            Self { stream },
            DeviceMonitor {
                queue,
                max_buffered: sample_rate as usize * usize::from(OUTPUT_CHANNELS),
            },
        ))
    }

    /// Suspend the device stream.
    pub fn pause(&self) -> StoryreelResult<()> {
        self.stream
            .pause()
            .map_err(|e| StoryreelError::validation(format!("pause output stream: {e}")))
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    queue: SharedQueue,
) -> StoryreelResult<Stream>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let data_callback = move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
        let mut q = queue.lock();
        for out in data.iter_mut() {
            *out = T::from_sample(q.pop_front().unwrap_or(0.0));
        }
    };
    let err_fn = |err: cpal::StreamError| tracing::warn!(error = %err, "audio output stream error");
    device
        .build_output_stream(config, data_callback, err_fn, None)
        .map_err(|e| StoryreelError::validation(format!("build output stream: {e}")))
}

/// Graph-side half of the device output: rendered blocks are queued for the stream callback.
pub struct DeviceMonitor {
    queue: SharedQueue,
    max_buffered: usize,
}

impl AudioSink for DeviceMonitor {
    fn write_block(&mut self, interleaved: &[f32], _sample_rate: u32, _channels: u16) {
        let mut q = self.queue.lock();
        q.extend(interleaved.iter().copied());
        // Drop the oldest audio rather than drifting behind the clock.
        let excess = q.len().saturating_sub(self.max_buffered);
        q.drain(..excess);
    }
}
