use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use parking_lot::Mutex;
use rtrb::Producer;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::audio::click::ClickRenderer;
use crate::audio::device::{get_max_channels_output_config, resolve_output_device};
use crate::sync::{ClickEvent, ClickSink};
use crate::types::CLICK_QUEUE_CAPACITY;

/// Metronome click output on a cpal stream.
///
/// The sync session pushes click events into a lock-free queue; the audio
/// callback renders them on every output channel.
pub struct ClickOutput {
    device_name: String,
    sample_rate: u32,
    channels: u16,
    producer: Producer<ClickEvent>,
    last_error: Arc<Mutex<Option<String>>>,
    stream: Option<Stream>,
}

impl ClickOutput {
    /// Open the selected output device (index, name, or default) and start playing
    pub fn open(selector: Option<&str>) -> Result<Self> {
        let device = resolve_output_device(selector)?;
        Self::with_device(device)
    }

    pub fn with_device(device: Device) -> Result<Self> {
        let supported_config = get_max_channels_output_config(&device)?;
        let device_name = device
            .description()
            .map(|desc| desc.name().to_string())
            .unwrap_or_else(|_| "Unknown".to_string());

        let config = StreamConfig {
            channels: supported_config.channels(),
            sample_rate: supported_config.sample_rate(),
            buffer_size: cpal::BufferSize::Fixed(256), // Small buffer for low latency
        };

        let (producer, consumer) = rtrb::RingBuffer::new(CLICK_QUEUE_CAPACITY);
        let mut renderer = ClickRenderer::new(consumer, config.sample_rate, config.channels as usize);

        let last_error = Arc::new(Mutex::new(None));
        let error_slot = last_error.clone();

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                    renderer.process(data);
                },
                move |err: cpal::StreamError| {
                    *error_slot.lock() = Some(err.to_string());
                },
                None,
            )
            .context("Failed to build click output stream")?;

        stream.play().context("Failed to play click output stream")?;

        debug!("click output stream playing");

        Ok(Self {
            device_name,
            sample_rate: config.sample_rate,
            channels: config.channels,
            producer,
            last_error,
            stream: Some(stream),
        })
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn stop(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            stream.pause().context("Failed to pause click output stream")?;
        }
        Ok(())
    }
}

impl ClickSink for ClickOutput {
    fn trigger(&mut self, click: ClickEvent) {
        if self.producer.push(click).is_err() {
            warn!(beat = click.beat_index, "click queue full, dropping click");
        }
    }

    fn take_error(&mut self) -> Option<String> {
        self.last_error.lock().take()
    }
}

impl Drop for ClickOutput {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            error!("{:#}", e);
        }
    }
}
