use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rtrb::Consumer;
use std::f32::consts::PI;

use crate::sync::ClickEvent;

/// Timbre of one click
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickVoice {
    /// Time for the envelope to fall to half amplitude
    pub half_life_ms: f32,
    /// High-pass cutoff applied to the noise burst
    pub cutoff_hz: f32,
    pub gain: f32,
    pub length_ms: f32,
}

/// First beat of a bar: shorter, brighter, louder
pub const ACCENT_VOICE: ClickVoice = ClickVoice {
    half_life_ms: 3.0,
    cutoff_hz: 2500.0,
    gain: 1.0,
    length_ms: 40.0,
};

pub const BEAT_VOICE: ClickVoice = ClickVoice {
    half_life_ms: 6.0,
    cutoff_hz: 1000.0,
    gain: 0.6,
    length_ms: 40.0,
};

/// Render a click as a high-passed noise burst with an exponential decay.
/// Output is deterministic for a given voice and sample rate.
pub fn render_click(voice: ClickVoice, sample_rate: u32) -> Vec<f32> {
    let sample_rate = sample_rate.max(1) as f32;
    let len = (sample_rate * voice.length_ms / 1000.0) as usize;
    let half_life = (voice.half_life_ms / 1000.0 * sample_rate).max(1.0);

    // One-pole high-pass
    let rc = 1.0 / (2.0 * PI * voice.cutoff_hz.max(1.0));
    let dt = 1.0 / sample_rate;
    let alpha = rc / (rc + dt);

    let mut rng = StdRng::seed_from_u64(42);
    let mut prev_in = 0.0f32;
    let mut prev_out = 0.0f32;

    (0..len)
        .map(|i| {
            let noise: f32 = rng.gen_range(-1.0..1.0);
            let filtered = alpha * (prev_out + noise - prev_in);
            prev_in = noise;
            prev_out = filtered;

            let envelope = 0.5f32.powf(i as f32 / half_life);
            (filtered * envelope * voice.gain).clamp(-1.0, 1.0)
        })
        .collect()
}

#[derive(Debug, Clone, Copy)]
struct ActiveClick {
    accent: bool,
    position: usize,
    volume: f32,
}

/// Audio-thread side of the click sink: drains click events from the ring
/// buffer and plays the pre-rendered samples on every output channel.
pub struct ClickRenderer {
    consumer: Consumer<ClickEvent>,
    accent: Vec<f32>,
    beat: Vec<f32>,
    channels: usize,
    active: Option<ActiveClick>,
}

impl ClickRenderer {
    pub fn new(consumer: Consumer<ClickEvent>, sample_rate: u32, channels: usize) -> Self {
        Self {
            consumer,
            accent: render_click(ACCENT_VOICE, sample_rate),
            beat: render_click(BEAT_VOICE, sample_rate),
            channels: channels.max(1),
            active: None,
        }
    }

    /// Fill an interleaved output buffer (audio-thread safe, no allocation)
    pub fn process(&mut self, output: &mut [f32]) {
        for frame in output.chunks_mut(self.channels) {
            // A new click cuts off the previous one
            if let Ok(click) = self.consumer.pop() {
                self.active = Some(ActiveClick {
                    accent: click.accent,
                    position: 0,
                    volume: click.volume,
                });
            }

            let value = match self.active.as_mut() {
                Some(active) => {
                    let samples = if active.accent { &self.accent } else { &self.beat };
                    match samples.get(active.position) {
                        Some(sample) => {
                            active.position += 1;
                            sample * active.volume
                        }
                        None => {
                            self.active = None;
                            0.0
                        }
                    }
                }
                None => 0.0,
            };

            frame.fill(value);
        }
    }
}
