use std::borrow::Cow;

/// Captured audio, one sample vector per channel
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl SampleBuffer {
    /// Build from per-channel data. All channels must have the same length.
    pub fn from_channels(channels: Vec<Vec<f32>>, sample_rate: u32) -> Self {
        debug_assert!(
            channels.windows(2).all(|w| w[0].len() == w[1].len()),
            "channel lengths differ"
        );
        Self {
            channels,
            sample_rate,
        }
    }

    /// Build from interleaved frames (L0, R0, L1, R1, ...)
    pub fn from_interleaved(samples: &[f32], num_channels: usize, sample_rate: u32) -> Self {
        let num_channels = num_channels.max(1);
        let frames = samples.len() / num_channels;
        let mut channels = vec![Vec::with_capacity(frames); num_channels];

        for frame in samples.chunks_exact(num_channels) {
            for (channel, &sample) in channels.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }

        Self::from_channels(channels, sample_rate)
    }

    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self::from_channels(vec![samples], sample_rate)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Length in frames
    pub fn len(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.len() as f64 / self.sample_rate as f64
    }

    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    /// Average of all channels
    pub fn to_mono(&self) -> Vec<f32> {
        match self.channels.as_slice() {
            [] => Vec::new(),
            [only] => only.clone(),
            all => {
                let scale = 1.0 / all.len() as f32;
                (0..self.len())
                    .map(|i| all.iter().map(|c| c[i]).sum::<f32>() * scale)
                    .collect()
            }
        }
    }

    /// Frames flattened in interleaved order
    pub fn interleaved(&self) -> impl Iterator<Item = f32> + '_ {
        (0..self.len()).flat_map(move |i| self.channels.iter().map(move |c| c[i]))
    }

    /// Drop leading frames that never reach `threshold` on any channel.
    ///
    /// A buffer that stays below the threshold throughout is returned as is.
    pub fn trim_to_onset(&self, threshold: f32) -> SampleBuffer {
        let threshold = threshold.clamp(0.0, 1.0);
        let onset = (0..self.len())
            .find(|&i| self.channels.iter().any(|c| c[i].abs() >= threshold));

        match onset {
            Some(start) if start > 0 => Self {
                channels: self.channels.iter().map(|c| c[start..].to_vec()).collect(),
                sample_rate: self.sample_rate,
            },
            _ => self.clone(),
        }
    }
}

/// Extend `buffer` with trailing silence up to `target_secs`.
///
/// Buffers that already reach the target are borrowed back untouched.
pub fn pad_with_silence(buffer: &SampleBuffer, target_secs: f64) -> Cow<'_, SampleBuffer> {
    let target_samples = target_samples(target_secs, buffer.sample_rate);
    if buffer.len() >= target_samples {
        return Cow::Borrowed(buffer);
    }

    let channels = buffer
        .channels
        .iter()
        .map(|original| {
            let mut padded = Vec::with_capacity(target_samples);
            padded.extend_from_slice(original);
            padded.resize(target_samples, 0.0);
            padded
        })
        .collect();

    Cow::Owned(SampleBuffer::from_channels(channels, buffer.sample_rate))
}

fn target_samples(target_secs: f64, sample_rate: u32) -> usize {
    if !target_secs.is_finite() || target_secs <= 0.0 {
        return 0;
    }
    (target_secs * sample_rate as f64).floor() as usize
}
