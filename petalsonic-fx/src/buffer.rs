//! Deinterleaved audio scratch buffers
//!
//! Effects allocate these once, during lazy initialization, sized to the
//! negotiated channel counts and block size. Nothing here allocates after
//! construction.

use crate::math::apply_volume_ramp;

/// Planar (deinterleaved) block of `num_channels * num_samples` samples.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    num_channels: usize,
    num_samples: usize,
    data: Vec<f32>,
}

impl AudioBuffer {
    pub fn new(num_channels: usize, num_samples: usize) -> Self {
        Self {
            num_channels,
            num_samples,
            data: vec![0.0; num_channels * num_samples],
        }
    }

    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    pub fn channel(&self, index: usize) -> &[f32] {
        let start = index * self.num_samples;
        &self.data[start..start + self.num_samples]
    }

    pub fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        let start = index * self.num_samples;
        &mut self.data[start..start + self.num_samples]
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn zero(&mut self) {
        self.data.fill(0.0);
    }

    /// Copies an interleaved block with `source_channels` channels into this buffer.
    ///
    /// Missing frames and channels are left at zero.
    pub fn deinterleave(&mut self, interleaved: &[f32], source_channels: usize) {
        self.zero();
        if source_channels == 0 {
            return;
        }
        let frames = (interleaved.len() / source_channels).min(self.num_samples);
        let channels = source_channels.min(self.num_channels);
        for frame in 0..frames {
            for channel in 0..channels {
                self.data[channel * self.num_samples + frame] =
                    interleaved[frame * source_channels + channel];
            }
        }
    }

    /// Writes this buffer into an interleaved block with the same channel count.
    pub fn interleave(&self, interleaved: &mut [f32]) {
        if self.num_channels == 0 {
            return;
        }
        let frames = (interleaved.len() / self.num_channels).min(self.num_samples);
        for frame in 0..frames {
            for channel in 0..self.num_channels {
                interleaved[frame * self.num_channels + channel] =
                    self.data[channel * self.num_samples + frame];
            }
        }
    }

    /// Adds `other` onto this buffer.
    ///
    /// A mono `other` is added to every channel; otherwise channels are matched
    /// by index and extra channels on either side are ignored.
    pub fn mix(&mut self, other: &AudioBuffer) {
        let samples = self.num_samples.min(other.num_samples);
        for channel in 0..self.num_channels {
            let source = if other.num_channels == 1 {
                0
            } else if channel < other.num_channels {
                channel
            } else {
                break;
            };
            let src = &other.channel(source)[..samples];
            let dst = &mut self.channel_mut(channel)[..samples];
            for (d, s) in dst.iter_mut().zip(src) {
                *d += s;
            }
        }
    }

    /// Averages all channels into channel 0 of `mono`.
    pub fn downmix(&self, mono: &mut AudioBuffer) {
        mono.zero();
        if self.num_channels == 0 || mono.num_channels == 0 {
            return;
        }
        let samples = self.num_samples.min(mono.num_samples);
        let scale = 1.0 / self.num_channels as f32;
        for channel in 0..self.num_channels {
            let src = &self.channel(channel)[..samples];
            let dst = &mut mono.channel_mut(0)[..samples];
            for (d, s) in dst.iter_mut().zip(src) {
                *d += s * scale;
            }
        }
    }

    /// Ramps every channel linearly from `start` to `end` gain.
    pub fn ramp(&mut self, start: f32, end: f32) {
        for channel in 0..self.num_channels {
            apply_volume_ramp(start, end, self.channel_mut(channel));
        }
    }

    pub fn is_silent(&self) -> bool {
        self.data.iter().all(|s| *s == 0.0)
    }
}
