// Reflection mixer - ambisonic bus shared between reflection producers and the
// mixer return effect.
//
// Spatialize and reverb effects add their reflection output here instead of
// decoding it themselves; the mixer return effect drains the bus once per
// block and decodes everything in one pass.

use crate::buffer::AudioBuffer;
use crate::error::{PetalSonicFxError, Result};
use parking_lot::Mutex;

/// Accumulates ambisonic reflection blocks from several effects.
pub struct ReflectionMixer {
    num_channels: usize,
    num_samples: usize,
    accum: Mutex<AudioBuffer>,
}

impl ReflectionMixer {
    pub fn try_new(num_channels: usize, num_samples: usize) -> Result<Self> {
        if num_channels == 0 || num_samples == 0 {
            return Err(PetalSonicFxError::ResourceCreation(format!(
                "Reflection mixer needs a non-empty shape, got {}x{}",
                num_channels, num_samples
            )));
        }
        Ok(Self {
            num_channels,
            num_samples,
            accum: Mutex::new(AudioBuffer::new(num_channels, num_samples)),
        })
    }

    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    /// Adds `block` to the bus.
    ///
    /// Called from audio threads, so it never waits: if another thread holds
    /// the bus the block is dropped and false is returned.
    pub fn accumulate(&self, block: &AudioBuffer) -> bool {
        let Some(mut accum) = self.accum.try_lock() else {
            log::trace!("Reflection mixer busy, dropping block");
            return false;
        };
        accum.mix(block);
        true
    }

    /// Moves the accumulated block into `out` and zeroes the bus.
    ///
    /// Returns false if the bus was busy; `out` is zeroed in that case.
    pub fn drain_into(&self, out: &mut AudioBuffer) -> bool {
        out.zero();
        let Some(mut accum) = self.accum.try_lock() else {
            return false;
        };
        out.mix(&accum);
        accum.zero();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_shape() {
        assert!(ReflectionMixer::try_new(0, 512).is_err());
        assert!(ReflectionMixer::try_new(4, 0).is_err());
    }

    #[test]
    fn test_accumulate_and_drain() {
        let mixer = ReflectionMixer::try_new(4, 2).unwrap();
        let mut block = AudioBuffer::new(4, 2);
        block.channel_mut(0).copy_from_slice(&[1.0, 2.0]);

        assert!(mixer.accumulate(&block));
        assert!(mixer.accumulate(&block));

        let mut out = AudioBuffer::new(4, 2);
        assert!(mixer.drain_into(&mut out));
        assert_eq!(out.channel(0), &[2.0, 4.0]);

        // Drained bus starts empty again.
        assert!(mixer.drain_into(&mut out));
        assert!(out.is_silent());
    }

    #[test]
    fn test_busy_bus_drops_block() {
        let mixer = ReflectionMixer::try_new(1, 1).unwrap();
        let guard = mixer.accum.lock();
        let block = AudioBuffer::new(1, 1);
        assert!(!mixer.accumulate(&block));
        drop(guard);
        assert!(mixer.accumulate(&block));
    }
}
