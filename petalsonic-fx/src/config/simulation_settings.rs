use crate::layout::channels_for_order;
use crate::math::num_samples_for_duration;

/// Algorithm used to render reflections and reverb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReflectionEffectType {
    #[default]
    Convolution,
    Parametric,
    Hybrid,
    /// Convolution on a TrueAudio Next device
    Tan,
}

/// Global simulation parameters published by the control thread.
///
/// Read-only on the audio thread once published; a later publish replaces it
/// wholesale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationSettings {
    pub reflection_type: ReflectionEffectType,
    /// Maximum ambisonic order of reflection and reverb output
    pub max_order: u32,
    /// Maximum impulse response length in seconds
    pub max_duration: f32,
    /// Opaque TrueAudio Next device handle, 0 when unused.
    ///
    /// Passed through to backends untouched. Neither bundled backend renders
    /// on a TrueAudio Next device: both fall back to convolution and ignore it.
    pub tan_device: u64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            reflection_type: ReflectionEffectType::Convolution,
            max_order: 1,
            max_duration: 1.0,
            tan_device: 0,
        }
    }
}

impl SimulationSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reflection_type(mut self, reflection_type: ReflectionEffectType) -> Self {
        self.reflection_type = reflection_type;
        self
    }

    pub fn max_order(mut self, order: u32) -> Self {
        self.max_order = order;
        self
    }

    pub fn max_duration(mut self, seconds: f32) -> Self {
        self.max_duration = seconds;
        self
    }

    pub fn tan_device(mut self, device: u64) -> Self {
        self.tan_device = device;
        self
    }

    /// Number of ambisonic channels for `max_order`.
    pub fn num_channels(&self) -> usize {
        channels_for_order(self.max_order)
    }

    /// Impulse response length in samples at the given sampling rate.
    pub fn impulse_response_size(&self, sampling_rate: u32) -> usize {
        num_samples_for_duration(self.max_duration, sampling_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_num_channels_follows_order() {
        assert_eq!(SimulationSettings::new().max_order(0).num_channels(), 1);
        assert_eq!(SimulationSettings::new().max_order(1).num_channels(), 4);
        assert_eq!(SimulationSettings::new().max_order(3).num_channels(), 16);
    }

    #[test]
    fn test_impulse_response_size_rounds_up() {
        let settings = SimulationSettings::new().max_duration(0.5);
        assert_eq!(settings.impulse_response_size(48000), 24000);

        let settings = SimulationSettings::new().max_duration(0.00001);
        assert_eq!(settings.impulse_response_size(48000), 1);
    }
}
