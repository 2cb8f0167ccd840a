mod audio_settings;
mod plugin_desc;
mod simulation_settings;

pub use audio_settings::AudioSettings;
pub use plugin_desc::{HrtfSettings, PluginDesc, VolumeNormalization};
pub use simulation_settings::{ReflectionEffectType, SimulationSettings};
