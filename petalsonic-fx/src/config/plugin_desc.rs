use super::AudioSettings;

/// How the HRTF volume is normalized when it is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VolumeNormalization {
    #[default]
    None,
    RootMeanSquared,
}

/// Settings used to build an HRTF.
#[derive(Debug, Clone, PartialEq)]
pub struct HrtfSettings {
    /// Linear gain applied to the HRTF
    pub volume: f32,
    pub normalization: VolumeNormalization,
    /// Optional path to a custom HRTF SOFA file (None uses the engine's default HRTF)
    pub sofa_path: Option<String>,
}

impl Default for HrtfSettings {
    fn default() -> Self {
        Self {
            volume: 1.0,
            normalization: VolumeNormalization::None,
            sofa_path: None,
        }
    }
}

/// Configuration descriptor for the plugin set.
#[derive(Debug, Clone)]
pub struct PluginDesc {
    /// HRTF created when the plugins provision their own engine context
    pub default_hrtf: HrtfSettings,
    /// Substrings of the executable path that identify the authoring tool
    pub editor_markers: Vec<String>,
    /// Used when the host reports a zero sample rate or block size
    pub fallback_audio: AudioSettings,
}

impl Default for PluginDesc {
    fn default() -> Self {
        Self {
            default_hrtf: HrtfSettings::default(),
            editor_markers: vec!["FMOD Studio.exe".to_string(), "FMOD Studio.app".to_string()],
            fallback_audio: AudioSettings::default(),
        }
    }
}

impl PluginDesc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_hrtf(mut self, hrtf: HrtfSettings) -> Self {
        self.default_hrtf = hrtf;
        self
    }

    pub fn editor_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.editor_markers = markers.into_iter().map(Into::into).collect();
        self
    }

    pub fn fallback_audio(mut self, audio: AudioSettings) -> Self {
        self.fallback_audio = audio;
        self
    }
}
