//! Spatial audio engine backends
//!
//! [`SpatialBackend`] is the fixed set of entry points the effects use to
//! reach the spatial audio engine. A backend value is the engine context
//! itself and is shared as `Arc<B>` by the global state and every effect.
//!
//! Two backends exist:
//! - [`ReferenceBackend`]: deterministic pure-Rust rendering, always built.
//! - `SteamAudioBackend`: Steam Audio through `audionimbus`, behind the
//!   `steam-audio` feature.

mod reference;
#[cfg(feature = "steam-audio")]
mod steam;

pub use reference::{
    DirectOutputs, ObjectKind, ReferenceBackend, ReferenceHrtf, ReferenceSource,
    ReflectionOutputs, SimulationOutputs,
};
#[cfg(feature = "steam-audio")]
pub use steam::{SteamAudioBackend, SteamHrtf, SteamSource};

use crate::buffer::AudioBuffer;
use crate::config::{AudioSettings, HrtfSettings, SimulationSettings};
use crate::error::Result;
use crate::layout::SpeakerLayout;
use crate::math::{CoordinateSpace, Vec3};

/// Parameters for decoding an ambisonic field to speakers or headphones.
pub struct DecodeParams<'a, H> {
    pub order: u32,
    pub hrtf: &'a H,
    /// Listener orientation in engine space
    pub orientation: CoordinateSpace,
    pub binaural: bool,
}

/// Parameters for HRTF rendering of a mono signal.
pub struct BinauralParams<'a, H> {
    /// Unit direction from listener to source, in listener space
    pub direction: Vec3,
    pub hrtf: &'a H,
    /// 0.0 renders without spatialization, 1.0 fully spatialized
    pub spatial_blend: f32,
}

/// Which direct-path simulation outputs to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectParams {
    pub distance_attenuation: bool,
    pub air_absorption: bool,
}

/// Entry points into the spatial audio engine.
///
/// `create_*` calls may fail (for example when the engine runs out of memory);
/// callers treat a failure as "not ready yet" and retry on the next block.
/// `apply_*` calls run on the audio thread and must not block or allocate.
pub trait SpatialBackend: Send + Sync + Sized + 'static {
    type Hrtf: Send + Sync + 'static;
    /// Simulation source; holds the latest simulation outputs for one emitter.
    type Source: Send + Sync + 'static;
    type AmbisonicsDecoder: Send + 'static;
    type BinauralEffect: Send + 'static;
    type PanningEffect: Send + 'static;
    type DirectEffect: Send + 'static;
    type ReflectionEffect: Send + 'static;

    /// Builds an engine context with default settings.
    fn create_default(audio: &AudioSettings) -> Result<Self>;

    fn create_hrtf(&self, audio: &AudioSettings, settings: &HrtfSettings) -> Result<Self::Hrtf>;

    fn create_ambisonics_decoder(
        &self,
        audio: &AudioSettings,
        layout: SpeakerLayout,
        max_order: u32,
        hrtf: &Self::Hrtf,
    ) -> Result<Self::AmbisonicsDecoder>;

    fn apply_ambisonics_decoder(
        &self,
        decoder: &mut Self::AmbisonicsDecoder,
        params: &DecodeParams<'_, Self::Hrtf>,
        input: &AudioBuffer,
        output: &mut AudioBuffer,
    );

    fn create_binaural_effect(
        &self,
        audio: &AudioSettings,
        hrtf: &Self::Hrtf,
    ) -> Result<Self::BinauralEffect>;

    /// Renders mono `input` to the first two channels of `output`.
    fn apply_binaural_effect(
        &self,
        effect: &mut Self::BinauralEffect,
        params: &BinauralParams<'_, Self::Hrtf>,
        input: &AudioBuffer,
        output: &mut AudioBuffer,
    );

    fn create_panning_effect(
        &self,
        audio: &AudioSettings,
        layout: SpeakerLayout,
    ) -> Result<Self::PanningEffect>;

    /// Pans mono `input` across the speakers of `output` toward `direction`.
    fn apply_panning_effect(
        &self,
        effect: &mut Self::PanningEffect,
        direction: Vec3,
        input: &AudioBuffer,
        output: &mut AudioBuffer,
    );

    fn create_direct_effect(
        &self,
        audio: &AudioSettings,
        num_channels: usize,
    ) -> Result<Self::DirectEffect>;

    /// Applies the direct-path outputs of `source`. Without a source the
    /// signal passes through unchanged.
    fn apply_direct_effect(
        &self,
        effect: &mut Self::DirectEffect,
        source: Option<&Self::Source>,
        params: &DirectParams,
        input: &AudioBuffer,
        output: &mut AudioBuffer,
    );

    fn create_reflection_effect(
        &self,
        audio: &AudioSettings,
        settings: &SimulationSettings,
    ) -> Result<Self::ReflectionEffect>;

    /// Renders reflections of mono `input` into ambisonic `output` using the
    /// reflection outputs of `source`.
    fn apply_reflection_effect(
        &self,
        effect: &mut Self::ReflectionEffect,
        source: &Self::Source,
        settings: &SimulationSettings,
        input: &AudioBuffer,
        output: &mut AudioBuffer,
    );
}
