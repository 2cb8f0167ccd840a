//! Steam Audio backend through `audionimbus`.
//!
//! Scratch buffers are handed to Steam Audio as borrowed planar views, so
//! applying an effect never allocates. Simulation sources are created by the
//! embedding application's simulator and registered wrapped in [`SteamSource`].

use super::{BinauralParams, DecodeParams, DirectParams, SpatialBackend};
use crate::buffer::AudioBuffer;
use crate::config::{
    AudioSettings, HrtfSettings, ReflectionEffectType, SimulationSettings, VolumeNormalization,
};
use crate::error::{PetalSonicFxError, Result};
use crate::layout::SpeakerLayout;
use crate::math::{CoordinateSpace, Vec3};
use audionimbus::{
    AmbisonicsDecodeEffect, AmbisonicsDecodeEffectParams, AmbisonicsDecodeEffectSettings,
    AudioBufferSettings, BinauralEffect, BinauralEffectParams, BinauralEffectSettings, Context,
    ContextSettings, CoordinateSystem, DirectEffect, DirectEffectParams, DirectEffectSettings,
    Direction, Hrtf, HrtfInterpolation, PanningEffect, PanningEffectParams,
    PanningEffectSettings, Point, ReflectionEffect, ReflectionEffectSettings, SimulationFlags,
    Sofa, Source, Vector3, audio_buffer::AudioBuffer as NimbusBuffer,
};

/// Engine context backed by a Steam Audio `Context`.
pub struct SteamAudioBackend {
    context: Context,
}

impl SteamAudioBackend {
    pub fn new(context: Context) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }
}

pub struct SteamHrtf(Hrtf);

impl SteamHrtf {
    pub fn hrtf(&self) -> &Hrtf {
        &self.0
    }
}

/// Simulation source owned by the embedding application's simulator.
pub struct SteamSource(Source);

impl SteamSource {
    pub fn new(source: Source) -> Self {
        Self(source)
    }

    pub fn source(&self) -> &Source {
        &self.0
    }
}

pub struct SteamDecoder(AmbisonicsDecodeEffect);
pub struct SteamBinaural(BinauralEffect);
pub struct SteamPanning(PanningEffect);
pub struct SteamDirect(DirectEffect);
pub struct SteamReflection(ReflectionEffect);

fn audio_settings(audio: &AudioSettings) -> audionimbus::AudioSettings {
    audionimbus::AudioSettings {
        sampling_rate: audio.sampling_rate,
        frame_size: audio.frame_size,
    }
}

fn speaker_layout(layout: SpeakerLayout) -> audionimbus::SpeakerLayout {
    match layout {
        SpeakerLayout::Mono => audionimbus::SpeakerLayout::Mono,
        SpeakerLayout::Stereo => audionimbus::SpeakerLayout::Stereo,
        SpeakerLayout::Quadraphonic => audionimbus::SpeakerLayout::Quadraphonic,
        SpeakerLayout::Surround5_1 => audionimbus::SpeakerLayout::Surround5_1,
        SpeakerLayout::Surround7_1 => audionimbus::SpeakerLayout::Surround7_1,
        SpeakerLayout::Custom(n) => {
            log::warn!("No Steam Audio layout for {} channels, rendering stereo", n);
            audionimbus::SpeakerLayout::Stereo
        }
    }
}

fn coordinate_system(space: &CoordinateSpace) -> CoordinateSystem {
    CoordinateSystem {
        right: Vector3::new(space.right.x, space.right.y, space.right.z),
        up: Vector3::new(space.up.x, space.up.y, space.up.z),
        ahead: Vector3::new(space.ahead.x, space.ahead.y, space.ahead.z),
        origin: Point::new(space.origin.x, space.origin.y, space.origin.z),
    }
}

fn buffer_settings(buffer: &AudioBuffer) -> AudioBufferSettings {
    AudioBufferSettings {
        num_channels: Some(buffer.num_channels() as _),
        ..Default::default()
    }
}

/// Runs `apply` with `input` and `output` viewed as Steam Audio buffers.
///
/// `output` is left silent if the views cannot be built.
macro_rules! with_buffers {
    ($input:expr, $output:expr, |$in_buf:ident, $out_buf:ident| $apply:expr) => {{
        let in_settings = buffer_settings($input);
        let out_settings = buffer_settings($output);
        $output.zero();
        let views = NimbusBuffer::try_with_data_and_settings($input.data(), in_settings).and_then(
            |in_view| {
                NimbusBuffer::try_with_data_and_settings($output.data_mut(), out_settings)
                    .map(|out_view| (in_view, out_view))
            },
        );
        match views {
            Ok(($in_buf, $out_buf)) => {
                let _effect_state = $apply;
            }
            Err(e) => log::error!("Failed to wrap audio buffers: {}", e),
        }
    }};
}

impl SpatialBackend for SteamAudioBackend {
    type Hrtf = SteamHrtf;
    type Source = SteamSource;
    type AmbisonicsDecoder = SteamDecoder;
    type BinauralEffect = SteamBinaural;
    type PanningEffect = SteamPanning;
    type DirectEffect = SteamDirect;
    type ReflectionEffect = SteamReflection;

    fn create_default(_audio: &AudioSettings) -> Result<Self> {
        let context = Context::try_new(&ContextSettings::default()).map_err(|e| {
            PetalSonicFxError::ResourceCreation(format!(
                "Failed to create Steam Audio context: {}",
                e
            ))
        })?;
        log::info!("Steam Audio context created");
        Ok(Self::new(context))
    }

    fn create_hrtf(&self, audio: &AudioSettings, settings: &HrtfSettings) -> Result<Self::Hrtf> {
        let sofa_information = match &settings.sofa_path {
            Some(path) => Some(Sofa::Buffer(std::fs::read(path)?)),
            None => None,
        };
        let volume_normalization = match settings.normalization {
            VolumeNormalization::None => audionimbus::VolumeNormalization::None,
            VolumeNormalization::RootMeanSquared => {
                audionimbus::VolumeNormalization::RootMeanSquared
            }
        };

        let hrtf = Hrtf::try_new(
            &self.context,
            &audio_settings(audio),
            &audionimbus::HrtfSettings {
                volume_normalization,
                sofa_information,
                ..Default::default()
            },
        )
        .map_err(|e| PetalSonicFxError::ResourceCreation(format!("Failed to create HRTF: {}", e)))?;

        match &settings.sofa_path {
            Some(path) => log::info!("Created HRTF from file: {}", path),
            None => log::info!("Created default HRTF"),
        }
        Ok(SteamHrtf(hrtf))
    }

    fn create_ambisonics_decoder(
        &self,
        audio: &AudioSettings,
        layout: SpeakerLayout,
        max_order: u32,
        hrtf: &Self::Hrtf,
    ) -> Result<Self::AmbisonicsDecoder> {
        let effect = AmbisonicsDecodeEffect::try_new(
            &self.context,
            &audio_settings(audio),
            &AmbisonicsDecodeEffectSettings {
                max_order: max_order as _,
                speaker_layout: speaker_layout(layout),
                hrtf: &hrtf.0,
            },
        )
        .map_err(|e| {
            PetalSonicFxError::ResourceCreation(format!(
                "Failed to create AmbisonicsDecodeEffect: {}",
                e
            ))
        })?;
        Ok(SteamDecoder(effect))
    }

    fn apply_ambisonics_decoder(
        &self,
        decoder: &mut Self::AmbisonicsDecoder,
        params: &DecodeParams<'_, Self::Hrtf>,
        input: &AudioBuffer,
        output: &mut AudioBuffer,
    ) {
        let decode_params = AmbisonicsDecodeEffectParams {
            order: params.order as _,
            hrtf: &params.hrtf.0,
            orientation: coordinate_system(&params.orientation),
            binaural: params.binaural,
        };
        with_buffers!(input, output, |in_buf, out_buf| decoder.0.apply(
            &decode_params,
            &in_buf,
            &out_buf
        ));
    }

    fn create_binaural_effect(
        &self,
        audio: &AudioSettings,
        hrtf: &Self::Hrtf,
    ) -> Result<Self::BinauralEffect> {
        let effect = BinauralEffect::try_new(
            &self.context,
            &audio_settings(audio),
            &BinauralEffectSettings { hrtf: &hrtf.0 },
        )
        .map_err(|e| {
            PetalSonicFxError::ResourceCreation(format!("Failed to create BinauralEffect: {}", e))
        })?;
        Ok(SteamBinaural(effect))
    }

    fn apply_binaural_effect(
        &self,
        effect: &mut Self::BinauralEffect,
        params: &BinauralParams<'_, Self::Hrtf>,
        input: &AudioBuffer,
        output: &mut AudioBuffer,
    ) {
        let d = params.direction;
        let binaural_params = BinauralEffectParams {
            direction: Direction::new(d.x, d.y, d.z),
            interpolation: HrtfInterpolation::Bilinear,
            spatial_blend: params.spatial_blend,
            hrtf: &params.hrtf.0,
            peak_delays: None,
        };
        with_buffers!(input, output, |in_buf, out_buf| effect.0.apply(
            &binaural_params,
            &in_buf,
            &out_buf
        ));
    }

    fn create_panning_effect(
        &self,
        audio: &AudioSettings,
        layout: SpeakerLayout,
    ) -> Result<Self::PanningEffect> {
        let effect = PanningEffect::try_new(
            &self.context,
            &audio_settings(audio),
            &PanningEffectSettings {
                speaker_layout: speaker_layout(layout),
            },
        )
        .map_err(|e| {
            PetalSonicFxError::ResourceCreation(format!("Failed to create PanningEffect: {}", e))
        })?;
        Ok(SteamPanning(effect))
    }

    fn apply_panning_effect(
        &self,
        effect: &mut Self::PanningEffect,
        direction: Vec3,
        input: &AudioBuffer,
        output: &mut AudioBuffer,
    ) {
        let panning_params = PanningEffectParams {
            direction: Direction::new(direction.x, direction.y, direction.z),
        };
        with_buffers!(input, output, |in_buf, out_buf| effect.0.apply(
            &panning_params,
            &in_buf,
            &out_buf
        ));
    }

    fn create_direct_effect(
        &self,
        audio: &AudioSettings,
        num_channels: usize,
    ) -> Result<Self::DirectEffect> {
        let effect = DirectEffect::try_new(
            &self.context,
            &audio_settings(audio),
            &DirectEffectSettings {
                num_channels: num_channels as _,
            },
        )
        .map_err(|e| {
            PetalSonicFxError::ResourceCreation(format!("Failed to create DirectEffect: {}", e))
        })?;
        Ok(SteamDirect(effect))
    }

    fn apply_direct_effect(
        &self,
        effect: &mut Self::DirectEffect,
        source: Option<&Self::Source>,
        params: &DirectParams,
        input: &AudioBuffer,
        output: &mut AudioBuffer,
    ) {
        let mut direct_params = match source {
            Some(source) => source.0.get_outputs(SimulationFlags::DIRECT).direct(),
            None => DirectEffectParams {
                distance_attenuation: None,
                air_absorption: None,
                directivity: None,
                occlusion: None,
                transmission: None,
            },
        };
        if !params.distance_attenuation {
            direct_params.distance_attenuation = None;
        }
        if !params.air_absorption {
            direct_params.air_absorption = None;
        }
        with_buffers!(input, output, |in_buf, out_buf| effect.0.apply(
            &direct_params,
            &in_buf,
            &out_buf
        ));
    }

    fn create_reflection_effect(
        &self,
        audio: &AudioSettings,
        settings: &SimulationSettings,
    ) -> Result<Self::ReflectionEffect> {
        if settings.reflection_type != ReflectionEffectType::Convolution {
            log::warn!(
                "{:?} reflections are rendered with convolution by this backend",
                settings.reflection_type
            );
        }
        let effect = ReflectionEffect::try_new(
            &self.context,
            &audio_settings(audio),
            &ReflectionEffectSettings::Convolution {
                impulse_response_size: settings.impulse_response_size(audio.sampling_rate) as _,
                num_channels: settings.num_channels() as _,
            },
        )
        .map_err(|e| {
            PetalSonicFxError::ResourceCreation(format!(
                "Failed to create ReflectionEffect: {}",
                e
            ))
        })?;
        Ok(SteamReflection(effect))
    }

    fn apply_reflection_effect(
        &self,
        effect: &mut Self::ReflectionEffect,
        source: &Self::Source,
        _settings: &SimulationSettings,
        input: &AudioBuffer,
        output: &mut AudioBuffer,
    ) {
        let reflection_params = source
            .0
            .get_outputs(SimulationFlags::REFLECTIONS)
            .reflections();
        with_buffers!(input, output, |in_buf, out_buf| effect.0.apply(
            &reflection_params,
            &in_buf,
            &out_buf
        ));
    }
}
