//! Pure-Rust reference backend.
//!
//! Renders with simple, deterministic math: first-order ambisonic decoding,
//! constant-power panning and a one-pole reflection tail. It needs no native
//! library, which makes it the backend for tests and headless hosts.
//!
//! Object creation can be made to fail per [`ObjectKind`] to exercise the
//! retry path of lazy initialization, and every created object is counted so
//! leaks show up in [`ReferenceBackend::live_objects`].

use super::{BinauralParams, DecodeParams, DirectParams, SpatialBackend};
use crate::buffer::AudioBuffer;
use crate::config::{AudioSettings, HrtfSettings, SimulationSettings};
use crate::error::{PetalSonicFxError, Result};
use crate::layout::{SpeakerLayout, channels_for_order};
use crate::math::Vec3;
use arc_swap::ArcSwap;
use std::f32::consts::FRAC_1_SQRT_2;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

/// Engine object kinds, used to inject creation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Hrtf,
    AmbisonicsDecoder,
    BinauralEffect,
    PanningEffect,
    DirectEffect,
    ReflectionEffect,
}

impl ObjectKind {
    fn bit(self) -> u32 {
        1 << self as u32
    }
}

/// Direct-path outputs of a simulation run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectOutputs {
    pub distance_attenuation: f32,
    /// Per-band gains (low, mid, high)
    pub air_absorption: [f32; 3],
}

impl Default for DirectOutputs {
    fn default() -> Self {
        Self {
            distance_attenuation: 1.0,
            air_absorption: [1.0; 3],
        }
    }
}

/// Reflection outputs of a simulation run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReflectionOutputs {
    pub gain: f32,
    /// Feedback of the reflection tail, 0.0..1.0
    pub decay: f32,
}

impl Default for ReflectionOutputs {
    fn default() -> Self {
        Self {
            gain: 0.5,
            decay: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SimulationOutputs {
    pub direct: DirectOutputs,
    pub reflections: ReflectionOutputs,
}

/// Simulation source whose outputs are written by the simulation thread.
pub struct ReferenceSource {
    outputs: ArcSwap<SimulationOutputs>,
}

impl Default for ReferenceSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferenceSource {
    pub fn new() -> Self {
        Self::with_outputs(SimulationOutputs::default())
    }

    pub fn with_outputs(outputs: SimulationOutputs) -> Self {
        Self {
            outputs: ArcSwap::from_pointee(outputs),
        }
    }

    pub fn set_outputs(&self, outputs: SimulationOutputs) {
        self.outputs.store(Arc::new(outputs));
    }

    pub fn outputs(&self) -> SimulationOutputs {
        **self.outputs.load()
    }
}

struct LiveToken(Arc<AtomicUsize>);

impl LiveToken {
    fn new(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self(counter.clone())
    }
}

impl Drop for LiveToken {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

pub struct ReferenceHrtf {
    gain: f32,
    _token: LiveToken,
}

impl ReferenceHrtf {
    pub fn gain(&self) -> f32 {
        self.gain
    }
}

pub struct ReferenceDecoder {
    layout: SpeakerLayout,
    max_order: u32,
    _token: LiveToken,
}

pub struct ReferenceBinaural {
    _token: LiveToken,
}

pub struct ReferencePanning {
    layout: SpeakerLayout,
    _token: LiveToken,
}

pub struct ReferenceDirect {
    num_channels: usize,
    _token: LiveToken,
}

pub struct ReferenceReflection {
    num_channels: usize,
    tail: f32,
    _token: LiveToken,
}

/// Reference engine context.
#[derive(Default)]
pub struct ReferenceBackend {
    failing: AtomicU32,
    live: Arc<AtomicUsize>,
}

impl ReferenceBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every creation of `kind` fail until reset.
    pub fn set_failing(&self, kind: ObjectKind, fail: bool) {
        if fail {
            self.failing.fetch_or(kind.bit(), Ordering::Relaxed);
        } else {
            self.failing.fetch_and(!kind.bit(), Ordering::Relaxed);
        }
    }

    /// Number of engine objects created by this context and not yet dropped.
    pub fn live_objects(&self) -> usize {
        self.live.load(Ordering::Relaxed)
    }

    fn token(&self, kind: ObjectKind) -> Result<LiveToken> {
        if self.failing.load(Ordering::Relaxed) & kind.bit() != 0 {
            return Err(PetalSonicFxError::ResourceCreation(format!(
                "Injected failure creating {:?}",
                kind
            )));
        }
        Ok(LiveToken::new(&self.live))
    }
}

impl SpatialBackend for ReferenceBackend {
    type Hrtf = ReferenceHrtf;
    type Source = ReferenceSource;
    type AmbisonicsDecoder = ReferenceDecoder;
    type BinauralEffect = ReferenceBinaural;
    type PanningEffect = ReferencePanning;
    type DirectEffect = ReferenceDirect;
    type ReflectionEffect = ReferenceReflection;

    fn create_default(audio: &AudioSettings) -> Result<Self> {
        if audio.sampling_rate == 0 || audio.frame_size == 0 {
            return Err(PetalSonicFxError::Configuration(format!(
                "Invalid audio settings: {:?}",
                audio
            )));
        }
        Ok(Self::new())
    }

    fn create_hrtf(&self, _audio: &AudioSettings, settings: &HrtfSettings) -> Result<Self::Hrtf> {
        if let Some(path) = &settings.sofa_path {
            std::fs::metadata(path)?;
        }
        Ok(ReferenceHrtf {
            gain: settings.volume,
            _token: self.token(ObjectKind::Hrtf)?,
        })
    }

    fn create_ambisonics_decoder(
        &self,
        _audio: &AudioSettings,
        layout: SpeakerLayout,
        max_order: u32,
        _hrtf: &Self::Hrtf,
    ) -> Result<Self::AmbisonicsDecoder> {
        if layout.num_speakers() == 0 {
            return Err(PetalSonicFxError::ResourceCreation(
                "Ambisonics decoder needs at least one speaker".into(),
            ));
        }
        Ok(ReferenceDecoder {
            layout,
            max_order,
            _token: self.token(ObjectKind::AmbisonicsDecoder)?,
        })
    }

    // First-order decode; higher-order channels are ignored.
    fn apply_ambisonics_decoder(
        &self,
        decoder: &mut Self::AmbisonicsDecoder,
        params: &DecodeParams<'_, Self::Hrtf>,
        input: &AudioBuffer,
        output: &mut AudioBuffer,
    ) {
        output.zero();
        let channels = channels_for_order(params.order.min(decoder.max_order))
            .min(input.num_channels())
            .min(4);
        let samples = input.num_samples().min(output.num_samples());
        let gain = if params.binaural {
            params.hrtf.gain
        } else {
            1.0
        };

        for speaker in 0..output.num_channels() {
            let Some(local) = decoder.layout.speaker_direction(speaker) else {
                continue;
            };
            let world = params.orientation.to_world(local);
            // ACN channel order: W, Y, Z, X
            let weights = [1.0, world.y, world.z, world.x];
            let out = &mut output.channel_mut(speaker)[..samples];
            for (channel, weight) in weights.iter().enumerate().take(channels) {
                let w = 0.5 * weight * gain;
                for (o, i) in out.iter_mut().zip(input.channel(channel)) {
                    *o += w * i;
                }
            }
        }
    }

    fn create_binaural_effect(
        &self,
        _audio: &AudioSettings,
        _hrtf: &Self::Hrtf,
    ) -> Result<Self::BinauralEffect> {
        Ok(ReferenceBinaural {
            _token: self.token(ObjectKind::BinauralEffect)?,
        })
    }

    fn apply_binaural_effect(
        &self,
        _effect: &mut Self::BinauralEffect,
        params: &BinauralParams<'_, Self::Hrtf>,
        input: &AudioBuffer,
        output: &mut AudioBuffer,
    ) {
        output.zero();
        let pan = params.direction.x.clamp(-1.0, 1.0);
        let blend = params.spatial_blend.clamp(0.0, 1.0);
        let gain = params.hrtf.gain;
        let left = blend * ((1.0 - pan) * 0.5).sqrt() + (1.0 - blend) * FRAC_1_SQRT_2;
        let right = blend * ((1.0 + pan) * 0.5).sqrt() + (1.0 - blend) * FRAC_1_SQRT_2;

        let stereo = [left, right];
        let gains: &[f32] = if output.num_channels() == 1 {
            &[1.0]
        } else {
            &stereo
        };
        for (channel, g) in gains.iter().enumerate() {
            let out = output.channel_mut(channel);
            for (o, i) in out.iter_mut().zip(input.channel(0)) {
                *o = i * g * gain;
            }
        }
    }

    fn create_panning_effect(
        &self,
        _audio: &AudioSettings,
        layout: SpeakerLayout,
    ) -> Result<Self::PanningEffect> {
        Ok(ReferencePanning {
            layout,
            _token: self.token(ObjectKind::PanningEffect)?,
        })
    }

    fn apply_panning_effect(
        &self,
        effect: &mut Self::PanningEffect,
        direction: Vec3,
        input: &AudioBuffer,
        output: &mut AudioBuffer,
    ) {
        output.zero();
        let speakers = effect.layout.num_speakers().min(output.num_channels());
        let gain = |speaker: usize| {
            effect
                .layout
                .speaker_direction(speaker)
                .map_or(0.0, |d| (1.0 + direction.dot(d)) * 0.5)
        };
        let norm = (0..speakers).map(|s| gain(s).powi(2)).sum::<f32>().sqrt();
        if norm <= f32::EPSILON {
            return;
        }

        for speaker in 0..speakers {
            let g = gain(speaker) / norm;
            let out = output.channel_mut(speaker);
            for (o, i) in out.iter_mut().zip(input.channel(0)) {
                *o = i * g;
            }
        }
    }

    fn create_direct_effect(
        &self,
        _audio: &AudioSettings,
        num_channels: usize,
    ) -> Result<Self::DirectEffect> {
        if num_channels == 0 {
            return Err(PetalSonicFxError::ResourceCreation(
                "Direct effect needs at least one channel".into(),
            ));
        }
        Ok(ReferenceDirect {
            num_channels,
            _token: self.token(ObjectKind::DirectEffect)?,
        })
    }

    fn apply_direct_effect(
        &self,
        effect: &mut Self::DirectEffect,
        source: Option<&Self::Source>,
        params: &DirectParams,
        input: &AudioBuffer,
        output: &mut AudioBuffer,
    ) {
        let direct = source.map(|s| s.outputs().direct).unwrap_or_default();
        let mut gain = 1.0;
        if params.distance_attenuation {
            gain *= direct.distance_attenuation;
        }
        if params.air_absorption {
            gain *= direct.air_absorption.iter().sum::<f32>() / 3.0;
        }

        output.zero();
        let channels = effect
            .num_channels
            .min(input.num_channels())
            .min(output.num_channels());
        for channel in 0..channels {
            let out = output.channel_mut(channel);
            for (o, i) in out.iter_mut().zip(input.channel(channel)) {
                *o = i * gain;
            }
        }
    }

    fn create_reflection_effect(
        &self,
        _audio: &AudioSettings,
        settings: &SimulationSettings,
    ) -> Result<Self::ReflectionEffect> {
        Ok(ReferenceReflection {
            num_channels: settings.num_channels(),
            tail: 0.0,
            _token: self.token(ObjectKind::ReflectionEffect)?,
        })
    }

    // Diffuse tail: y[n] = gain * x[n] + decay * y[n-1], written to W only.
    fn apply_reflection_effect(
        &self,
        effect: &mut Self::ReflectionEffect,
        source: &Self::Source,
        _settings: &SimulationSettings,
        input: &AudioBuffer,
        output: &mut AudioBuffer,
    ) {
        output.zero();
        if effect.num_channels == 0 || output.num_channels() == 0 {
            return;
        }
        let reflections = source.outputs().reflections;
        let decay = reflections.decay.clamp(0.0, 0.999);
        let mut tail = effect.tail;
        let out = output.channel_mut(0);
        for (o, i) in out.iter_mut().zip(input.channel(0)) {
            tail = reflections.gain * i + decay * tail;
            *o = tail;
        }
        effect.tail = tail;
    }
}
