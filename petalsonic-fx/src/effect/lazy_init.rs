//! Per-instance lazy initialization of engine resources
//!
//! Every process call runs [`lazy_init`]. Each latch in [`InitFlags`] turns
//! ready once its prerequisites hold and the engine objects behind it have been
//! created. A failed creation leaves the latch unset and is retried on the next
//! call. Objects already created are kept, so repeated calls are cheap.

use super::EffectKind;
use crate::backend::SpatialBackend;
use crate::buffer::AudioBuffer;
use crate::config::{AudioSettings, SimulationSettings};
use crate::environment::EnvironmentDetector;
use crate::error::Result;
use crate::global::GlobalState;
use crate::handoff::{HandoffChannel, PublishOutcome};
use crate::layout::{SpeakerLayout, channels_for_order};
use crate::mixer::ReflectionMixer;
use std::ops::{BitOr, BitOrAssign};
use std::sync::{Arc, Weak};

/// Readiness bitmask returned by [`lazy_init`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InitFlags(u8);

impl InitFlags {
    pub const NONE: Self = Self(0);
    /// Scratch buffers are allocated.
    pub const BUFFERS: Self = Self(1 << 0);
    /// Reflection sub-engines exist (reflection effect or reflection mixer).
    pub const REFLECTION: Self = Self(1 << 1);
    /// Spatial sub-engines exist (binaural, panning or ambisonic decoding).
    pub const SPATIAL: Self = Self(1 << 2);

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }
}

impl BitOr for InitFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for InitFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.insert(rhs);
    }
}

/// Scratch buffers of one effect instance.
///
/// Kinds that do not need a buffer get an empty one.
pub(crate) struct Buffers {
    pub input: AudioBuffer,
    pub mono: AudioBuffer,
    pub direct: AudioBuffer,
    pub reflections: AudioBuffer,
    /// Locally decoded reflections before they are added to `output`
    pub decoded: AudioBuffer,
    pub output: AudioBuffer,
}

impl Buffers {
    fn new(
        kind: EffectKind,
        num_channels_in: usize,
        num_channels_out: usize,
        num_ambisonic_channels: usize,
        frames: usize,
    ) -> Self {
        let sized = |needed: bool, channels: usize| {
            AudioBuffer::new(if needed { channels } else { 0 }, frames)
        };
        let downmixes = kind != EffectKind::MixerReturn;
        Self {
            input: AudioBuffer::new(num_channels_in, frames),
            mono: sized(downmixes, 1),
            direct: sized(kind == EffectKind::Spatialize, 1),
            reflections: AudioBuffer::new(num_ambisonic_channels, frames),
            decoded: sized(kind == EffectKind::Spatialize, num_channels_out),
            output: AudioBuffer::new(num_channels_out, frames),
        }
    }
}

/// Engine objects and buffers owned by one effect instance.
///
/// Everything is optional: release only drops what was actually created.
pub(crate) struct EffectState<B: SpatialBackend> {
    pub context: Option<Arc<B>>,
    pub audio: Option<AudioSettings>,
    /// Settings the settings-dependent objects were built for
    pub settings: Option<SimulationSettings>,
    pub channels: (usize, usize),
    pub buffers: Option<Buffers>,
    pub direct_effect: Option<B::DirectEffect>,
    pub binaural_effect: Option<B::BinauralEffect>,
    pub panning_effect: Option<B::PanningEffect>,
    pub reflection_effect: Option<B::ReflectionEffect>,
    pub decoder: Option<B::AmbisonicsDecoder>,
    pub mixer: Option<Arc<ReflectionMixer>>,
    /// Last mixer this instance staged on the reflection mixer channel
    pub offered_mixer: Weak<ReflectionMixer>,
    /// Mix levels applied on the previous block, ramped from on the next
    pub prev_direct_mix: Option<f32>,
    pub prev_reflections_mix: Option<f32>,
}

impl<B: SpatialBackend> Default for EffectState<B> {
    fn default() -> Self {
        Self {
            context: None,
            audio: None,
            settings: None,
            channels: (0, 0),
            buffers: None,
            direct_effect: None,
            binaural_effect: None,
            panning_effect: None,
            reflection_effect: None,
            decoder: None,
            mixer: None,
            offered_mixer: Weak::new(),
            prev_direct_mix: None,
            prev_reflections_mix: None,
        }
    }
}

impl<B: SpatialBackend> EffectState<B> {
    /// Drops every engine object and buffer, keeping nothing.
    pub fn release(&mut self) {
        let had_context = self.context.is_some();
        *self = Self::default();
        if had_context {
            log::debug!("Effect state released");
        }
    }

    fn drop_engines(&mut self) {
        self.buffers = None;
        self.direct_effect = None;
        self.binaural_effect = None;
        self.panning_effect = None;
        self.reflection_effect = None;
        self.decoder = None;
        self.mixer = None;
        self.settings = None;
    }

    /// Binds the state to `context` and `audio`, dropping objects created for
    /// a different context or different audio settings.
    fn bind(&mut self, context: &Arc<B>, audio: AudioSettings) {
        let same_context = self
            .context
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, context));
        if !same_context || self.audio != Some(audio) {
            if self.context.is_some() {
                log::debug!("Engine context or audio settings changed, rebuilding effect state");
            }
            self.drop_engines();
            self.context = Some(context.clone());
            self.audio = Some(audio);
        }
    }

    /// Drops objects sized by the simulation settings when new ones arrive.
    fn sync_settings(&mut self, settings: Option<SimulationSettings>) {
        let Some(settings) = settings else {
            return;
        };
        if self.settings == Some(settings) {
            return;
        }
        if self.settings.is_some() {
            log::debug!("Simulation settings changed, rebuilding reflection state");
        }
        self.buffers = None;
        self.reflection_effect = None;
        self.decoder = None;
        self.mixer = None;
        self.settings = Some(settings);
    }

    /// Drops objects shaped by the host channel counts when those change.
    ///
    /// Zero counts come from instance creation and never invalidate anything.
    fn sync_channels(&mut self, num_channels_in: usize, num_channels_out: usize) {
        if num_channels_in == 0 || num_channels_out == 0 {
            return;
        }
        let channels = (num_channels_in, num_channels_out);
        if self.channels == channels {
            return;
        }
        self.buffers = None;
        self.panning_effect = None;
        self.decoder = None;
        self.channels = channels;
    }
}

/// Runs one lazy-initialization pass and returns the latches that are ready.
///
/// In the authoring tool the first effect to run without an engine context
/// provisions a default one; elsewhere the embedding application must call
/// [`GlobalState::initialize`].
pub(crate) fn lazy_init<B: SpatialBackend>(
    kind: EffectKind,
    state: &mut EffectState<B>,
    global: &GlobalState<B>,
    environment: &dyn EnvironmentDetector,
    audio: AudioSettings,
    num_channels_in: usize,
    num_channels_out: usize,
) -> InitFlags {
    if !global.is_initialized() && environment.is_running_in_editor() {
        if let Err(e) = global.provision_default(&audio) {
            log::debug!("Default engine provisioning failed: {}", e);
        }
    }

    let Some(context) = global.context() else {
        return InitFlags::NONE;
    };
    let Some(hrtf) = global.hrtf().staged() else {
        return InitFlags::NONE;
    };

    state.bind(&context, audio);
    let settings = global.simulation_settings();
    state.sync_settings(settings);
    state.sync_channels(num_channels_in, num_channels_out);

    let request = InitRequest {
        kind,
        context: &*context,
        global,
        hrtf: &hrtf,
        audio,
        settings,
        num_channels_in,
        num_channels_out,
    };

    match kind {
        EffectKind::Spatialize => init_spatialize(&request, state),
        EffectKind::MixerReturn => init_mixer_return(&request, state),
        EffectKind::Reverb => init_reverb(&request, state),
    }
}

struct InitRequest<'a, B: SpatialBackend> {
    kind: EffectKind,
    context: &'a B,
    global: &'a GlobalState<B>,
    hrtf: &'a B::Hrtf,
    audio: AudioSettings,
    settings: Option<SimulationSettings>,
    num_channels_in: usize,
    num_channels_out: usize,
}

impl<B: SpatialBackend> InitRequest<'_, B> {
    fn has_io(&self) -> bool {
        self.num_channels_in > 0 && self.num_channels_out > 0
    }

    fn layout(&self) -> SpeakerLayout {
        SpeakerLayout::for_channels(self.num_channels_out)
    }

    fn ensure_buffers(&self, state: &mut EffectState<B>) -> InitFlags {
        if !self.has_io() {
            return InitFlags::NONE;
        }
        if state.buffers.is_none() {
            // Before settings arrive the ambisonic buffer takes the default
            // order; it is rebuilt once real settings are published.
            let order = self.settings.unwrap_or_default().max_order;
            state.buffers = Some(Buffers::new(
                self.kind,
                self.num_channels_in,
                self.num_channels_out,
                channels_for_order(order),
                self.audio.frame_size(),
            ));
            log::debug!(
                "{:?} buffers allocated ({} in, {} out, {} frames)",
                self.kind,
                self.num_channels_in,
                self.num_channels_out,
                self.audio.frame_size
            );
        }
        InitFlags::BUFFERS
    }

    fn ensure_decoder(&self, state: &mut EffectState<B>) -> bool {
        let Some(settings) = self.settings else {
            return false;
        };
        if self.num_channels_out == 0 {
            return false;
        }
        if state.decoder.is_none() {
            match self.context.create_ambisonics_decoder(
                &self.audio,
                self.layout(),
                settings.max_order,
                self.hrtf,
            ) {
                Ok(decoder) => {
                    log::debug!("{:?} ambisonics decoder ready", self.kind);
                    state.decoder = Some(decoder);
                }
                Err(e) => {
                    log::debug!("{:?} ambisonics decoder not created: {}", self.kind, e);
                    return false;
                }
            }
        }
        true
    }

    fn ensure_reflection_effect(&self, state: &mut EffectState<B>) -> bool {
        let Some(settings) = self.settings else {
            return false;
        };
        if state.reflection_effect.is_none() {
            match self.context.create_reflection_effect(&self.audio, &settings) {
                Ok(effect) => {
                    log::debug!("{:?} reflection effect ready", self.kind);
                    state.reflection_effect = Some(effect);
                }
                Err(e) => {
                    log::debug!("{:?} reflection effect not created: {}", self.kind, e);
                    return false;
                }
            }
        }
        true
    }

    fn ensure_spatial_effects(&self, state: &mut EffectState<B>) -> Result<()> {
        if state.direct_effect.is_none() {
            state.direct_effect = Some(self.context.create_direct_effect(&self.audio, 1)?);
        }
        if state.binaural_effect.is_none() {
            state.binaural_effect =
                Some(self.context.create_binaural_effect(&self.audio, self.hrtf)?);
        }
        if state.panning_effect.is_none() {
            state.panning_effect =
                Some(self.context.create_panning_effect(&self.audio, self.layout())?);
            log::debug!("{:?} spatial effects ready", self.kind);
        }
        Ok(())
    }
}

fn latch(ready: bool, flag: InitFlags) -> InitFlags {
    if ready { flag } else { InitFlags::NONE }
}

fn init_spatialize<B: SpatialBackend>(
    request: &InitRequest<'_, B>,
    state: &mut EffectState<B>,
) -> InitFlags {
    let mut flags = request.ensure_buffers(state);

    let spatial_ready = request.num_channels_out > 0
        && match request.ensure_spatial_effects(state) {
            Ok(()) => true,
            Err(e) => {
                log::debug!("Spatialize spatial effects not created: {}", e);
                false
            }
        };
    flags |= latch(spatial_ready, InitFlags::SPATIAL);

    // Reflections are decoded locally while no reflection mixer is adopted.
    let reflection_ready =
        request.ensure_reflection_effect(state) && request.ensure_decoder(state);
    flags |= latch(reflection_ready, InitFlags::REFLECTION);

    flags
}

fn init_mixer_return<B: SpatialBackend>(
    request: &InitRequest<'_, B>,
    state: &mut EffectState<B>,
) -> InitFlags {
    let mut flags = InitFlags::NONE;

    if let Some(settings) = request.settings {
        if state.mixer.is_none() {
            match ReflectionMixer::try_new(settings.num_channels(), request.audio.frame_size()) {
                Ok(mixer) => {
                    log::debug!("MixerReturn reflection mixer ready");
                    state.mixer = Some(Arc::new(mixer));
                }
                Err(e) => log::debug!("MixerReturn reflection mixer not created: {}", e),
            }
        }
        if let Some(mixer) = state.mixer.as_ref() {
            offer_mixer(
                request.global.reflection_mixer(),
                mixer,
                &mut state.offered_mixer,
            );
        }
        flags |= latch(state.mixer.is_some(), InitFlags::REFLECTION);
    }

    flags |= latch(request.ensure_decoder(state), InitFlags::SPATIAL);
    flags |= request.ensure_buffers(state);
    flags
}

/// Stages `mixer` unless the channel already carries another instance's mixer.
///
/// Runs every block, so a mixer that lost a race for the channel, or was
/// cleared by [`GlobalState::terminate`], is offered again. A mixer this
/// instance staged earlier and has since rebuilt is superseded even while it
/// is still pending.
fn offer_mixer(
    channel: &HandoffChannel<ReflectionMixer>,
    mixer: &Arc<ReflectionMixer>,
    offered: &mut Weak<ReflectionMixer>,
) {
    let should_offer = match channel.staged() {
        None => true,
        Some(staged) => {
            !Arc::ptr_eq(&staged, mixer) && std::ptr::eq(Arc::as_ptr(&staged), offered.as_ptr())
        }
    };
    if should_offer && channel.try_replace(mixer.clone()) == PublishOutcome::Staged {
        *offered = Arc::downgrade(mixer);
    }
}

fn init_reverb<B: SpatialBackend>(
    request: &InitRequest<'_, B>,
    state: &mut EffectState<B>,
) -> InitFlags {
    let mut flags = request.ensure_buffers(state);
    flags |= latch(request.ensure_reflection_effect(state), InitFlags::REFLECTION);
    flags |= latch(request.ensure_decoder(state), InitFlags::SPATIAL);
    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{ObjectKind, ReferenceBackend};
    use crate::config::{HrtfSettings, PluginDesc};
    use crate::environment::FixedEnvironment;

    fn audio() -> AudioSettings {
        AudioSettings::new(48000, 256)
    }

    fn ready_global() -> (Arc<ReferenceBackend>, GlobalState<ReferenceBackend>) {
        let global = GlobalState::new(PluginDesc::default());
        let context = Arc::new(ReferenceBackend::new());
        global.initialize(context.clone()).unwrap();
        let hrtf = context
            .create_hrtf(&audio(), &HrtfSettings::default())
            .unwrap();
        global.set_hrtf(Arc::new(hrtf));
        (context, global)
    }

    fn run(
        kind: EffectKind,
        state: &mut EffectState<ReferenceBackend>,
        global: &GlobalState<ReferenceBackend>,
        channels: (usize, usize),
    ) -> InitFlags {
        lazy_init(
            kind,
            state,
            global,
            &FixedEnvironment(false),
            audio(),
            channels.0,
            channels.1,
        )
    }

    #[test]
    fn test_flags_bit_ops() {
        let mut flags = InitFlags::BUFFERS | InitFlags::SPATIAL;
        assert!(flags.contains(InitFlags::BUFFERS));
        assert!(!flags.contains(InitFlags::REFLECTION));
        flags |= InitFlags::REFLECTION;
        assert_eq!(flags.bits(), 0b111);
        assert!(flags.contains(InitFlags::NONE));
    }

    #[test]
    fn test_nothing_ready_without_context() {
        let global = GlobalState::<ReferenceBackend>::new(PluginDesc::default());
        let mut state = EffectState::default();
        let flags = run(EffectKind::Reverb, &mut state, &global, (2, 2));
        assert_eq!(flags, InitFlags::NONE);
        assert!(state.buffers.is_none());
    }

    #[test]
    fn test_nothing_ready_without_hrtf() {
        let global = GlobalState::new(PluginDesc::default());
        global.initialize(Arc::new(ReferenceBackend::new())).unwrap();
        let mut state = EffectState::default();
        assert_eq!(
            run(EffectKind::MixerReturn, &mut state, &global, (2, 2)),
            InitFlags::NONE
        );
    }

    #[test]
    fn test_editor_self_provisions() {
        let global = GlobalState::<ReferenceBackend>::new(PluginDesc::default());
        let mut state = EffectState::default();
        let flags = lazy_init(
            EffectKind::Spatialize,
            &mut state,
            &global,
            &FixedEnvironment(true),
            audio(),
            2,
            2,
        );
        assert!(global.is_initialized());
        assert!(flags.contains(InitFlags::BUFFERS | InitFlags::SPATIAL));
    }

    #[test]
    fn test_settings_gate_reflection_latches() {
        let (_context, global) = ready_global();
        let mut state = EffectState::default();

        let flags = run(EffectKind::Reverb, &mut state, &global, (2, 2));
        assert_eq!(flags, InitFlags::BUFFERS);

        global.set_simulation_settings(SimulationSettings::default());
        let flags = run(EffectKind::Reverb, &mut state, &global, (2, 2));
        assert_eq!(
            flags,
            InitFlags::BUFFERS | InitFlags::REFLECTION | InitFlags::SPATIAL
        );
    }

    #[test]
    fn test_failed_creation_is_retried() {
        let (context, global) = ready_global();
        global.set_simulation_settings(SimulationSettings::default());
        context.set_failing(ObjectKind::AmbisonicsDecoder, true);

        let mut state = EffectState::default();
        let flags = run(EffectKind::MixerReturn, &mut state, &global, (2, 2));
        assert!(!flags.contains(InitFlags::SPATIAL));
        assert!(flags.contains(InitFlags::REFLECTION | InitFlags::BUFFERS));

        context.set_failing(ObjectKind::AmbisonicsDecoder, false);
        let flags = run(EffectKind::MixerReturn, &mut state, &global, (2, 2));
        assert!(flags.contains(InitFlags::SPATIAL));
    }

    #[test]
    fn test_repeated_init_keeps_objects() {
        let (context, global) = ready_global();
        global.set_simulation_settings(SimulationSettings::default());
        let mut state = EffectState::default();

        run(EffectKind::Spatialize, &mut state, &global, (2, 2));
        let live = context.live_objects();
        run(EffectKind::Spatialize, &mut state, &global, (2, 2));
        assert_eq!(context.live_objects(), live);
    }

    #[test]
    fn test_mixer_return_publishes_mixer() {
        let (_context, global) = ready_global();
        global.set_simulation_settings(SimulationSettings::default().max_order(2));
        let mut state = EffectState::default();

        run(EffectKind::MixerReturn, &mut state, &global, (2, 2));
        let published = global.reflection_mixer().staged().unwrap();
        assert!(Arc::ptr_eq(&published, state.mixer.as_ref().unwrap()));
        assert_eq!(published.num_channels(), 9);
        assert_eq!(published.num_samples(), 256);
    }

    #[test]
    fn test_rebuilt_mixer_supersedes_pending_one() {
        let (_context, global) = ready_global();
        global.set_simulation_settings(SimulationSettings::default().max_order(1));
        let mut state = EffectState::default();
        run(EffectKind::MixerReturn, &mut state, &global, (2, 2));
        let first = global.reflection_mixer().staged().unwrap();
        assert!(global.reflection_mixer().is_pending());

        global.set_simulation_settings(SimulationSettings::default().max_order(2));
        run(EffectKind::MixerReturn, &mut state, &global, (2, 2));

        let staged = global.reflection_mixer().staged().unwrap();
        assert!(!Arc::ptr_eq(&staged, &first));
        assert!(Arc::ptr_eq(&staged, state.mixer.as_ref().unwrap()));
        assert_eq!(staged.num_channels(), 9);

        global.reflection_mixer().adopt();
        let current = global.reflection_mixer().current().unwrap();
        assert!(Arc::ptr_eq(&current, &staged));
    }

    #[test]
    fn test_mixer_is_offered_again_after_channel_clear() {
        let (_context, global) = ready_global();
        global.set_simulation_settings(SimulationSettings::default());
        let mut state = EffectState::default();
        run(EffectKind::MixerReturn, &mut state, &global, (2, 2));

        global.reflection_mixer().clear();
        assert!(!global.reflection_mixer().has_value());

        run(EffectKind::MixerReturn, &mut state, &global, (2, 2));
        let staged = global.reflection_mixer().staged().unwrap();
        assert!(Arc::ptr_eq(&staged, state.mixer.as_ref().unwrap()));
    }

    #[test]
    fn test_other_instance_mixer_is_kept() {
        let (_context, global) = ready_global();
        global.set_simulation_settings(SimulationSettings::default());
        let mut first = EffectState::default();
        let mut second = EffectState::default();

        run(EffectKind::MixerReturn, &mut first, &global, (2, 2));
        for _ in 0..3 {
            run(EffectKind::MixerReturn, &mut second, &global, (2, 2));
        }

        let staged = global.reflection_mixer().staged().unwrap();
        assert!(Arc::ptr_eq(&staged, first.mixer.as_ref().unwrap()));
    }

    #[test]
    fn test_settings_change_rebuilds_reflection_state() {
        let (_context, global) = ready_global();
        global.set_simulation_settings(SimulationSettings::default());
        let mut state = EffectState::default();
        run(EffectKind::Reverb, &mut state, &global, (2, 2));
        assert_eq!(state.buffers.as_ref().unwrap().reflections.num_channels(), 4);

        global.set_simulation_settings(SimulationSettings::default().max_order(3));
        run(EffectKind::Reverb, &mut state, &global, (2, 2));
        assert_eq!(state.buffers.as_ref().unwrap().reflections.num_channels(), 16);
    }

    #[test]
    fn test_creation_pass_without_channels() {
        let (context, global) = ready_global();
        global.set_simulation_settings(SimulationSettings::default());
        let mut state = EffectState::default();

        let flags = run(EffectKind::Reverb, &mut state, &global, (0, 0));
        assert_eq!(flags, InitFlags::REFLECTION);
        assert!(state.buffers.is_none());

        state.release();
        // Only the HRTF held by the global state is left.
        assert_eq!(context.live_objects(), 1);
    }
}
