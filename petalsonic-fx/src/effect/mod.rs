//! DSP effect instances
//!
//! One [`SpatialEffect`] type implements all three plugins; [`EffectKind`]
//! selects the parameter table, the sub-engines created by lazy
//! initialization and the per-block processing.
//!
//! Lifecycle: [`SpatialEffect::create`], then [`SpatialEffect::process`] once
//! per host block, then [`SpatialEffect::release`] (or drop).

mod lazy_init;
mod mixer_return;
mod params;
mod reverb;
mod spatialize;

pub use lazy_init::InitFlags;
pub use params::{ParamDesc, ParamKind, ParamTable, ParamValue};

/// Parameter indices, per effect kind.
pub mod param {
    pub use super::mixer_return::BINAURAL as MIXER_RETURN_BINAURAL;
    pub use super::reverb::BINAURAL as REVERB_BINAURAL;
    pub use super::spatialize::{
        AIR_ABSORPTION, DIRECT_BINAURAL, DIRECT_MIX_LEVEL, DISTANCE_ATTENUATION, REFLECTIONS,
        REFLECTIONS_MIX_LEVEL, SIMULATION_OUTPUTS, SOURCE_POSITION,
    };
}

use crate::backend::SpatialBackend;
use crate::config::AudioSettings;
use crate::environment::EnvironmentDetector;
use crate::error::Result;
use crate::global::{GlobalState, Version, version};
use crate::math::{Attributes3d, CoordinateSpace};
use lazy_init::{EffectState, lazy_init};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectKind {
    /// Per-emitter direct path rendering plus optional reflections
    Spatialize,
    /// Decodes the shared reflection bus and mixes it onto its input
    MixerReturn,
    /// Renders reflections of the designated reverb source
    Reverb,
}

impl EffectKind {
    pub const ALL: [EffectKind; 3] = [Self::Spatialize, Self::MixerReturn, Self::Reverb];

    pub fn name(self) -> &'static str {
        match self {
            Self::Spatialize => "PetalSonic Spatializer",
            Self::MixerReturn => "PetalSonic Mixer Return",
            Self::Reverb => "PetalSonic Reverb",
        }
    }

    pub fn params(self) -> &'static [ParamDesc] {
        match self {
            Self::Spatialize => spatialize::PARAMS,
            Self::MixerReturn => mixer_return::PARAMS,
            Self::Reverb => reverb::PARAMS,
        }
    }

    /// Latches that must be ready before a block is processed.
    pub fn required_flags(self) -> InitFlags {
        match self {
            Self::Spatialize => InitFlags::BUFFERS | InitFlags::SPATIAL,
            Self::MixerReturn | Self::Reverb => {
                InitFlags::BUFFERS | InitFlags::REFLECTION | InitFlags::SPATIAL
            }
        }
    }

    pub fn descriptor(self) -> EffectDescriptor {
        EffectDescriptor {
            kind: self,
            name: self.name(),
            version: version(),
            num_inputs: 1,
            num_outputs: 1,
            params: self.params(),
        }
    }
}

/// What the host needs to register one effect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectDescriptor {
    pub kind: EffectKind,
    pub name: &'static str,
    pub version: Version,
    pub num_inputs: u32,
    pub num_outputs: u32,
    pub params: &'static [ParamDesc],
}

/// Descriptors of every effect in the plugin set.
pub fn plugin_list() -> [EffectDescriptor; 3] {
    EffectKind::ALL.map(EffectKind::descriptor)
}

/// Accessors the host provides to effects.
pub trait DspHost {
    fn sample_rate(&self) -> u32;
    fn block_size(&self) -> u32;
    fn listener_attributes(&self) -> Attributes3d;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOperation {
    /// The host asks whether the effect would produce output.
    Query,
    Perform,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    Ok,
    /// The output block is silent.
    Silence,
    /// The host may skip this block entirely.
    DontProcess,
}

/// Interleaved host buffers for one block.
pub struct ProcessBlock<'a> {
    pub input: &'a [f32],
    pub input_channels: usize,
    pub output: &'a mut [f32],
    pub output_channels: usize,
    pub inputs_idle: bool,
}

impl<'a> ProcessBlock<'a> {
    pub fn new(
        input: &'a [f32],
        input_channels: usize,
        output: &'a mut [f32],
        output_channels: usize,
    ) -> Self {
        Self {
            input,
            input_channels,
            output,
            output_channels,
            inputs_idle: false,
        }
    }

    pub fn inputs_idle(mut self, idle: bool) -> Self {
        self.inputs_idle = idle;
        self
    }
}

/// Everything a kind-specific process function works with.
pub(crate) struct BlockContext<'a, B: SpatialBackend> {
    pub context: &'a B,
    pub global: &'a GlobalState<B>,
    pub state: &'a mut EffectState<B>,
    pub params: &'a ParamTable,
    pub listener: CoordinateSpace,
    pub flags: InitFlags,
}

/// One effect instance.
pub struct SpatialEffect<B: SpatialBackend> {
    kind: EffectKind,
    global: Arc<GlobalState<B>>,
    environment: Arc<dyn EnvironmentDetector>,
    params: ParamTable,
    state: EffectState<B>,
    last_flags: InitFlags,
}

impl<B: SpatialBackend> SpatialEffect<B> {
    /// Creates an instance with default parameters and makes a first,
    /// best-effort initialization pass.
    pub fn create(
        kind: EffectKind,
        global: Arc<GlobalState<B>>,
        environment: Arc<dyn EnvironmentDetector>,
        host: &dyn DspHost,
    ) -> Self {
        let mut effect = Self {
            kind,
            global,
            environment,
            params: ParamTable::new(kind.params()),
            state: EffectState::default(),
            last_flags: InitFlags::NONE,
        };
        effect.run_lazy_init(host, 0, 0);
        log::debug!("{} created", kind.name());
        effect
    }

    pub fn kind(&self) -> EffectKind {
        self.kind
    }

    pub fn params(&self) -> &ParamTable {
        &self.params
    }

    /// Restores default parameters.
    pub fn reset(&mut self) {
        self.params.reset();
        self.state.prev_direct_mix = None;
        self.state.prev_reflections_mix = None;
    }

    /// Readiness reported by the most recent initialization pass.
    pub fn last_init_flags(&self) -> InitFlags {
        self.last_flags
    }

    pub fn get_parameter(&self, index: usize) -> Result<ParamValue> {
        self.params.get(index)
    }

    pub fn set_parameter(&mut self, index: usize, value: ParamValue) -> Result<()> {
        self.params.set(index, value)
    }

    pub fn get_bool(&self, index: usize) -> Result<bool> {
        self.params.get_bool(index)
    }

    pub fn set_bool(&mut self, index: usize, value: bool) -> Result<()> {
        self.params.set(index, ParamValue::Bool(value))
    }

    pub fn get_int(&self, index: usize) -> Result<i32> {
        self.params.get_int(index)
    }

    pub fn set_int(&mut self, index: usize, value: i32) -> Result<()> {
        self.params.set(index, ParamValue::Int(value))
    }

    pub fn get_float(&self, index: usize) -> Result<f32> {
        self.params.get_float(index)
    }

    pub fn set_float(&mut self, index: usize, value: f32) -> Result<()> {
        self.params.set(index, ParamValue::Float(value))
    }

    pub fn get_attributes(&self, index: usize) -> Result<Attributes3d> {
        self.params.get_attributes(index)
    }

    pub fn set_attributes(&mut self, index: usize, value: Attributes3d) -> Result<()> {
        self.params.set(index, ParamValue::Attributes3d(value))
    }

    /// Processes one block.
    ///
    /// The output is zeroed before anything else, so every early return
    /// leaves silence behind. Unavailable prerequisites and failed engine
    /// object creation yield [`ProcessStatus::Silence`] and are retried on the
    /// next block.
    pub fn process(
        &mut self,
        host: &dyn DspHost,
        operation: ProcessOperation,
        mut block: ProcessBlock<'_>,
    ) -> ProcessStatus {
        if operation == ProcessOperation::Query {
            return if block.inputs_idle {
                ProcessStatus::DontProcess
            } else {
                ProcessStatus::Ok
            };
        }

        block.output.fill(0.0);

        let flags = self.run_lazy_init(host, block.input_channels, block.output_channels);
        if !flags.contains(self.kind.required_flags()) {
            return ProcessStatus::Silence;
        }
        let Some(context) = self.state.context.clone() else {
            return ProcessStatus::Silence;
        };

        let kind = self.kind;
        let cx = BlockContext {
            context: &*context,
            global: &self.global,
            state: &mut self.state,
            params: &self.params,
            listener: CoordinateSpace::from_attributes(&host.listener_attributes()),
            flags,
        };
        match kind {
            EffectKind::Spatialize => spatialize::process(cx, &mut block),
            EffectKind::MixerReturn => mixer_return::process(cx, &mut block),
            EffectKind::Reverb => reverb::process(cx, &mut block),
        }
    }

    /// Releases the instance and every engine object it created.
    pub fn release(self) {
        drop(self);
    }

    fn run_lazy_init(
        &mut self,
        host: &dyn DspHost,
        num_channels_in: usize,
        num_channels_out: usize,
    ) -> InitFlags {
        let audio = AudioSettings::new(host.sample_rate(), host.block_size())
            .or(self.global.desc().fallback_audio);
        let flags = lazy_init(
            self.kind,
            &mut self.state,
            &self.global,
            self.environment.as_ref(),
            audio,
            num_channels_in,
            num_channels_out,
        );
        if flags != self.last_flags {
            log::debug!(
                "{} readiness changed: {:#05b} -> {:#05b}",
                self.kind.name(),
                self.last_flags.bits(),
                flags.bits()
            );
            self.last_flags = flags;
        }
        flags
    }
}

impl<B: SpatialBackend> Drop for SpatialEffect<B> {
    fn drop(&mut self) {
        self.state.release();
        log::debug!("{} released", self.kind.name());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{ObjectKind, ReferenceBackend, ReferenceSource};
    use crate::config::{HrtfSettings, PluginDesc, SimulationSettings};
    use crate::environment::FixedEnvironment;
    use crate::error::PetalSonicFxError;
    use crate::math::Vec3;

    const FRAMES: usize = 512;

    struct TestHost {
        listener: Attributes3d,
    }

    impl DspHost for TestHost {
        fn sample_rate(&self) -> u32 {
            48000
        }

        fn block_size(&self) -> u32 {
            FRAMES as u32
        }

        fn listener_attributes(&self) -> Attributes3d {
            self.listener
        }
    }

    fn host() -> TestHost {
        TestHost {
            listener: Attributes3d::IDENTITY,
        }
    }

    fn tone(channels: usize) -> Vec<f32> {
        (0..FRAMES * channels)
            .map(|i| ((i / channels) as f32 * 0.05).sin() * 0.5)
            .collect()
    }

    fn new_global() -> Arc<GlobalState<ReferenceBackend>> {
        let _ = env_logger::builder().is_test(true).try_init();
        Arc::new(GlobalState::new(PluginDesc::default()))
    }

    fn initialize(global: &GlobalState<ReferenceBackend>) -> Arc<ReferenceBackend> {
        let context = Arc::new(ReferenceBackend::new());
        global.initialize(context.clone()).unwrap();
        let hrtf = context
            .create_hrtf(&AudioSettings::new(48000, FRAMES as u32), &HrtfSettings::default())
            .unwrap();
        global.set_hrtf(Arc::new(hrtf));
        global.set_simulation_settings(SimulationSettings::default());
        context
    }

    fn effect(
        kind: EffectKind,
        global: &Arc<GlobalState<ReferenceBackend>>,
    ) -> SpatialEffect<ReferenceBackend> {
        SpatialEffect::create(kind, global.clone(), Arc::new(FixedEnvironment(false)), &host())
    }

    fn perform(
        effect: &mut SpatialEffect<ReferenceBackend>,
        input: &[f32],
        output: &mut [f32],
    ) -> ProcessStatus {
        effect.process(
            &host(),
            ProcessOperation::Perform,
            ProcessBlock::new(input, 2, output, 2),
        )
    }

    fn is_silent(block: &[f32]) -> bool {
        block.iter().all(|s| *s == 0.0)
    }

    #[test]
    fn test_end_to_end_scenario() {
        let global = new_global();
        let mut spatializer = effect(EffectKind::Spatialize, &global);
        let input = tone(2);
        let mut output = vec![1.0; FRAMES * 2];

        assert_eq!(
            perform(&mut spatializer, &input, &mut output),
            ProcessStatus::Silence
        );
        assert!(is_silent(&output));

        initialize(&global);

        assert_eq!(perform(&mut spatializer, &input, &mut output), ProcessStatus::Ok);
        assert!(
            spatializer
                .last_init_flags()
                .contains(InitFlags::BUFFERS | InitFlags::REFLECTION | InitFlags::SPATIAL)
        );
        assert_eq!(output.len(), FRAMES * 2);
        assert!(output.iter().any(|s| s.abs() > 1e-3));

        let a = global.add_source(Arc::new(ReferenceSource::new()));
        let b = global.add_source(Arc::new(ReferenceSource::new()));
        assert_eq!((a.raw(), b.raw()), (0, 1));
        assert!(global.remove_source(a));
        let c = global.add_source(Arc::new(ReferenceSource::new()));
        assert_eq!(c.raw(), 0);
    }

    #[test]
    fn test_silence_until_ready() {
        let global = new_global();
        let mut reverb = effect(EffectKind::Reverb, &global);
        let input = tone(2);
        for _ in 0..8 {
            let mut output = vec![0.25; FRAMES * 2];
            assert_eq!(perform(&mut reverb, &input, &mut output), ProcessStatus::Silence);
            assert!(is_silent(&output));
        }
        assert_eq!(reverb.last_init_flags(), InitFlags::NONE);
    }

    #[test]
    fn test_query_mode() {
        let global = new_global();
        let mut mixer_return = effect(EffectKind::MixerReturn, &global);
        let input = tone(2);
        let mut output = vec![0.0; FRAMES * 2];

        let idle = ProcessBlock::new(&input, 2, &mut output, 2).inputs_idle(true);
        assert_eq!(
            mixer_return.process(&host(), ProcessOperation::Query, idle),
            ProcessStatus::DontProcess
        );
        let busy = ProcessBlock::new(&input, 2, &mut output, 2);
        assert_eq!(
            mixer_return.process(&host(), ProcessOperation::Query, busy),
            ProcessStatus::Ok
        );
    }

    #[test]
    fn test_parameters() {
        let global = new_global();
        let mut spatializer = effect(EffectKind::Spatialize, &global);

        assert!(spatializer.get_bool(param::DIRECT_BINAURAL).unwrap());
        assert!(!spatializer.get_bool(param::REFLECTIONS).unwrap());
        assert_eq!(spatializer.get_int(param::SIMULATION_OUTPUTS).unwrap(), -1);

        spatializer.set_float(param::DIRECT_MIX_LEVEL, 2.0).unwrap();
        assert_eq!(spatializer.get_float(param::DIRECT_MIX_LEVEL).unwrap(), 1.0);
        spatializer
            .set_float(param::REFLECTIONS_MIX_LEVEL, 4.0)
            .unwrap();
        assert_eq!(
            spatializer.get_float(param::REFLECTIONS_MIX_LEVEL).unwrap(),
            4.0
        );

        assert!(matches!(
            spatializer.set_bool(8, true),
            Err(PetalSonicFxError::InvalidParameter { index: 8 })
        ));

        spatializer.reset();
        assert_eq!(spatializer.get_float(param::REFLECTIONS_MIX_LEVEL).unwrap(), 1.0);

        let mut reverb = effect(EffectKind::Reverb, &global);
        assert!(!reverb.get_bool(param::REVERB_BINAURAL).unwrap());
        reverb.set_bool(param::REVERB_BINAURAL, true).unwrap();
        assert!(reverb.get_bool(param::REVERB_BINAURAL).unwrap());
        assert!(reverb.get_bool(1).is_err());
    }

    #[test]
    fn test_failed_creation_retries_until_success() {
        let global = new_global();
        let context = initialize(&global);
        context.set_failing(ObjectKind::BinauralEffect, true);

        let mut spatializer = effect(EffectKind::Spatialize, &global);
        let input = tone(2);
        let mut output = vec![0.0; FRAMES * 2];

        assert_eq!(
            perform(&mut spatializer, &input, &mut output),
            ProcessStatus::Silence
        );
        assert!(!spatializer.last_init_flags().contains(InitFlags::SPATIAL));

        context.set_failing(ObjectKind::BinauralEffect, false);
        assert_eq!(perform(&mut spatializer, &input, &mut output), ProcessStatus::Ok);
        assert!(!is_silent(&output));
    }

    #[test]
    fn test_release_before_initialization() {
        let global = new_global();
        let spatializer = effect(EffectKind::Spatialize, &global);
        let mixer_return = effect(EffectKind::MixerReturn, &global);
        spatializer.release();
        mixer_return.release();
    }

    #[test]
    fn test_release_frees_engine_objects() {
        let global = new_global();
        let context = initialize(&global);
        let input = tone(2);
        let mut output = vec![0.0; FRAMES * 2];

        for kind in EffectKind::ALL {
            let mut instance = effect(kind, &global);
            perform(&mut instance, &input, &mut output);
            assert!(instance.last_init_flags().contains(kind.required_flags()));
            instance.release();
        }

        global.terminate();
        assert_eq!(context.live_objects(), 0);
    }

    #[test]
    fn test_editor_provisions_default_context() {
        let global = new_global();
        let mut spatializer = SpatialEffect::create(
            EffectKind::Spatialize,
            global.clone(),
            Arc::new(FixedEnvironment(true)),
            &host(),
        );
        assert!(global.is_initialized());

        let input = tone(2);
        let mut output = vec![0.0; FRAMES * 2];
        assert_eq!(perform(&mut spatializer, &input, &mut output), ProcessStatus::Ok);
    }

    #[test]
    fn test_reverb_needs_reverb_source() {
        let global = new_global();
        initialize(&global);
        let mut reverb = effect(EffectKind::Reverb, &global);
        let input = tone(2);
        let mut output = vec![0.0; FRAMES * 2];

        assert_eq!(perform(&mut reverb, &input, &mut output), ProcessStatus::Silence);
        assert!(is_silent(&output));

        global.set_reverb_source(Arc::new(ReferenceSource::new()));
        assert_eq!(perform(&mut reverb, &input, &mut output), ProcessStatus::Ok);
        assert!(!is_silent(&output));
    }

    #[test]
    fn test_reflections_flow_through_mixer_return() {
        let global = new_global();
        initialize(&global);
        let input = tone(2);
        let silence = vec![0.0; FRAMES * 2];
        let mut output = vec![0.0; FRAMES * 2];

        let mut mixer_return = effect(EffectKind::MixerReturn, &global);
        assert_eq!(
            perform(&mut mixer_return, &silence, &mut output),
            ProcessStatus::Ok
        );
        assert!(is_silent(&output));
        assert!(global.reflection_mixer().is_pending());

        let handle = global.add_source(Arc::new(ReferenceSource::new()));
        let mut spatializer = effect(EffectKind::Spatialize, &global);
        spatializer.set_bool(param::REFLECTIONS, true).unwrap();
        spatializer
            .set_int(param::SIMULATION_OUTPUTS, handle.raw())
            .unwrap();
        spatializer
            .set_attributes(
                param::SOURCE_POSITION,
                Attributes3d::from_position(Vec3::new(2.0, 0.0, 0.0)),
            )
            .unwrap();
        assert_eq!(perform(&mut spatializer, &input, &mut output), ProcessStatus::Ok);
        assert!(!global.reflection_mixer().is_pending());

        assert_eq!(
            perform(&mut mixer_return, &silence, &mut output),
            ProcessStatus::Ok
        );
        assert!(!is_silent(&output));

        // The bus was drained.
        assert_eq!(
            perform(&mut mixer_return, &silence, &mut output),
            ProcessStatus::Ok
        );
        assert!(is_silent(&output));
    }

    fn reflecting_spatializer(
        global: &Arc<GlobalState<ReferenceBackend>>,
        handle: crate::registry::SourceHandle,
    ) -> SpatialEffect<ReferenceBackend> {
        let mut spatializer = effect(EffectKind::Spatialize, global);
        spatializer.set_bool(param::REFLECTIONS, true).unwrap();
        spatializer
            .set_int(param::SIMULATION_OUTPUTS, handle.raw())
            .unwrap();
        spatializer
    }

    #[test]
    fn test_settings_change_keeps_reflections_flowing() {
        let global = new_global();
        initialize(&global);
        let input = tone(2);
        let silence = vec![0.0; FRAMES * 2];
        let mut output = vec![0.0; FRAMES * 2];

        let mut mixer_return = effect(EffectKind::MixerReturn, &global);
        perform(&mut mixer_return, &silence, &mut output);
        assert!(global.reflection_mixer().is_pending());

        global.set_simulation_settings(SimulationSettings::default().max_order(2));
        perform(&mut mixer_return, &silence, &mut output);

        let handle = global.add_source(Arc::new(ReferenceSource::new()));
        let mut spatializer = reflecting_spatializer(&global, handle);
        let mut audible = 0;
        for _ in 0..20 {
            perform(&mut spatializer, &input, &mut output);
            assert_eq!(
                perform(&mut mixer_return, &silence, &mut output),
                ProcessStatus::Ok
            );
            if !is_silent(&output) {
                audible += 1;
            }
        }
        assert_eq!(audible, 20);

        let adopted = global.reflection_mixer().current().unwrap();
        assert_eq!(adopted.num_channels(), 9);
        assert!(Arc::ptr_eq(&adopted, mixer_return.state.mixer.as_ref().unwrap()));
    }

    #[test]
    fn test_reinitialize_with_live_effects() {
        let global = new_global();
        let context = initialize(&global);
        let input = tone(2);
        let silence = vec![0.0; FRAMES * 2];
        let mut output = vec![0.0; FRAMES * 2];

        let mut mixer_return = effect(EffectKind::MixerReturn, &global);
        perform(&mut mixer_return, &silence, &mut output);
        let handle = global.add_source(Arc::new(ReferenceSource::new()));
        let mut spatializer = reflecting_spatializer(&global, handle);
        perform(&mut spatializer, &input, &mut output);

        global.terminate();
        assert_eq!(
            perform(&mut spatializer, &input, &mut output),
            ProcessStatus::Silence
        );
        assert!(!global.reflection_mixer().has_value());

        global.initialize(context.clone()).unwrap();
        let hrtf = context
            .create_hrtf(&AudioSettings::new(48000, FRAMES as u32), &HrtfSettings::default())
            .unwrap();
        global.set_hrtf(Arc::new(hrtf));
        global.set_simulation_settings(SimulationSettings::default());
        let handle = global.add_source(Arc::new(ReferenceSource::new()));
        spatializer
            .set_int(param::SIMULATION_OUTPUTS, handle.raw())
            .unwrap();

        perform(&mut mixer_return, &silence, &mut output);
        let staged = global.reflection_mixer().staged().unwrap();
        assert!(Arc::ptr_eq(&staged, mixer_return.state.mixer.as_ref().unwrap()));

        for _ in 0..10 {
            assert_eq!(perform(&mut spatializer, &input, &mut output), ProcessStatus::Ok);
            assert_eq!(
                perform(&mut mixer_return, &silence, &mut output),
                ProcessStatus::Ok
            );
            assert!(!is_silent(&output));
        }
    }

    #[test]
    fn test_removed_source_keeps_direct_path() {
        let global = new_global();
        initialize(&global);
        let handle = global.add_source(Arc::new(ReferenceSource::new()));
        let mut spatializer = reflecting_spatializer(&global, handle);
        let input = tone(2);
        let mut output = vec![0.0; FRAMES * 2];

        assert_eq!(perform(&mut spatializer, &input, &mut output), ProcessStatus::Ok);
        assert!(!is_silent(&output));

        assert!(global.remove_source(handle));
        assert!(global.resolve_source(handle).is_none());
        for _ in 0..4 {
            assert_eq!(perform(&mut spatializer, &input, &mut output), ProcessStatus::Ok);
            assert!(!is_silent(&output));
        }
    }

    #[test]
    fn test_local_reflections_without_mixer() {
        let global = new_global();
        initialize(&global);
        let handle = global.add_source(Arc::new(ReferenceSource::new()));
        let input = tone(2);

        let mut dry = effect(EffectKind::Spatialize, &global);
        dry.set_int(param::SIMULATION_OUTPUTS, handle.raw()).unwrap();
        let mut dry_out = vec![0.0; FRAMES * 2];
        perform(&mut dry, &input, &mut dry_out);

        let mut wet = effect(EffectKind::Spatialize, &global);
        wet.set_int(param::SIMULATION_OUTPUTS, handle.raw()).unwrap();
        wet.set_bool(param::REFLECTIONS, true).unwrap();
        let mut wet_out = vec![0.0; FRAMES * 2];
        perform(&mut wet, &input, &mut wet_out);

        assert_ne!(dry_out, wet_out);
    }

    #[test]
    fn test_plugin_list() {
        let list = plugin_list();
        assert_eq!(list.len(), 3);
        assert_eq!(list[0].kind, EffectKind::Spatialize);
        assert_eq!(list[0].params.len(), 8);
        assert_eq!(list[1].params.len(), 1);
        assert_eq!(list[2].name, "PetalSonic Reverb");
        assert!(list.iter().all(|d| d.num_inputs == 1 && d.num_outputs == 1));
    }
}
