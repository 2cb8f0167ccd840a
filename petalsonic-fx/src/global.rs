//! Process-wide state shared by every effect instance
//!
//! [`GlobalState`] owns the engine context, the source registry and the
//! hand-off channels. Its methods are the control API used by the embedding
//! application: all of them run on the control thread except
//! [`GlobalState::resolve_source`] and the channel accessors, which effects use
//! from the audio thread.

use crate::backend::SpatialBackend;
use crate::config::{AudioSettings, PluginDesc, SimulationSettings};
use crate::error::{PetalSonicFxError, Result};
use crate::handoff::{HandoffChannel, PublishOutcome, SettingsCell};
use crate::mixer::ReflectionMixer;
use crate::registry::{SourceHandle, SourceRegistry};
use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use std::sync::Arc;

pub struct GlobalState<B: SpatialBackend> {
    desc: PluginDesc,
    context: ArcSwapOption<B>,
    registry: ArcSwapOption<SourceRegistry<B::Source>>,
    hrtf: HandoffChannel<B::Hrtf>,
    simulation_settings: SettingsCell,
    reverb_source: HandoffChannel<B::Source>,
    reflection_mixer: HandoffChannel<ReflectionMixer>,
    // Serializes initialize, terminate and self-provisioning.
    lifecycle: Mutex<()>,
}

impl<B: SpatialBackend> GlobalState<B> {
    pub fn new(desc: PluginDesc) -> Self {
        Self {
            desc,
            context: ArcSwapOption::empty(),
            registry: ArcSwapOption::empty(),
            hrtf: HandoffChannel::new("HRTF"),
            simulation_settings: SettingsCell::new(),
            reverb_source: HandoffChannel::new("Reverb source"),
            reflection_mixer: HandoffChannel::new("Reflection mixer"),
            lifecycle: Mutex::new(()),
        }
    }

    pub fn desc(&self) -> &PluginDesc {
        &self.desc
    }

    /// Retains `context` as the shared engine context and creates the source
    /// registry.
    ///
    /// Initializing twice without [`GlobalState::terminate`] is a contract
    /// violation: it panics in debug builds and returns
    /// [`PetalSonicFxError::AlreadyInitialized`] otherwise.
    pub fn initialize(&self, context: Arc<B>) -> Result<()> {
        let _lifecycle = self.lifecycle.lock();
        if self.context.load().is_some() {
            debug_assert!(false, "engine context initialized twice");
            return Err(PetalSonicFxError::AlreadyInitialized);
        }
        self.install(context);
        Ok(())
    }

    fn install(&self, context: Arc<B>) {
        self.context.store(Some(context));
        self.registry.store(Some(Arc::new(SourceRegistry::new())));
        log::info!("Engine context initialized");
    }

    /// Creates a default engine context and HRTF if none exists yet.
    ///
    /// Used by effects running inside the authoring tool. Never waits: if
    /// another thread holds the lifecycle lock this returns `Ok(false)` and the
    /// caller tries again on its next block.
    pub fn provision_default(&self, audio: &AudioSettings) -> Result<bool> {
        let Some(_lifecycle) = self.lifecycle.try_lock() else {
            return Ok(false);
        };
        if self.context.load().is_some() {
            return Ok(false);
        }

        let context = Arc::new(B::create_default(audio)?);
        let hrtf = Arc::new(context.create_hrtf(audio, &self.desc.default_hrtf)?);
        self.install(context);
        self.hrtf.try_publish(hrtf);

        log::info!(
            "Provisioned default engine context and HRTF (sampling_rate: {} Hz, frame_size: {})",
            audio.sampling_rate,
            audio.frame_size
        );
        Ok(true)
    }

    /// Releases the shared engine context and everything published through
    /// the hand-off channels.
    ///
    /// Effects keep whatever they already retained; they go silent on their
    /// next block because the context is gone.
    pub fn terminate(&self) {
        let _lifecycle = self.lifecycle.lock();
        self.reflection_mixer.clear();
        self.reverb_source.clear();
        self.simulation_settings.invalidate();
        self.hrtf.clear();
        self.context.store(None);
        self.registry.store(None);
        log::info!("Engine context terminated");
    }

    pub fn is_initialized(&self) -> bool {
        self.context.load().is_some()
    }

    pub fn context(&self) -> Option<Arc<B>> {
        self.context.load_full()
    }

    /// Publishes the HRTF used for binaural rendering.
    pub fn set_hrtf(&self, hrtf: Arc<B::Hrtf>) -> PublishOutcome {
        self.hrtf.publish(hrtf)
    }

    pub fn set_simulation_settings(&self, settings: SimulationSettings) {
        self.simulation_settings.publish(settings);
        log::debug!("Simulation settings published: {:?}", settings);
    }

    /// Valid simulation settings, if any have been published.
    pub fn simulation_settings(&self) -> Option<SimulationSettings> {
        self.simulation_settings.get()
    }

    /// Publishes the source whose reflections drive the reverb effect.
    pub fn set_reverb_source(&self, source: Arc<B::Source>) -> PublishOutcome {
        self.reverb_source.publish(source)
    }

    /// Registers a simulation source and returns its handle, or
    /// [`SourceHandle::INVALID`] before initialization.
    pub fn add_source(&self, source: Arc<B::Source>) -> SourceHandle {
        match self.registry.load().as_ref() {
            Some(registry) => registry.register(source),
            None => {
                log::warn!("Cannot add source: engine context not initialized");
                SourceHandle::INVALID
            }
        }
    }

    /// Unregisters a simulation source. Returns false if nothing was removed.
    pub fn remove_source(&self, handle: SourceHandle) -> bool {
        match self.registry.load().as_ref() {
            Some(registry) => registry.unregister(handle),
            None => false,
        }
    }

    /// Looks up a registered source. Unknown handles resolve to `None`.
    pub fn resolve_source(&self, handle: SourceHandle) -> Option<Arc<B::Source>> {
        self.registry
            .load()
            .as_ref()
            .and_then(|registry| registry.resolve(handle))
    }

    pub fn hrtf(&self) -> &HandoffChannel<B::Hrtf> {
        &self.hrtf
    }

    pub fn reverb_source(&self) -> &HandoffChannel<B::Source> {
        &self.reverb_source
    }

    pub fn reflection_mixer(&self) -> &HandoffChannel<ReflectionMixer> {
        &self.reflection_mixer
    }
}

/// Library version, as reported to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

pub fn version() -> Version {
    Version {
        major: env!("CARGO_PKG_VERSION_MAJOR").parse().unwrap_or(0),
        minor: env!("CARGO_PKG_VERSION_MINOR").parse().unwrap_or(0),
        patch: env!("CARGO_PKG_VERSION_PATCH").parse().unwrap_or(0),
    }
}
