//! # PetalSonic FX
//!
//! Spatial audio effect plugins for a third-party audio host: a spatializer,
//! a reverb and a mixer return that decodes the reflections the other two
//! produce.
//!
//! The host runs each effect on its real-time audio thread while the embedding
//! application updates shared engine state (HRTF, simulation settings, reverb
//! source, simulation sources) from a control thread. The audio thread never
//! waits on the control thread: every shared object crosses over through a
//! [`HandoffChannel`] and each effect builds its own engine objects lazily, one
//! block at a time, emitting silence until it is ready.
//!
//! ## Quick Start
//!
//! ```no_run
//! use petalsonic_fx::*;
//! use std::sync::Arc;
//!
//! struct Host;
//!
//! impl DspHost for Host {
//!     fn sample_rate(&self) -> u32 { 48000 }
//!     fn block_size(&self) -> u32 { 512 }
//!     fn listener_attributes(&self) -> Attributes3d { Attributes3d::IDENTITY }
//! }
//!
//! // Control thread: shared state and engine context
//! let global = Arc::new(GlobalState::<ReferenceBackend>::new(PluginDesc::default()));
//! let audio = AudioSettings::new(48000, 512);
//! let context = Arc::new(ReferenceBackend::create_default(&audio)?);
//! global.initialize(context.clone())?;
//! global.set_hrtf(Arc::new(context.create_hrtf(&audio, &HrtfSettings::default())?));
//! global.set_simulation_settings(SimulationSettings::default());
//!
//! // Audio thread: one effect instance per host plugin instance
//! let mut effect = SpatialEffect::create(
//!     EffectKind::Spatialize,
//!     global.clone(),
//!     Arc::new(FixedEnvironment(false)),
//!     &Host,
//! );
//! let input = vec![0.0f32; 512 * 2];
//! let mut output = vec![0.0f32; 512 * 2];
//! let status = effect.process(
//!     &Host,
//!     ProcessOperation::Perform,
//!     ProcessBlock::new(&input, 2, &mut output, 2),
//! );
//! assert_eq!(status, ProcessStatus::Ok);
//! # Ok::<(), PetalSonicFxError>(())
//! ```
//!
//! ## Key Components
//!
//! - **[`GlobalState`]**: control API; owns the engine context, the source registry and the hand-off channels
//! - **[`SpatialEffect`]**: one effect instance, parameterized by [`EffectKind`]
//! - **[`HandoffChannel`]**: depth-1 publish/adopt slot between control and audio threads
//! - **[`SourceRegistry`]**: integer handles for simulation sources
//! - **[`SpatialBackend`]**: entry points into the spatial audio engine
//!
//! ## Features
//!
//! - `steam-audio`: Steam Audio backend through `audionimbus`
//! - `auto-install`: downloads the Steam Audio library at build time

pub mod backend;
pub mod buffer;
pub mod config;
pub mod effect;
pub mod environment;
pub mod error;
pub mod global;
pub mod handoff;
pub mod layout;
pub mod math;
pub mod mixer;
pub mod registry;

pub use backend::{ReferenceBackend, ReferenceSource, SpatialBackend};
#[cfg(feature = "steam-audio")]
pub use backend::{SteamAudioBackend, SteamSource};
pub use config::{AudioSettings, HrtfSettings, PluginDesc, SimulationSettings};
pub use effect::{
    DspHost, EffectDescriptor, EffectKind, InitFlags, ParamValue, ProcessBlock, ProcessOperation,
    ProcessStatus, SpatialEffect, plugin_list,
};
pub use environment::{EnvironmentDetector, ExecutableNameDetector, FixedEnvironment};
pub use error::{PetalSonicFxError, Result};
pub use global::{GlobalState, Version, version};
pub use handoff::{HandoffChannel, PublishOutcome};
pub use math::{Attributes3d, Vec3};
pub use mixer::ReflectionMixer;
pub use registry::{SourceHandle, SourceRegistry};
