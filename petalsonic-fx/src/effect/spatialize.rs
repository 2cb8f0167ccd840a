//! Spatializer: renders one emitter's direct path and, optionally, its
//! reflections.

use super::params::{ParamDesc, ParamKind};
use super::{BlockContext, InitFlags, ProcessBlock, ProcessStatus};
use crate::backend::{BinauralParams, DecodeParams, DirectParams, SpatialBackend};
use crate::math::convert_vector;
use crate::registry::SourceHandle;

pub const DIRECT_BINAURAL: usize = 0;
pub const DISTANCE_ATTENUATION: usize = 1;
pub const AIR_ABSORPTION: usize = 2;
pub const REFLECTIONS: usize = 3;
pub const SIMULATION_OUTPUTS: usize = 4;
pub const DIRECT_MIX_LEVEL: usize = 5;
pub const REFLECTIONS_MIX_LEVEL: usize = 6;
pub const SOURCE_POSITION: usize = 7;

pub(super) const PARAMS: &[ParamDesc] = &[
    ParamDesc {
        name: "DirectBinaural",
        description: "Render the direct path with the HRTF instead of panning",
        kind: ParamKind::Bool { default: true },
    },
    ParamDesc {
        name: "DistanceAttenuation",
        description: "Apply simulated distance attenuation",
        kind: ParamKind::Bool { default: true },
    },
    ParamDesc {
        name: "AirAbsorption",
        description: "Apply simulated air absorption",
        kind: ParamKind::Bool { default: true },
    },
    ParamDesc {
        name: "Reflections",
        description: "Render simulated reflections",
        kind: ParamKind::Bool { default: false },
    },
    ParamDesc {
        name: "SimulationOutputs",
        description: "Handle of the simulation source driving this emitter",
        kind: ParamKind::Int {
            min: -1,
            max: i32::MAX,
            default: -1,
        },
    },
    ParamDesc {
        name: "DirectMixLevel",
        description: "Gain of the direct path",
        kind: ParamKind::Float {
            min: 0.0,
            max: 1.0,
            default: 1.0,
        },
    },
    ParamDesc {
        name: "ReflectionsMixLevel",
        description: "Gain of the reflections",
        kind: ParamKind::Float {
            min: 0.0,
            max: 10.0,
            default: 1.0,
        },
    },
    ParamDesc {
        name: "SourcePosition",
        description: "Position and orientation of the emitter",
        kind: ParamKind::Attributes3d,
    },
];

pub(super) fn process<B: SpatialBackend>(
    cx: BlockContext<'_, B>,
    block: &mut ProcessBlock<'_>,
) -> ProcessStatus {
    let BlockContext {
        context,
        global,
        state,
        params,
        listener,
        flags,
    } = cx;

    global.hrtf().adopt();
    global.reflection_mixer().adopt();
    let Some(hrtf) = global.hrtf().current() else {
        return ProcessStatus::Silence;
    };

    let (Some(buffers), Some(direct_effect), Some(binaural_effect), Some(panning_effect)) = (
        state.buffers.as_mut(),
        state.direct_effect.as_mut(),
        state.binaural_effect.as_mut(),
        state.panning_effect.as_mut(),
    ) else {
        return ProcessStatus::Silence;
    };

    // A handle that no longer resolves renders without simulation outputs.
    let source = global.resolve_source(SourceHandle::from_raw(params.int(SIMULATION_OUTPUTS)));

    buffers.input.deinterleave(block.input, block.input_channels);
    buffers.input.downmix(&mut buffers.mono);

    let direct_params = DirectParams {
        distance_attenuation: params.flag(DISTANCE_ATTENUATION),
        air_absorption: params.flag(AIR_ABSORPTION),
    };
    context.apply_direct_effect(
        direct_effect,
        source.as_deref(),
        &direct_params,
        &buffers.mono,
        &mut buffers.direct,
    );

    let emitter = convert_vector(params.attributes(SOURCE_POSITION).position);
    let direction = listener.direction_to(emitter);
    let binaural = params.flag(DIRECT_BINAURAL);
    if binaural {
        let binaural_params = BinauralParams {
            direction,
            hrtf: &*hrtf,
            spatial_blend: 1.0,
        };
        context.apply_binaural_effect(
            binaural_effect,
            &binaural_params,
            &buffers.direct,
            &mut buffers.output,
        );
    } else {
        context.apply_panning_effect(
            panning_effect,
            direction,
            &buffers.direct,
            &mut buffers.output,
        );
    }

    let direct_mix = params.float(DIRECT_MIX_LEVEL);
    buffers
        .output
        .ramp(state.prev_direct_mix.unwrap_or(direct_mix), direct_mix);
    state.prev_direct_mix = Some(direct_mix);

    if params.flag(REFLECTIONS) && flags.contains(InitFlags::REFLECTION) {
        if let (Some(source), Some(settings), Some(reflection_effect)) = (
            source.as_deref(),
            state.settings,
            state.reflection_effect.as_mut(),
        ) {
            context.apply_reflection_effect(
                reflection_effect,
                source,
                &settings,
                &buffers.mono,
                &mut buffers.reflections,
            );

            let reflections_mix = params.float(REFLECTIONS_MIX_LEVEL);
            buffers.reflections.ramp(
                state.prev_reflections_mix.unwrap_or(reflections_mix),
                reflections_mix,
            );
            state.prev_reflections_mix = Some(reflections_mix);

            match global.reflection_mixer().current() {
                Some(mixer) => {
                    mixer.accumulate(&buffers.reflections);
                }
                None => {
                    if let Some(decoder) = state.decoder.as_mut() {
                        let decode_params = DecodeParams {
                            order: settings.max_order,
                            hrtf: &*hrtf,
                            orientation: listener,
                            binaural,
                        };
                        context.apply_ambisonics_decoder(
                            decoder,
                            &decode_params,
                            &buffers.reflections,
                            &mut buffers.decoded,
                        );
                        buffers.output.mix(&buffers.decoded);
                    }
                }
            }
        }
    }

    buffers.output.interleave(block.output);
    ProcessStatus::Ok
}
