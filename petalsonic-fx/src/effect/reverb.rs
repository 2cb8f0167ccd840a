//! Reverb: renders the reflections of the designated reverb source.

use super::params::{ParamDesc, ParamKind};
use super::{BlockContext, ProcessBlock, ProcessStatus};
use crate::backend::{DecodeParams, SpatialBackend};

pub const BINAURAL: usize = 0;

pub(super) const PARAMS: &[ParamDesc] = &[ParamDesc {
    name: "Binaural",
    description: "Decode reverb with the HRTF",
    kind: ParamKind::Bool { default: false },
}];

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
        ..
    } = cx;

    global.hrtf().adopt();
    global.reverb_source().adopt();
    global.reflection_mixer().adopt();

    let Some(hrtf) = global.hrtf().current() else {
        return ProcessStatus::Silence;
    };
    let Some(source) = global.reverb_source().current() else {
        return ProcessStatus::Silence;
    };

    let (Some(buffers), Some(reflection_effect), Some(decoder), Some(settings)) = (
        state.buffers.as_mut(),
        state.reflection_effect.as_mut(),
        state.decoder.as_mut(),
        state.settings,
    ) else {
        return ProcessStatus::Silence;
    };

    buffers.input.deinterleave(block.input, block.input_channels);
    buffers.input.downmix(&mut buffers.mono);

    context.apply_reflection_effect(
        reflection_effect,
        &source,
        &settings,
        &buffers.mono,
        &mut buffers.reflections,
    );

    if let Some(mixer) = global.reflection_mixer().current() {
        // The mixer return renders it; this block stays silent.
        mixer.accumulate(&buffers.reflections);
        return ProcessStatus::Ok;
    }

    let decode_params = DecodeParams {
        order: settings.max_order,
        hrtf: &*hrtf,
        orientation: listener,
        binaural: params.flag(BINAURAL),
    };
    context.apply_ambisonics_decoder(
        decoder,
        &decode_params,
        &buffers.reflections,
        &mut buffers.output,
    );

    buffers.output.interleave(block.output);
    ProcessStatus::Ok
}
