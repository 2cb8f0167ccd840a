//! Mixer return: decodes the shared reflection bus and adds it to the signal
//! passing through.

use super::params::{ParamDesc, ParamKind};
use super::{BlockContext, ProcessBlock, ProcessStatus};
use crate::backend::{DecodeParams, SpatialBackend};

pub const BINAURAL: usize = 0;

pub(super) const PARAMS: &[ParamDesc] = &[ParamDesc {
    name: "Binaural",
    description: "Decode reflections with the HRTF",
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
    let Some(hrtf) = global.hrtf().current() else {
        return ProcessStatus::Silence;
    };

    let (Some(buffers), Some(decoder), Some(mixer), Some(settings)) = (
        state.buffers.as_mut(),
        state.decoder.as_mut(),
        state.mixer.as_ref(),
        state.settings,
    ) else {
        return ProcessStatus::Silence;
    };

    mixer.drain_into(&mut buffers.reflections);

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

    buffers.input.deinterleave(block.input, block.input_channels);
    buffers.output.mix(&buffers.input);
    buffers.output.interleave(block.output);

    ProcessStatus::Ok
}
