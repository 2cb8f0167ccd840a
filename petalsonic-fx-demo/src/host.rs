//! Simulated audio host: a control thread publishing shared state and the
//! main thread standing in for the host's real-time mixer.

use crate::cli::DemoOptions;
use anyhow::{Result, anyhow};
use crossbeam_channel::{Receiver, Sender};
use glam::Vec3;
use petalsonic_fx::backend::{DirectOutputs, ReflectionOutputs, SimulationOutputs};
use petalsonic_fx::effect::param;
use petalsonic_fx::{
    Attributes3d, AudioSettings, DspHost, EffectKind, FixedEnvironment, GlobalState,
    HrtfSettings, PluginDesc, ProcessBlock, ProcessOperation, ReferenceBackend, ReferenceSource,
    SimulationSettings, SourceHandle, SpatialBackend, SpatialEffect, plugin_list, version,
};
use std::sync::Arc;
use std::thread;

const NUM_CHANNELS: usize = 2;
const LOG_INTERVAL: usize = 8;

/// Requests sent from the audio side to the control thread.
#[derive(Debug)]
enum ControlCommand {
    Initialize,
    SetSimulationSettings(SimulationSettings),
    AddSource { position: Vec3 },
    MoveSource { handle: SourceHandle, position: Vec3 },
    SetReverbSource,
    RemoveSource(SourceHandle),
    Shutdown,
}

/// Replies from the control thread.
#[derive(Debug)]
enum ControlEvent {
    SourceAdded(SourceHandle),
}

struct SimulatedHost {
    sample_rate: u32,
    block_size: u32,
    listener: Attributes3d,
}

impl DspHost for SimulatedHost {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn block_size(&self) -> u32 {
        self.block_size
    }

    fn listener_attributes(&self) -> Attributes3d {
        self.listener
    }
}

/// Stand-in for the simulation engine: outputs fall off with distance.
fn simulate(position: Vec3) -> SimulationOutputs {
    let distance = position.length().max(1.0);
    SimulationOutputs {
        direct: DirectOutputs {
            distance_attenuation: 1.0 / distance,
            air_absorption: [1.0, 0.97_f32.powf(distance), 0.9_f32.powf(distance)],
        },
        reflections: ReflectionOutputs {
            gain: 0.4,
            decay: 0.6,
        },
    }
}

fn control_loop(
    global: Arc<GlobalState<ReferenceBackend>>,
    audio: AudioSettings,
    commands: Receiver<ControlCommand>,
    events: Sender<ControlEvent>,
) -> Result<()> {
    for command in commands {
        log::debug!("Control command: {:?}", command);
        match command {
            ControlCommand::Initialize => {
                let context = Arc::new(ReferenceBackend::create_default(&audio)?);
                global.initialize(context.clone())?;
                let hrtf = context.create_hrtf(&audio, &HrtfSettings::default())?;
                global.set_hrtf(Arc::new(hrtf));
            }
            ControlCommand::SetSimulationSettings(settings) => {
                global.set_simulation_settings(settings);
            }
            ControlCommand::AddSource { position } => {
                let source = Arc::new(ReferenceSource::with_outputs(simulate(position)));
                let handle = global.add_source(source);
                log::info!("Source added at {:?} with handle {}", position, handle);
                events
                    .send(ControlEvent::SourceAdded(handle))
                    .map_err(|e| anyhow!("Failed to send control event: {}", e))?;
            }
            ControlCommand::MoveSource { handle, position } => {
                if let Some(source) = global.resolve_source(handle) {
                    source.set_outputs(simulate(position));
                }
            }
            ControlCommand::SetReverbSource => {
                let outputs = SimulationOutputs {
                    reflections: ReflectionOutputs {
                        gain: 0.3,
                        decay: 0.8,
                    },
                    ..Default::default()
                };
                global.set_reverb_source(Arc::new(ReferenceSource::with_outputs(outputs)));
            }
            ControlCommand::RemoveSource(handle) => {
                global.remove_source(handle);
            }
            ControlCommand::Shutdown => break,
        }
    }

    global.terminate();
    log::info!("Control thread finished");
    Ok(())
}

fn rms(block: &[f32]) -> f32 {
    if block.is_empty() {
        return 0.0;
    }
    (block.iter().map(|s| s * s).sum::<f32>() / block.len() as f32).sqrt()
}

fn tone(frames: usize, offset: usize, sample_rate: u32, output: &mut [f32]) {
    let step = 440.0 * std::f32::consts::TAU / sample_rate as f32;
    for frame in 0..frames {
        let sample = ((offset + frame) as f32 * step).sin() * 0.25;
        for channel in 0..NUM_CHANNELS {
            output[frame * NUM_CHANNELS + channel] = sample;
        }
    }
}

pub fn run(options: &DemoOptions) -> Result<()> {
    log::info!("PetalSonic FX {} demo host: {:?}", version(), options);
    for descriptor in plugin_list() {
        log::info!(
            "Effect '{}' with {} parameters",
            descriptor.name,
            descriptor.params.len()
        );
    }

    let audio = AudioSettings::new(options.sample_rate, options.frame_size);
    let frames = audio.frame_size();
    let global = Arc::new(GlobalState::<ReferenceBackend>::new(PluginDesc::default()));

    let (command_tx, command_rx) = crossbeam_channel::unbounded();
    let (event_tx, event_rx) = crossbeam_channel::unbounded();
    let control = {
        let global = global.clone();
        thread::Builder::new()
            .name("petalsonic-fx-control".into())
            .spawn(move || control_loop(global, audio, command_rx, event_tx))?
    };

    let host = SimulatedHost {
        sample_rate: options.sample_rate,
        block_size: options.frame_size,
        listener: Attributes3d::IDENTITY,
    };
    let environment = Arc::new(FixedEnvironment(options.editor));
    let mut spatializer = SpatialEffect::create(
        EffectKind::Spatialize,
        global.clone(),
        environment.clone(),
        &host,
    );
    let mut reverb =
        SpatialEffect::create(EffectKind::Reverb, global.clone(), environment.clone(), &host);
    let mut mixer_return =
        SpatialEffect::create(EffectKind::MixerReturn, global.clone(), environment, &host);

    let send = |command: ControlCommand| {
        command_tx
            .send(command)
            .map_err(|e| anyhow!("Control thread is gone: {}", e))
    };

    let mut input = vec![0.0; frames * NUM_CHANNELS];
    let mut spatialized = vec![0.0; frames * NUM_CHANNELS];
    let mut reverberated = vec![0.0; frames * NUM_CHANNELS];
    let mut output = vec![0.0; frames * NUM_CHANNELS];
    let mut handle = None;

    for block in 0..options.blocks {
        match block {
            2 if !options.editor => send(ControlCommand::Initialize)?,
            4 => send(ControlCommand::SetSimulationSettings(
                SimulationSettings::default().max_order(1),
            ))?,
            6 => send(ControlCommand::AddSource {
                position: Vec3::new(3.0, 0.0, -2.0),
            })?,
            8 => send(ControlCommand::SetReverbSource)?,
            _ => {}
        }

        for event in event_rx.try_iter() {
            match event {
                ControlEvent::SourceAdded(added) => {
                    spatializer.set_int(param::SIMULATION_OUTPUTS, added.raw())?;
                    spatializer.set_bool(param::REFLECTIONS, true)?;
                    handle = Some(added);
                }
            }
        }

        // The emitter circles the listener.
        let angle = block as f32 * 0.1;
        let position = Vec3::new(3.0 * angle.cos(), 0.0, 3.0 * angle.sin());
        spatializer.set_attributes(
            param::SOURCE_POSITION,
            Attributes3d::from_position(position),
        )?;
        if let Some(handle) = handle {
            send(ControlCommand::MoveSource { handle, position })?;
        }

        tone(frames, block * frames, options.sample_rate, &mut input);

        let spatial_status = spatializer.process(
            &host,
            ProcessOperation::Perform,
            ProcessBlock::new(&input, NUM_CHANNELS, &mut spatialized, NUM_CHANNELS),
        );
        let reverb_status = reverb.process(
            &host,
            ProcessOperation::Perform,
            ProcessBlock::new(&input, NUM_CHANNELS, &mut reverberated, NUM_CHANNELS),
        );
        // The mixer return sits on the bus the spatializer feeds.
        let return_status = mixer_return.process(
            &host,
            ProcessOperation::Perform,
            ProcessBlock::new(&spatialized, NUM_CHANNELS, &mut output, NUM_CHANNELS),
        );

        if block % LOG_INTERVAL == 0 || block + 1 == options.blocks {
            log::info!(
                "block {:>4}: spatialize {:?} [{:03b}] rms {:.4} | reverb {:?} [{:03b}] rms {:.4} | return {:?} [{:03b}] rms {:.4}",
                block,
                spatial_status,
                spatializer.last_init_flags().bits(),
                rms(&spatialized),
                reverb_status,
                reverb.last_init_flags().bits(),
                rms(&reverberated),
                return_status,
                mixer_return.last_init_flags().bits(),
                rms(&output),
            );
        }
    }

    if let Some(handle) = handle {
        send(ControlCommand::RemoveSource(handle))?;
    }
    send(ControlCommand::Shutdown)?;

    spatializer.release();
    reverb.release();
    mixer_return.release();

    control
        .join()
        .map_err(|_| anyhow!("Control thread panicked"))??;
    log::info!("Demo finished");
    Ok(())
}
