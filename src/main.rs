//! hdmi-mirror - Dry-run entry point
//!
//! Drives the mirroring core through a simulated hotplug session: cable
//! connect, a run of vsync frames with a rotation and an HDMI preemption in
//! the middle, then disconnect. Hardware collaborators only log.

mod args;
mod dry_run;

use args::Args;
use clap::Parser;
use crossbeam::channel::{self, Receiver, Sender};
use dry_run::{DryRunOutput, LogBlitter};
use hdmi_mirror::{
    Config, ControlBlockOrientation, ManualOrientation, Mirror, MirrorPhase, OrientationProvider,
    Rotation, ScreenGeometry,
};
use log::{debug, error, info, warn};
use std::env;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Events delivered to the single consumer that owns the mirror
#[derive(Debug, Clone, Copy)]
enum Event {
    CableConnect,
    CableDisconnect,
    /// Another client claims the HDMI path
    ExternalEnable,
    /// The HDMI path is released again
    ExternalDisable,
    Rotate(Rotation),
    Vsync(u32),
}

const FRAME_INTERVAL: Duration = Duration::from_millis(16);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args = Args::parse();
    let config_result = args.load_config();

    // Initialize logging
    let log_level = if args.verbose {
        "debug".to_string()
    } else {
        config_result
            .as_ref()
            .map(|cfg| cfg.logging.level.clone())
            .unwrap_or_else(|_| "info".to_string())
    };
    env_logger::Builder::new()
        .parse_filters(&env::var("HDMI_MIRROR_LOG").unwrap_or(log_level))
        .init();

    info!("hdmi-mirror v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config = match config_result {
        Ok(cfg) => {
            info!("Loaded configuration from {:?}", args.config);
            cfg
        }
        Err(e) => {
            warn!("Failed to load config: {}, using defaults", e);
            Config::default()
        }
    };

    if let Some(ref path) = args.control_block {
        config.orientation.control_block = Some(path.clone());
    }

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(e.into());
    }

    let manual = Arc::new(ManualOrientation::new(Rotation::Deg0));
    let orientation: Arc<dyn OrientationProvider> = match config.orientation.control_block {
        Some(ref path) => {
            info!("Reading orientation from {}", path.display());
            Arc::new(ControlBlockOrientation::new(path))
        }
        None => manual.clone(),
    };

    let output = Arc::new(DryRunOutput::new(&config.output));
    let blitter = Arc::new(LogBlitter::default());
    let mirror = Mirror::new(config.mirror, orientation, output.clone(), blitter.clone());

    let (tx, rx) = channel::unbounded();
    let frames = args.frames;
    let connected = config.output.connected;
    let producer = thread::spawn(move || produce_events(&tx, frames, connected));

    let source = config.source.geometry();
    info!("Mirroring {} onto HDMI", source);
    run(&mirror, &output, &manual, source, &rx, args.json)?;

    if producer.join().is_err() {
        error!("Event producer panicked");
    }

    let stats = mirror.stats();
    info!(
        "Done: {} frames, {} recomputes ({} failed), {} blits submitted",
        stats.frames,
        stats.recomputes,
        stats.failed_recomputes,
        blitter.submitted()
    );

    Ok(())
}

/// Simulated hotplug and vsync source
fn produce_events(tx: &Sender<Event>, frames: u32, connected: bool) {
    let send = |event| {
        if tx.send(event).is_err() {
            debug!("Event consumer gone, dropping {:?}", event);
        }
    };

    if connected {
        send(Event::CableConnect);
    }

    let rotate_at = frames / 3;
    let preempt_at = frames / 2;
    let resume_at = preempt_at + frames / 10;

    for frame in 0..frames {
        if frame == rotate_at {
            send(Event::Rotate(Rotation::Deg90));
        }
        if frame == preempt_at {
            send(Event::ExternalEnable);
        }
        if frame == resume_at {
            send(Event::ExternalDisable);
        }
        send(Event::Vsync(frame));
        thread::sleep(FRAME_INTERVAL);
    }

    if connected {
        send(Event::CableDisconnect);
    }
}

/// Single consumer: the only place the mirror is driven from
fn run(
    mirror: &Mirror,
    output: &DryRunOutput,
    manual: &ManualOrientation,
    mut source: ScreenGeometry,
    rx: &Receiver<Event>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let page_flip = source.yres_virtual >= source.yres.saturating_mul(2);

    for event in rx.iter() {
        match event {
            Event::CableConnect => {
                output.set_connected(true);
                match mirror.on_cable_connect() {
                    Ok(mode) => info!("HDMI mode {}", mode),
                    Err(e) => warn!("Mirroring started without a mode: {}", e),
                }
            }
            Event::CableDisconnect => {
                output.set_connected(false);
                mirror.on_cable_disconnect();
            }
            Event::ExternalEnable => {
                mirror.on_external_enable_request();
            }
            Event::ExternalDisable => match mirror.on_external_disable_request() {
                Ok(Some(mode)) => info!("Resumed at {}", mode),
                Ok(None) => debug!("Nothing to resume"),
                Err(e) => warn!("Resumed without a mode: {}", e),
            },
            Event::Rotate(rotation) => {
                info!("Primary display rotated to {}", rotation);
                manual.set(rotation);
            }
            Event::Vsync(frame) => {
                if mirror.phase() != MirrorPhase::Mirroring || !output.is_running() {
                    continue;
                }
                let Some(destination) = output.destination() else {
                    debug!("No HDMI mode set, skipping frame {}", frame);
                    continue;
                };

                source.yoffset = if page_flip && frame % 2 == 1 { source.yres } else { 0 };

                let recomputes = mirror.stats().recomputes;
                match mirror.report_frame(&source, &destination) {
                    Ok(descriptor) => {
                        if json && mirror.stats().recomputes != recomputes {
                            println!("{}", serde_json::to_string(&descriptor)?);
                        }
                    }
                    Err(e) => warn!("Frame {} not mirrored: {}", frame, e),
                }
            }
        }
    }

    Ok(())
}
