//! padchop - headless pad player
//!
//! Loads an audio file, chops it into pads and plays them through the
//! default (or configured) output device. Commands are read from stdin one
//! per line; `help` lists them.
//!
//! ## Command line
//!
//! ```text
//! padchop [--config <path>] <file>
//! padchop --list-devices
//! ```

mod commands;
mod config;
mod session;

use std::path::PathBuf;
use std::sync::mpsc::{self, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use padchop_core::analysis::{AnalysisWorker, NullAnalyzer};
use padchop_core::audio::{list_output_devices, open_output};
use padchop_core::audio_file::load_source;
use padchop_core::control::{engine_pair, Controller, Notice};

use config::PlayerConfig;
use session::{Flow, Session};

/// Control loop period
const POLL_INTERVAL: Duration = Duration::from_millis(5);
/// How long to wait for the audio thread to accept the engine
const READY_TIMEOUT: Duration = Duration::from_secs(3);

struct Args {
    config_path: PathBuf,
    file: Option<PathBuf>,
    list_devices: bool,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        config_path: config::default_config_path(),
        file: None,
        list_devices: false,
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let path = iter.next().context("--config needs a path")?;
                args.config_path = PathBuf::from(path);
            }
            "--list-devices" => args.list_devices = true,
            flag if flag.starts_with("--") => bail!("unknown flag {}", flag),
            _ => args.file = Some(PathBuf::from(arg)),
        }
    }
    Ok(args)
}

fn main() -> Result<()> {
    // Set RUST_LOG=debug for verbose output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = parse_args()?;

    if args.list_devices {
        for device in list_output_devices()? {
            println!("{}  rates: {:?}", device, device.sample_rates);
        }
        return Ok(());
    }

    let Some(file) = args.file else {
        bail!("usage: padchop [--config <path>] <file>");
    };

    let config: PlayerConfig = config::load_config(&args.config_path);
    log::info!("padchop starting up");

    let output = open_output(&config.audio).context("Failed to open audio output")?;
    let (mut controller, renderer) = engine_pair(config.engine.clone(), output.sample_rate())?;
    let audio = output.start(renderer)?;
    log::info!(
        "Output running at {} Hz (~{:.1}ms buffer)",
        audio.sample_rate(),
        audio.latency_ms()
    );

    controller.init_default()?;
    wait_until_ready(&mut controller)?;

    let source = load_source(&file, controller.sample_rate())
        .with_context(|| format!("Failed to load {}", file.display()))?;

    let analysis = match AnalysisWorker::spawn(Box::new(NullAnalyzer)) {
        Ok(worker) => Some(worker),
        Err(e) => {
            log::warn!("Analysis worker unavailable: {}", e);
            None
        }
    };

    let mut session = Session::new(controller, config.pad_count, config.default_pad, analysis);
    session.load(source)?;
    println!("type 'help' for commands");

    let lines = spawn_stdin_reader()?;
    loop {
        match lines.try_recv() {
            Ok(line) => match commands::parse(&line) {
                Ok(Some(command)) => {
                    if session.handle(command) == Flow::Quit {
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => println!("{}", e),
            },
            Err(TryRecvError::Empty) => {}
            // stdin closed
            Err(TryRecvError::Disconnected) => break,
        }
        session.poll();
        thread::sleep(POLL_INTERVAL);
    }

    let stats = session.controller().stats();
    log::info!("Shutting down ({:?})", stats);
    Ok(())
}

/// Tick the controller until the render side reports back
fn wait_until_ready(controller: &mut Controller) -> Result<()> {
    let deadline = Instant::now() + READY_TIMEOUT;
    while Instant::now() < deadline {
        for notice in controller.tick() {
            match notice {
                Notice::Ready => return Ok(()),
                Notice::InitFailed(reason) => bail!("Render engine rejected the stretcher: {}", reason),
                _ => {}
            }
        }
        thread::sleep(POLL_INTERVAL);
    }
    bail!("Audio thread did not start within {:?}", READY_TIMEOUT)
}

/// Forward stdin lines to the control loop without blocking it
fn spawn_stdin_reader() -> Result<mpsc::Receiver<String>> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("padchop-stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        })
        .context("Failed to spawn stdin reader")?;
    Ok(rx)
}
