//! # dexjoy Binary
//!
//! Drives a DexArm from a joystick over its serial G-code link.
//!
//! # Usage
//!
//! ```bash
//! # Live joystick on a real arm (built with --features gamepad)
//! dexjoy /dev/ttyACM0
//!
//! # Explicit configuration file
//! dexjoy --config config/dexjoy.toml /dev/ttyACM0
//!
//! # Replay a scripted session against the simulated arm
//! dexjoy --simulate --script demos/square.toml -v
//!
//! # Print raw joystick readings (no arm needed)
//! dexjoy --joydbg
//!
//! # List serial ports
//! dexjoy --list-ports
//! ```

#![deny(warnings)]

use clap::Parser;
use dexjoy::{
    ControlLoop, InputError, InputMonitor, InputSource, LogDisplay, ScriptedInput, Session,
    SessionError,
};
use dexjoy_common::config::{ConfigError, ConfigLoader, DexjoyConfig};
use dexjoy_common::consts::DEFAULT_CONFIG_PATH;
use dexjoy_link::TransportRegistry;
use dexjoy_link::transport::{serial, simulation};
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

/// dexjoy - joystick teleoperation for the DexArm
#[derive(Parser, Debug)]
#[command(name = "dexjoy")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Joystick teleoperation for the DexArm robotic arm")]
#[command(long_about = None)]
struct Args {
    /// Serial port of the arm (overrides serial.port)
    #[arg(value_name = "PORT")]
    port: Option<String>,

    /// Serial port of the arm, as a flag
    #[arg(long = "port", value_name = "PORT", conflicts_with = "port")]
    port_flag: Option<String>,

    /// Path to configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Use the simulated arm instead of a serial port
    #[arg(short = 's', long)]
    simulate: bool,

    /// Replay joystick input from a TOML script
    #[arg(long, value_name = "FILE")]
    script: Option<PathBuf>,

    /// List available serial ports and exit
    #[arg(long)]
    list_ports: bool,

    /// Joystick debugging: log raw axes and buttons, never open the arm link
    #[arg(long)]
    joydbg: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = run() {
        error!("dexjoy failed: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(&args.config, args.config != Path::new(DEFAULT_CONFIG_PATH));

    setup_tracing(&args, config.as_ref().ok());
    let config = config?;

    info!("dexjoy v{} starting...", env!("CARGO_PKG_VERSION"));

    if args.list_ports {
        let ports = serial::available_ports()?;
        if ports.is_empty() {
            info!("No serial ports found");
        }
        for port in ports {
            println!("{port}");
        }
        return Ok(());
    }

    if args.joydbg {
        let input = open_input(&args, &config)?;
        let mut monitor = InputMonitor::new(input, config.control.period());
        let running = monitor.running_flag();
        ctrlc::set_handler(move || {
            info!("Received shutdown signal");
            running.store(false, Ordering::SeqCst);
        })?;
        monitor.run()?;
        return Ok(());
    }

    let transport_name = if args.simulate {
        info!("Simulation mode enabled");
        simulation::TRANSPORT_NAME
    } else {
        serial::TRANSPORT_NAME
    };
    let transport = TransportRegistry::with_builtin().create(transport_name)?;

    let port = args
        .port
        .clone()
        .or_else(|| args.port_flag.clone())
        .or_else(|| config.serial.port.clone())
        .or_else(|| args.simulate.then(|| "sim0".to_string()))
        .ok_or(SessionError::NoPort)?;

    let input = open_input(&args, &config)?;
    let mut control = ControlLoop::new(input, LogDisplay::new(), &config.control)?;
    let mut session = Session::new(transport, config)?;

    let running = control.running_flag();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        running.store(false, Ordering::SeqCst);
    })?;

    let stats = control.drive(&mut session, &port)?;
    info!(
        "Loop stats: {} ticks, {} commands, {} overruns, max tick {:?}",
        stats.ticks, stats.commands, stats.overruns, stats.max_tick
    );
    info!("dexjoy shutdown complete");
    Ok(())
}

/// Load the configuration file.
///
/// A missing file at the default location falls back to defaults.
fn load_config(path: &Path, explicit: bool) -> Result<DexjoyConfig, ConfigError> {
    match DexjoyConfig::load(path) {
        Err(ConfigError::FileNotFound) if !explicit => Ok(DexjoyConfig::default()),
        other => other,
    }
}

/// Pick the input source: a script if given, otherwise the live gamepad.
fn open_input(args: &Args, config: &DexjoyConfig) -> Result<Box<dyn InputSource>, InputError> {
    if let Some(script) = &args.script {
        return Ok(Box::new(ScriptedInput::load(script)?));
    }
    open_gamepad(&config.control.device_name_filter)
}

#[cfg(feature = "gamepad")]
fn open_gamepad(name_filter: &str) -> Result<Box<dyn InputSource>, InputError> {
    Ok(Box::new(dexjoy::input::gamepad::GamepadInput::new(name_filter)?))
}

#[cfg(not(feature = "gamepad"))]
fn open_gamepad(_name_filter: &str) -> Result<Box<dyn InputSource>, InputError> {
    tracing::warn!("Built without the gamepad feature");
    Err(InputError::Unavailable(
        "no joystick backend; pass --script FILE or rebuild with --features gamepad".to_string(),
    ))
}

/// Setup tracing subscriber based on CLI arguments and configuration.
fn setup_tracing(args: &Args, config: Option<&DexjoyConfig>) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        config.map_or(Level::INFO, |c| c.shared.log_level.into())
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
