//! pumpctl: temperature-gated fermentation pump supervisor.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  LinuxPlatform       LogEventSink   YamlConfigFile  ProcfsProbe│
//! │  (relay + DS18B20)   (EventSink)    (ConfigPort)    (probe)    │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │          CycleController (pure logic)                  │    │
//! │  │  FSM · Safety evaluator                                │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  SingletonGuard · StatePublisher · ShutdownHandler · signals   │
//! └────────────────────────────────────────────────────────────────┘
//! ```

use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::{error, info, warn};
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use serde::Serialize;

use pumpctl::adapters::config_file::{DEFAULT_CONFIG_PATH, YamlConfigFile};
use pumpctl::adapters::hardware::LinuxPlatform;
use pumpctl::adapters::log_sink::LogEventSink;
use pumpctl::adapters::logging;
use pumpctl::adapters::procfs::ProcfsProbe;
use pumpctl::app::ports::{ActuatorPort, ConfigPort, TemperaturePort};
use pumpctl::app::service::CycleController;
use pumpctl::config::SystemConfig;
use pumpctl::drivers::gpio::SYSFS_GPIO_ROOT;
use pumpctl::error::LockError;
use pumpctl::runtime::{
    DEFAULT_RUNTIME_DIR, LockStatus, RuntimePaths, SingletonGuard, Stage, StatePublisher, status,
};
use pumpctl::sensors::Ds18b20Sensor;
use pumpctl::sensors::ds18b20::W1_DEVICES_DIR;
use pumpctl::shutdown::{self, ActuatorLine, ShutdownHandler, ShutdownReason};
use pumpctl::signals;

#[derive(Parser)]
#[command(name = "pumpctl", version, about = "Fermentation pump supervisor")]
struct Cli {
    #[command(flatten)]
    locations: Locations,
    #[command(subcommand)]
    command: Option<Command>,
}

/// Where the controller keeps its records and finds its hardware.
#[derive(Args)]
struct Locations {
    /// Directory holding the lock and status files
    #[arg(
        long,
        global = true,
        env = "PUMPCTL_RUNTIME_DIR",
        default_value = DEFAULT_RUNTIME_DIR
    )]
    runtime_dir: PathBuf,
    /// sysfs GPIO class directory
    #[arg(
        long,
        global = true,
        env = "PUMPCTL_GPIO_ROOT",
        default_value = SYSFS_GPIO_ROOT,
        hide = true
    )]
    gpio_root: PathBuf,
    /// 1-Wire bus devices directory
    #[arg(
        long,
        global = true,
        env = "PUMPCTL_W1_ROOT",
        default_value = W1_DEVICES_DIR,
        hide = true
    )]
    w1_root: PathBuf,
}

impl Locations {
    fn runtime_paths(&self) -> RuntimePaths {
        RuntimePaths::in_dir(&self.runtime_dir)
    }

    fn platform(&self) -> LinuxPlatform {
        LinuxPlatform::with_roots(self.gpio_root.clone(), self.w1_root.clone())
    }
}

#[derive(Subcommand)]
enum Command {
    /// Run one temperature-gated pump cycle (default)
    Run(ConfigArgs),
    /// Show whether a controller is running and its current stage
    Status {
        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },
    /// Ask the running controller to stop (SIGTERM)
    Stop,
    /// Stop the running controller, or force the relay off if none is running
    EmergencyStop(ConfigArgs),
    /// Take one temperature reading
    ReadTemp {
        /// Report in Fahrenheit
        #[arg(long)]
        fahrenheit: bool,
    },
}

#[derive(Args)]
struct ConfigArgs {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

impl Default for ConfigArgs {
    fn default() -> Self {
        Self {
            config: PathBuf::from(DEFAULT_CONFIG_PATH),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let at = &cli.locations;
    let result = match cli.command.unwrap_or(Command::Run(ConfigArgs::default())) {
        Command::Run(args) => run(at, &args),
        Command::Status { json } => show_status(at, json),
        Command::Stop => stop(at),
        Command::EmergencyStop(args) => emergency_stop(at, &args),
        Command::ReadTemp { fahrenheit } => read_temp(at, fahrenheit),
    };
    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{e:#}");
            eprintln!("pumpctl: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(args: &ConfigArgs) -> Result<SystemConfig> {
    YamlConfigFile::new(&args.config)
        .load()
        .with_context(|| format!("loading {}", args.config.display()))
}

// ── run ───────────────────────────────────────────────────────

fn run(at: &Locations, args: &ConfigArgs) -> Result<u8> {
    // Before any thread exists, so every thread inherits the mask.
    signals::block_termination_signals().context("blocking termination signals")?;

    let config = load_config(args)?;
    logging::init(&config.logging);
    shutdown::install_panic_hook();
    if !args.config.exists() {
        warn!("CONFIG | {} not found, using defaults", args.config.display());
    }
    info!("=== fermentation pump cycle ===");

    let probe = ProcfsProbe::for_current_exe();
    let guard = match SingletonGuard::acquire(at.runtime_paths(), &probe) {
        Ok(guard) => Arc::new(guard),
        Err(LockError::AlreadyRunning { pid }) => {
            error!("LOCK | pump controller is already running (pid {pid})");
            return Ok(1);
        }
        Err(e) => return Err(e).context("acquiring the controller lock"),
    };

    let line = Arc::new(ActuatorLine::new());
    let handler = Arc::new(ShutdownHandler::new(Arc::clone(&line), Arc::clone(&guard)));
    if let Err(e) = signals::spawn_watcher(Arc::clone(&handler)) {
        handler.trigger(ShutdownReason::StartupFailed);
        return Err(e).context("starting the signal watcher");
    }
    let publisher = StatePublisher::new(Arc::clone(&guard));

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let mut platform = at.platform();
        CycleController::new(
            &config,
            &mut platform,
            line,
            publisher,
            Arc::clone(&handler),
            LogEventSink::new(),
        )
        .map(|mut controller| controller.run_cycle())
    }));

    let code = match outcome {
        Ok(Ok(report)) => {
            handler.trigger(ShutdownReason::CycleFinished);
            report.exit_code()
        }
        Ok(Err(e)) => {
            error!("INIT | {e}");
            handler.trigger(ShutdownReason::StartupFailed);
            1
        }
        Err(_) => {
            handler.trigger(ShutdownReason::Panic);
            1
        }
    };
    Ok(code)
}

// ── status / stop ─────────────────────────────────────────────

#[derive(Serialize)]
struct StatusReport {
    running: bool,
    pid: Option<u32>,
    stage: Stage,
}

fn show_status(at: &Locations, json: bool) -> Result<u8> {
    let paths = at.runtime_paths();
    let probe = ProcfsProbe::for_current_exe();
    let pid = match SingletonGuard::inspect(&paths, &probe) {
        LockStatus::OwnedBy(pid) => Some(pid),
        LockStatus::Idle => None,
    };
    let report = StatusReport {
        running: pid.is_some(),
        pid,
        stage: status::read(&paths, &probe),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if let Some(pid) = report.pid {
        println!("running (pid {pid}), stage: {}", report.stage);
    } else {
        println!("idle");
    }
    Ok(0)
}

fn signal_owner(pid: u32) -> Result<()> {
    let raw = i32::try_from(pid).context("lock holds an out-of-range pid")?;
    kill(Pid::from_raw(raw), Signal::SIGTERM)
        .with_context(|| format!("sending SIGTERM to pid {pid}"))?;
    println!("sent SIGTERM to pump controller (pid {pid})");
    Ok(())
}

fn stop(at: &Locations) -> Result<u8> {
    let paths = at.runtime_paths();
    match SingletonGuard::inspect(&paths, &ProcfsProbe::for_current_exe()) {
        LockStatus::OwnedBy(pid) => {
            signal_owner(pid)?;
            Ok(0)
        }
        LockStatus::Idle => {
            println!("pump controller is not running");
            Ok(1)
        }
    }
}

/// Never writes the relay line while a live controller owns it.
fn emergency_stop(at: &Locations, args: &ConfigArgs) -> Result<u8> {
    let config = load_config(args)?;
    let paths = at.runtime_paths();
    match SingletonGuard::inspect(&paths, &ProcfsProbe::for_current_exe()) {
        LockStatus::OwnedBy(pid) => signal_owner(pid)?,
        LockStatus::Idle => {
            let mut relay = at
                .platform()
                .open_relay(&config.pump)
                .with_context(|| format!("driving GPIO {} off", config.pump.gpio_pin))?;
            relay.release().context("releasing the relay line")?;
            println!("relay turned OFF (GPIO {})", config.pump.gpio_pin);
        }
    }
    Ok(0)
}

// ── read-temp ─────────────────────────────────────────────────

fn read_temp(at: &Locations, fahrenheit: bool) -> Result<u8> {
    let mut sensor = Ds18b20Sensor::discover_in(&at.w1_root).context("opening DS18B20")?;
    let reading = if fahrenheit {
        sensor.read_fahrenheit()
    } else {
        sensor.read_celsius()
    }
    .context("reading DS18B20")?;

    match reading {
        Some(t) => {
            let unit = if fahrenheit { "F" } else { "C" };
            println!("Temperature: {t:.2}\u{00b0}{unit}");
            Ok(0)
        }
        None => {
            eprintln!("error reading temperature");
            Ok(1)
        }
    }
}
