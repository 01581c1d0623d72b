//! Command-line interface for Raybot.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand, ValueEnum};
use raybot_core::{AppConfig, EventBus, SerialConfig};
use raybot_hardware::{
    BatteryController, CargoDoorController, Controller, DriveMotorController,
    LiftMotorController, PortSerialClient, SerialClient, SerialError, Subsystem,
};
use tokio_util::sync::CancellationToken;

/// Raybot hardware control.
#[derive(Parser, Debug)]
#[command(name = "raybot")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Action to perform.
    #[command(subcommand)]
    command: Command,

    /// Configuration file (TOML).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Load, validate and print the effective configuration.
    CheckConfig,
    /// Write one command to the hardware.
    ///
    /// Only the target's serial port is opened. Acknowledgments are not
    /// tracked: this binary has no reader publishing them.
    Send {
        #[command(subcommand)]
        target: SendTarget,
    },
}

#[derive(Subcommand, Debug)]
enum SendTarget {
    /// Drive motors.
    Drive {
        #[arg(value_enum)]
        action: DriveAction,
        /// Motor speed (0-100).
        #[arg(short, long, default_value_t = 50)]
        speed: u8,
    },
    /// Cargo lift motor.
    Lift {
        /// Target position. Omit to stop the motor.
        #[arg(short, long)]
        position: Option<u16>,
        /// Motor speed (0-100).
        #[arg(short, long, default_value_t = 50)]
        speed: u8,
    },
    /// Cargo door motor.
    CargoDoor {
        #[arg(value_enum)]
        action: DoorAction,
        /// Motor speed (0-100).
        #[arg(short, long, default_value_t = 50)]
        speed: u8,
    },
    /// Battery charge/discharge configuration.
    Battery {
        #[arg(value_enum)]
        mode: BatteryMode,
        /// Current limit (mA).
        #[arg(short = 'l', long, default_value_t = 1000)]
        current_limit: u16,
        /// Disable instead of enable.
        #[arg(long)]
        disable: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum DriveAction {
    Forward,
    Backward,
    Stop,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum DoorAction {
    Open,
    Close,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum BatteryMode {
    Charge,
    Discharge,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => AppConfig::default(),
    };
    config.apply_env_overrides();

    init_logging(&config, args.verbose);

    match args.command {
        Command::CheckConfig => check_config(&config),
        Command::Send { target } => send(config, target).await,
    }
}

fn init_logging(config: &AppConfig, verbose: bool) {
    let level = if verbose { "debug" } else { config.log.level.as_str() };

    // RUST_LOG wins over the configured level
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("raybot={level}")));

    if config.log.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .compact()
            .init();
    }
}

fn check_config(config: &AppConfig) -> Result<()> {
    config.validate().context("Invalid configuration")?;
    let rendered = toml::to_string_pretty(config).context("Failed to render configuration")?;
    println!("{rendered}");
    Ok(())
}

impl SendTarget {
    fn subsystem(&self) -> Subsystem {
        match self {
            SendTarget::Drive { .. } | SendTarget::Lift { .. } | SendTarget::Battery { .. } => {
                Subsystem::Pic
            }
            SendTarget::CargoDoor { .. } => Subsystem::Esp,
        }
    }
}

/// Stand-in for a link the current command does not use.
struct UnopenedLink;

#[async_trait]
impl SerialClient for UnopenedLink {
    async fn write(&self, _token: &CancellationToken, _data: &[u8]) -> Result<(), SerialError> {
        Err(SerialError::Closed)
    }
}

fn open_link(subsystem: Subsystem, config: &SerialConfig) -> Result<Arc<dyn SerialClient>> {
    let client = PortSerialClient::open(config)
        .with_context(|| format!("Failed to open {subsystem} serial port {}", config.port))?;
    Ok(Arc::new(client))
}

async fn send(mut config: AppConfig, target: SendTarget) -> Result<()> {
    config.hardware.pic.enable_ack = false;
    config.hardware.esp.enable_ack = false;
    config.validate().context("Invalid configuration")?;

    let subsystem = target.subsystem();
    let (pic, esp): (Arc<dyn SerialClient>, Arc<dyn SerialClient>) = match subsystem {
        Subsystem::Pic => (
            open_link(subsystem, &config.hardware.pic)?,
            Arc::new(UnopenedLink),
        ),
        Subsystem::Esp => (
            Arc::new(UnopenedLink),
            open_link(subsystem, &config.hardware.esp)?,
        ),
    };

    let controller = Controller::new(&config.hardware, EventBus::new(), pic, esp);

    let token = CancellationToken::new();
    tokio::spawn({
        let token = token.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupted, canceling dispatch");
                token.cancel();
            }
        }
    });

    let result = match target {
        SendTarget::Drive { action, speed } => match action {
            DriveAction::Forward => controller.move_forward(&token, speed).await,
            DriveAction::Backward => controller.move_backward(&token, speed).await,
            DriveAction::Stop => controller.stop_drive_motor(&token).await,
        },
        SendTarget::Lift { position, speed } => match position {
            Some(position) => controller.set_cargo_position(&token, speed, position).await,
            None => controller.stop_lift_motor(&token).await,
        },
        SendTarget::CargoDoor { action, speed } => match action {
            DoorAction::Open => controller.open_cargo_door(&token, speed).await,
            DoorAction::Close => controller.close_cargo_door(&token, speed).await,
        },
        SendTarget::Battery {
            mode,
            current_limit,
            disable,
        } => match mode {
            BatteryMode::Charge => {
                controller
                    .config_battery_charge(&token, current_limit, !disable)
                    .await
            }
            BatteryMode::Discharge => {
                controller
                    .config_battery_discharge(&token, current_limit, !disable)
                    .await
            }
        },
    };

    result.context("Dispatch failed")?;
    tracing::info!(subsystem = %subsystem, "command written");
    Ok(())
}
