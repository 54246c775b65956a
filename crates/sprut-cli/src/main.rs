//! Sprut.hub command line client.
//!
//! Connects to one hub over WebSocket, authenticates, runs one command,
//! and prints the result as JSON on stdout. Connection settings come from
//! flags or `SPRUT_*` environment variables.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use sprut_client::{
    NewScenario, Sprut, controllable_characteristics, decode_log_event, devices_in_room,
};
use sprut_rpc::ClientConfig;
use sprut_types::ControlValue;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Sprut.hub command line client
#[derive(Parser)]
#[command(name = "sprut")]
#[command(about = "Command line client for a Sprut.hub smart-home hub")]
#[command(version)]
#[command(after_help = "\
Examples:
  sprut version                   Show hub identity and firmware
  sprut devices                   List accessories
  sprut devices --controllable    List writable characteristics
  sprut devices --room 3          List accessories in room 3
  sprut set 10 11 12 true         Write a characteristic value
  sprut scenarios                 List scenarios
  sprut scenario 7                Show scenario 7 with its body
  sprut logs --count 50           Fetch recent hub log entries
  sprut watch-logs                Stream hub logs until Ctrl-C

Environment:
  SPRUT_WS_URL, SPRUT_EMAIL, SPRUT_PASSWORD, SPRUT_SERIAL
")]
struct Cli {
    /// WebSocket endpoint, e.g. ws://spruthub.local:55080/spruthub
    #[arg(long, env = "SPRUT_WS_URL")]
    url: String,

    /// Account email
    #[arg(long, env = "SPRUT_EMAIL")]
    email: String,

    /// Account password
    #[arg(long, env = "SPRUT_PASSWORD", hide_env_values = true)]
    password: String,

    /// Serial of the target hub
    #[arg(long, env = "SPRUT_SERIAL")]
    serial: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show hub identity and firmware version
    Version,

    /// List hubs visible to this account
    Hubs,

    /// List accessories
    Devices {
        /// Show only writable characteristics, flattened
        #[arg(long)]
        controllable: bool,

        /// Show only accessories assigned to this room
        #[arg(long)]
        room: Option<u64>,
    },

    /// List rooms
    Rooms,

    /// List scenarios
    Scenarios,

    /// Show one scenario, including its body
    Scenario { index: String },

    /// Create an empty block scenario
    CreateScenario {
        /// Scenario name
        name: String,
    },

    /// Delete a scenario
    DeleteScenario { index: String },

    /// Write a characteristic value (bool/int/float/string inferred)
    Set {
        accessory: u64,
        service: u64,
        characteristic: u64,
        value: String,
    },

    /// Fetch recent hub log entries
    Logs {
        #[arg(long, default_value_t = 100)]
        count: u32,
    },

    /// Stream hub log entries until interrupted
    WatchLogs,

    /// Fetch an aggregated snapshot of hubs, devices, rooms and scenarios
    System,
}

fn setup_logging() {
    let default_level = if cfg!(debug_assertions) { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("sprut={default_level}")));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging();
    let cli = Cli::parse();

    let sprut = Sprut::new(ClientConfig::new(
        &cli.url,
        &cli.email,
        &cli.password,
        &cli.serial,
    ))?;

    tokio::time::timeout(CONNECT_TIMEOUT, sprut.client().connected())
        .await
        .context("timed out waiting for the hub connection")?;

    let result = run(&cli.command, &sprut).await;
    sprut.close().await;
    result
}

async fn run(command: &Commands, sprut: &Sprut) -> Result<()> {
    match command {
        Commands::Version => print_json(&sprut.hubs().version().await?),

        Commands::Hubs => print_json(&sprut.hubs().list().await?),

        Commands::Devices { controllable, room } => {
            let accessories = sprut.devices().list().await?;
            if *controllable {
                print_json(&controllable_characteristics(&accessories))
            } else if let Some(room_id) = room {
                print_json(&devices_in_room(&accessories, *room_id))
            } else {
                print_json(&accessories)
            }
        }

        Commands::Rooms => print_json(&sprut.rooms().list().await?),

        Commands::Scenarios => print_json(&sprut.scenarios().list().await?),

        Commands::Scenario { index } => print_json(&sprut.scenarios().get(index).await?),

        Commands::CreateScenario { name } => {
            let scenario = sprut
                .scenarios()
                .create(NewScenario {
                    name: name.clone(),
                    ..NewScenario::default()
                })
                .await?;
            print_json(&scenario)
        }

        Commands::DeleteScenario { index } => {
            sprut.scenarios().delete(index).await?;
            eprintln!("scenario {index} deleted");
            Ok(())
        }

        Commands::Set {
            accessory,
            service,
            characteristic,
            value,
        } => {
            sprut
                .devices()
                .update_characteristic(
                    *accessory,
                    *service,
                    *characteristic,
                    ControlValue::parse(value),
                )
                .await?;
            eprintln!("characteristic {accessory}.{service}.{characteristic} set to {value}");
            Ok(())
        }

        Commands::Logs { count } => print_json(&sprut.logs().recent(*count).await?),

        Commands::WatchLogs => watch_logs(sprut).await,

        Commands::System => print_json(&sprut.system().snapshot().await),
    }
}

async fn watch_logs(sprut: &Sprut) -> Result<()> {
    let logs = sprut.logs();
    // Subscribe to the broadcast channel first so no frame between the
    // hub's ack and the first recv is missed.
    let mut events = logs.events();
    let uuid = logs.subscribe().await?;
    eprintln!("streaming hub logs (subscription {uuid}); press Ctrl-C to stop");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            frame = events.recv() => match frame {
                Ok(frame) => {
                    let Some(entries) = decode_log_event(&frame) else {
                        continue;
                    };
                    for entry in entries {
                        println!(
                            "{} [{}] {}: {}",
                            entry.time.unwrap_or_default(),
                            entry.level.as_deref().unwrap_or("-"),
                            entry.path.as_deref().unwrap_or("-"),
                            entry.message.as_deref().unwrap_or(""),
                        );
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("dropped {n} event frames");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    logs.unsubscribe(&uuid).await?;
    Ok(())
}
