//! Operator CLI for the GSM modem SMS engine.
//!
//! `sms-modem list-ports` shows what the OS can see; `sms-modem send`
//! connects, sends one message, and disconnects. Applications talk to the
//! library directly; the CLI exists for bench testing a modem and picking
//! the right COM port.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sms_modem::{list_ports, ModemConfig, ModemSession};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Serial AT-command engine for sending SMS through GSM modems.",
    long_about = "Drives a GSM modem on a COM port: lists candidate ports, runs the \
                  AT initialization handshake, and sends text-mode SMS messages."
)]
struct Cli {
    /// Path to a TOML configuration file with timing overrides.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List serial ports available for modem attachment.
    ListPorts {
        /// Emit the list as JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Connect to a modem, send one SMS, and disconnect.
    Send {
        /// Serial port path, e.g. COM3 or /dev/ttyUSB0.
        #[arg(long)]
        port: String,
        /// Destination phone number.
        #[arg(long)]
        number: String,
        /// Message body.
        #[arg(long)]
        message: String,
        /// Baud rate override.
        #[arg(long)]
        baud: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Command::ListPorts { json } => run_list_ports(json),
        Command::Send {
            port,
            number,
            message,
            baud,
        } => run_send(config, &port, &number, &message, baud).await,
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<ModemConfig, sms_modem::ConfigError> {
    match path {
        Some(path) => ModemConfig::from_toml_file(path),
        None => Ok(ModemConfig::default()),
    }
}

fn run_list_ports(json: bool) -> ExitCode {
    let ports = list_ports();

    if json {
        match serde_json::to_string_pretty(&ports) {
            Ok(out) => println!("{out}"),
            Err(e) => {
                eprintln!("error: {e}");
                return ExitCode::FAILURE;
            }
        }
        return ExitCode::SUCCESS;
    }

    if ports.is_empty() {
        println!("No serial ports found.");
        return ExitCode::SUCCESS;
    }

    for port in ports {
        let manufacturer = port.manufacturer.as_deref().unwrap_or("-");
        println!("{:<20} {:<10} {}", port.path, port.port_type, manufacturer);
    }
    ExitCode::SUCCESS
}

async fn run_send(
    config: ModemConfig,
    port: &str,
    number: &str,
    message: &str,
    baud: Option<u32>,
) -> ExitCode {
    let baud_rate = baud.unwrap_or(config.baud_rate);
    let session = ModemSession::with_config(config);

    if let Err(e) = session.connect_with_baud(port, baud_rate).await {
        eprintln!("connect failed: {e}");
        return ExitCode::FAILURE;
    }

    let result = session.send_sms(number, message).await;
    session.disconnect();

    match result {
        Ok(_) => {
            println!("Message sent.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("send failed: {e}");
            ExitCode::FAILURE
        }
    }
}
