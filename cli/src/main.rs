//! Command-line access to the backend license and update API.
use std::time::Duration;

use anyhow::Result;
use backend_api::{machine_id, ApiConfig, BackendApiClient, Query, RedeemLicense};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Backend base URL. Defaults to http://localhost:8000/api/v1.
    #[arg(long, env = "BACKEND_API_BASE_URL")]
    base_url: Option<String>,

    /// Per-request timeout in milliseconds.
    #[arg(long, default_value_t = backend_api::REQUEST_TIMEOUT_MS)]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ask the backend whether a newer release exists.
    CheckUpdate {
        #[arg(long)]
        current_version: Option<String>,

        /// Extra query parameters as key=value.
        #[arg(long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },
    /// Show the license status of a machine.
    LicenseStatus {
        /// Defaults to this host's machine ID.
        #[arg(long)]
        machine_id: Option<String>,
    },
    /// Redeem a license code for a machine.
    Redeem {
        code: String,

        /// Defaults to this host's machine ID.
        #[arg(long)]
        machine_id: Option<String>,
    },
    /// Print this host's machine ID.
    MachineId,
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {raw:?}"))?;
    if key.is_empty() {
        return Err(format!("empty key in {raw:?}"));
    }
    Ok((key.to_string(), value.to_string()))
}

fn update_query(current_version: Option<String>, params: Vec<(String, String)>) -> Query {
    let mut query = Query::new().param("current_version", current_version);
    for (key, value) in params {
        query.set(&key, value);
    }
    query
}

fn print_payload(payload: Option<Value>) -> Result<()> {
    match payload {
        Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        None => println!("null"),
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = match args.base_url.as_deref() {
        Some(url) => ApiConfig::new(url),
        None => ApiConfig::default(),
    }
    .with_timeout(Duration::from_millis(args.timeout_ms));
    debug!(base_url = config.base_url(), "resolved backend config");
    let client = BackendApiClient::new(config);

    match args.command {
        Command::CheckUpdate {
            current_version,
            params,
        } => {
            let query = update_query(current_version, params);
            print_payload(client.check_update(&query)?)
        }
        Command::LicenseStatus { machine_id: id } => {
            let id = id.unwrap_or_else(machine_id);
            print_payload(client.get_license_status(&id)?)
        }
        Command::Redeem {
            code,
            machine_id: id,
        } => {
            let input = RedeemLicense {
                code,
                machine_id: id.unwrap_or_else(machine_id),
            };
            print_payload(client.redeem_license_code(&input)?)
        }
        Command::MachineId => {
            println!("{}", machine_id());
            Ok(())
        }
    }
}
