// tank_utility_exporter - Prometheus metrics exporter for Tank Utility propane monitors
//
// Copyright 2022 Nick Pillitteri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tank_utility_exporter::client::TankUtilityClient;
use tank_utility_exporter::config::{self, Config};
use tank_utility_exporter::credentials::Credentials;
use tank_utility_exporter::token;
use tracing::Level;

const DEFAULT_LOG_LEVEL: Level = Level::WARN;
const DEFAULT_TOKEN_FILE: &str = "tank_utility.token";

/// Fetch a token for the Tank Utility API, save it, and print information about each device.
#[derive(Debug, Parser)]
#[clap(name = "tank_utility", version = clap::crate_version!())]
struct TankUtilityApplication {
    /// Path to a file containing 'username:password' for the Tank Utility API
    #[clap(long)]
    credentials_file: PathBuf,

    /// Path to write the token to.
    #[clap(long, default_value = DEFAULT_TOKEN_FILE)]
    output_token_file: PathBuf,

    /// Base URL for the Tank Utility API
    #[clap(long, default_value = config::DEFAULT_API_URL, value_parser = config::parse_endpoint)]
    endpoint: reqwest::Url,

    /// Skip TLS certificate verification when making requests to the Tank Utility API.
    #[clap(long)]
    insecure: bool,

    /// Timeout for each request to the Tank Utility API, in milliseconds.
    #[clap(long, default_value_t = config::DEFAULT_TIMEOUT_MILLIS)]
    timeout_millis: u64,

    /// Logging verbosity. Allowed values are 'trace', 'debug', 'info', 'warn', and 'error'
    /// (case insensitive)
    #[clap(long, default_value_t = DEFAULT_LOG_LEVEL)]
    log_level: Level,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let opts = TankUtilityApplication::parse();
    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(opts.log_level)
            .with_writer(std::io::stderr)
            .finish(),
    )
    .expect("failed to set tracing subscriber");

    let mut config = Config::new(opts.endpoint.clone());
    config.insecure = opts.insecure;
    config.timeout = Duration::from_millis(opts.timeout_millis);

    let credentials = Credentials::load(&opts.credentials_file).await.unwrap_or_else(|e| {
        tracing::error!(message = "unable to load credentials", error = %e);
        process::exit(1)
    });

    let http_client = config.http_client().unwrap_or_else(|e| {
        tracing::error!(message = "unable to initialize HTTP client", error = %e);
        process::exit(1)
    });

    let client = TankUtilityClient::new(http_client, config.endpoint.clone());
    let token = client.exchange_token(&credentials).await.unwrap_or_else(|e| {
        tracing::error!(message = "unable to fetch token", error = %e);
        process::exit(1)
    });

    match token::write(&opts.output_token_file, &token).await {
        Ok(_) => tracing::info!(message = "wrote token", path = %opts.output_token_file.display()),
        Err(e) => tracing::warn!(message = "unable to write token", error = %e),
    }

    for device in client.list_devices(&token).await? {
        match client.device_detail(&device, &token).await {
            Ok(info) => println!("{}: {}", device, serde_json::to_string_pretty(&info)?),
            Err(e) => tracing::error!(message = "failed to fetch device", device = %device, error = %e),
        }
    }

    Ok(())
}
