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
use prometheus_client::registry::Registry;
use std::error::Error;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tank_utility_exporter::client::TankUtilityClient;
use tank_utility_exporter::config::{self, Config};
use tank_utility_exporter::http::{self, RequestState};
use tank_utility_exporter::metrics::TankMetrics;
use tank_utility_exporter::poller::Poller;
use tokio::signal::unix::{self, SignalKind};
use tracing::Level;

const DEFAULT_LOG_LEVEL: Level = Level::INFO;
const DEFAULT_BIND_ADDR: ([u8; 4], u16) = ([0, 0, 0, 0], 9494);
const DEFAULT_METRICS_PATH: &str = "/metrics";

#[derive(Debug, Parser)]
#[clap(name = "tank_utility_exporter", version = clap::crate_version!())]
struct TankUtilityExporterApplication {
    /// Base URL for the Tank Utility API
    #[clap(long, default_value = config::DEFAULT_API_URL, value_parser = config::parse_endpoint)]
    endpoint: reqwest::Url,

    /// Path to a file containing 'username:password' for the Tank Utility API. Used to
    /// fetch a new token when there is no cached token or it is no longer accepted.
    #[clap(long)]
    credentials_file: Option<PathBuf>,

    /// Path to read a cached API token from, and write new tokens to.
    #[clap(long)]
    token_file: Option<PathBuf>,

    /// Skip TLS certificate verification when making requests to the Tank Utility API.
    #[clap(long)]
    insecure: bool,

    /// Logging verbosity. Allowed values are 'trace', 'debug', 'info', 'warn', and 'error'
    /// (case insensitive)
    #[clap(long, default_value_t = DEFAULT_LOG_LEVEL)]
    log_level: Level,

    /// Fetch tank readings from the Tank Utility API at this interval, in minutes.
    #[clap(long, default_value_t = config::DEFAULT_POLL_RATE_MINS, value_parser = config::parse_poll_rate)]
    poll_rate: u64,

    /// Timeout for each request to the Tank Utility API, in milliseconds.
    #[clap(long, default_value_t = config::DEFAULT_TIMEOUT_MILLIS)]
    timeout_millis: u64,

    /// Path under which to expose metrics.
    #[clap(long, default_value = DEFAULT_METRICS_PATH, value_parser = config::parse_metrics_path)]
    metrics_path: String,

    /// Address to bind to. By default, tank_utility_exporter will bind to public address since
    /// the purpose is to expose metrics to an external system (Prometheus or another
    /// agent for ingestion)
    #[clap(long, default_value_t = DEFAULT_BIND_ADDR.into())]
    bind: SocketAddr,
}

impl TankUtilityExporterApplication {
    fn config(&self) -> Config {
        Config {
            endpoint: self.endpoint.clone(),
            insecure: self.insecure,
            timeout: Duration::from_millis(self.timeout_millis),
            poll_interval: Duration::from_secs(self.poll_rate.saturating_mul(60)),
            token_file: self.token_file.clone(),
            credentials_file: self.credentials_file.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let opts = TankUtilityExporterApplication::parse();
    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(opts.log_level)
            .finish(),
    )
    .expect("failed to set tracing subscriber");

    let config = opts.config();
    if config.token_file.is_none() && config.credentials_file.is_none() {
        tracing::warn!(message = "neither a token file nor credentials file was provided, no readings will be fetched");
    }

    if config.insecure {
        tracing::warn!(message = "TLS certificate verification is disabled", endpoint = %config.endpoint);
    }

    let http_client = config.http_client().unwrap_or_else(|e| {
        tracing::error!(message = "unable to initialize HTTP client", error = %e);
        process::exit(1)
    });

    let mut registry = Registry::default();
    let metrics = TankMetrics::new(&mut registry);
    let client = TankUtilityClient::new(http_client, config.endpoint.clone());
    let poller = Poller::new(client, &config);

    let server = axum::Server::try_bind(&opts.bind).unwrap_or_else(|e| {
        tracing::error!(message = "error binding to address", address = %opts.bind, error = %e);
        process::exit(1)
    });

    tracing::info!(
        message = "tank polling started",
        endpoint = %config.endpoint,
        poll_interval_secs = config.poll_interval.as_secs(),
    );
    tokio::spawn(poller.run(metrics, config.poll_interval));

    let state = Arc::new(RequestState::new(registry));
    let app = http::router(&opts.metrics_path, state);

    tracing::info!(message = "server started", address = %opts.bind, path = %opts.metrics_path);
    server
        .serve(app.into_make_service())
        .with_graceful_shutdown(async {
            // Wait for either SIGTERM or SIGINT to shutdown
            tokio::select! {
                _ = sigterm() => {}
                _ = sigint() => {}
            }
        })
        .await?;

    tracing::info!("server shutdown");
    Ok(())
}

/// Return after the first SIGTERM signal received by this process
async fn sigterm() -> io::Result<()> {
    unix::signal(SignalKind::terminate())?.recv().await;
    Ok(())
}

/// Return after the first SIGINT signal received by this process
async fn sigint() -> io::Result<()> {
    unix::signal(SignalKind::interrupt())?.recv().await;
    Ok(())
}
