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

use crate::client::{ClientError, DeviceInfo, DeviceRef, TankUtilityClient};
use crate::config::Config;
use crate::credentials::{CredentialError, Credentials};
use crate::metrics::TankMetrics;
use crate::token::{self, Token, TokenCacheError};
use std::error;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{Instrument, Level};

/// Latest reading for a single tank.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub device_name: String,
    pub capacity: i64,
    pub tank_percentage: f64,
    pub temperature: f64,
    pub observed_at: i64,
}

impl From<DeviceInfo> for Reading {
    fn from(info: DeviceInfo) -> Self {
        Reading {
            device_name: info.device.name,
            capacity: info.device.capacity,
            tank_percentage: info.device.last_reading.tank,
            temperature: info.device.last_reading.temperature,
            observed_at: info.device.last_reading.time,
        }
    }
}

#[derive(Debug)]
pub enum CycleError {
    NoCredentials,
    Credentials(CredentialError),
    Auth(ClientError),
    ListDevices(ClientError),
    DeviceDetail(DeviceRef, ClientError),
}

impl fmt::Display for CycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no usable token and no credentials file configured"),
            Self::Credentials(e) => write!(f, "unable to load credentials: {}", e),
            Self::Auth(e) => write!(f, "token exchange failed: {}", e),
            Self::ListDevices(e) => write!(f, "unable to list devices: {}", e),
            Self::DeviceDetail(d, e) => write!(f, "unable to fetch device {}: {}", d, e),
        }
    }
}

impl error::Error for CycleError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::NoCredentials => None,
            Self::Credentials(e) => Some(e),
            Self::Auth(e) => Some(e),
            Self::ListDevices(e) => Some(e),
            Self::DeviceDetail(_, e) => Some(e),
        }
    }
}

/// Everything that happened during a single poll cycle.
#[derive(Debug, Default)]
pub struct PollCycleResult {
    /// Readings for each device that was fetched successfully, in device list order.
    pub readings: Vec<Reading>,
    /// Failures encountered, none of which stopped the remaining devices from being fetched.
    pub errors: Vec<CycleError>,
    /// Outcome of persisting a token obtained during this cycle. `None` if no token was
    /// exchanged or there is no token file configured.
    pub token_persisted: Option<Result<(), TokenCacheError>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenState {
    NoToken,
    TokenLoaded(Token),
    TokenExchanging,
}

/// Fetches readings for every device on an account, managing the token needed to do so.
///
/// A token is loaded from the token file (if any) on the first cycle, exchanged for using
/// the credentials file (if any) when there isn't one, and exchanged for again at most once
/// per cycle if the API rejects it.
#[derive(Debug)]
pub struct Poller {
    client: TankUtilityClient,
    token_file: Option<PathBuf>,
    credentials_file: Option<PathBuf>,
    state: TokenState,
    cache_checked: bool,
}

impl Poller {
    pub fn new(client: TankUtilityClient, config: &Config) -> Self {
        Poller {
            client,
            token_file: config.token_file.clone(),
            credentials_file: config.credentials_file.clone(),
            state: TokenState::NoToken,
            cache_checked: false,
        }
    }

    pub fn state(&self) -> &TokenState {
        &self.state
    }

    /// Run a full poll cycle: resolve a token, list devices, and fetch each of them.
    pub async fn cycle(&mut self) -> PollCycleResult {
        let mut result = PollCycleResult::default();
        let mut reexchanged = false;

        if !self.cache_checked {
            self.cache_checked = true;
            self.load_cached_token().await;
        }

        let mut token = match self.resolve_token(&mut result).await {
            Some(t) => t,
            None => return result,
        };

        let listed = self.client.list_devices(&token).await;
        let devices = match listed {
            Ok(devices) => devices,
            Err(e) if e.is_unauthorized() && self.credentials_file.is_some() => {
                tracing::warn!(message = "token rejected listing devices, exchanging for new token", error = %e);
                reexchanged = true;
                token = match self.reexchange(&mut result).await {
                    Some(t) => t,
                    None => return result,
                };

                match self.client.list_devices(&token).await {
                    Ok(devices) => devices,
                    Err(e) => {
                        result.errors.push(CycleError::ListDevices(e));
                        return result;
                    }
                }
            }
            Err(e) => {
                result.errors.push(CycleError::ListDevices(e));
                return result;
            }
        };

        tracing::debug!(message = "listed devices", num_devices = devices.len());

        for device in devices {
            let fetched = self.client.device_detail(&device, &token).await;
            let detail = match fetched {
                Err(e) if e.is_unauthorized() && !reexchanged && self.credentials_file.is_some() => {
                    tracing::warn!(message = "token rejected fetching device, exchanging for new token", device = %device, error = %e);
                    reexchanged = true;
                    match self.reexchange(&mut result).await {
                        Some(t) => {
                            token = t;
                            self.client.device_detail(&device, &token).await
                        }
                        None => Err(e),
                    }
                }
                res => res,
            };

            match detail {
                Ok(info) => result.readings.push(Reading::from(info)),
                Err(e) => result.errors.push(CycleError::DeviceDetail(device, e)),
            }
        }

        result
    }

    /// Run a poll cycle immediately and then at every `interval`, forever, setting metrics
    /// from each reading fetched.
    pub async fn run(mut self, metrics: TankMetrics, interval: Duration) {
        let mut interval = tokio::time::interval(interval);
        // Overrunning cycles are run back to back rather than skipped
        interval.set_missed_tick_behavior(MissedTickBehavior::Burst);

        loop {
            let _ = interval.tick().await;
            let result = self
                .cycle()
                .instrument(tracing::span!(Level::DEBUG, "tank_utility_poll"))
                .await;

            for reading in result.readings.iter() {
                metrics.observe(reading);
                tracing::debug!(
                    message = "fetched new reading",
                    device = %reading.device_name,
                    tank = reading.tank_percentage,
                    observed_at = reading.observed_at,
                );
            }

            for e in result.errors.iter() {
                tracing::error!(message = "failed to fetch readings", error = %e);
            }

            tracing::info!(
                message = "poll cycle complete",
                num_readings = result.readings.len(),
                num_errors = result.errors.len(),
            );
        }
    }

    async fn load_cached_token(&mut self) {
        let path = match &self.token_file {
            Some(p) => p,
            None => return,
        };

        match token::read(path).await {
            Ok(t) => {
                tracing::info!(message = "loaded cached token", path = %path.display());
                self.state = TokenState::TokenLoaded(t);
            }
            Err(e) => {
                tracing::warn!(message = "unable to load cached token", error = %e);
            }
        }
    }

    async fn resolve_token(&mut self, result: &mut PollCycleResult) -> Option<Token> {
        if let TokenState::TokenLoaded(t) = &self.state {
            return Some(t.clone());
        }

        self.exchange(result).await
    }

    async fn reexchange(&mut self, result: &mut PollCycleResult) -> Option<Token> {
        self.state = TokenState::NoToken;
        self.exchange(result).await
    }

    async fn exchange(&mut self, result: &mut PollCycleResult) -> Option<Token> {
        let path = match &self.credentials_file {
            Some(p) => p.clone(),
            None => {
                result.errors.push(CycleError::NoCredentials);
                return None;
            }
        };

        let credentials = match Credentials::load(&path).await {
            Ok(c) => c,
            Err(e) => {
                result.errors.push(CycleError::Credentials(e));
                return None;
            }
        };

        self.state = TokenState::TokenExchanging;
        let token = match self
            .client
            .exchange_token(&credentials)
            .instrument(tracing::span!(Level::DEBUG, "tank_utility_token"))
            .await
        {
            Ok(t) => t,
            Err(e) => {
                self.state = TokenState::NoToken;
                result.errors.push(CycleError::Auth(e));
                return None;
            }
        };

        tracing::info!(message = "exchanged credentials for new token", username = %credentials.username());
        self.state = TokenState::TokenLoaded(token.clone());

        if let Some(p) = &self.token_file {
            let persisted = token::write(p, &token).await;
            if let Err(e) = &persisted {
                tracing::warn!(message = "unable to persist token", error = %e);
            }

            result.token_persisted = Some(persisted);
        }

        Some(token)
    }
}
