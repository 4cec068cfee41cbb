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

use crate::credentials::Credentials;
use crate::token::Token;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::error;
use std::fmt;

#[derive(Debug)]
pub enum ClientError {
    Transport(reqwest::Error),
    Unauthorized(StatusCode, Url),
    Unexpected(StatusCode, Url),
    Decode(Url, serde_json::Error),
    EmptyToken(Url),
    InvalidEndpoint(Url),
}

impl ClientError {
    /// True if the API rejected the token or credentials used for a request.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_, _))
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "{}", e),
            Self::Unauthorized(status, url) => write!(f, "unauthorized status {} for {}", status, redacted(url)),
            Self::Unexpected(status, url) => write!(f, "unexpected status {} for {}", status, redacted(url)),
            Self::Decode(url, e) => write!(f, "invalid response body for {}: {}", redacted(url), e),
            Self::EmptyToken(url) => write!(f, "empty token returned by {}", redacted(url)),
            Self::InvalidEndpoint(url) => write!(f, "invalid API endpoint {}", url),
        }
    }
}

impl error::Error for ClientError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            Self::Decode(_, e) => Some(e),
            _ => None,
        }
    }
}

/// Strip the query string (which carries the token) from a URL for display.
fn redacted(url: &Url) -> Url {
    let mut url = url.clone();
    url.set_query(None);
    url
}

/// Wrap a transport error, stripping the token from the URL it carries.
fn transport(mut e: reqwest::Error) -> ClientError {
    if let Some(url) = e.url_mut() {
        url.set_query(None);
    }

    ClientError::Transport(e)
}

/// Client for the three Tank Utility API calls needed to fetch tank readings.
///
/// TLS verification and request timeouts are properties of the `reqwest::Client`
/// this is built with, see `Config::http_client`.
#[derive(Debug, Clone)]
pub struct TankUtilityClient {
    client: Client,
    base_url: Url,
}

impl TankUtilityClient {
    const USER_AGENT: &'static str = "Tank Utility Prometheus Exporter";
    const JSON_RESPONSE: &'static str = "application/json";
    const TOKEN_PARAM: &'static str = "token";

    pub fn new(client: Client, base_url: Url) -> Self {
        TankUtilityClient { client, base_url }
    }

    /// Exchange a username and password for a new bearer token.
    pub async fn exchange_token(&self, credentials: &Credentials) -> Result<Token, ClientError> {
        let url = self.url(&["getToken"], None)?;
        tracing::debug!(message = "making token request", url = %url);

        let mut req = self.client.get(url.clone());
        if credentials.is_complete() {
            req = req.basic_auth(credentials.username(), Some(credentials.password()));
        }

        let token: Token = self.make_request(req, url.clone()).await?;
        if token.is_empty() {
            return Err(ClientError::EmptyToken(url));
        }

        Ok(token)
    }

    /// Fetch the IDs of all devices associated with the account the token belongs to.
    pub async fn list_devices(&self, token: &Token) -> Result<Vec<DeviceRef>, ClientError> {
        let url = self.url(&["devices"], Some(token))?;
        tracing::debug!(message = "making device list request", url = %redacted(&url));

        let list: DeviceList = self.make_request(self.client.get(url.clone()), url).await?;
        Ok(list.devices)
    }

    /// Fetch the most recent reading for a single device.
    pub async fn device_detail(&self, device: &DeviceRef, token: &Token) -> Result<DeviceInfo, ClientError> {
        let url = self.url(&["devices", device.id()], Some(token))?;
        tracing::debug!(message = "making device detail request", url = %redacted(&url));

        self.make_request(self.client.get(url.clone()), url).await
    }

    async fn make_request<T: DeserializeOwned>(&self, req: RequestBuilder, url: Url) -> Result<T, ClientError> {
        let res = req
            .header(USER_AGENT, Self::USER_AGENT)
            .header(ACCEPT, Self::JSON_RESPONSE)
            .send()
            .await
            .map_err(transport)?;

        let status = res.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ClientError::Unauthorized(status, url));
        } else if !status.is_success() {
            return Err(ClientError::Unexpected(status, url));
        }

        let body = res.bytes().await.map_err(transport)?;
        serde_json::from_slice(&body).map_err(|e| ClientError::Decode(url, e))
    }

    fn url(&self, segments: &[&str], token: Option<&Token>) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| ClientError::InvalidEndpoint(self.base_url.clone()))?;
            path.pop_if_empty().extend(segments);
        }

        if let Some(t) = token {
            url.query_pairs_mut().append_pair(Self::TOKEN_PARAM, t.value());
        }

        Ok(url)
    }
}

/// Opaque device identifier, only used to build device detail requests.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct DeviceRef(String);

impl DeviceRef {
    pub fn new<S: Into<String>>(id: S) -> Self {
        DeviceRef(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct DeviceList {
    #[serde(rename = "Devices")]
    pub devices: Vec<DeviceRef>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DeviceInfo {
    #[serde(rename = "Device")]
    pub device: Device,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Device {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Address")]
    pub address: String,
    #[serde(rename = "Capacity")]
    pub capacity: i64,
    #[serde(rename = "LastReading")]
    pub last_reading: TankReading,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TankReading {
    #[serde(rename = "Tank")]
    pub tank: f64,
    #[serde(rename = "Temperature")]
    pub temperature: f64,
    #[serde(rename = "Time")]
    pub time: i64,
    #[serde(rename = "TimeIso")]
    pub time_iso: String,
}
