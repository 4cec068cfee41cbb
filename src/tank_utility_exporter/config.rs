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

use reqwest::{Client, Url};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://data.tankutility.com/api";
pub const DEFAULT_TIMEOUT_MILLIS: u64 = 5000;
pub const DEFAULT_POLL_RATE_MINS: u64 = 15;

/// Settings for talking to the Tank Utility API, built once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub endpoint: Url,
    pub insecure: bool,
    pub timeout: Duration,
    pub poll_interval: Duration,
    pub token_file: Option<PathBuf>,
    pub credentials_file: Option<PathBuf>,
}

impl Config {
    pub fn new(endpoint: Url) -> Self {
        Config {
            endpoint,
            insecure: false,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MILLIS),
            poll_interval: Duration::from_secs(DEFAULT_POLL_RATE_MINS * 60),
            token_file: None,
            credentials_file: None,
        }
    }

    /// Build an HTTP client that applies the configured timeout to every request and
    /// only skips certificate verification when explicitly asked to.
    pub fn http_client(&self) -> Result<Client, reqwest::Error> {
        Client::builder()
            .timeout(self.timeout)
            .danger_accept_invalid_certs(self.insecure)
            .build()
    }
}

/// Parse an API base URL, rejecting URLs that can't have path segments appended.
pub fn parse_endpoint(s: &str) -> Result<Url, String> {
    let url = Url::parse(s).map_err(|e| e.to_string())?;
    if url.cannot_be_a_base() {
        return Err(format!("{} cannot be used as a base URL", url));
    }

    Ok(url)
}

/// Parse a URL path for serving metrics, which must be absolute.
pub fn parse_metrics_path(s: &str) -> Result<String, String> {
    if s.starts_with('/') {
        Ok(s.to_owned())
    } else {
        Err(format!("path {} must begin with '/'", s))
    }
}

/// Parse a poll rate in minutes, which must be non-zero.
pub fn parse_poll_rate(s: &str) -> Result<u64, String> {
    match s.parse::<u64>() {
        Ok(0) => Err("poll rate must be at least one minute".to_owned()),
        Ok(v) => Ok(v),
        Err(e) => Err(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_endpoint, parse_metrics_path, parse_poll_rate, Config, DEFAULT_API_URL};
    use std::time::Duration;

    #[test]
    fn test_defaults() {
        let config = Config::new(parse_endpoint(DEFAULT_API_URL).unwrap());
        assert!(!config.insecure);
        assert_eq!(Duration::from_secs(900), config.poll_interval);
        assert!(config.token_file.is_none());
        assert!(config.credentials_file.is_none());
    }

    #[test]
    fn test_http_client_builds() {
        let mut config = Config::new(parse_endpoint(DEFAULT_API_URL).unwrap());
        assert!(config.http_client().is_ok());

        config.insecure = true;
        assert!(config.http_client().is_ok());
    }

    #[test]
    fn test_parse_endpoint() {
        assert!(parse_endpoint("https://example.com/api").is_ok());
        assert!(parse_endpoint("not a url").is_err());
        assert!(parse_endpoint("mailto:someone@example.com").is_err());
    }

    #[test]
    fn test_parse_metrics_path() {
        assert_eq!("/metrics", parse_metrics_path("/metrics").unwrap());
        assert!(parse_metrics_path("metrics").is_err());
    }

    #[test]
    fn test_parse_poll_rate() {
        assert_eq!(15, parse_poll_rate("15").unwrap());
        assert!(parse_poll_rate("0").is_err());
        assert!(parse_poll_rate("-1").is_err());
    }
}
