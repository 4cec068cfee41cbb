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

//! Prometheus metrics exporter for Tank Utility propane tank monitors
//!
//! ## Features
//!
//! `tank_utility_exporter` fetches the latest reading of every propane tank monitor on a
//! [Tank Utility] account using their API and emits it as Prometheus metrics. The following
//! metrics are emitted for each device.
//!
//! * `propane_percentage{name=$NAME}` - Percentage of propane remaining in the tank.
//! * `temperature{name=$NAME}` - Temperature at the tank, in degrees fahrenheit.
//! * `capacity{name=$NAME}` - Capacity of the tank, in gallons.
//! * `last_update{name=$NAME}` - Time of the last reading from the device, as a UNIX timestamp.
//!
//! [Tank Utility]: https://www.tankutility.com/
//!
//! ## Build
//!
//! `tank_utility_exporter` is a Rust program and must be built from source using a
//! [Rust toolchain](https://rustup.rs/).
//!
//! ```text
//! cargo build --release
//! ```
//!
//! ## Usage
//!
//! ### Credentials
//!
//! The Tank Utility API issues tokens in exchange for the username and password of your
//! account. Put them in a file, separated by a colon.
//!
//! ```text
//! echo 'you@example.com:your password' > credentials
//! chmod 600 credentials
//! ```
//!
//! The `tank_utility` binary can be used to verify the credentials work. It fetches a
//! token, saves it to `tank_utility.token`, and prints information about each device.
//!
//! ```text
//! ./tank_utility --credentials-file credentials
//! ```
//!
//! ### Run
//!
//! Run the exporter with a credentials file, a token file, or both. When both are given,
//! the token is reused across restarts and replaced if the API stops accepting it.
//!
//! ```text
//! ./tank_utility_exporter --credentials-file credentials --token-file tank_utility.token
//! ```
//!
//! Readings are fetched every 15 minutes by default, see `--poll-rate`.
//!
//! ### Prometheus
//!
//! Prometheus metrics are exposed on port `9494` at `/metrics`. Once `tank_utility_exporter`
//! is running, configure scrapes of it by your Prometheus server.
//!
//! ```yaml
//! scrape_configs:
//! - job_name: tank_utility_exporter
//!   static_configs:
//!   - targets: ['example:9494']
//! ```
//!

pub mod client;
pub mod config;
pub mod credentials;
pub mod http;
pub mod metrics;
pub mod poller;
pub mod token;
