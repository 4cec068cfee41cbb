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

#![allow(dead_code)]

use axum::extract::{Path, Query, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use reqwest::{Client, Url};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tank_utility_exporter::client::TankUtilityClient;

/// `user:pass` encoded for basic auth
pub const BASIC_AUTH_USER_PASS: &str = "Basic dXNlcjpwYXNz";

/// Mutable behavior and call counts of a `MockVendor`.
#[derive(Debug, Default)]
pub struct VendorState {
    /// Tokens handed out by `getToken`, in order. The last one is repeated.
    pub issued_tokens: Vec<String>,
    /// Tokens accepted for device list and detail calls.
    pub valid_tokens: HashSet<String>,
    /// Tokens accepted for device list calls but rejected for detail calls.
    pub list_only_tokens: HashSet<String>,
    /// How long the device list call waits before responding.
    pub list_delay: Option<Duration>,
    pub devices: Vec<String>,
    pub details: HashMap<String, Value>,
    /// Devices whose detail call returns a 500.
    pub failing: HashSet<String>,
    pub token_calls: usize,
    pub list_calls: usize,
    pub detail_calls: usize,
}

/// In-process stand in for the Tank Utility API, mounted under `/api`.
pub struct MockVendor {
    pub addr: SocketAddr,
    pub state: Arc<Mutex<VendorState>>,
}

impl MockVendor {
    pub async fn start(state: VendorState) -> Self {
        let state = Arc::new(Mutex::new(state));
        let app = Router::new()
            .route("/api/getToken", get(get_token))
            .route("/api/devices", get(list_devices))
            .route("/api/devices/:id", get(device_detail))
            .with_state(state.clone());

        let server = axum::Server::bind(&"127.0.0.1:0".parse().unwrap()).serve(app.into_make_service());
        let addr = server.local_addr();
        tokio::spawn(server);

        MockVendor { addr, state }
    }

    pub fn endpoint(&self) -> Url {
        Url::parse(&format!("http://{}/api", self.addr)).unwrap()
    }

    pub fn client(&self) -> TankUtilityClient {
        TankUtilityClient::new(Client::new(), self.endpoint())
    }

    pub fn with<T, F: FnOnce(&mut VendorState) -> T>(&self, f: F) -> T {
        f(&mut self.state.lock().unwrap())
    }
}

/// Vendor state for a single valid token "abc123" and one device "dev1" named "Tank A".
pub fn single_tank() -> VendorState {
    let mut state = VendorState {
        issued_tokens: vec!["abc123".to_owned()],
        valid_tokens: HashSet::from(["abc123".to_owned()]),
        devices: vec!["dev1".to_owned()],
        ..Default::default()
    };

    state.details.insert("dev1".to_owned(), detail("Tank A", 62.5));
    state
}

pub fn detail(name: &str, tank: f64) -> Value {
    json!({
        "Device": {
            "Name": name,
            "Address": "00:11",
            "Capacity": 500,
            "LastReading": {
                "Tank": tank,
                "Temperature": 71.2,
                "Time": 1700000000,
                "TimeIso": "2023-11-14T22:13:20Z"
            }
        }
    })
}

async fn get_token(State(state): State<Arc<Mutex<VendorState>>>, headers: HeaderMap) -> Response {
    let mut state = state.lock().unwrap();
    let auth = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    if auth != Some(BASIC_AUTH_USER_PASS) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let idx = state.token_calls.min(state.issued_tokens.len().saturating_sub(1));
    state.token_calls += 1;
    match state.issued_tokens.get(idx) {
        Some(t) => Json(json!({ "Token": t })).into_response(),
        None => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

async fn list_devices(
    State(state): State<Arc<Mutex<VendorState>>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let (res, delay) = {
        let mut state = state.lock().unwrap();
        state.list_calls += 1;
        let res = if authorized(&state, &params, true) {
            Json(json!({ "Devices": state.devices })).into_response()
        } else {
            StatusCode::UNAUTHORIZED.into_response()
        };

        (res, state.list_delay)
    };

    if let Some(d) = delay {
        tokio::time::sleep(d).await;
    }

    res
}

async fn device_detail(
    State(state): State<Arc<Mutex<VendorState>>>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let mut state = state.lock().unwrap();
    state.detail_calls += 1;
    if !authorized(&state, &params, false) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    if state.failing.contains(&id) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    match state.details.get(&id) {
        Some(d) => Json(d.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

fn authorized(state: &VendorState, params: &HashMap<String, String>, listing: bool) -> bool {
    params
        .get("token")
        .map(|t| state.valid_tokens.contains(t) || (listing && state.list_only_tokens.contains(t)))
        .unwrap_or(false)
}
