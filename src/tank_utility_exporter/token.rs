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

use serde::{Deserialize, Serialize};
use std::error;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum TokenCacheError {
    Unreadable(PathBuf, io::Error),
    Malformed(PathBuf, serde_json::Error),
    Empty(PathBuf),
    Persist(PathBuf, io::Error),
}

impl TokenCacheError {
    /// True if this error means there was no usable cached token, as opposed to
    /// a failure to persist one.
    pub fn is_miss(&self) -> bool {
        !matches!(self, Self::Persist(_, _))
    }
}

impl fmt::Display for TokenCacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreadable(p, e) => write!(f, "unable to read token cache {}: {}", p.display(), e),
            Self::Malformed(p, e) => write!(f, "invalid token cache {}: {}", p.display(), e),
            Self::Empty(p) => write!(f, "empty token in token cache {}", p.display()),
            Self::Persist(p, e) => write!(f, "unable to write token cache {}: {}", p.display(), e),
        }
    }
}

impl error::Error for TokenCacheError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Unreadable(_, e) => Some(e),
            Self::Malformed(_, e) => Some(e),
            Self::Persist(_, e) => Some(e),
            _ => None,
        }
    }
}

/// Opaque bearer token issued by the Tank Utility API.
///
/// The serialized form, `{"Token": "..."}`, is shared by the `getToken` response and
/// the on-disk token cache.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    #[serde(rename = "Token")]
    value: String,
}

impl Token {
    pub fn new<S: Into<String>>(value: S) -> Self {
        Token { value: value.into() }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token").field("value", &"<redacted>").finish()
    }
}

/// Read a previously cached token.
pub async fn read(path: &Path) -> Result<Token, TokenCacheError> {
    let contents = tokio::fs::read(path)
        .await
        .map_err(|e| TokenCacheError::Unreadable(path.to_path_buf(), e))?;
    let token: Token =
        serde_json::from_slice(&contents).map_err(|e| TokenCacheError::Malformed(path.to_path_buf(), e))?;

    if token.is_empty() {
        return Err(TokenCacheError::Empty(path.to_path_buf()));
    }

    Ok(token)
}

/// Persist a token, replacing any existing cache contents.
pub async fn write(path: &Path, token: &Token) -> Result<(), TokenCacheError> {
    let contents =
        serde_json::to_vec(token).map_err(|e| TokenCacheError::Persist(path.to_path_buf(), e.into()))?;
    tokio::fs::write(path, contents)
        .await
        .map_err(|e| TokenCacheError::Persist(path.to_path_buf(), e))
}
