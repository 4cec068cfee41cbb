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

use std::error;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const SEPARATOR: char = ':';

#[derive(Debug)]
pub enum CredentialError {
    Unreadable(PathBuf, io::Error),
    Malformed,
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreadable(path, e) => write!(f, "unable to read credentials {}: {}", path.display(), e),
            Self::Malformed => write!(f, "credentials must be of the form 'username{}password'", SEPARATOR),
        }
    }
}

impl error::Error for CredentialError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Unreadable(_, e) => Some(e),
            _ => None,
        }
    }
}

/// Username and password used for the basic-auth token exchange.
///
/// The `Debug` implementation never includes the password.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new<U: Into<String>, P: Into<String>>(username: U, password: P) -> Self {
        Credentials {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Read credentials from a file containing `username:password`, optionally
    /// surrounded by whitespace.
    pub async fn load(path: &Path) -> Result<Self, CredentialError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| CredentialError::Unreadable(path.to_path_buf(), e))?;

        contents.parse()
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// True if both parts are present and basic-auth should be attempted.
    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

impl FromStr for Credentials {
    type Err = CredentialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Only the first separator splits, passwords may contain ':'
        s.trim()
            .split_once(SEPARATOR)
            .map(|(user, pass)| Credentials::new(user, pass))
            .ok_or(CredentialError::Malformed)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
