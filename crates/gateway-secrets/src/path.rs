// SPDX-License-Identifier: Apache-2.0
//! Validated secret store paths.

use crate::error::InvalidSecretPath;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Location of a secret in the store namespace, e.g. `secret/data/myapp`.
///
/// Surrounding slashes are stripped. The path must be non-empty and may not
/// contain empty, `.` or `..` segments, whitespace or control characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SecretPath(String);

impl SecretPath {
    pub fn new(path: impl AsRef<str>) -> Result<Self, InvalidSecretPath> {
        let raw = path.as_ref();
        let invalid = |reason| InvalidSecretPath {
            path: raw.to_string(),
            reason,
        };

        let trimmed = raw.trim_matches('/');
        if trimmed.is_empty() {
            return Err(invalid("path is empty"));
        }
        if trimmed.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(invalid("path contains whitespace or control characters"));
        }
        for segment in trimmed.split('/') {
            match segment {
                "" => return Err(invalid("path contains an empty segment")),
                "." | ".." => return Err(invalid("path contains a relative segment")),
                _ => {}
            }
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The secrets engine mount, i.e. the first segment.
    pub fn mount(&self) -> &str {
        self.0.split('/').next().unwrap_or(&self.0)
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }
}

impl fmt::Display for SecretPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SecretPath {
    type Err = InvalidSecretPath;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for SecretPath {
    type Error = InvalidSecretPath;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SecretPath> for String {
    fn from(path: SecretPath) -> Self {
        path.0
    }
}

impl AsRef<str> for SecretPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
