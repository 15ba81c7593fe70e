// SPDX-License-Identifier: Apache-2.0
//! Error types for secret store access.

use std::fmt;
use thiserror::Error;

/// Boxed underlying cause carried by [`SecretStoreError`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Coarse classification of a failed secret store call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Network, TLS or timeout failure before a usable response arrived.
    Connection,
    /// The store rejected the credential.
    Auth,
    /// The store answered, but with a malformed body or an unexpected status.
    Store,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Connection => "ConnectionError",
            ErrorKind::Auth => "AuthError",
            ErrorKind::Store => "StoreError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a secret store call.
///
/// "No data at path" is not an error; reads return `Ok(None)` for it.
#[derive(Debug, Error)]
pub enum SecretStoreError {
    #[error("secret store unreachable: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("secret store rejected credentials: {message}")]
    Auth {
        status: Option<u16>,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("unexpected secret store response: {message}")]
    Store {
        status: Option<u16>,
        message: String,
        #[source]
        source: Option<BoxError>,
    },
}

impl SecretStoreError {
    pub fn connection(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Connection {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn auth(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Auth {
            status,
            message: message.into(),
            source: None,
        }
    }

    pub fn store(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Store {
            status,
            message: message.into(),
            source: None,
        }
    }

    /// Attach an underlying cause, replacing any existing one.
    pub fn with_source(mut self, cause: impl Into<BoxError>) -> Self {
        match &mut self {
            Self::Connection { source, .. }
            | Self::Auth { source, .. }
            | Self::Store { source, .. } => *source = Some(cause.into()),
        }
        self
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connection { .. } => ErrorKind::Connection,
            Self::Auth { .. } => ErrorKind::Auth,
            Self::Store { .. } => ErrorKind::Store,
        }
    }

    /// HTTP status returned by the store, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Connection { .. } => None,
            Self::Auth { status, .. } | Self::Store { status, .. } => *status,
        }
    }

    /// The error message followed by every underlying cause, `: `-separated.
    pub fn display_chain(&self) -> String {
        let mut out = self.to_string();
        let mut cause = std::error::Error::source(self);
        while let Some(err) = cause {
            out.push_str(": ");
            out.push_str(&err.to_string());
            cause = err.source();
        }
        out
    }
}

/// Rejected [`SecretPath`](crate::SecretPath) input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid secret path {path:?}: {reason}")]
pub struct InvalidSecretPath {
    pub path: String,
    pub reason: &'static str,
}
