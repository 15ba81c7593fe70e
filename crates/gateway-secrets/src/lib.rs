// SPDX-License-Identifier: Apache-2.0
//! Read-only secret store access for the vault gateway.
//!
//! This crate provides:
//! - [`SecretStoreClient`], a single-operation read interface
//! - [`VaultClient`], its implementation over the Vault/OpenBao HTTP API
//! - [`ConnectionValidator`], a bounded one-shot startup diagnostic
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use vault_gateway_secrets::{ConnectionValidator, SecretPath, StoreConfig, VaultClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = StoreConfig {
//!     address: "https://vault.internal:8200".to_string(),
//!     token: Some("s.example".to_string()),
//!     ..Default::default()
//! };
//!
//! let client = VaultClient::new(&config)?;
//! let validator = ConnectionValidator::new(
//!     SecretPath::new("secret/data/myapp")?,
//!     Duration::from_secs(10),
//! );
//! let outcome = validator.validate(&client).await;
//! outcome.log(validator.path());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod path;
pub mod store;
pub mod validator;
pub mod vault;

// Re-exports for convenience
pub use config::{AuthMethod, StoreConfig, ValidationConfig};
pub use error::{ErrorKind, InvalidSecretPath, SecretStoreError};
pub use path::SecretPath;
pub use store::{KvMetadata, Lease, SecretPayload, SecretStoreClient, StaticSecretStore};
pub use validator::{ConnectionValidator, ValidationOutcome};
pub use vault::VaultClient;
