// SPDX-License-Identifier: Apache-2.0
//! Vault/OpenBao HTTP API integration.
//!
//! Supports:
//! - Token authentication (inline or token file)
//! - AppRole authentication
//! - Reads from KV v1, KV v2 and other engines that answer a plain GET

mod auth;
mod client;
mod kv;

pub use auth::{AppRoleAuth, Credentials, TokenSource};
pub use client::VaultClient;
