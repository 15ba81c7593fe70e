// SPDX-License-Identifier: Apache-2.0
//! Response shapes of the Vault HTTP API and their conversion to payloads.

use crate::error::SecretStoreError;
use crate::store::{KvMetadata, Lease, SecretPayload};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Generic Vault API response wrapper.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub warnings: Option<Vec<String>>,
    #[serde(default)]
    pub auth: Option<AuthInfo>,
    #[serde(default)]
    pub lease_id: Option<String>,
    #[serde(default)]
    pub lease_duration: Option<u64>,
    #[serde(default)]
    pub renewable: Option<bool>,
}

/// Authentication info from a login response.
#[derive(Debug, Deserialize)]
pub struct AuthInfo {
    pub client_token: String,
    #[serde(default)]
    pub policies: Vec<String>,
    #[serde(default)]
    pub lease_duration: u64,
    #[serde(default)]
    pub renewable: bool,
}

/// Error body returned with non-2xx statuses.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub errors: Vec<String>,
}

/// Convert a read response into a payload.
///
/// KV v2 responses nest the document under `data.data` next to
/// `data.metadata`; they are unwrapped so the payload holds the document keys.
/// Anything else is taken as a flat KV v1 style document. A missing or null
/// `data` means there is nothing at the path.
pub fn payload_from_response(
    response: ApiResponse<Value>,
) -> Result<Option<SecretPayload>, SecretStoreError> {
    let lease = lease_of(&response);

    let map = match response.data {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Object(map)) => map,
        Some(other) => {
            return Err(SecretStoreError::store(
                Some(200),
                format!("secret data is a JSON {}, expected an object", type_name(&other)),
            ))
        }
    };

    let mut payload = if is_kv2_document(&map) {
        kv2_payload(map)?
    } else {
        SecretPayload::new(map.into_iter().collect())
    };
    payload.lease = lease;
    Ok(Some(payload))
}

/// KV v2 reads return exactly `data` and `metadata`, each an object or null.
fn is_kv2_document(map: &Map<String, Value>) -> bool {
    let object_or_null = |key: &str| matches!(map.get(key), Some(Value::Object(_) | Value::Null));
    map.len() == 2 && object_or_null("data") && object_or_null("metadata")
}

fn kv2_payload(mut map: Map<String, Value>) -> Result<SecretPayload, SecretStoreError> {
    let metadata = match map.remove("metadata") {
        Some(value @ Value::Object(_)) => Some(
            serde_json::from_value::<KvMetadata>(value).map_err(|e| {
                SecretStoreError::store(Some(200), "malformed KV v2 metadata").with_source(e)
            })?,
        ),
        _ => None,
    };

    // A soft-deleted or destroyed version comes back with `data: null`.
    let data = match map.remove("data") {
        Some(Value::Object(inner)) => inner.into_iter().collect(),
        _ => Default::default(),
    };

    Ok(SecretPayload {
        data,
        metadata,
        lease: None,
    })
}

fn lease_of<T>(response: &ApiResponse<T>) -> Option<Lease> {
    let lease_id = response.lease_id.clone().filter(|id| !id.is_empty());
    let duration_secs = response.lease_duration.filter(|d| *d > 0);
    if lease_id.is_none() && duration_secs.is_none() {
        return None;
    }
    Some(Lease {
        lease_id,
        duration_secs,
        renewable: response.renewable.unwrap_or(false),
    })
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Human-readable message from an error body, falling back to the raw text.
pub fn error_message(body: &str) -> String {
    const MAX_LEN: usize = 256;

    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if !parsed.errors.is_empty() {
            return parsed.errors.join("; ");
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response body".to_string();
    }
    trimmed.chars().take(MAX_LEN).collect()
}
