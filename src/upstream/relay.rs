//! Authenticated device calls: list fans and send a fan command.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::Error;

/// One fan as reported by the vendor. Known fields are typed; anything else
/// is passed through unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceState {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub online: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_usage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "device id must be a string or number, got {other}"
        ))),
    }
}

/// Body of a fan command, relayed to the vendor unchanged.
///
/// Only the outer shape is checked here: it must be a JSON object. Keys such
/// as `speed`, `mode` and `power` are neither required nor range-checked; the
/// vendor rejects what it does not accept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandPayload(pub Map<String, Value>);

impl CommandPayload {
    /// Parse a request body. Anything that is not a JSON object is a
    /// validation error.
    pub fn from_slice(body: &[u8]) -> Result<Self, Error> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| Error::Validation(format!("Invalid payload: {e}")))?;
        match value {
            Value::Object(map) => Ok(CommandPayload(map)),
            _ => Err(Error::Validation(
                "Invalid payload: expected a JSON object".to_string(),
            )),
        }
    }
}

type ShapeMatcher = fn(&Value) -> Option<&Vec<Value>>;

fn data_field(body: &Value) -> Option<&Vec<Value>> {
    body.get("data")?.as_array()
}

fn fans_field(body: &Value) -> Option<&Vec<Value>> {
    body.get("fans")?.as_array()
}

fn bare_array(body: &Value) -> Option<&Vec<Value>> {
    body.as_array()
}

/// Accepted list shapes, in priority order.
const LIST_SHAPES: [(&str, ShapeMatcher); 3] = [
    ("data", data_field),
    ("fans", fans_field),
    ("bare", bare_array),
];

/// Normalize a list response into an ordered sequence of devices.
///
/// Entries without a usable `id` are logged and skipped; the rest keep their
/// upstream order.
pub fn normalize_device_list(body: &Value) -> Result<Vec<DeviceState>, Error> {
    let (shape, items) = LIST_SHAPES
        .iter()
        .find_map(|(name, matcher)| matcher(body).map(|items| (*name, items)))
        .ok_or_else(|| {
            Error::Protocol("device list is not under `data`, `fans`, or a bare array".to_string())
        })?;

    tracing::debug!(shape, count = items.len(), "Device list normalized");

    let devices = items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| match DeviceState::deserialize(item) {
            Ok(device) => Some(device),
            Err(e) => {
                tracing::warn!(index, error = %e, "Skipping malformed device entry");
                None
            }
        })
        .collect();

    Ok(devices)
}

/// Issues device calls with a bearer token from the broker.
#[derive(Clone)]
pub struct Relay {
    client: reqwest::Client,
}

impl Relay {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// GET `{base}/api/v1/fans`.
    pub async fn list_devices(
        &self,
        access_token: &str,
        base_url: &str,
    ) -> Result<Vec<DeviceState>, Error> {
        let response = self
            .client
            .get(format!("{base_url}/api/v1/fans"))
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::upstream(status, &body));
        }

        let bytes = response.bytes().await?;
        let body: Value = serde_json::from_slice(&bytes)
            .map_err(|e| Error::Protocol(format!("device list is not JSON: {e}")))?;

        normalize_device_list(&body)
    }

    /// POST `{base}/api/v1/fans/{id}/command`.
    ///
    /// Some commands answer with no content; an empty or non-JSON success body
    /// is returned as an empty acknowledgment.
    pub async fn send_command(
        &self,
        access_token: &str,
        base_url: &str,
        device_id: &str,
        payload: &CommandPayload,
    ) -> Result<Value, Error> {
        let url = format!(
            "{base_url}/api/v1/fans/{}/command",
            urlencoding::encode(device_id)
        );

        let response = self
            .client
            .post(url)
            .bearer_auth(access_token)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::upstream(status, &body));
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::Object(Map::new())))
    }
}
