//! Refresh-token grant against the vendor OAuth endpoint.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::vault::CredentialRecord;

#[derive(Serialize)]
struct RefreshRequest<'a> {
    grant_type: &'static str,
    refresh_token: &'a str,
    api_key: &'a str,
}

#[derive(Deserialize)]
struct RefreshResponse {
    #[serde(default)]
    access_token: Option<String>,
}

/// A short-lived bearer token and the base URL it is valid against.
pub struct AccessGrant {
    pub access_token: String,
    pub base_url: String,
}

/// Exchanges refresh tokens for access tokens. Nothing is cached: every call
/// is a fresh round trip.
#[derive(Clone)]
pub struct TokenBroker {
    client: reqwest::Client,
    default_base_url: String,
}

impl TokenBroker {
    pub fn new(client: reqwest::Client, default_base_url: impl Into<String>) -> Self {
        Self {
            client,
            default_base_url: default_base_url.into(),
        }
    }

    /// The base URL a record resolves to, with any trailing slash removed.
    pub fn effective_base_url(&self, record: &CredentialRecord) -> String {
        record
            .base_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .unwrap_or(&self.default_base_url)
            .trim_end_matches('/')
            .to_string()
    }

    /// POST `{base}/oauth/token` with a refresh-token grant.
    pub async fn refresh(&self, record: &CredentialRecord) -> Result<AccessGrant, Error> {
        let base_url = self.effective_base_url(record);

        let response = self
            .client
            .post(format!("{base_url}/oauth/token"))
            .json(&RefreshRequest {
                grant_type: "refresh_token",
                refresh_token: &record.refresh_token,
                api_key: &record.api_key,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::upstream_auth(status, &body));
        }

        let body = response.bytes().await?;
        let parsed: RefreshResponse = serde_json::from_slice(&body)
            .map_err(|e| Error::Protocol(format!("token response is not JSON: {e}")))?;

        match parsed.access_token {
            Some(access_token) if !access_token.is_empty() => {
                tracing::debug!(base_url = %base_url, "Access token refreshed");
                Ok(AccessGrant {
                    access_token,
                    base_url,
                })
            }
            _ => Err(Error::Protocol("no access_token returned".to_string())),
        }
    }
}
