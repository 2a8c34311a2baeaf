use axum::body::Bytes;
use axum::extract::State;
use axum::response::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use serde_json::{json, Value};

use super::error::ApiError;
use super::{AppState, COOKIE_NAME, SESSION_MAX_AGE_SECS};
use crate::error::Error;
use crate::vault::CredentialRecord;

/// Minimum length of the API key and refresh token.
const MIN_CREDENTIAL_LEN: usize = 4;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionInput {
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    base_url: Option<String>,
}

fn invalid() -> Error {
    Error::Validation("Invalid payload".to_string())
}

/// Validate login input into a credential record.
fn parse_session_input(body: &[u8]) -> Result<CredentialRecord, Error> {
    let input: SessionInput = serde_json::from_slice(body).map_err(|_| invalid())?;

    let api_key = input
        .api_key
        .filter(|k| k.chars().count() >= MIN_CREDENTIAL_LEN)
        .ok_or_else(invalid)?;
    let refresh_token = input
        .refresh_token
        .filter(|t| t.chars().count() >= MIN_CREDENTIAL_LEN)
        .ok_or_else(invalid)?;

    let base_url = match input.base_url {
        None => None,
        Some(raw) => {
            let parsed = url::Url::parse(&raw).map_err(|_| invalid())?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(invalid());
            }
            Some(raw.trim_end_matches('/').to_string())
        }
    };

    Ok(CredentialRecord {
        api_key,
        refresh_token,
        base_url,
    })
}

/// POST /api/session: seal credentials into the session cookie
pub async fn create_session(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Bytes,
) -> Result<(CookieJar, Json<Value>), ApiError> {
    let op = "Failed to create session";
    let record = parse_session_input(&body).map_err(|e| ApiError::from_core(e, op))?;
    let token = state
        .vault
        .seal(&record)
        .map_err(|e| ApiError::from_core(e, op))?;

    let cookie = Cookie::build((COOKIE_NAME, token))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::seconds(SESSION_MAX_AGE_SECS))
        .secure(state.secure_cookies);

    tracing::info!(custom_base_url = record.base_url.is_some(), "Session created");
    Ok((jar.add(cookie), Json(json!({ "ok": true }))))
}

/// DELETE /api/session: clear the session cookie; never fails
pub async fn destroy_session(jar: CookieJar) -> (CookieJar, Json<Value>) {
    let mut cookie = Cookie::build((COOKIE_NAME, "")).path("/").build();
    cookie.make_removal();

    tracing::info!("Session destroyed");
    (jar.add(cookie), Json(json!({ "ok": true })))
}
