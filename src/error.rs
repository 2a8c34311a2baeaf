//! Error taxonomy shared by the vault, the token broker and the relay.
//!
//! The HTTP layer decides how much of this reaches the client; see
//! [`crate::routes::error`].

use thiserror::Error;

/// Maximum length for upstream response bodies kept inside errors.
const MAX_ERROR_BODY_LENGTH: usize = 500;

#[derive(Error, Debug)]
pub enum Error {
    /// Malformed client input. Never retried.
    #[error("invalid payload: {0}")]
    Validation(String),

    /// No session cookie was presented.
    #[error("not authenticated")]
    Authentication,

    /// The session token could not be split into nonce, tag and ciphertext.
    #[error("session token malformed: {0}")]
    Format(String),

    /// The authentication tag did not verify (tampered or wrong key).
    #[error("session token failed integrity check")]
    Integrity,

    #[error("session token could not be sealed")]
    Encryption,

    /// The vendor rejected the refresh-token grant.
    #[error("refresh failed: {status} {body}")]
    UpstreamAuth { status: u16, body: String },

    /// The vendor rejected a device operation.
    #[error("upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },

    /// The vendor answered successfully but broke its documented contract.
    #[error("upstream protocol violation: {0}")]
    Protocol(String),

    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub fn upstream_auth(status: reqwest::StatusCode, body: &str) -> Self {
        Error::UpstreamAuth {
            status: status.as_u16(),
            body: truncate_body(body),
        }
    }

    pub fn upstream(status: reqwest::StatusCode, body: &str) -> Self {
        Error::Upstream {
            status: status.as_u16(),
            body: truncate_body(body),
        }
    }

    /// True for failures that stem from the session cookie itself.
    pub fn is_session_failure(&self) -> bool {
        matches!(
            self,
            Error::Authentication | Error::Format(_) | Error::Integrity
        )
    }
}

/// Truncate a response body to avoid logging excessive data.
fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY_LENGTH;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!(
        "{}... (truncated, {} total bytes)",
        &body[..end],
        body.len()
    )
}
