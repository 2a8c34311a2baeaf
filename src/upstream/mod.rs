//! Calls to the vendor cloud API.

pub mod relay;
pub mod token;

pub use relay::{CommandPayload, DeviceState, Relay};
pub use token::TokenBroker;

use std::time::Duration;

/// Build the HTTP client shared by the broker and the relay.
///
/// The core enforces no operation-level timeout, so the client bounds both
/// connecting and the whole request.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, String> {
    reqwest::Client::builder()
        .connect_timeout(timeout)
        .timeout(timeout)
        .build()
        .map_err(|e| format!("failed to build HTTP client: {e}"))
}
