//! The credential vault: one reusable core that seals sessions and relays
//! device calls on their behalf.

pub mod codec;

pub use codec::{CredentialCodec, CredentialRecord};

use serde_json::Value;
use std::sync::Arc;

use crate::error::Error;
use crate::upstream::{CommandPayload, DeviceState, Relay, TokenBroker};

/// Composes the codec, broker and relay. Cheap to clone; holds no
/// per-session state.
#[derive(Clone)]
pub struct Vault {
    codec: Arc<CredentialCodec>,
    broker: TokenBroker,
    relay: Relay,
}

impl Vault {
    pub fn new(codec: CredentialCodec, broker: TokenBroker, relay: Relay) -> Self {
        Self {
            codec: Arc::new(codec),
            broker,
            relay,
        }
    }

    /// Seal a record into a session token.
    pub fn seal(&self, record: &CredentialRecord) -> Result<String, Error> {
        self.codec.encrypt(record)
    }

    /// Open a session token. An absent token is an authentication failure.
    pub fn open(&self, token: Option<&str>) -> Result<CredentialRecord, Error> {
        match token {
            Some(token) if !token.is_empty() => self.codec.decrypt(token),
            _ => Err(Error::Authentication),
        }
    }

    /// refresh -> list, for a record obtained from [`Vault::open`].
    pub async fn list_fans(&self, record: &CredentialRecord) -> Result<Vec<DeviceState>, Error> {
        let grant = self.broker.refresh(record).await?;
        self.relay
            .list_devices(&grant.access_token, &grant.base_url)
            .await
    }

    /// refresh -> command, for a record obtained from [`Vault::open`].
    pub async fn send_command(
        &self,
        record: &CredentialRecord,
        device_id: &str,
        payload: &CommandPayload,
    ) -> Result<Value, Error> {
        let grant = self.broker.refresh(record).await?;
        self.relay
            .send_command(&grant.access_token, &grant.base_url, device_id, payload)
            .await
    }
}
