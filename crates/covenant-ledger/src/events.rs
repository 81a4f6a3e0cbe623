use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::LedgerError;

/// An event emitted by an invocation and published once it commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEvent {
    /// Invocation that emitted the event.
    pub tx_id: Uuid,
    /// Invocation timestamp (seconds).
    pub timestamp: i64,
    /// Event name, e.g. `CreateCoin`.
    pub name: String,
    /// JSON-encoded entity after the transition.
    pub payload: Vec<u8>,
}

impl LedgerEvent {
    /// Decode the payload.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, LedgerError> {
        Ok(serde_json::from_slice(&self.payload)?)
    }

    /// The payload as UTF-8 text, for logging.
    pub fn payload_str(&self) -> &str {
        std::str::from_utf8(&self.payload).unwrap_or("<binary>")
    }
}
