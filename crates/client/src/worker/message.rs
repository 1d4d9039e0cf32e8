//! Control messages sent from a page to its worker.

use serde::{Deserialize, Serialize};

/// The only command a page can send: `{ "type": "SKIP_WAITING" }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ControlMessage {
    #[serde(rename = "SKIP_WAITING")]
    SkipWaiting,
}

impl ControlMessage {
    /// Decode a structured message. Anything unrecognised yields `None`.
    pub fn decode(value: &serde_json::Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}
