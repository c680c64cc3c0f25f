//! Request and response exchanged during one sync cycle.

use crate::{error::Result, ChangeList, ItemId, ItemValue, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sent by a client to the server.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    /// The client's last confirmed server-time checkpoint
    pub timestamp: Timestamp,
    /// The client's wall clock when the request was built, used only to
    /// calibrate change timestamps
    pub client_time: Timestamp,
    /// Every unconfirmed local change list, keyed by item id
    pub change_lists: BTreeMap<ItemId, ChangeList>,
}

/// Returned by the server.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    /// The client's new checkpoint
    pub timestamp: Timestamp,
    /// Authoritative values the client must adopt, keyed by item id
    pub changes: BTreeMap<ItemId, ItemValue>,
}

impl SyncRequest {
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl SyncResponse {
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
