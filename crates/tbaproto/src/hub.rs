//! Requests domain servers send to the hub, and the hub's replies.
//!
//! Every field is optional at the serde level so the hub can answer a missing
//! field with a precise `400` instead of a generic parse failure.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::ids::{DomainId, ItemId, UserId};

/// Distinguishes `"field": null` (present) from a missing field.
fn present<'de, D>(d: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(d).map(Some)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verb: Option<BTreeMap<String, String>>,
    /// Only integer depths count; anything else is ignored by the hub.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterReq {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub items: Option<Vec<ItemSpec>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResp {
    pub id: DomainId,
    pub items: Vec<ItemId>,
    pub secret: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreReq {
    #[serde(default)]
    pub domain: Option<DomainId>,
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default)]
    pub user: Option<UserId>,
    /// A number, or a string holding one.
    #[serde(default)]
    pub score: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransferReq {
    #[serde(default)]
    pub domain: Option<DomainId>,
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default)]
    pub user: Option<UserId>,
    #[serde(default)]
    pub item: Option<ItemId>,
    /// `"inventory"` or a spot inside the sending domain; `null` is a spot.
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub to: Option<Value>,
}

/// Exactly one of `location` and `depth` must be present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryReq {
    #[serde(default)]
    pub domain: Option<DomainId>,
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default)]
    pub user: Option<UserId>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub location: Option<Value>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub depth: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkResp {
    pub ok: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResp {
    pub error: String,
}
