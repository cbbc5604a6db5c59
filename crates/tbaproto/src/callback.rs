//! Bodies the hub POSTs to a domain server's callback endpoints.
//!
//! Every callback carries the domain's own secret so the domain can tell the
//! hub apart from anyone else poking at it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::{ItemId, UserId};
use crate::location::Spot;

/// The public face of an item template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemBrief {
    pub id: ItemId,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub verb: BTreeMap<String, String>,
    /// Set for prizes only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<u32>,
    /// Set for items dropped in the receiving domain only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Spot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArriveReq {
    pub secret: String,
    pub user: UserId,
    /// `login`, or the direction the user arrives from.
    pub from: String,
    /// Carried items whose home is the receiving domain.
    pub owned: Vec<ItemBrief>,
    /// Carried items from elsewhere.
    pub carried: Vec<ItemBrief>,
    /// Items the user left in the receiving domain.
    pub dropped: Vec<ItemBrief>,
    /// Loot of the receiving domain the user has never held.
    pub prize: Vec<ItemBrief>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepartReq {
    pub secret: String,
    pub user: UserId,
}

/// The reply body is the spot, as any JSON value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DroppedReq {
    pub secret: String,
    pub user: UserId,
    pub item: ItemBrief,
}
