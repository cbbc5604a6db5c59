use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::DomainId;

/// Wire token for "carried by the user".
pub const INVENTORY: &str = "inventory";

/// A domain-local place, opaque to the hub.
///
/// Whatever JSON the domain answered `/dropped` with (or sent as `to` on
/// `/transfer`) is kept verbatim and echoed back on `/arrive`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Spot(pub Value);

#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    Carried,
    Dropped { domain: DomainId, spot: Spot },
}

impl Location {
    /// Resolves a `to`/`location` value sent by `domain`.
    ///
    /// `"inventory"` means carried; anything else names a spot inside the
    /// sending domain. A domain can never name another domain's spot.
    pub fn from_wire(v: Value, domain: DomainId) -> Self {
        if v.as_str() == Some(INVENTORY) {
            Location::Carried
        } else {
            Location::Dropped {
                domain,
                spot: Spot(v),
            }
        }
    }

    pub fn is_carried(&self) -> bool {
        matches!(self, Location::Carried)
    }

    pub fn domain(&self) -> Option<DomainId> {
        match self {
            Location::Carried => None,
            Location::Dropped { domain, .. } => Some(*domain),
        }
    }
}
