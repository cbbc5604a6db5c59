use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use tbaproto::ids::{DomainId, ItemId, UserId};
use tbaproto::location::Location;
use tokio::sync::{Mutex, RwLock};

use crate::entropy::Entropy;
use crate::error::{HubError, conflict};

const ID_SPACE_MIN: u32 = 1000;
const TRIES_PER_SPACE: usize = 16;

/// Picks an unused id by random draws.
///
/// The space grows with the number of ids in use, so draws stay cheap and ids
/// carry no ordering.
pub fn random_id(entropy: &dyn Entropy, in_use: usize, taken: impl Fn(u32) -> bool) -> u32 {
    let mut space = ID_SPACE_MIN.max(u32::try_from(in_use.saturating_mul(4)).unwrap_or(u32::MAX));
    loop {
        for _ in 0..TRIES_PER_SPACE {
            let id = entropy.below(space);
            if !taken(id) {
                return id;
            }
        }
        space = space.saturating_mul(2);
    }
}

#[derive(Debug, Clone)]
pub struct DomainRec {
    pub id: DomainId,
    pub url: String,
    pub name: String,
    pub description: String,
    pub secret: String,
    /// Outside-world items this domain vends; filled when play starts.
    pub loot: Vec<ItemId>,
}

#[derive(Debug, Clone)]
pub struct UserRec {
    pub id: UserId,
    pub secret: String,
    /// Current domain.
    pub at: DomainId,
    pub open: BTreeSet<DomainId>,
    pub inventory: BTreeMap<ItemId, Location>,
    pub domstate: u32,
    pub score: BTreeMap<DomainId, f64>,
    pub hashad: BTreeSet<ItemId>,
}

impl UserRec {
    pub fn new(id: UserId, secret: String, at: DomainId) -> Self {
        Self {
            id,
            secret,
            at,
            open: BTreeSet::from([at]),
            inventory: BTreeMap::new(),
            domstate: 0,
            score: BTreeMap::new(),
            hashad: BTreeSet::new(),
        }
    }

    pub fn carries(&self, item: ItemId) -> bool {
        self.inventory.get(&item).is_some_and(Location::is_carried)
    }

    pub fn carried(&self) -> Vec<ItemId> {
        self.items_at(&Location::Carried)
    }

    pub fn items_at(&self, loc: &Location) -> Vec<ItemId> {
        self.inventory
            .iter()
            .filter(|(_, l)| *l == loc)
            .map(|(id, _)| *id)
            .collect()
    }
}

/// A user's record plus the gate serializing that user's commands.
///
/// `turn` may be held across outbound domain calls; `state` never is.
#[derive(Debug)]
pub struct UserSlot {
    pub turn: Mutex<()>,
    pub state: Mutex<UserRec>,
}

#[derive(Debug, Default)]
pub struct Registry {
    domains: RwLock<BTreeMap<DomainId, Arc<DomainRec>>>,
    users: RwLock<HashMap<UserId, Arc<UserSlot>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn domain(&self, id: DomainId) -> Option<Arc<DomainRec>> {
        self.domains.read().await.get(&id).cloned()
    }

    pub async fn domains(&self) -> Vec<Arc<DomainRec>> {
        self.domains.read().await.values().cloned().collect()
    }

    pub async fn domain_count(&self) -> usize {
        self.domains.read().await.len()
    }

    pub async fn url_taken(&self, url: &str) -> bool {
        self.domains.read().await.values().any(|d| d.url == url)
    }

    /// Allocates an id and stores the domain with an empty loot list.
    ///
    /// The url check and the cap (`max_domains`, 0 = unlimited) are made
    /// under the same write lock as the insert.
    pub async fn insert_domain(
        &self,
        entropy: &dyn Entropy,
        url: String,
        name: String,
        description: String,
        max_domains: usize,
    ) -> Result<Arc<DomainRec>, HubError> {
        let mut domains = self.domains.write().await;
        if domains.values().any(|d| d.url == url) {
            return Err(conflict("Cannot register same domain more than once"));
        }
        if max_domains > 0 && domains.len() >= max_domains {
            return Err(conflict(format!(
                "This hub only supports {max_domains} domain(s) at a time"
            )));
        }
        let id = DomainId(random_id(entropy, domains.len(), |id| {
            domains.contains_key(&DomainId(id))
        }));
        let rec = Arc::new(DomainRec {
            id,
            url,
            name,
            description,
            secret: entropy.secret(),
            loot: Vec::new(),
        });
        domains.insert(id, rec.clone());
        Ok(rec)
    }

    pub async fn set_loot(&self, id: DomainId, loot: Vec<ItemId>) {
        let mut domains = self.domains.write().await;
        if let Some(d) = domains.get_mut(&id) {
            Arc::make_mut(d).loot = loot;
        }
    }

    pub async fn user(&self, id: UserId) -> Option<Arc<UserSlot>> {
        self.users.read().await.get(&id).cloned()
    }

    /// Allocates an id and secret for a user starting in `at`.
    pub async fn insert_user(&self, entropy: &dyn Entropy, at: DomainId) -> Arc<UserSlot> {
        let mut users = self.users.write().await;
        let id = UserId(random_id(entropy, users.len(), |id| {
            users.contains_key(&UserId(id))
        }));
        let slot = Arc::new(UserSlot {
            turn: Mutex::new(()),
            state: Mutex::new(UserRec::new(id, entropy.secret(), at)),
        });
        users.insert(id, slot.clone());
        slot
    }
}
