use std::collections::{BTreeMap, BTreeSet, HashMap};

use tbaproto::callback::ItemBrief;
use tbaproto::hub::ItemSpec;
use tbaproto::ids::{DomainId, ItemId};

use crate::entropy::{Entropy, shuffle};
use crate::registry::random_id;

/// Outside-world side-quest stages; `domstate` runs `0..=STAGES`.
pub const STAGES: u32 = 3;

const DEFAULT_ITEM_NAME: &str = "thing";
const DEFAULT_ITEM_DESCRIPTION: &str = "error: owner did not describe this item";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Home {
    Domain(DomainId),
    /// Synthetic items of the simulated world between domains.
    Outside,
}

#[derive(Debug, Clone)]
pub struct ItemTemplate {
    pub id: ItemId,
    pub name: String,
    pub description: String,
    pub verb: BTreeMap<String, String>,
    pub home: Home,
    pub hosts: BTreeSet<DomainId>,
    pub depth: Option<u32>,
}

impl ItemTemplate {
    pub fn is_home(&self, did: DomainId) -> bool {
        self.home == Home::Domain(did)
    }

    /// Home or hosting domain: may originate the item.
    pub fn owned_by(&self, did: DomainId) -> bool {
        self.is_home(did) || self.hosts.contains(&did)
    }

    pub fn brief(&self) -> ItemBrief {
        ItemBrief {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            verb: self.verb.clone(),
            depth: None,
            location: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct Catalog {
    items: HashMap<ItemId, ItemTemplate>,
    // home domain -> depth -> prize ids, ascending
    prizes: HashMap<DomainId, BTreeMap<u32, Vec<ItemId>>>,
    // progress[depth] unlocks stage depth+1
    progress: Vec<ItemId>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: ItemId) -> Option<&ItemTemplate> {
        self.items.get(&id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Adds a template submitted by a registering domain.
    pub fn add_registered(
        &mut self,
        home: DomainId,
        spec: &ItemSpec,
        entropy: &dyn Entropy,
    ) -> ItemId {
        let id = self.fresh_id(entropy);
        let depth = spec
            .depth
            .as_ref()
            .and_then(|d| d.as_i64())
            .map(|d| d.clamp(0, i64::from(u32::MAX)) as u32);
        self.items.insert(
            id,
            ItemTemplate {
                id,
                name: spec
                    .name
                    .clone()
                    .unwrap_or_else(|| DEFAULT_ITEM_NAME.to_string()),
                description: spec
                    .description
                    .clone()
                    .unwrap_or_else(|| DEFAULT_ITEM_DESCRIPTION.to_string()),
                verb: spec.verb.clone().unwrap_or_default(),
                home: Home::Domain(home),
                hosts: BTreeSet::new(),
                depth,
            },
        );
        id
    }

    /// Generates the outside-world items and indexes prizes.
    ///
    /// Every domain in `hosts` may vend every outside item; the returned ids
    /// become each host's loot list. Runs once, during the setup -> play
    /// transition.
    pub fn build_outside_world(&mut self, hosts: &[DomainId], entropy: &dyn Entropy) -> Vec<ItemId> {
        let hosts: BTreeSet<DomainId> = hosts.iter().copied().collect();

        let mut names = OUTSIDE_NAMES.to_vec();
        shuffle(entropy, &mut names);
        let mut verbs = OUTSIDE_VERBS.to_vec();
        shuffle(entropy, &mut verbs);

        let mut loot = Vec::new();
        self.progress.clear();
        let mut next_verb = 0;
        for depth in 0..STAGES {
            let take = depth as usize + 1;
            let vs = &verbs[next_verb..(next_verb + take).min(verbs.len())];
            next_verb += take;
            let name = names[depth as usize];
            let how = vs
                .iter()
                .map(|(v, _)| format!("<code>{}</code>", v.replace("tell", "tell about")))
                .collect::<Vec<_>>()
                .join(" and ");
            let id = self.fresh_id(entropy);
            self.items.insert(
                id,
                ItemTemplate {
                    id,
                    name: name.to_string(),
                    description: format!("{}\nIt looks like you could {how} it.", outside_blurb(name, depth)),
                    verb: vs
                        .iter()
                        .map(|(v, text)| (v.to_string(), text.replace("{name}", name)))
                        .collect(),
                    home: Home::Outside,
                    hosts: hosts.clone(),
                    depth: Some(depth),
                },
            );
            self.progress.push(id);
            loot.push(id);
        }

        // One decoy with no verbs at a random depth.
        let name = names[STAGES as usize];
        let depth = entropy.below(STAGES);
        let id = self.fresh_id(entropy);
        self.items.insert(
            id,
            ItemTemplate {
                id,
                name: name.to_string(),
                description: outside_blurb(name, depth),
                verb: BTreeMap::new(),
                home: Home::Outside,
                hosts,
                depth: Some(depth),
            },
        );
        loot.push(id);

        self.index_prizes();
        loot
    }

    fn index_prizes(&mut self) {
        self.prizes.clear();
        let mut ids = self.items.keys().copied().collect::<Vec<_>>();
        ids.sort();
        for id in ids {
            let t = &self.items[&id];
            let (Home::Domain(home), Some(depth)) = (t.home, t.depth) else {
                continue;
            };
            self.prizes
                .entry(home)
                .or_default()
                .entry(depth)
                .or_default()
                .push(id);
        }
    }

    /// Items of `home` with the given depth, found while journeying.
    pub fn prizes_at(&self, home: DomainId, depth: u32) -> &[ItemId] {
        self.prizes
            .get(&home)
            .and_then(|m| m.get(&depth))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The outside item that must be carried to clear stage `depth`.
    pub fn progress_item(&self, depth: u32) -> Option<ItemId> {
        self.progress.get(depth as usize).copied()
    }

    fn fresh_id(&self, entropy: &dyn Entropy) -> ItemId {
        ItemId(random_id(entropy, self.items.len(), |id| {
            self.items.contains_key(&ItemId(id))
        }))
    }
}

const OUTSIDE_NAMES: [&str; 4] = ["doodad", "whatsit", "thingamajig", "gizmo"];

const OUTSIDE_VERBS: [(&str, &str); 6] = [
    (
        "use",
        "You use the {name}. Nothing visible happens, yet you feel oddly accomplished.",
    ),
    (
        "open",
        "You pry the {name} open. Inside is a slightly smaller {name}, which you close again.",
    ),
    (
        "close",
        "You push the {name} shut. It creaks back open the moment you let go.",
    ),
    (
        "read",
        "Tiny letters run around the rim of the {name}:\n\n<em>property of somewhere else</em>",
    ),
    (
        "tell",
        "You announce that you own a {name}. Nobody answers, which feels like a compliment.",
    ),
    (
        "shake",
        "You shake the {name}. Something inside rattles, then goes quiet.",
    ),
];

fn outside_blurb(name: &str, depth: u32) -> String {
    format!("Nobody is quite sure what this {name} is, but it was reported as a depth-{depth} find.")
}
