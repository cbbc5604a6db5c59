//! Player-facing flows: login, command dispatch and the domain notifications
//! they trigger.

use std::sync::Arc;

use tbaproto::callback::{ArriveReq, DepartReq, DroppedReq, ItemBrief};
use tbaproto::ids::ItemId;
use tbaproto::location::Location;
use tbaproto::player::{Command, CommandReq, Direction, DomainCard, LoginResp};
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, STAGES};
use crate::client::DomainClient;
use crate::error::{HubError, bad_request, conflict, forbidden};
use crate::hub::Hub;
use crate::registry::{DomainRec, UserRec, UserSlot};
use crate::transfer::{Mover, transfer};

pub fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn points(v: f64) -> String {
    let s = format!("{v:.3}");
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// One pass through the outside world for stage `domstate`.
///
/// Awards the current domain's prizes of that depth, then advances
/// `domstate` by one if the stage's progress item is carried. Returns one
/// narrative line per find.
pub fn travel(st: &mut UserRec, catalog: &Catalog) -> Vec<String> {
    let mut lines = Vec::new();
    let stage = st.domstate;
    if stage >= STAGES {
        return lines;
    }

    for id in catalog.prizes_at(st.at, stage) {
        if st.hashad.contains(id) {
            continue;
        }
        let Some(tmpl) = catalog.get(*id) else {
            continue;
        };
        match transfer(st, tmpl, Mover::Hub, Location::Carried) {
            Ok(()) => lines.push(format!("You find a {}.", html_escape(&tmpl.name))),
            Err(e) => debug!(item = %id, err = %e, "prize not awarded"),
        }
    }

    if let Some(key) = catalog.progress_item(stage) {
        if st.carries(key) {
            st.domstate = stage + 1;
            let name = catalog.get(key).map_or("find", |t| t.name.as_str());
            lines.push(format!(
                "You use your {} to get past an obstacle.",
                html_escape(name)
            ));
        }
    }
    lines
}

fn resolve_carried(st: &UserRec, catalog: &Catalog, target: &str) -> Result<ItemId, HubError> {
    let gear = st.carried();
    if let Some(id) = gear.iter().copied().find(|id| id.to_string() == target) {
        return Ok(id);
    }
    let named = gear
        .into_iter()
        .filter(|id| catalog.get(*id).is_some_and(|t| t.name == target))
        .collect::<Vec<_>>();
    match named.as_slice() {
        [] => Err(HubError::NotFound(format!(
            "You have no {} to drop",
            html_escape(target)
        ))),
        [one] => Ok(*one),
        many => {
            let name = html_escape(target);
            let options = many
                .iter()
                .map(|id| format!("<li><code>drop {id}</code> to drop {name} <sub>{id}</sub></li>"))
                .collect::<String>();
            Err(HubError::Ambiguous(format!(
                "You have more than one {name}; say which one you mean:<ul>{options}</ul>"
            )))
        }
    }
}

impl<C: DomainClient> Hub<C> {
    /// Creates a user in a random live domain.
    pub async fn login(&self) -> Result<LoginResp, HubError> {
        self.require_play().await?;
        let domains = self.registry.domains().await;
        if domains.is_empty() {
            return Err(conflict("No domains are registered"));
        }
        let n = u32::try_from(domains.len()).unwrap_or(u32::MAX);
        let home = domains[self.entropy.below(n) as usize].clone();

        let slot = self.registry.insert_user(self.entropy.as_ref(), home.id).await;
        let (id, secret) = {
            let st = slot.state.lock().await;
            (st.id, st.secret.clone())
        };
        info!(user = %id, domain = %home.id, "login");

        {
            let _turn = slot.turn.lock().await;
            self.arrive(&slot, &home, "login").await;
        }

        Ok(LoginResp {
            id,
            secret,
            domain: DomainCard {
                url: home.url.clone(),
                name: home.name.clone(),
                description: home.description.clone(),
            },
        })
    }

    pub async fn command(&self, req: CommandReq) -> Result<String, HubError> {
        let slot = self.auth_user(req.user, req.secret.as_deref()).await?;
        let words = req
            .command
            .ok_or_else(|| bad_request("Command must be a list of words"))?;
        let cmd = Command::parse(&words).map_err(|e| bad_request(e.to_string()))?;

        match cmd {
            Command::Region => self.region(&slot).await,
            Command::Journey(rest) => self.journey(&slot, &rest).await,
            Command::Inventory => self.inventory(&slot).await,
            Command::Score => self.score_card(&slot).await,
            Command::Drop(rest) => self.drop_item(&slot, &rest.join(" ")).await,
            Command::Unknown(verb) => {
                debug!(verb = %verb, "unknown command");
                Ok("I don't know how to do that".to_string())
            }
        }
    }

    async fn current_domain(&self, slot: &UserSlot) -> Result<Arc<DomainRec>, HubError> {
        let at = slot.state.lock().await.at;
        self.registry
            .domain(at)
            .await
            .ok_or_else(|| HubError::NotFound(format!("Domain {at} not known")))
    }

    async fn region(&self, slot: &UserSlot) -> Result<String, HubError> {
        let here = self.current_domain(slot).await?;
        let others = self
            .registry
            .domains()
            .await
            .into_iter()
            .filter(|d| d.id != here.id)
            .map(|d| format!("<strong>{}</strong>", html_escape(&d.name)))
            .collect::<Vec<_>>();

        let mut out = format!(
            "You are in the domain <strong>{}</strong>.\n{}\n",
            html_escape(&here.name),
            html_escape(&here.description)
        );
        if others.is_empty() {
            out.push_str("There is no detail available about other domains in the region.");
        } else {
            out.push_str(&format!("Other domains in the region: {}.", others.join(", ")));
        }
        Ok(out)
    }

    async fn journey(&self, slot: &UserSlot, rest: &[String]) -> Result<String, HubError> {
        let dir = match rest {
            [one] => Direction::parse(one).ok(),
            _ => None,
        }
        .ok_or_else(|| forbidden("I only know how to journey in cardinal directions"))?;

        let _turn = slot.turn.lock().await;
        let here = self.current_domain(slot).await?;
        let uid = slot.state.lock().await.id;

        let bye = DepartReq {
            secret: here.secret.clone(),
            user: uid,
        };
        if let Err(e) = self.client.depart(&here.url, &bye).await {
            warn!(user = %uid, domain = %here.id, err = %e, "depart callback failed");
        }

        let found = {
            let catalog = self.catalog.read().await;
            let mut st = slot.state.lock().await;
            travel(&mut st, &catalog)
        };
        info!(user = %uid, dir = dir.as_str(), found = found.len(), "journey");

        self.arrive(slot, &here, dir.opposite().as_str()).await;

        let mut lines = vec!["You travel in other domains for a time.".to_string()];
        let nothing = found.is_empty();
        lines.extend(found);
        lines.push(if nothing {
            "Finding nothing new, you return to this domain.".to_string()
        } else {
            "You then return to this domain.".to_string()
        });
        Ok(lines.join("\n"))
    }

    async fn inventory(&self, slot: &UserSlot) -> Result<String, HubError> {
        let catalog = self.catalog.read().await;
        let carried = slot.state.lock().await.carried();
        if carried.is_empty() {
            return Ok("You are not carrying anything.".to_string());
        }
        let rows = carried
            .iter()
            .filter_map(|id| catalog.get(*id))
            .map(|t| format!("<li>{} <sub>{}</sub></li>", html_escape(&t.name), t.id))
            .collect::<String>();
        Ok(format!("You are carrying:<ul>{rows}</ul>"))
    }

    async fn score_card(&self, slot: &UserSlot) -> Result<String, HubError> {
        let (uid, scores, domstate) = {
            let st = slot.state.lock().await;
            (st.id, st.score.clone(), st.domstate)
        };

        let mut rows = String::new();
        let mut total = 0.0;
        for (did, v) in &scores {
            let name = match self.registry.domain(*did).await {
                Some(d) => html_escape(&d.name),
                None => format!("{did}"),
            };
            rows.push_str(&format!(
                "<li>{name} <sub>{did}</sub>: {} points</li>",
                points(*v)
            ));
            total += v;
        }
        // Outside-world progress; shown, never stored.
        let others = f64::from(domstate) / 2.0;
        rows.push_str(&format!("<li>Others: {} points</li>", points(others)));
        total += others;

        Ok(format!(
            "Score for user {uid}:<ul>{rows}</ul>Total: {} points.",
            points(total)
        ))
    }

    async fn drop_item(&self, slot: &UserSlot, target: &str) -> Result<String, HubError> {
        if target.trim().is_empty() {
            return Ok(
                "What do you want to drop?\n<code>inventory</code> will show your options."
                    .to_string(),
            );
        }

        let _turn = slot.turn.lock().await;
        let here = self.current_domain(slot).await?;
        let (uid, brief) = {
            let catalog = self.catalog.read().await;
            let st = slot.state.lock().await;
            let id = resolve_carried(&st, &catalog, target)?;
            let brief = catalog
                .get(id)
                .map(|t| t.brief())
                .ok_or_else(|| HubError::NotFound(format!("You have no {target} to drop")))?;
            (st.id, brief)
        };

        let req = DroppedReq {
            secret: here.secret.clone(),
            user: uid,
            item: brief.clone(),
        };
        let spot = match self.client.dropped(&here.url, &req).await {
            Ok(spot) => spot,
            Err(e) => {
                warn!(user = %uid, domain = %here.id, item = %brief.id, err = %e, "dropped callback failed");
                return Err(forbidden("You try to drop it, but the domain won't let you"));
            }
        };

        {
            let catalog = self.catalog.read().await;
            let tmpl = catalog
                .get(brief.id)
                .ok_or_else(|| HubError::NotFound(format!("You have no {target} to drop")))?;
            let mut st = slot.state.lock().await;
            transfer(
                &mut st,
                tmpl,
                Mover::Holder,
                Location::Dropped {
                    domain: here.id,
                    spot,
                },
            )?;
        }
        info!(user = %uid, domain = %here.id, item = %brief.id, "item dropped");
        Ok(format!(
            "{} <sub>{}</sub> dropped.",
            html_escape(&brief.name),
            brief.id
        ))
    }

    /// Tells `dest` what the user brings along. Failures are logged only.
    ///
    /// Callers hold the user's turn.
    async fn arrive(&self, slot: &UserSlot, dest: &DomainRec, from: &str) {
        let req = {
            let catalog = self.catalog.read().await;
            let mut st = slot.state.lock().await;
            st.score.entry(dest.id).or_insert(0.0);
            st.open.insert(dest.id);

            let mut owned = Vec::new();
            let mut carried = Vec::new();
            let mut dropped = Vec::new();
            for (id, loc) in &st.inventory {
                let Some(tmpl) = catalog.get(*id) else {
                    continue;
                };
                match loc {
                    Location::Carried if tmpl.is_home(dest.id) => owned.push(tmpl.brief()),
                    Location::Carried => carried.push(tmpl.brief()),
                    Location::Dropped { domain, spot } if *domain == dest.id => {
                        dropped.push(ItemBrief {
                            location: Some(spot.clone()),
                            ..tmpl.brief()
                        });
                    }
                    Location::Dropped { .. } => {}
                }
            }
            let prize = dest
                .loot
                .iter()
                .filter(|id| !st.inventory.contains_key(id))
                .filter_map(|id| catalog.get(*id))
                .map(|t| ItemBrief {
                    depth: t.depth,
                    ..t.brief()
                })
                .collect();

            ArriveReq {
                secret: dest.secret.clone(),
                user: st.id,
                from: from.to_string(),
                owned,
                carried,
                dropped,
                prize,
            }
        };

        if let Err(e) = self.client.arrive(&dest.url, &req).await {
            warn!(user = %req.user, domain = %dest.id, err = %e, "arrive callback failed");
        }
    }
}
