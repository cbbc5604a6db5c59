//! Operations domain servers (and the operator adding them) call on the hub.

use std::sync::Arc;

use serde_json::Value;
use tbaproto::hub::{OkResp, QueryReq, RegisterReq, RegisterResp, ScoreReq, TransferReq};
use tbaproto::ids::{ItemId, UserId};
use tbaproto::location::Location;
use tracing::{debug, info};

use crate::client::DomainClient;
use crate::error::{HubError, bad_request, conflict};
use crate::guard::Mode;
use crate::hub::Hub;
use crate::orchestrator::html_escape;
use crate::registry::UserSlot;
use crate::transfer::{Mover, transfer};

/// Highest score a domain may award.
pub const MAX_SCORE: f64 = 1.005;

fn ok(msg: &str) -> OkResp {
    OkResp {
        ok: msg.to_string(),
    }
}

fn parse_score(v: Option<&Value>) -> Result<f64, HubError> {
    let score = match v {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    score.ok_or_else(|| bad_request("Numeric score required"))
}

fn integral(v: &Value) -> Option<i64> {
    v.as_i64().or_else(|| {
        v.as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15)
            .map(|f| f as i64)
    })
}

impl<C: DomainClient> Hub<C> {
    /// Registers a domain and its item templates. Setup mode only.
    pub async fn register(&self, req: RegisterReq) -> Result<RegisterResp, HubError> {
        // Held until the templates are in, so play cannot start half-way.
        let mode = self.mode.read().await;
        if *mode != Mode::Setup {
            return Err(conflict("Central server is not in setup mode"));
        }
        let name = req.name.ok_or_else(|| bad_request("Name string required"))?;
        let description = req
            .description
            .ok_or_else(|| bad_request("Description string required"))?;
        let url = req.url.ok_or_else(|| bad_request("Server url required"))?;
        let items = req
            .items
            .ok_or_else(|| bad_request("List of item templates required"))?;

        let rec = self
            .registry
            .insert_domain(
                self.entropy.as_ref(),
                url,
                name,
                description,
                self.settings.max_domains,
            )
            .await?;
        let ids = {
            let mut catalog = self.catalog.write().await;
            items
                .iter()
                .map(|spec| catalog.add_registered(rec.id, spec, self.entropy.as_ref()))
                .collect::<Vec<_>>()
        };
        drop(mode);

        info!(domain = %rec.id, url = %rec.url, items = ids.len(), "domain registered");
        Ok(RegisterResp {
            id: rec.id,
            items: ids,
            secret: rec.secret.clone(),
        })
    }

    /// Asks the domain server at `url` to register itself.
    pub async fn add_domain(&self, url: &str) -> Result<String, HubError> {
        if self.mode().await != Mode::Setup {
            return Err(conflict("Central server is not in setup mode."));
        }
        let url = url.trim();
        if url.is_empty() {
            return Err(bad_request("Domain server URL required"));
        }
        if self.registry.url_taken(url).await {
            return Ok("That domain server has already been registered.".to_string());
        }

        let reply = self.client.newhub(url, &self.settings.public_url).await?;
        if let Some(err) = reply.get("error") {
            let err = err.as_str().map(str::to_string).unwrap_or_else(|| err.to_string());
            info!(url, err = %err, "domain declined to register");
            return Ok(format!(
                "Domain server returned an error message:<pre>{}</pre>",
                html_escape(&err)
            ));
        }
        Ok(reply
            .get("ok")
            .and_then(Value::as_str)
            .unwrap_or("Domain registered.")
            .to_string())
    }

    async fn known_user(&self, user: Option<UserId>) -> Result<Arc<UserSlot>, HubError> {
        let Some(uid) = user else {
            return Err(bad_request("Valid user ID required"));
        };
        self.registry
            .user(uid)
            .await
            .ok_or_else(|| bad_request("Valid user ID required"))
    }

    pub async fn award_score(&self, req: ScoreReq) -> Result<OkResp, HubError> {
        let dom = self.auth_domain(req.domain, req.secret.as_deref()).await?;
        let slot = self.known_user(req.user).await?;
        let score = parse_score(req.score.as_ref())?;
        if !(0.0..=MAX_SCORE).contains(&score) {
            return Err(bad_request(format!(
                "Invalid score; should be between 0 and {MAX_SCORE}"
            )));
        }

        let mut st = slot.state.lock().await;
        let current = st.score.get(&dom.id).copied().unwrap_or(0.0);
        if score < current {
            return Err(conflict("Reducing scores is not supported"));
        }
        st.score.insert(dom.id, score);
        debug!(user = %st.id, domain = %dom.id, score, "score changed");
        Ok(ok("Score changed"))
    }

    pub async fn transfer_item(&self, req: TransferReq) -> Result<OkResp, HubError> {
        let dom = self.auth_domain(req.domain, req.secret.as_deref()).await?;
        let slot = self.known_user(req.user).await?;
        let item = req.item.ok_or_else(|| bad_request("Valid item ID required"))?;
        let to = req.to.ok_or_else(|| bad_request("Missing \"to\" field"))?;
        let to = Location::from_wire(to, dom.id);

        let catalog = self.catalog.read().await;
        let tmpl = catalog
            .get(item)
            .ok_or_else(|| bad_request("Valid item ID required"))?;
        let mut st = slot.state.lock().await;
        transfer(&mut st, tmpl, Mover::Domain(dom.id), to)?;
        debug!(user = %st.id, domain = %dom.id, item = %item, "item transferred");
        Ok(ok("Item transferred"))
    }

    /// Lists the user's items at `location`, or the caller's loot of `depth`
    /// the user never held. A depth must be a number with an integral value
    /// (`1` or `1.0`); anything else matches nothing.
    pub async fn query(&self, req: QueryReq) -> Result<Vec<ItemId>, HubError> {
        let dom = self.auth_domain(req.domain, req.secret.as_deref()).await?;
        let slot = self.known_user(req.user).await?;

        match (req.location, req.depth) {
            (Some(loc), None) => {
                if loc.is_null() {
                    return Err(bad_request("Location required"));
                }
                let loc = Location::from_wire(loc, dom.id);
                Ok(slot.state.lock().await.items_at(&loc))
            }
            (None, Some(depth)) => {
                let Some(depth) = integral(&depth) else {
                    return Ok(Vec::new());
                };
                let catalog = self.catalog.read().await;
                let st = slot.state.lock().await;
                Ok(dom
                    .loot
                    .iter()
                    .copied()
                    .filter(|id| !st.inventory.contains_key(id))
                    .filter(|id| {
                        catalog
                            .get(*id)
                            .and_then(|t| t.depth)
                            .is_some_and(|d| i64::from(d) == depth)
                    })
                    .collect())
            }
            _ => Err(bad_request("Must provide location xor depth")),
        }
    }
}
