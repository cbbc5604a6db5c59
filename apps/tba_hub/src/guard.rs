use std::sync::Arc;

use tbaproto::ids::{DomainId, UserId};
use tracing::info;

use crate::client::DomainClient;
use crate::error::{HubError, bad_request, conflict, forbidden};
use crate::hub::Hub;
use crate::registry::{DomainRec, UserSlot};

/// Server lifecycle: `Setup -> Locked -> Play`, never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Setup,
    /// Held only while the world is generated.
    Locked,
    Play,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Setup => "setup",
            Mode::Locked => "locked",
            Mode::Play => "play",
        }
    }

    /// Modes an operator may request.
    pub fn parse_requested(s: &str) -> Option<Self> {
        match s.trim() {
            "setup" => Some(Mode::Setup),
            "play" => Some(Mode::Play),
            _ => None,
        }
    }
}

impl<C: DomainClient> Hub<C> {
    pub async fn mode(&self) -> Mode {
        *self.mode.read().await
    }

    pub(crate) async fn require_play(&self) -> Result<(), HubError> {
        match self.mode().await {
            Mode::Play => Ok(()),
            Mode::Locked => Err(conflict("The hub is busy entering play mode")),
            Mode::Setup => Err(conflict("Only available during play")),
        }
    }

    /// Resolves a domain actor from its id and secret.
    pub(crate) async fn auth_domain(
        &self,
        domain: Option<DomainId>,
        secret: Option<&str>,
    ) -> Result<Arc<DomainRec>, HubError> {
        self.require_play().await?;
        let did = domain.ok_or_else(|| bad_request("Request must contain domain"))?;
        let secret = secret.ok_or_else(|| bad_request("Request must contain secret"))?;
        let rec = self
            .registry
            .domain(did)
            .await
            .ok_or_else(|| HubError::Unauthorized(format!("Domain {did} not known")))?;
        if rec.secret != secret {
            return Err(HubError::Unauthorized("Invalid secret".to_string()));
        }
        Ok(rec)
    }

    /// Resolves a user actor from its id and secret.
    pub(crate) async fn auth_user(
        &self,
        user: Option<UserId>,
        secret: Option<&str>,
    ) -> Result<Arc<UserSlot>, HubError> {
        self.require_play().await?;
        let uid = user.ok_or_else(|| bad_request("Request must contain user"))?;
        let secret = secret.ok_or_else(|| bad_request("Request must contain secret"))?;
        let slot = self
            .registry
            .user(uid)
            .await
            .ok_or_else(|| HubError::Unauthorized(format!("User {uid} not known")))?;
        if slot.state.lock().await.secret != secret {
            return Err(HubError::Unauthorized("Invalid secret".to_string()));
        }
        Ok(slot)
    }

    /// Handles an operator's mode change request.
    pub async fn set_mode(&self, requested: &str) -> Result<String, HubError> {
        let Some(want) = Mode::parse_requested(requested) else {
            return Err(bad_request(format!("Unknown mode {:?}", requested.trim())));
        };

        {
            let mut mode = self.mode.write().await;
            if *mode == want {
                return Ok(format!("Already in {} mode", want.as_str()));
            }
            match (*mode, want) {
                (Mode::Locked, _) => {
                    return Err(conflict(
                        "Error: request sent midway through handling another request.",
                    ));
                }
                (Mode::Play, Mode::Setup) => {
                    return Err(forbidden("This hub cannot be put back into setup mode."));
                }
                _ => {}
            }
            if self.registry.domain_count().await == 0 {
                return Err(conflict(
                    "Must register at least one domain before entering play mode.",
                ));
            }
            *mode = Mode::Locked;
        }

        self.build_world().await;
        *self.mode.write().await = Mode::Play;
        info!("now in play mode");
        Ok(format!("Now in {} mode", Mode::Play.as_str()))
    }

    async fn build_world(&self) {
        let domains = self.registry.domains().await;
        let ids = domains.iter().map(|d| d.id).collect::<Vec<_>>();
        let (loot, items) = {
            let mut catalog = self.catalog.write().await;
            let loot = catalog.build_outside_world(&ids, self.entropy.as_ref());
            (loot, catalog.len())
        };
        for did in &ids {
            self.registry.set_loot(*did, loot.clone()).await;
        }
        info!(domains = ids.len(), items, loot = loot.len(), "world generated");
    }
}
