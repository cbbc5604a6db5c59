//! In-process fakes for hub tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};
use tbaproto::callback::{ArriveReq, DepartReq, DroppedReq};
use tbaproto::hub::{ItemSpec, RegisterReq, RegisterResp};
use tbaproto::location::Spot;
use tokio::sync::Notify;

use crate::client::DomainClient;
use crate::entropy::SeededEntropy;
use crate::error::HubError;
use crate::hub::{Hub, HubSettings};

#[derive(Debug, Clone)]
pub enum Call {
    Newhub { domain_url: String, hub_url: String },
    Arrive { domain_url: String, req: ArriveReq },
    Depart { domain_url: String, req: DepartReq },
    Dropped { domain_url: String, req: DroppedReq },
}

/// Parks a `/dropped` call: `entered` fires once the call is in flight, the
/// call answers after `release` fires.
#[derive(Debug, Clone, Default)]
pub struct DropGate {
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

/// Records every callback; `/dropped` answers with `drop_spot` or refuses
/// when it is `None`.
#[derive(Debug)]
pub struct FakeDomains {
    pub calls: Mutex<Vec<Call>>,
    pub drop_spot: Mutex<Option<Spot>>,
    pub drop_gate: Mutex<Option<DropGate>>,
    pub fail_arrive: AtomicBool,
    pub newhub_reply: Mutex<Value>,
}

impl Default for FakeDomains {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            drop_spot: Mutex::new(Some(Spot(json!("floor")))),
            drop_gate: Mutex::new(None),
            fail_arrive: AtomicBool::new(false),
            newhub_reply: Mutex::new(json!({"ok": "Registered"})),
        }
    }
}

impl FakeDomains {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn arrivals(&self) -> Vec<ArriveReq> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Arrive { req, .. } => Some(req),
                _ => None,
            })
            .collect()
    }

    pub fn refuse_drops(&self) {
        *self.drop_spot.lock().unwrap() = None;
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl DomainClient for FakeDomains {
    async fn newhub(&self, domain_url: &str, hub_url: &str) -> Result<Value, HubError> {
        self.record(Call::Newhub {
            domain_url: domain_url.to_string(),
            hub_url: hub_url.to_string(),
        });
        Ok(self.newhub_reply.lock().unwrap().clone())
    }

    async fn arrive(&self, domain_url: &str, req: &ArriveReq) -> Result<(), HubError> {
        self.record(Call::Arrive {
            domain_url: domain_url.to_string(),
            req: req.clone(),
        });
        if self.fail_arrive.load(Ordering::SeqCst) {
            return Err(HubError::Upstream(format!("{domain_url} is down")));
        }
        Ok(())
    }

    async fn depart(&self, domain_url: &str, req: &DepartReq) -> Result<(), HubError> {
        self.record(Call::Depart {
            domain_url: domain_url.to_string(),
            req: req.clone(),
        });
        Ok(())
    }

    async fn dropped(&self, domain_url: &str, req: &DroppedReq) -> Result<Spot, HubError> {
        self.record(Call::Dropped {
            domain_url: domain_url.to_string(),
            req: req.clone(),
        });
        let gate = self.drop_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        self.drop_spot
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| HubError::Upstream(format!("{domain_url} returned 403")))
    }
}

pub fn setup_hub() -> Arc<Hub<FakeDomains>> {
    Arc::new(Hub::new(
        HubSettings {
            public_url: "http://hub.test".to_string(),
            max_domains: 0,
        },
        FakeDomains::default(),
        Arc::new(SeededEntropy::new(77)),
    ))
}

pub fn item(name: &str, depth: Option<i64>) -> ItemSpec {
    ItemSpec {
        name: Some(name.to_string()),
        description: Some(format!("a {name}")),
        verb: None,
        depth: depth.map(Value::from),
    }
}

pub fn register_req(url: &str, name: &str, items: &[ItemSpec]) -> RegisterReq {
    RegisterReq {
        name: Some(name.to_string()),
        description: Some(format!("{name}, a test domain")),
        url: Some(url.to_string()),
        items: Some(items.to_vec()),
    }
}

/// A hub in setup mode with one registered domain.
pub async fn hub_with_domain(items: &[ItemSpec]) -> (Arc<Hub<FakeDomains>>, RegisterResp) {
    let hub = setup_hub();
    let reg = hub
        .register(register_req("http://boutique.test", "Boutique", items))
        .await
        .unwrap();
    (hub, reg)
}
