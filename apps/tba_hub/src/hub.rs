use std::sync::Arc;

use tokio::sync::RwLock;

use crate::catalog::Catalog;
use crate::client::DomainClient;
use crate::entropy::Entropy;
use crate::guard::Mode;
use crate::registry::Registry;

#[derive(Clone, Debug)]
pub struct HubSettings {
    /// URL domains are told to register against.
    pub public_url: String,
    /// 0 = unlimited.
    pub max_domains: usize,
}

/// Process-wide hub state. Only reachable through its methods.
pub struct Hub<C> {
    pub(crate) mode: RwLock<Mode>,
    pub(crate) registry: Registry,
    pub(crate) catalog: RwLock<Catalog>,
    pub(crate) entropy: Arc<dyn Entropy>,
    pub(crate) client: C,
    pub(crate) settings: HubSettings,
}

impl<C: DomainClient> Hub<C> {
    pub fn new(settings: HubSettings, client: C, entropy: Arc<dyn Entropy>) -> Self {
        Self {
            mode: RwLock::new(Mode::Setup),
            registry: Registry::new(),
            catalog: RwLock::new(Catalog::new()),
            entropy,
            client,
            settings,
        }
    }

    pub fn settings(&self) -> &HubSettings {
        &self.settings
    }
}
