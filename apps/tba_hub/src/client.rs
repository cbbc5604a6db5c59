//! Outbound calls to domain servers.

use std::future::Future;
use std::time::Duration;

use anyhow::Context;
use serde::Serialize;
use tbaproto::callback::{ArriveReq, DepartReq, DroppedReq};
use tbaproto::location::Spot;

use crate::error::HubError;

/// The callback surface every domain server exposes.
///
/// No retries: each call either answers within the client's timeout or
/// fails with [`HubError::Upstream`].
pub trait DomainClient: Send + Sync + 'static {
    /// Asks the domain at `domain_url` to register itself with the hub.
    /// Returns the domain's JSON answer, whatever its status.
    fn newhub(
        &self,
        domain_url: &str,
        hub_url: &str,
    ) -> impl Future<Output = Result<serde_json::Value, HubError>> + Send;

    fn arrive(
        &self,
        domain_url: &str,
        req: &ArriveReq,
    ) -> impl Future<Output = Result<(), HubError>> + Send;

    fn depart(
        &self,
        domain_url: &str,
        req: &DepartReq,
    ) -> impl Future<Output = Result<(), HubError>> + Send;

    /// Returns the spot the domain left the item at.
    fn dropped(
        &self,
        domain_url: &str,
        req: &DroppedReq,
    ) -> impl Future<Output = Result<Spot, HubError>> + Send;
}

#[derive(Clone, Debug)]
pub struct HttpDomainClient {
    http: reqwest::Client,
}

impl HttpDomainClient {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("build domain http client")?;
        Ok(Self { http })
    }

    async fn post_json<T: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
    ) -> Result<reqwest::Response, HubError> {
        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| upstream(url, e))?;
        if !resp.status().is_success() {
            return Err(HubError::Upstream(format!(
                "{url} returned {}",
                resp.status()
            )));
        }
        Ok(resp)
    }
}

fn endpoint(base: &str, path: &str) -> String {
    format!("{}{path}", base.trim_end_matches('/'))
}

fn upstream(url: &str, e: impl std::fmt::Display) -> HubError {
    HubError::Upstream(format!("{url} failed: {e}"))
}

impl DomainClient for HttpDomainClient {
    async fn newhub(&self, domain_url: &str, hub_url: &str) -> Result<serde_json::Value, HubError> {
        let url = endpoint(domain_url, "/newhub");
        let resp = self
            .http
            .post(&url)
            .body(hub_url.to_string())
            .send()
            .await
            .map_err(|e| upstream(&url, e))?;
        resp.json().await.map_err(|e| upstream(&url, e))
    }

    async fn arrive(&self, domain_url: &str, req: &ArriveReq) -> Result<(), HubError> {
        self.post_json(&endpoint(domain_url, "/arrive"), req).await?;
        Ok(())
    }

    async fn depart(&self, domain_url: &str, req: &DepartReq) -> Result<(), HubError> {
        self.post_json(&endpoint(domain_url, "/depart"), req).await?;
        Ok(())
    }

    async fn dropped(&self, domain_url: &str, req: &DroppedReq) -> Result<Spot, HubError> {
        let url = endpoint(domain_url, "/dropped");
        let resp = self.post_json(&url, req).await?;
        resp.json().await.map(Spot).map_err(|e| upstream(&url, e))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;
    use tbaproto::callback::ItemBrief;
    use tbaproto::ids::{ItemId, UserId};
    use wiremock::matchers::{body_json, body_string, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client() -> HttpDomainClient {
        HttpDomainClient::new(Duration::from_millis(500)).unwrap()
    }

    fn dropped_req() -> DroppedReq {
        DroppedReq {
            secret: "dsecret".into(),
            user: UserId(3),
            item: ItemBrief {
                id: ItemId(9),
                name: "key".into(),
                description: "a key".into(),
                verb: BTreeMap::new(),
                depth: None,
                location: None,
            },
        }
    }

    #[tokio::test]
    async fn dropped_returns_the_domain_spot() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/dropped"))
            .and(body_json(json!({
                "secret": "dsecret",
                "user": 3,
                "item": {"id": 9, "name": "key", "description": "a key", "verb": {}},
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!("fitting-rooms")))
            .expect(1)
            .mount(&server)
            .await;

        let spot = client()
            .dropped(&format!("{}/", server.uri()), &dropped_req())
            .await
            .unwrap();
        assert_eq!(spot, Spot(json!("fitting-rooms")));
    }

    #[tokio::test]
    async fn dropped_refusal_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/dropped"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let err = client()
            .dropped(&server.uri(), &dropped_req())
            .await
            .unwrap_err();
        assert!(matches!(err, HubError::Upstream(_)));
    }

    #[tokio::test]
    async fn slow_domains_time_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/depart"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let err = client()
            .depart(
                &server.uri(),
                &DepartReq {
                    secret: "s".into(),
                    user: UserId(1),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, HubError::Upstream(_)));
    }

    #[tokio::test]
    async fn newhub_posts_hub_url_and_relays_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/newhub"))
            .and(body_string("http://hub:10340"))
            .respond_with(
                ResponseTemplate::new(409).set_body_json(json!({"error": "already registered"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let v = client()
            .newhub(&server.uri(), "http://hub:10340")
            .await
            .unwrap();
        assert_eq!(v["error"], "already registered");
    }
}
