use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::de::DeserializeOwned;
use tbaproto::hub::{ErrorResp, OkResp, RegisterResp};
use tbaproto::ids::ItemId;
use tbaproto::player::LoginResp;
use tower_http::trace::TraceLayer;

use crate::client::DomainClient;
use crate::error::{HubError, bad_request};
use crate::hub::Hub;

type Shared<C> = State<Arc<Hub<C>>>;

pub fn router<C: DomainClient>(hub: Arc<Hub<C>>) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok\n" }))
        .route("/mode", get(get_mode::<C>).post(set_mode::<C>))
        .route("/domain", post(add_domain::<C>))
        .route("/newhub", post(newhub::<C>))
        .route("/register", post(register::<C>))
        .route("/score", post(score::<C>))
        .route("/transfer", post(transfer::<C>))
        .route("/query", post(query::<C>))
        .route("/login", get(login::<C>))
        .route("/command", post(command::<C>))
        .with_state(hub)
        .layer(TraceLayer::new_for_http())
}

fn json_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, HubError> {
    serde_json::from_slice(body).map_err(|e| bad_request(format!("JSON data required: {e}")))
}

fn text_body(body: &Bytes) -> Result<&str, HubError> {
    std::str::from_utf8(body).map_err(|_| bad_request("Body must be UTF-8 text"))
}

fn text_reply(r: Result<String, HubError>) -> Response {
    match r {
        Ok(text) => text.into_response(),
        Err(e) => e.into_text_response(),
    }
}

async fn get_mode<C: DomainClient>(State(hub): Shared<C>) -> String {
    hub.mode().await.as_str().to_string()
}

async fn set_mode<C: DomainClient>(State(hub): Shared<C>, body: Bytes) -> Response {
    let r = match text_body(&body) {
        Ok(want) => hub.set_mode(want).await,
        Err(e) => Err(e),
    };
    text_reply(r)
}

async fn add_domain<C: DomainClient>(State(hub): Shared<C>, body: Bytes) -> Response {
    let r = match text_body(&body) {
        Ok(url) => hub.add_domain(url).await,
        Err(e) => Err(e),
    };
    text_reply(r)
}

async fn newhub<C: DomainClient>(State(hub): Shared<C>) -> Response {
    let error = format!(
        "{} is the URL of the hub server, not a domain server.",
        hub.settings().public_url
    );
    (StatusCode::BAD_REQUEST, Json(ErrorResp { error })).into_response()
}

async fn register<C: DomainClient>(
    State(hub): Shared<C>,
    body: Bytes,
) -> Result<Json<RegisterResp>, HubError> {
    Ok(Json(hub.register(json_body(&body)?).await?))
}

async fn score<C: DomainClient>(State(hub): Shared<C>, body: Bytes) -> Result<Json<OkResp>, HubError> {
    Ok(Json(hub.award_score(json_body(&body)?).await?))
}

async fn transfer<C: DomainClient>(
    State(hub): Shared<C>,
    body: Bytes,
) -> Result<Json<OkResp>, HubError> {
    Ok(Json(hub.transfer_item(json_body(&body)?).await?))
}

async fn query<C: DomainClient>(
    State(hub): Shared<C>,
    body: Bytes,
) -> Result<Json<Vec<ItemId>>, HubError> {
    Ok(Json(hub.query(json_body(&body)?).await?))
}

async fn login<C: DomainClient>(State(hub): Shared<C>) -> Result<Json<LoginResp>, HubError> {
    Ok(Json(hub.login().await?))
}

async fn command<C: DomainClient>(State(hub): Shared<C>, body: Bytes) -> Response {
    let r = match json_body(&body) {
        Ok(req) => hub.command(req).await,
        Err(e) => Err(e),
    };
    text_reply(r)
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::testkit::{FakeDomains, setup_hub};

    async fn serve(hub: Arc<Hub<FakeDomains>>) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(hub)).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn a_session_over_http() {
        let base = serve(setup_hub()).await;
        let http = reqwest::Client::new();

        let mode = http.get(format!("{base}/mode")).send().await.unwrap();
        assert_eq!(mode.text().await.unwrap(), "setup");

        let reg: Value = http
            .post(format!("{base}/register"))
            .json(&json!({
                "name": "Boutique",
                "description": "racks of clothes",
                "url": "http://boutique.test",
                "items": [{"name": "key"}],
            }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let did = reg["id"].clone();
        let dsecret = reg["secret"].clone();
        let key = reg["items"][0].clone();

        let early = http.get(format!("{base}/login")).send().await.unwrap();
        assert_eq!(early.status(), StatusCode::CONFLICT);

        let play = http
            .post(format!("{base}/mode"))
            .body("play")
            .send()
            .await
            .unwrap();
        assert_eq!(play.status(), StatusCode::OK);
        assert_eq!(play.text().await.unwrap(), "Now in play mode");

        let user: Value = http
            .get(format!("{base}/login"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(user["domain"]["name"], "Boutique");

        let moved = http
            .post(format!("{base}/transfer"))
            .json(&json!({
                "domain": did, "secret": dsecret, "user": user["id"],
                "item": key, "to": "inventory",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(moved.status(), StatusCode::OK);
        assert_eq!(moved.json::<Value>().await.unwrap(), json!({"ok": "Item transferred"}));

        let again = http
            .post(format!("{base}/transfer"))
            .json(&json!({
                "domain": did, "secret": dsecret, "user": user["id"],
                "item": key, "to": "inventory",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(again.status(), StatusCode::CONFLICT);
        assert!(again.json::<Value>().await.unwrap()["error"].is_string());

        let held: Value = http
            .post(format!("{base}/query"))
            .json(&json!({
                "domain": did, "secret": dsecret, "user": user["id"],
                "location": "inventory",
            }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(held, json!([key]));

        let inv = http
            .post(format!("{base}/command"))
            .json(&json!({"user": user["id"], "secret": user["secret"], "command": ["inventory"]}))
            .send()
            .await
            .unwrap();
        assert_eq!(inv.status(), StatusCode::OK);
        assert!(inv.text().await.unwrap().contains("key"));

        let journey = http
            .post(format!("{base}/command"))
            .json(&json!({"user": user["id"], "secret": user["secret"], "command": ["journey", "up"]}))
            .send()
            .await
            .unwrap();
        assert_eq!(journey.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            journey.text().await.unwrap(),
            "I only know how to journey in cardinal directions"
        );
    }

    #[tokio::test]
    async fn malformed_requests_are_bad_requests() {
        let base = serve(setup_hub()).await;
        let http = reqwest::Client::new();

        let r = http
            .post(format!("{base}/register"))
            .body("not json")
            .send()
            .await
            .unwrap();
        assert_eq!(r.status(), StatusCode::BAD_REQUEST);
        assert!(r.json::<Value>().await.unwrap()["error"].is_string());

        let r = http
            .post(format!("{base}/register"))
            .json(&json!({"name": "A", "description": "a", "url": "http://a", "items": "none"}))
            .send()
            .await
            .unwrap();
        assert_eq!(r.status(), StatusCode::BAD_REQUEST);

        let r = http
            .post(format!("{base}/mode"))
            .body("sideways")
            .send()
            .await
            .unwrap();
        assert_eq!(r.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn newhub_points_at_the_hub_itself() {
        let base = serve(setup_hub()).await;
        let r = reqwest::Client::new()
            .post(format!("{base}/newhub"))
            .body("http://elsewhere")
            .send()
            .await
            .unwrap();
        assert_eq!(r.status(), StatusCode::BAD_REQUEST);
        let body: Value = r.json().await.unwrap();
        assert_eq!(
            body["error"],
            "http://hub.test is the URL of the hub server, not a domain server."
        );

        let health = reqwest::get(format!("{base}/healthz")).await.unwrap();
        assert_eq!(health.text().await.unwrap(), "ok\n");
    }

    #[tokio::test]
    async fn wrong_secrets_are_forbidden() {
        let hub = setup_hub();
        let reg = hub
            .register(crate::testkit::register_req("http://a.test", "A", &[]))
            .await
            .unwrap();
        hub.set_mode("play").await.unwrap();
        let base = serve(hub).await;

        let r = reqwest::Client::new()
            .post(format!("{base}/score"))
            .json(&json!({"domain": reg.id, "secret": "guess", "user": 1, "score": 0.5}))
            .send()
            .await
            .unwrap();
        assert_eq!(r.status(), StatusCode::FORBIDDEN);
    }
}
