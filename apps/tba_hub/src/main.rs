use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{Level, info};

mod catalog;
mod client;
mod domain_api;
mod entropy;
mod error;
mod guard;
mod http;
mod hub;
mod orchestrator;
mod registry;
mod transfer;

#[cfg(test)]
mod testkit;

use crate::client::HttpDomainClient;
use crate::entropy::OsEntropy;
use crate::hub::{Hub, HubSettings};

fn usage_and_exit() -> ! {
    eprintln!(
        "tba_hub

USAGE:
  tba_hub [--bind HOST:PORT] [--public-url URL] [--callback-timeout-ms N] [--max-domains N]

ENV:
  HUB_BIND                 default 0.0.0.0:10340
  HUB_PUBLIC_URL           default http://localhost:<port> (sent to domains on /newhub)
  HUB_CALLBACK_TIMEOUT_MS  default 3000 (arrive/depart/dropped/newhub)
  HUB_MAX_DOMAINS          default 0 (unlimited)
"
    );
    std::process::exit(2);
}

#[derive(Clone, Debug)]
struct Config {
    bind: SocketAddr,
    public_url: String,
    callback_timeout: Duration,
    max_domains: usize,
}

fn parse_args() -> Config {
    let mut bind: SocketAddr = std::env::var("HUB_BIND")
        .unwrap_or_else(|_| "0.0.0.0:10340".to_string())
        .parse()
        .unwrap_or_else(|_| usage_and_exit());

    let mut public_url: Option<String> = std::env::var("HUB_PUBLIC_URL").ok();

    let mut timeout_ms: u64 = std::env::var("HUB_CALLBACK_TIMEOUT_MS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);

    let mut max_domains: usize = std::env::var("HUB_MAX_DOMAINS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);

    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--bind" => {
                let v = it.next().unwrap_or_else(|| usage_and_exit());
                bind = v.parse().unwrap_or_else(|_| usage_and_exit());
            }
            "--public-url" => {
                public_url = Some(it.next().unwrap_or_else(|| usage_and_exit()));
            }
            "--callback-timeout-ms" => {
                let v = it.next().unwrap_or_else(|| usage_and_exit());
                timeout_ms = v.parse().unwrap_or_else(|_| usage_and_exit());
            }
            "--max-domains" => {
                let v = it.next().unwrap_or_else(|| usage_and_exit());
                max_domains = v.parse().unwrap_or_else(|_| usage_and_exit());
            }
            "-h" | "--help" => usage_and_exit(),
            _ => usage_and_exit(),
        }
    }

    Config {
        bind,
        public_url: public_url.unwrap_or_else(|| format!("http://localhost:{}", bind.port())),
        callback_timeout: Duration::from_millis(timeout_ms),
        max_domains,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with_target(false)
        .with_max_level(Level::DEBUG)
        .init();

    let cfg = parse_args();

    let client = HttpDomainClient::new(cfg.callback_timeout)?;
    let hub = Arc::new(Hub::new(
        HubSettings {
            public_url: cfg.public_url.clone(),
            max_domains: cfg.max_domains,
        },
        client,
        Arc::new(OsEntropy),
    ));
    let app = http::router(hub);

    info!(
        bind = %cfg.bind,
        public_url = %cfg.public_url,
        callback_timeout_ms = cfg.callback_timeout.as_millis() as u64,
        max_domains = cfg.max_domains,
        "starting tba_hub"
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        let _ = shutdown_tx.send(true);
        info!("shutdown signal received");
    });

    let listener = tokio::net::TcpListener::bind(cfg.bind)
        .await
        .with_context(|| format!("bind {}", cfg.bind))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown(shutdown_rx))
        .await
        .context("http server failed")?;
    Ok(())
}

async fn wait_for_shutdown(mut rx: tokio::sync::watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}
