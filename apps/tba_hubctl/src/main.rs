use anyhow::Context;
use tbaproto::player::{CommandReq, LoginResp};

fn usage_and_exit() -> ! {
    eprintln!(
        "tba_hubctl\n\n\
USAGE:\n\
  tba_hubctl [--hub URL] <command> [args...]\n\n\
ENV:\n\
  TBA_HUB_URL  default http://127.0.0.1:10340\n\n\
COMMANDS:\n\
  mode [play|setup]\n\
  add-domain <url>\n\
  login\n\
  cmd <user> <secret> <word>...\n\
  health\n"
    );
    std::process::exit(2);
}

struct Hub {
    base: String,
    http: reqwest::Client,
}

impl Hub {
    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base.trim_end_matches('/'))
    }

    /// Text endpoints answer errors as text too; print whatever came back.
    async fn text(&self, req: reqwest::RequestBuilder) -> anyhow::Result<(bool, String)> {
        let resp = req.send().await.with_context(|| format!("reach {}", self.base))?;
        let status = resp.status();
        let body = resp.text().await.context("read response body")?;
        if status.is_success() {
            Ok((true, body))
        } else {
            Ok((false, format!("{status}: {body}")))
        }
    }
}

fn finish((ok, body): (bool, String)) -> anyhow::Result<()> {
    if ok {
        println!("{body}");
        Ok(())
    } else {
        anyhow::bail!("{body}")
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut base = std::env::var("TBA_HUB_URL").unwrap_or_else(|_| "http://127.0.0.1:10340".to_string());

    let mut args = std::env::args().skip(1);
    let mut cmd: Option<String> = None;
    let mut rest: Vec<String> = Vec::new();

    while let Some(a) = args.next() {
        if a == "--hub" {
            base = args.next().unwrap_or_else(|| usage_and_exit());
            continue;
        }
        cmd = Some(a);
        rest.extend(args);
        break;
    }

    let Some(cmd) = cmd else { usage_and_exit() };
    let hub = Hub {
        base,
        http: reqwest::Client::new(),
    };

    match cmd.as_str() {
        "mode" => match rest.as_slice() {
            [] => finish(hub.text(hub.http.get(hub.url("/mode"))).await?)?,
            [want] => finish(hub.text(hub.http.post(hub.url("/mode")).body(want.clone())).await?)?,
            _ => usage_and_exit(),
        },
        "add-domain" => {
            let [url] = rest.as_slice() else { usage_and_exit() };
            finish(hub.text(hub.http.post(hub.url("/domain")).body(url.clone())).await?)?;
        }
        "login" => {
            if !rest.is_empty() {
                usage_and_exit();
            }
            let resp = hub
                .http
                .get(hub.url("/login"))
                .send()
                .await
                .with_context(|| format!("reach {}", hub.base))?;
            if !resp.status().is_success() {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                anyhow::bail!("{status}: {body}");
            }
            let login: LoginResp = resp.json().await.context("bad login response")?;
            println!("user:   {}", login.id);
            println!("secret: {}", login.secret);
            println!("domain: {} ({})", login.domain.name, login.domain.url);
            println!("{}", login.domain.description);
        }
        "cmd" => {
            if rest.len() < 3 {
                usage_and_exit();
            }
            let user = rest[0].parse().unwrap_or_else(|_| usage_and_exit());
            let req = CommandReq {
                user: Some(user),
                secret: Some(rest[1].clone()),
                command: Some(rest[2..].to_vec()),
            };
            finish(hub.text(hub.http.post(hub.url("/command")).json(&req)).await?)?;
        }
        "health" => {
            if !rest.is_empty() {
                usage_and_exit();
            }
            finish(hub.text(hub.http.get(hub.url("/healthz"))).await?)?;
        }
        _ => usage_and_exit(),
    }

    Ok(())
}
