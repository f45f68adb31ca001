//! Web skill — grounded on `ai_web_tools/ai_web_read.py` for the contract
//! shape and on the ancestor gateway's `skills/web_fetch.rs` for the SSRF
//! safety checks (private/link-local address rejection, size/time limits).

use std::net::{IpAddr, ToSocketAddrs};
use std::time::Duration;

use async_trait::async_trait;
use lg_domain::skill::{SkillOutcome, SkillPermission, SkillSchema};
use serde_json::{json, Value};

use crate::invoker::SkillInvoker;
use crate::normalize::coerce_urls_list;

const DEFAULT_MAX_PAGES: u64 = 3;
const DEFAULT_MAX_CHARS: u64 = 20_000;

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback() || v4.is_private() || v4.is_link_local() || v4.is_broadcast() || v4.is_unspecified()
        }
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified(),
    }
}

fn validate_url(raw: &str) -> Result<reqwest::Url, String> {
    let url = reqwest::Url::parse(raw).map_err(|e| format!("invalid url: {e}"))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(format!("unsupported scheme: {}", url.scheme()));
    }
    let host = url.host_str().ok_or_else(|| "url has no host".to_string())?;
    if let Ok(addrs) = (host, url.port_or_known_default().unwrap_or(443)).to_socket_addrs() {
        for addr in addrs {
            if is_private_ip(&addr.ip()) {
                return Err(format!("refusing to fetch private/link-local address: {host}"));
            }
        }
    }
    Ok(url)
}

pub struct ReadUrl {
    client: reqwest::Client,
}

impl ReadUrl {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent("loomgate-agent/0.1")
            .build()
            .expect("reqwest client builds with static config");
        Self { client }
    }
}

impl Default for ReadUrl {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SkillInvoker for ReadUrl {
    fn name(&self) -> &str {
        "read_url"
    }
    fn description(&self) -> &str {
        "Fetch one or more URLs and return their text content."
    }
    fn permission(&self) -> SkillPermission {
        SkillPermission::Read
    }
    fn schema(&self) -> SkillSchema {
        SkillSchema {
            required: vec!["urls".to_string()],
            parameters: json!({
                "urls": {"type": "array", "items": {"type": "string"}},
                "max_pages": {"type": "integer"},
                "max_chars": {"type": "integer"},
            }),
        }
    }
    fn normalize(&self, args: Value) -> Value {
        coerce_urls_list(args, DEFAULT_MAX_PAGES, DEFAULT_MAX_CHARS)
    }
    async fn call(&self, args: Value) -> SkillOutcome {
        let Some(urls) = args.get("urls").and_then(Value::as_array) else {
            return SkillOutcome::Err { message: "missing required argument: urls".to_string() };
        };
        let max_pages = args.get("max_pages").and_then(Value::as_u64).unwrap_or(DEFAULT_MAX_PAGES) as usize;
        let max_chars = args.get("max_chars").and_then(Value::as_u64).unwrap_or(DEFAULT_MAX_CHARS) as usize;

        let mut pages = Vec::new();
        for url in urls.iter().take(max_pages) {
            let Some(raw) = url.as_str() else { continue };
            let parsed = match validate_url(raw) {
                Ok(u) => u,
                Err(e) => {
                    pages.push(json!({"url": raw, "success": false, "error": e}));
                    continue;
                }
            };
            match self.client.get(parsed).send().await {
                Ok(resp) if resp.status().is_success() => match resp.text().await {
                    Ok(mut text) => {
                        text.truncate(max_chars);
                        pages.push(json!({"url": raw, "success": true, "text": text}));
                    }
                    Err(e) => pages.push(json!({"url": raw, "success": false, "error": e.to_string()})),
                },
                Ok(resp) => pages.push(json!({"url": raw, "success": false, "error": format!("status {}", resp.status())})),
                Err(e) => pages.push(json!({"url": raw, "success": false, "error": e.to_string()})),
            }
        }
        let any_failed = pages.iter().any(|p| p.get("success").and_then(Value::as_bool) == Some(false));
        if any_failed && pages.iter().all(|p| p.get("success").and_then(Value::as_bool) == Some(false)) {
            SkillOutcome::Err { message: "all URL fetches failed".to_string() }
        } else {
            SkillOutcome::Ok { message: format!("fetched {} page(s)", pages.len()), data: json!({ "pages": pages }) }
        }
    }
}
