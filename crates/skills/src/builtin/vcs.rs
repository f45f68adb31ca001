//! Source-control read skills — grounded on `ai_github_tools/github_client.py`'s
//! `github_request`/content-decoding helpers. Only the read surface is carried
//! (no issue/PR writes, no token management UI) per `spec.md` §4.3's catalog.

use async_trait::async_trait;
use base64::Engine;
use lg_domain::skill::{SkillOutcome, SkillPermission, SkillSchema};
use serde_json::{json, Value};

use crate::invoker::SkillInvoker;
use crate::normalize::split_owner_repo;

const GITHUB_API_BASE: &str = "https://api.github.com";

pub struct GithubReadFile {
    client: reqwest::Client,
    token: Option<String>,
}

impl GithubReadFile {
    pub fn new(token: Option<String>) -> Self {
        Self { client: reqwest::Client::new(), token }
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let req = req.header("Accept", "application/vnd.github+json");
        match &self.token {
            Some(t) if !t.is_empty() => req.bearer_auth(t),
            _ => req,
        }
    }
}

#[async_trait]
impl SkillInvoker for GithubReadFile {
    fn name(&self) -> &str {
        "github_read_file"
    }
    fn description(&self) -> &str {
        "Read a file's contents from a GitHub repository at a given ref."
    }
    fn permission(&self) -> SkillPermission {
        SkillPermission::Read
    }
    fn schema(&self) -> SkillSchema {
        SkillSchema {
            required: vec!["owner".to_string(), "repo".to_string(), "path".to_string()],
            parameters: json!({
                "owner": {"type": "string"},
                "repo": {"type": "string"},
                "path": {"type": "string"},
                "ref": {"type": "string"},
            }),
        }
    }
    fn normalize(&self, args: Value) -> Value {
        split_owner_repo(args)
    }
    async fn call(&self, args: Value) -> SkillOutcome {
        let (Some(owner), Some(repo), Some(path)) = (
            args.get("owner").and_then(Value::as_str),
            args.get("repo").and_then(Value::as_str),
            args.get("path").and_then(Value::as_str),
        ) else {
            return SkillOutcome::Err { message: "missing required argument: owner, repo, or path".to_string() };
        };
        let mut url = format!("{GITHUB_API_BASE}/repos/{owner}/{repo}/contents/{path}");
        if let Some(r) = args.get("ref").and_then(Value::as_str) {
            url.push_str(&format!("?ref={r}"));
        }
        let req = self.authed(self.client.get(&url));
        let resp = match req.send().await {
            Ok(r) => r,
            Err(e) => return SkillOutcome::Err { message: format!("github_request_failed: {e}") },
        };
        if !resp.status().is_success() {
            return SkillOutcome::Err { message: format!("github_api_error: {}", resp.status()) };
        }
        let body: Value = match resp.json().await {
            Ok(b) => b,
            Err(e) => return SkillOutcome::Err { message: format!("github_response_parse_failed: {e}") },
        };
        let Some(encoded) = body.get("content").and_then(Value::as_str) else {
            return SkillOutcome::Err { message: "not_a_file: path did not resolve to a single file".to_string() };
        };
        let cleaned: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
        let decoded = match base64::engine::general_purpose::STANDARD.decode(cleaned) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => return SkillOutcome::Err { message: format!("decode_failed: {e}") },
        };
        SkillOutcome::Ok { message: format!("read {path}"), data: json!({ "content": decoded }) }
    }
}

pub struct GithubListBranches {
    client: reqwest::Client,
    token: Option<String>,
}

impl GithubListBranches {
    pub fn new(token: Option<String>) -> Self {
        Self { client: reqwest::Client::new(), token }
    }
}

#[async_trait]
impl SkillInvoker for GithubListBranches {
    fn name(&self) -> &str {
        "github_list_branches"
    }
    fn description(&self) -> &str {
        "List branches in a GitHub repository."
    }
    fn permission(&self) -> SkillPermission {
        SkillPermission::Read
    }
    fn schema(&self) -> SkillSchema {
        SkillSchema {
            required: vec!["owner".to_string(), "repo".to_string()],
            parameters: json!({"owner": {"type": "string"}, "repo": {"type": "string"}}),
        }
    }
    fn normalize(&self, args: Value) -> Value {
        split_owner_repo(args)
    }
    async fn call(&self, args: Value) -> SkillOutcome {
        let (Some(owner), Some(repo)) =
            (args.get("owner").and_then(Value::as_str), args.get("repo").and_then(Value::as_str))
        else {
            return SkillOutcome::Err { message: "missing required argument: owner or repo".to_string() };
        };
        let url = format!("{GITHUB_API_BASE}/repos/{owner}/{repo}/branches");
        let mut req = self.client.get(&url).header("Accept", "application/vnd.github+json");
        if let Some(t) = &self.token {
            if !t.is_empty() {
                req = req.bearer_auth(t);
            }
        }
        let resp = match req.send().await {
            Ok(r) => r,
            Err(e) => return SkillOutcome::Err { message: format!("github_request_failed: {e}") },
        };
        if !resp.status().is_success() {
            return SkillOutcome::Err { message: format!("github_api_error: {}", resp.status()) };
        }
        let body: Value = match resp.json().await {
            Ok(b) => b,
            Err(e) => return SkillOutcome::Err { message: format!("github_response_parse_failed: {e}") },
        };
        let names: Vec<String> = body
            .as_array()
            .map(|items| items.iter().filter_map(|b| b.get("name").and_then(Value::as_str).map(String::from)).collect())
            .unwrap_or_default();
        SkillOutcome::Ok { message: format!("{} branch(es)", names.len()), data: json!({ "branches": names }) }
    }
}
