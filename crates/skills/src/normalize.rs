//! Argument normalization helpers shared by the built-in skill catalog.
//!
//! `spec.md` §4.3: "given an object whose keys may be any of the documented
//! aliases, produce an object whose keys are the declared parameter names."
//! These are data-shaped helper functions (one per rule named in the spec),
//! not a single generic alias table — grounded in shape on the ancestor
//! skills crate's `aliases.rs`, but operating on argument *keys* within one
//! skill rather than tool *names* across the registry.

use serde_json::{Map, Value};

/// Collapse `"owner/repo"` in a `repo` field into separate `owner`/`repo`
/// keys, for GitHub content/branch skills.
pub fn split_owner_repo(mut args: Value) -> Value {
    let Some(obj) = args.as_object_mut() else { return args };
    if obj.contains_key("owner") {
        return args;
    }
    if let Some(repo) = obj.get("repo").and_then(Value::as_str) {
        if let Some((owner, rest)) = repo.split_once('/') {
            let owner = owner.to_string();
            let rest = rest.to_string();
            obj.insert("owner".to_string(), Value::String(owner));
            obj.insert("repo".to_string(), Value::String(rest));
        }
    }
    args
}

/// Accept `paths`, `file_paths`, `files`, `items` as aliases for
/// `paths_list`; coerce a bare string into a single-item list; coerce a
/// list of `{path: ...}` objects into a list of strings.
pub fn coerce_paths_list(mut args: Value) -> Value {
    let Some(obj) = args.as_object_mut() else { return args };
    if obj.contains_key("paths_list") {
        return args;
    }
    let raw = ["paths", "file_paths", "files", "items"]
        .iter()
        .find_map(|k| obj.remove(*k));
    let Some(raw) = raw else { return args };

    let list = match raw {
        Value::String(s) => vec![Value::String(s)],
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(ref o) => {
                    o.get("path").and_then(Value::as_str).map(|s| Value::String(s.to_string())).unwrap_or(item)
                }
                other => other,
            })
            .collect(),
        other => vec![other],
    };
    obj.insert("paths_list".to_string(), Value::Array(list));
    args
}

/// Accept `url`, `web_url`, `links` as aliases for `urls`; default
/// `max_pages`/`max_chars`.
pub fn coerce_urls_list(mut args: Value, default_max_pages: u64, default_max_chars: u64) -> Value {
    let obj = if let Some(obj) = args.as_object_mut() {
        obj
    } else {
        let mut m = Map::new();
        if let Value::String(s) = args {
            m.insert("urls".to_string(), Value::Array(vec![Value::String(s)]));
        }
        args = Value::Object(m);
        args.as_object_mut().unwrap()
    };

    if !obj.contains_key("urls") {
        let raw = ["url", "web_url", "links"].iter().find_map(|k| obj.remove(*k));
        if let Some(raw) = raw {
            let list = match raw {
                Value::String(s) => vec![Value::String(s)],
                Value::Array(items) => items,
                other => vec![other],
            };
            obj.insert("urls".to_string(), Value::Array(list));
        }
    }
    obj.entry("max_pages").or_insert(Value::from(default_max_pages));
    obj.entry("max_chars").or_insert(Value::from(default_max_chars));
    args
}
