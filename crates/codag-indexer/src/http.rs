//! HTTP endpoint literals: normalisation, object allow-lists and path matching

use crate::config::HttpConfig;
use codag_core::MatchConfidence;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

pub const HTTP_VERBS: [&str; 7] = ["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"];

/// Upper-case verb for a method name: `post`, `Post`, `POST` → `POST`.
pub fn http_verb(name: &str) -> Option<&'static str> {
    HTTP_VERBS.iter().copied().find(|verb| verb.eq_ignore_ascii_case(name))
}

/// Router and client object allow-lists.
#[derive(Debug, Clone)]
pub struct HttpObjects {
    routers: HashSet<String>,
    clients: HashSet<String>,
}

impl HttpObjects {
    pub fn from_config(config: &HttpConfig) -> Self {
        HttpObjects {
            routers: config.router_objects.iter().cloned().collect(),
            clients: config.client_objects.iter().cloned().collect(),
        }
    }

    /// `app`, `this.router`, `api.v1` (last segment decides).
    pub fn is_router(&self, receiver: &str) -> bool {
        self.routers.contains(last_segment(receiver))
    }

    pub fn is_client(&self, receiver: &str) -> bool {
        self.clients.contains(last_segment(receiver))
    }
}

impl Default for HttpObjects {
    fn default() -> Self {
        Self::from_config(&HttpConfig::default())
    }
}

fn last_segment(receiver: &str) -> &str {
    let trimmed = receiver.trim_end_matches("()");
    trimmed
        .rsplit(['.', ':', '>'])
        .next()
        .unwrap_or(trimmed)
}

fn interpolation() -> &'static Regex {
    static INTERPOLATION: OnceLock<Regex> = OnceLock::new();
    // `${id}`, `{id}`, `\(id)`
    INTERPOLATION.get_or_init(|| Regex::new(r"\$\{[^}]*\}|\{[^}]*\}|\\\([^)]*\)").expect("valid regex"))
}

/// Normalise an endpoint literal to a route path.
///
/// Quotes are stripped, interpolations become `:param`, absolute URLs keep
/// only their path (no query or fragment), a leading slash is enforced and a
/// trailing one removed. Returns `None` unless the literal starts with `/` or
/// `http` and the normalized path keeps a slash of its own, not just the one
/// enforced at the front.
pub fn normalize_path(raw: &str) -> Option<String> {
    let literal = crate::languages::strip_quotes(raw).trim();
    if !(literal.starts_with('/') || literal.starts_with("http")) {
        return None;
    }

    let replaced = interpolation().replace_all(literal, ":param");
    let mut path: &str = &replaced;

    if path.starts_with("http") {
        let (_, rest) = path.split_once("://")?;
        path = rest.find('/').map_or("", |slash| &rest[slash..]);
    }
    if let Some(end) = path.find(['?', '#']) {
        path = &path[..end];
    }
    if !path.contains('/') {
        return None;
    }

    let mut normalized = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };
    while normalized.len() > 1 && normalized.ends_with('/') {
        normalized.pop();
    }
    Some(normalized)
}

fn trim_trailing_slash(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}

fn is_param_segment(segment: &str) -> bool {
    segment.starts_with(':') || (segment.starts_with('{') && segment.ends_with('}'))
}

/// Pair a handler route with a client request.
///
/// Methods compare case-insensitively. Identical paths (ignoring a trailing
/// slash) are an exact match; otherwise handler segments like `:id` or `{id}`
/// match any single client segment for a fuzzy match.
pub fn match_paths(
    handler_path: &str,
    client_path: &str,
    handler_method: &str,
    client_method: &str,
) -> Option<MatchConfidence> {
    if !handler_method.eq_ignore_ascii_case(client_method) {
        return None;
    }

    let handler = trim_trailing_slash(handler_path);
    let client = trim_trailing_slash(client_path);
    if handler == client {
        return Some(MatchConfidence::Exact);
    }

    let segments: Vec<&str> = handler.split('/').collect();
    if !segments.iter().any(|s| is_param_segment(s)) {
        return None;
    }
    let pattern = segments
        .iter()
        .map(|s| if is_param_segment(s) { "[^/]+".to_string() } else { regex::escape(s) })
        .collect::<Vec<_>>()
        .join("/");

    let regex = Regex::new(&format!("^{}$", pattern)).ok()?;
    regex.is_match(client).then_some(MatchConfidence::Fuzzy)
}
