//! Routes, requests and responses for the hub server
//!
//! Routing is exact-match on method and path. The hub has no parameters or
//! wildcards; it only needs enough to let plugins publish endpoints that can
//! be exercised in-process through [`Hub::inject`](super::Hub::inject) or
//! served over HTTP by the CLI.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Handler invoked for a matched route.
pub type Handler = Arc<dyn Fn(&Request) -> Response + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub host: Option<String>,
}

impl Request {
    pub fn new(method: &str, path: &str) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            path: path.to_string(),
            host: None,
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Response {
    pub status: u16,
    pub content_type: String,
    pub body: String,
}

impl Response {
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            content_type: "text/plain; charset=utf-8".to_string(),
            body: body.into(),
        }
    }

    pub fn json(value: &serde_json::Value) -> Self {
        Self {
            status: 200,
            content_type: "application/json".to_string(),
            body: value.to_string(),
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: 404,
            ..Self::text("Not Found")
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }
}

/// A route as registered by a plugin, after prefixing.
#[derive(Clone)]
pub struct Route {
    pub method: String,
    pub path: String,
    pub vhost: Option<String>,
    pub plugin: String,
    pub(crate) handler: Handler,
}

impl Route {
    pub(crate) fn matches(&self, request: &Request) -> bool {
        if self.method != request.method || self.path != request.path {
            return false;
        }
        match (&self.vhost, &request.host) {
            (Some(vhost), Some(host)) => vhost == host,
            (Some(_), None) => false,
            (None, _) => true,
        }
    }

    pub(crate) fn conflicts_with(&self, other: &Route) -> bool {
        self.method == other.method && self.path == other.path && self.vhost == other.vhost
    }

    pub fn handle(&self, request: &Request) -> Response {
        (self.handler)(request)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("vhost", &self.vhost)
            .field("plugin", &self.plugin)
            .finish_non_exhaustive()
    }
}

/// Public summary of a registered route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteInfo {
    pub method: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vhost: Option<String>,
    pub plugin: String,
}

impl From<&Route> for RouteInfo {
    fn from(route: &Route) -> Self {
        Self {
            method: route.method.clone(),
            path: route.path.clone(),
            vhost: route.vhost.clone(),
            plugin: route.plugin.clone(),
        }
    }
}

/// Apply a registration prefix to a plugin-declared path.
///
/// The result always starts with `/`; the prefix's trailing `/` and the path's
/// leading `/` are collapsed into one.
pub fn prefixed_path(prefix: Option<&str>, path: &str) -> String {
    let path = path.trim_start_matches('/');
    match prefix {
        Some(prefix) if !prefix.trim_matches('/').is_empty() => {
            let prefix = prefix.trim_end_matches('/');
            if path.is_empty() {
                prefix.to_string()
            } else {
                format!("{}/{}", prefix, path)
            }
        }
        _ => format!("/{}", path),
    }
}
