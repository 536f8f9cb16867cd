//! `mortar serve`: compose a manifest and serve its routes over HTTP
//!
//! Every request goes through a single axum fallback that hands it to the
//! composed hub, so the routes plugins registered are served exactly as
//! `Hub::inject` would answer them.

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use mortar::Hub;
use mortar::hub::Request;
use serde_json::Value;
use std::path::Path;

use super::compose::{compose_manifest, load_manifest};
use crate::config::MortarConfig;

/// Command-line overrides for the manifest's `server` table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServeOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl ServeOverrides {
    fn apply(&self, manifest: &mut mortar::Manifest) {
        if self.host.is_none() && self.port.is_none() {
            return;
        }
        let server = manifest.server.get_or_insert_with(Default::default);
        if let Some(host) = &self.host {
            server
                .settings
                .insert("host".to_string(), Value::String(host.clone()));
        }
        if let Some(port) = self.port {
            server.settings.insert("port".to_string(), Value::from(port));
        }
    }
}

/// Router that answers every request from `hub`.
pub fn router(hub: Hub) -> Router {
    Router::new().fallback(dispatch).with_state(hub)
}

async fn dispatch(State(hub): State<Hub>, method: Method, uri: Uri, headers: HeaderMap) -> Response {
    let request = to_request(&method, &uri, &headers);
    let response = hub.dispatch(&request);
    tracing::debug!(
        method = %request.method,
        path = %request.path,
        status = response.status,
        "Dispatched request"
    );
    to_http(response)
}

fn to_request(method: &Method, uri: &Uri, headers: &HeaderMap) -> Request {
    let request = Request::new(method.as_str(), uri.path());
    // vhosts are matched on the bare hostname
    match headers.get(header::HOST).and_then(|h| h.to_str().ok()) {
        Some(host) => request.with_host(strip_port(host)),
        None => request,
    }
}

fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        // [::1]:8080
        return host.split_once(']').map_or(host, |(addr, _)| &host[..=addr.len()]);
    }
    host.rsplit_once(':').map_or(host, |(name, _)| name)
}

/// The host to hand the resolver; `[::1]` and `::1` both bind IPv6 loopback.
fn bind_host(host: &str) -> &str {
    host.strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host)
}

fn display_addr(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

fn to_http(response: mortar::hub::Response) -> Response {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        [(header::CONTENT_TYPE, response.content_type)],
        response.body,
    )
        .into_response()
}

pub async fn run(path: &Path, overrides: ServeOverrides, config: MortarConfig) -> Result<()> {
    let mut manifest = load_manifest(path)?;
    overrides.apply(&mut manifest);

    let hub = compose_manifest(&manifest, path, config).await?;
    let info = hub.info().clone();
    let routes = hub.routes().len();

    let host = bind_host(&info.host);
    let listener = tokio::net::TcpListener::bind((host, info.port))
        .await
        .with_context(|| format!("Failed to bind {}", display_addr(host, info.port)))?;
    let local = listener.local_addr()?;

    tracing::info!(addr = %local, routes, "Serving composed manifest");
    eprintln!("Listening on http://{}", local);

    axum::serve(listener, router(hub))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            eprintln!("Received shutdown signal...");
        })
        .await?;

    Ok(())
}
