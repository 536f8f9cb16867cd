//! File-backed route-table plugins
//!
//! A `.toml` file of this shape loads as a plugin:
//!
//! ```toml
//! name = "hello"
//! version = "1.0.0"     # optional
//! multiple = false      # optional
//!
//! [[routes]]
//! method = "GET"
//! path = "/hello"
//! body = "world"
//! status = 200          # optional
//! ```
//!
//! Each route serves its fixed body. The registration's `routes.prefix`
//! applies as for any other plugin.

use anyhow::{Context, Result};
use async_trait::async_trait;
use mortar::BoxError;
use mortar::hub::{Plugin, Realm, Response};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteTable {
    pub name: String,

    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub multiple: bool,

    #[serde(default)]
    pub routes: Vec<RouteSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteSpec {
    #[serde(default = "default_method")]
    pub method: String,
    pub path: String,
    #[serde(default)]
    pub body: String,
    #[serde(default = "default_status")]
    pub status: u16,
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_status() -> u16 {
    200
}

impl RouteTable {
    pub fn parse(source: &str) -> Result<Self> {
        let table: RouteTable = toml::from_str(source).context("Invalid route table")?;
        if table.name.is_empty() {
            anyhow::bail!("Invalid route table: name must not be empty");
        }
        Ok(table)
    }

    pub async fn from_file(path: &Path) -> Result<Self> {
        let source = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read route table: {}", path.display()))?;
        Self::parse(&source).with_context(|| format!("in {}", path.display()))
    }
}

#[async_trait]
impl Plugin for RouteTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    fn multiple(&self) -> bool {
        self.multiple
    }

    async fn register(&self, realm: &Realm, _options: Arc<Value>) -> Result<(), BoxError> {
        for route in &self.routes {
            let response = Response::text(route.body.clone()).with_status(route.status);
            realm.route(&route.method, &route.path, move |_| response.clone())?;
        }
        tracing::debug!(plugin = %self.name, routes = self.routes.len(), "Registered route table");
        Ok(())
    }
}
