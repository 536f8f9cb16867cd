//! `mortar compose`: load a manifest file and compose it
//!
//! Relative specifiers in the manifest resolve against the manifest's own
//! directory, so a manifest and its route tables can move together.

use anyhow::{Context, Result};
use mortar::hub::{Registration, RouteInfo, ServerInfo};
use mortar::{ComposeOptions, Hub, Manifest};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::MortarConfig;
use crate::modules::CliModules;

/// Manifest document formats, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Json,
    Toml,
}

impl ManifestFormat {
    /// `.toml` is TOML; everything else is read as JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ManifestFormat::Toml,
            _ => ManifestFormat::Json,
        }
    }
}

/// Read and parse a manifest file.
pub fn load_manifest(path: &Path) -> Result<Manifest> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest: {}", path.display()))?;

    let manifest = match ManifestFormat::from_path(path) {
        ManifestFormat::Toml => Manifest::from_toml_str(&source),
        ManifestFormat::Json => Manifest::from_json_str(&source),
    }
    .with_context(|| format!("Failed to load manifest: {}", path.display()))?;

    Ok(manifest)
}

/// The directory relative specifiers in `path` resolve against
pub fn manifest_dir(path: &Path) -> Result<PathBuf> {
    let canonical = path
        .canonicalize()
        .with_context(|| format!("Failed to resolve manifest path: {}", path.display()))?;
    Ok(canonical
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("/")))
}

/// Compose an already-loaded manifest that was read from `path`.
pub async fn compose_manifest(manifest: &Manifest, path: &Path, config: MortarConfig) -> Result<Hub> {
    let options = ComposeOptions::new().relative_to(manifest_dir(path)?);
    let modules = Arc::new(CliModules::new(config));

    let hub = mortar::compose(manifest, &options, modules)
        .await
        .with_context(|| format!("Failed to compose {}", path.display()))?;
    Ok(hub)
}

/// What a composed server consists of
#[derive(Debug, Serialize)]
pub struct Summary {
    pub server: ServerInfo,
    pub plugins: Vec<Registration>,
    pub routes: Vec<RouteInfo>,
    pub caches: Vec<CacheSummary>,
}

#[derive(Debug, Serialize)]
pub struct CacheSummary {
    pub name: String,
    pub engine: String,
}

impl Summary {
    pub fn of(hub: &Hub) -> Self {
        Self {
            server: hub.info().clone(),
            plugins: hub.registrations(),
            routes: hub.routes(),
            caches: hub
                .caches()
                .into_iter()
                .map(|(name, engine)| CacheSummary { name, engine })
                .collect(),
        }
    }

    /// Human-readable rendering, one section per concern.
    pub fn render(&self) -> String {
        let mut out = format!("Server: {}:{}\n", self.server.host, self.server.port);

        out.push_str(&format!("\nPlugins ({}):\n", self.plugins.len()));
        for plugin in &self.plugins {
            match &plugin.version {
                Some(version) => out.push_str(&format!("  {} {}\n", plugin.name, version)),
                None => out.push_str(&format!("  {}\n", plugin.name)),
            }
        }

        out.push_str(&format!("\nRoutes ({}):\n", self.routes.len()));
        for route in &self.routes {
            out.push_str(&format!(
                "  {:<6} {}  ({})\n",
                route.method, route.path, route.plugin
            ));
        }

        out.push_str(&format!("\nCaches ({}):\n", self.caches.len()));
        for cache in &self.caches {
            out.push_str(&format!("  {} ({})\n", cache.name, cache.engine));
        }

        out
    }
}

pub async fn run(path: &Path, json: bool, config: MortarConfig) -> Result<()> {
    let manifest = load_manifest(path)?;
    let hub = compose_manifest(&manifest, path, config).await?;
    let summary = Summary::of(&hub);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?
        );
    } else {
        print!("{}", summary.render());
    }
    Ok(())
}
