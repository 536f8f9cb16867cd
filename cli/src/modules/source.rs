//! Module source used by the CLI
//!
//! Resolution order for a specifier (already joined to the manifest's
//! directory by the composer when it was relative):
//!
//! 1. Configured alias → recursively resolve its target
//! 2. Built-in module (`mortar/memory`, ...)
//! 3. File path → the file itself, or the same path with `.toml` appended
//!
//! ```text
//! hello                  → (alias) → /srv/app/plugins/hello.toml
//! mortar/status          → built-in
//! /srv/app/plugins/hello → /srv/app/plugins/hello.toml (if it exists)
//! ```
//!
//! Loaded route tables are memoised per file, so a specifier resolves to
//! the same plugin value however often it appears.

use async_trait::async_trait;
use mortar::{BoxError, Module, ModuleHandle, ModuleRegistry, ModuleSource};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::builtin;
use super::route_table::RouteTable;
use crate::config::{MortarConfig, utils};

/// Extension probed when a path names no existing file
pub const ROUTE_TABLE_EXTENSION: &str = "toml";

const BUILTIN_PREFIX: &str = "builtin:";
const FILE_PREFIX: &str = "file:";

pub struct CliModules {
    builtins: ModuleRegistry,
    config: MortarConfig,
    loaded: Mutex<HashMap<PathBuf, Arc<Module>>>,
}

impl std::fmt::Debug for CliModules {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CliModules")
            .field("builtins", &self.builtins)
            .field("aliases", &self.config.aliases)
            .finish_non_exhaustive()
    }
}

impl CliModules {
    pub fn new(config: MortarConfig) -> Self {
        Self {
            builtins: builtin::catalogue(),
            config,
            loaded: Mutex::new(HashMap::new()),
        }
    }

    pub fn aliases(&self) -> &BTreeMap<String, String> {
        &self.config.aliases
    }

    /// Follow aliases from `spec` to the specifier that should be looked up.
    fn dealias<'a>(&'a self, spec: &'a str) -> Option<&'a str> {
        if !utils::is_identifier(spec) {
            return Some(spec);
        }
        match self.config.resolve_alias(spec) {
            Ok(Some(target)) => {
                tracing::debug!(alias = spec, resolved = target, "Resolved alias");
                Some(target)
            }
            Ok(None) => Some(spec),
            Err(e) => {
                tracing::warn!("{}", e);
                None
            }
        }
    }

    async fn find_file(spec: &str) -> Option<PathBuf> {
        let path = utils::expand_home(spec).ok()?;
        if is_file(&path).await {
            return Some(path);
        }

        let mut probed = path.into_os_string();
        probed.push(".");
        probed.push(ROUTE_TABLE_EXTENSION);
        let probed = PathBuf::from(probed);
        is_file(&probed).await.then_some(probed)
    }

    async fn load_file(&self, path: &Path) -> Result<Arc<Module>, BoxError> {
        let cached = self.lock().get(path).cloned();
        if let Some(module) = cached {
            return Ok(module);
        }

        let table = RouteTable::from_file(path).await?;
        tracing::debug!(path = %path.display(), plugin = %table.name, "Loaded route table");

        let mut loaded = self.lock();
        let module = loaded
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(Module::plugin(table)));
        Ok(module.clone())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, Arc<Module>>> {
        self.loaded
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

#[async_trait]
impl ModuleSource for CliModules {
    async fn try_resolve(&self, specifier: &str) -> Option<ModuleHandle> {
        let spec = self.dealias(specifier)?;

        if let Some(handle) = self.builtins.try_resolve(spec).await {
            return Some(ModuleHandle::new(format!("{}{}", BUILTIN_PREFIX, handle.id())));
        }

        if utils::is_path_spec(spec) {
            let path = Self::find_file(spec).await?;
            return Some(ModuleHandle::new(format!("{}{}", FILE_PREFIX, path.display())));
        }

        None
    }

    async fn load(&self, handle: &ModuleHandle) -> Result<Arc<Module>, BoxError> {
        if let Some(id) = handle.id().strip_prefix(BUILTIN_PREFIX) {
            return self.builtins.load(&ModuleHandle::new(id)).await;
        }
        if let Some(path) = handle.id().strip_prefix(FILE_PREFIX) {
            return self.load_file(Path::new(path)).await;
        }
        Err(format!("unknown module handle '{}'", handle.id()).into())
    }
}
