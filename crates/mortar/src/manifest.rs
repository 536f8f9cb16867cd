//! Manifest data model
//!
//! A manifest describes a server as data:
//!
//! ```toml
//! [server]
//! port = 8080
//! cache = "mortar/memory"
//!
//! [register]
//! plugins = [
//!     "./plugins/hello.toml",
//!     { plugin = "mortar/echo", options = { message = "hi" }, routes = { prefix = "/echo" } },
//! ]
//!
//! [register.options]
//! once = true
//! ```
//!
//! Two fields accept several historical shorthands:
//!
//! - `server.cache`: a specifier, `{ provider }`, or a list of either, where
//!   `provider` is a specifier, an engine, or `{ constructor, options }`.
//! - `register.plugins[]`: a specifier or `{ plugin, options?, ...registration }`,
//!   where `plugin` is a specifier or a plugin value.
//!
//! Plugin values, cache engines, and pre-register hooks can only be supplied
//! in code; those enum variants are skipped when reading documents.
//!
//! Plugin `options` are held behind `Arc` and are shared, never copied,
//! by normalization.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

use crate::error::ComposeError;
use crate::hub::{CacheEngine, Plugin};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub server: Option<ServerManifest>,

    #[serde(default)]
    pub register: Option<Register>,
}

/// The `server` table. Opaque to the composer except for `cache`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerManifest {
    #[serde(default)]
    pub cache: Option<CacheSpec>,

    #[serde(flatten)]
    pub settings: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Register {
    #[serde(default)]
    pub plugins: Option<Vec<PluginSpec>>,

    /// Registration options shared by every plugin in the batch
    #[serde(default)]
    pub options: Option<RegistrationOptions>,
}

/// Options controlling how the framework registers a plugin.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistrationOptions {
    /// Skip the plugin silently if a plugin of the same name is already registered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub once: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routes: Option<RouteOptions>,

    /// Keys the framework does not know; rejected by [`Manifest::validate`]
    #[serde(flatten, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vhost: Option<String>,
}

impl RegistrationOptions {
    /// Field-by-field merge where `self` wins over `shared`.
    pub fn merged_over(&self, shared: &RegistrationOptions) -> RegistrationOptions {
        let routes = match (&self.routes, &shared.routes) {
            (None, None) => None,
            (own, shared) => {
                let own = own.clone().unwrap_or_default();
                let shared = shared.clone().unwrap_or_default();
                Some(RouteOptions {
                    prefix: own.prefix.or(shared.prefix),
                    vhost: own.vhost.or(shared.vhost),
                })
            }
        };

        let mut extra = shared.extra.clone();
        extra.extend(self.extra.clone());

        RegistrationOptions {
            once: self.once.or(shared.once),
            routes,
            extra,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.once.is_none() && self.routes.is_none() && self.extra.is_empty()
    }
}

/// One entry of `register.plugins`.
#[derive(Clone, Deserialize)]
#[serde(untagged)]
pub enum PluginSpec {
    Specifier(String),
    Entry(PluginEntry),
}

#[derive(Clone, Deserialize)]
pub struct PluginEntry {
    pub plugin: PluginRef,

    #[serde(default)]
    pub options: Option<Arc<Value>>,

    /// Registration options declared alongside `plugin`
    #[serde(flatten)]
    pub registration: RegistrationOptions,
}

#[derive(Clone, Deserialize)]
#[serde(untagged)]
pub enum PluginRef {
    Specifier(String),
    #[serde(skip_deserializing)]
    Plugin(Arc<dyn Plugin>),
}

/// `server.cache`
#[derive(Clone, Deserialize)]
#[serde(untagged)]
pub enum CacheSpec {
    Many(Vec<CacheItem>),
    One(CacheItem),
}

#[derive(Clone, Deserialize)]
#[serde(untagged)]
pub enum CacheItem {
    Specifier(String),
    Entry(CacheEntry),
}

#[derive(Clone, Deserialize)]
pub struct CacheEntry {
    pub provider: ProviderSpec,

    #[serde(default)]
    pub name: Option<String>,

    /// Remaining per-cache settings, passed to the framework untouched
    #[serde(flatten)]
    pub settings: Map<String, Value>,
}

#[derive(Clone, Deserialize)]
#[serde(untagged)]
pub enum ProviderSpec {
    Specifier(String),
    Config(ProviderConfig),
    #[serde(skip_deserializing)]
    Engine(Arc<dyn CacheEngine>),
}

#[derive(Clone, Deserialize)]
pub struct ProviderConfig {
    pub constructor: ConstructorRef,

    #[serde(default)]
    pub options: Option<Value>,
}

#[derive(Clone, Deserialize)]
#[serde(untagged)]
pub enum ConstructorRef {
    Specifier(String),
    #[serde(skip_deserializing)]
    Engine(Arc<dyn CacheEngine>),
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a manifest from an already-parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self, ComposeError> {
        serde_json::from_value(value).map_err(|e| ComposeError::invalid_manifest(vec![e.to_string()]))
    }

    pub fn from_json_str(source: &str) -> Result<Self, ComposeError> {
        serde_json::from_str(source).map_err(|e| ComposeError::invalid_manifest(vec![e.to_string()]))
    }

    pub fn from_toml_str(source: &str) -> Result<Self, ComposeError> {
        toml::from_str(source)
            .map_err(|e| ComposeError::invalid_manifest(vec![e.to_string()]))
    }

    pub fn server(mut self, server: ServerManifest) -> Self {
        self.server = Some(server);
        self
    }

    /// Append a plugin entry to `register.plugins`.
    pub fn plugin(mut self, spec: impl Into<PluginSpec>) -> Self {
        self.register
            .get_or_insert_with(Register::default)
            .plugins
            .get_or_insert_with(Vec::new)
            .push(spec.into());
        self
    }

    pub fn register_options(mut self, options: RegistrationOptions) -> Self {
        self.register.get_or_insert_with(Register::default).options = Some(options);
        self
    }

    pub fn plugins(&self) -> Option<&[PluginSpec]> {
        self.register.as_ref()?.plugins.as_deref()
    }

    pub fn cache(&self) -> Option<&CacheSpec> {
        self.server.as_ref()?.cache.as_ref()
    }

    /// Validate the manifest for errors serde cannot express
    ///
    /// Returns Ok(()) if valid, or Err with a list of error messages
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if let Some(cache) = self.cache() {
            for (i, item) in cache.items().iter().enumerate() {
                if let Some(spec) = item.specifier()
                    && spec.is_empty()
                {
                    errors.push(format!("server.cache[{}]: empty specifier", i));
                }
            }
        }

        if let Some(register) = &self.register {
            if let Some(options) = &register.options {
                validate_registration("register.options", options, &mut errors);
            }

            for (i, spec) in register.plugins.iter().flatten().enumerate() {
                match spec {
                    PluginSpec::Specifier(s) if s.is_empty() => {
                        errors.push(format!("register.plugins[{}]: empty specifier", i));
                    }
                    PluginSpec::Entry(entry) => {
                        if let PluginRef::Specifier(s) = &entry.plugin
                            && s.is_empty()
                        {
                            errors.push(format!("register.plugins[{}].plugin: empty specifier", i));
                        }
                        validate_registration(
                            &format!("register.plugins[{}]", i),
                            &entry.registration,
                            &mut errors,
                        );
                    }
                    PluginSpec::Specifier(_) => {}
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn validate_registration(path: &str, options: &RegistrationOptions, errors: &mut Vec<String>) {
    for key in options.extra.keys() {
        errors.push(format!("{}: unknown registration option '{}'", path, key));
    }

    if let Some(prefix) = options.routes.as_ref().and_then(|r| r.prefix.as_deref())
        && !prefix.starts_with('/')
    {
        errors.push(format!(
            "{}.routes.prefix: '{}' must start with '/'",
            path, prefix
        ));
    }
}

impl ServerManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache(mut self, cache: CacheSpec) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn setting(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }
}

impl CacheSpec {
    /// The cache entries as a list, whichever shorthand they were written in.
    pub fn items(&self) -> &[CacheItem] {
        match self {
            CacheSpec::Many(items) => items,
            CacheSpec::One(item) => std::slice::from_ref(item),
        }
    }
}

impl CacheItem {
    /// The module specifier this item would load, if any.
    pub fn specifier(&self) -> Option<&str> {
        match self {
            CacheItem::Specifier(s) => Some(s),
            CacheItem::Entry(entry) => match &entry.provider {
                ProviderSpec::Specifier(s) => Some(s),
                ProviderSpec::Config(ProviderConfig {
                    constructor: ConstructorRef::Specifier(s),
                    ..
                }) => Some(s),
                _ => None,
            },
        }
    }
}

impl PluginEntry {
    pub fn new(plugin: impl Into<PluginRef>) -> Self {
        Self {
            plugin: plugin.into(),
            options: None,
            registration: RegistrationOptions::default(),
        }
    }

    pub fn options(mut self, options: impl Into<Arc<Value>>) -> Self {
        self.options = Some(options.into());
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.registration
            .routes
            .get_or_insert_with(RouteOptions::default)
            .prefix = Some(prefix.into());
        self
    }

    pub fn once(mut self, once: bool) -> Self {
        self.registration.once = Some(once);
        self
    }
}

impl From<&str> for PluginSpec {
    fn from(spec: &str) -> Self {
        PluginSpec::Specifier(spec.to_string())
    }
}

impl From<String> for PluginSpec {
    fn from(spec: String) -> Self {
        PluginSpec::Specifier(spec)
    }
}

impl From<PluginEntry> for PluginSpec {
    fn from(entry: PluginEntry) -> Self {
        PluginSpec::Entry(entry)
    }
}

impl From<&str> for PluginRef {
    fn from(spec: &str) -> Self {
        PluginRef::Specifier(spec.to_string())
    }
}

impl From<Arc<dyn Plugin>> for PluginRef {
    fn from(plugin: Arc<dyn Plugin>) -> Self {
        PluginRef::Plugin(plugin)
    }
}

impl From<&str> for CacheSpec {
    fn from(spec: &str) -> Self {
        CacheSpec::One(CacheItem::Specifier(spec.to_string()))
    }
}

impl fmt::Debug for PluginSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginSpec::Specifier(s) => f.debug_tuple("Specifier").field(s).finish(),
            PluginSpec::Entry(entry) => f
                .debug_struct("Entry")
                .field("plugin", &entry.plugin)
                .field("options", &entry.options)
                .field("registration", &entry.registration)
                .finish(),
        }
    }
}

impl fmt::Debug for PluginRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginRef::Specifier(s) => f.debug_tuple("Specifier").field(s).finish(),
            PluginRef::Plugin(p) => f.debug_tuple("Plugin").field(&p.name()).finish(),
        }
    }
}

impl fmt::Debug for CacheSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.items()).finish()
    }
}

impl fmt::Debug for CacheItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheItem::Specifier(s) => f.debug_tuple("Specifier").field(s).finish(),
            CacheItem::Entry(entry) => {
                let provider = match &entry.provider {
                    ProviderSpec::Specifier(s) => s.clone(),
                    ProviderSpec::Engine(e) => format!("<engine {}>", e.name()),
                    ProviderSpec::Config(config) => match &config.constructor {
                        ConstructorRef::Specifier(s) => s.clone(),
                        ConstructorRef::Engine(e) => format!("<engine {}>", e.name()),
                    },
                };
                f.debug_struct("Entry")
                    .field("provider", &provider)
                    .field("name", &entry.name)
                    .finish_non_exhaustive()
            }
        }
    }
}
