//! Hub: the reference server framework that manifests compose into
//!
//! The composer only relies on the narrow contract in [`crate::framework`];
//! the hub is one implementation of it, small enough to run in-process and
//! complete enough to serve real requests:
//!
//! - `info` with host and port taken from the manifest's `server` table
//! - named caches provisioned from normalized cache descriptors; a cache
//!   declared without `shared = true` is claimed by the first plugin that
//!   asks for it
//! - ordered plugin registration with name uniqueness, `once`, and
//!   dependency checks
//! - per-plugin exposed values and prefixed routes
//! - in-process request injection
//!
//! ```text
//! Manifest ──compose──> HubFactory::create ──> Hub
//!                                              │ register(descriptors, shared)
//!                                              ▼
//!                              Plugin::register(&Realm, options)
//!                                  ├─ realm.expose(..)
//!                                  └─ realm.route(..)
//! ```

pub mod cache;
pub mod plugin;
pub mod route;

pub use cache::{CacheClient, CacheEngine, MemoryCache, MemoryEngine};
pub use plugin::{FnPlugin, Plugin, Realm};
pub use route::{Request, Response, RouteInfo};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use thiserror::Error;

use self::route::Route;
use crate::error::BoxError;
use crate::framework::{ServerFactory, ServerHandle, ServerOptions};
use crate::manifest::RegistrationOptions;
use crate::normalize::PluginDescriptor;

/// Cache name used for a descriptor without an explicit `name`
pub const DEFAULT_CACHE: &str = "_default";

const DEFAULT_HOST: &str = "localhost";

#[derive(Error, Debug)]
pub enum HubError {
    #[error("invalid server setting '{key}': {reason}")]
    InvalidSetting { key: String, reason: String },

    #[error("cache '{0}' is already provisioned")]
    DuplicateCache(String),

    #[error("failed to provision cache '{name}' with engine '{engine}': {source}")]
    CacheProvision {
        name: String,
        engine: String,
        #[source]
        source: BoxError,
    },

    #[error("plugin '{0}' is already registered")]
    DuplicatePlugin(String),

    #[error("plugin '{plugin}' missing dependency '{dependency}'")]
    MissingDependency { plugin: String, dependency: String },

    #[error("route {method} {path} is already defined")]
    RouteConflict { method: String, path: String },

    #[error("unknown cache '{0}'")]
    UnknownCache(String),

    #[error("cache '{name}' is not shared and already belongs to plugin '{owner}'")]
    CacheNotShared { name: String, owner: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerInfo {
    pub host: String,
    pub port: u16,
}

/// A completed plugin registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
}

struct CacheSlot {
    engine: String,
    shared: bool,
    client: Arc<dyn CacheClient>,
}

/// Read the per-cache settings the hub understands.
fn cache_shared(name: &str, settings: &Map<String, Value>) -> Result<bool, HubError> {
    let mut shared = false;
    for (key, value) in settings {
        match (key.as_str(), value) {
            ("shared", Value::Bool(flag)) => shared = *flag,
            ("shared", other) => {
                return Err(HubError::InvalidSetting {
                    key: format!("cache.{}.shared", name),
                    reason: format!("expected a boolean, got {}", other),
                });
            }
            (other, _) => {
                return Err(HubError::InvalidSetting {
                    key: format!("cache.{}.{}", name, other),
                    reason: "unknown cache setting".to_string(),
                });
            }
        }
    }
    Ok(shared)
}

#[derive(Default)]
struct State {
    registrations: Vec<Registration>,
    exposed: BTreeMap<String, Map<String, Value>>,
    cache_owners: BTreeMap<String, String>,
    routes: Vec<Route>,
}

struct Inner {
    info: ServerInfo,
    settings: Map<String, Value>,
    caches: BTreeMap<String, CacheSlot>,
    state: Mutex<State>,
}

/// A composed server. Cloning is cheap and every clone shares state.
#[derive(Clone)]
pub struct Hub {
    inner: Arc<Inner>,
}

/// A non-owning handle, for route handlers that need the hub they belong to.
#[derive(Clone)]
pub struct WeakHub {
    inner: Weak<Inner>,
}

impl WeakHub {
    pub fn upgrade(&self) -> Option<Hub> {
        self.inner.upgrade().map(|inner| Hub { inner })
    }
}

impl fmt::Debug for Hub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hub")
            .field("info", &self.inner.info)
            .field("caches", &self.caches())
            .field("plugins", &self.registered_names())
            .finish_non_exhaustive()
    }
}

impl Hub {
    /// Build a hub from construction options.
    ///
    /// `host` must be a string and `port` an integer in `0..=65535`; other
    /// settings are kept verbatim and readable through [`Hub::settings`].
    pub fn new(options: ServerOptions) -> Result<Self, HubError> {
        let ServerOptions { settings, cache } = options;

        let host = match settings.get("host") {
            None => DEFAULT_HOST.to_string(),
            Some(Value::String(host)) => host.clone(),
            Some(other) => {
                return Err(HubError::InvalidSetting {
                    key: "host".to_string(),
                    reason: format!("expected a string, got {}", other),
                });
            }
        };

        let port = match settings.get("port") {
            None => 0,
            Some(value) => value
                .as_u64()
                .and_then(|p| u16::try_from(p).ok())
                .ok_or_else(|| HubError::InvalidSetting {
                    key: "port".to_string(),
                    reason: format!("expected an integer in 0..=65535, got {}", value),
                })?,
        };

        let mut caches = BTreeMap::new();
        for descriptor in cache.unwrap_or_default() {
            let name = descriptor
                .name
                .clone()
                .unwrap_or_else(|| DEFAULT_CACHE.to_string());
            if caches.contains_key(&name) {
                return Err(HubError::DuplicateCache(name));
            }
            let shared = cache_shared(&name, &descriptor.settings)?;

            let engine = descriptor.provider.constructor.name().to_string();
            let options = descriptor.provider.options.clone().unwrap_or(Value::Null);
            let client = descriptor
                .provider
                .constructor
                .create(&options)
                .map_err(|source| HubError::CacheProvision {
                    name: name.clone(),
                    engine: engine.clone(),
                    source,
                })?;

            tracing::debug!(cache = %name, engine = %engine, shared, "Provisioned cache");
            caches.insert(
                name,
                CacheSlot {
                    engine,
                    shared,
                    client,
                },
            );
        }

        Ok(Self {
            inner: Arc::new(Inner {
                info: ServerInfo { host, port },
                settings,
                caches,
                state: Mutex::new(State::default()),
            }),
        })
    }

    pub fn downgrade(&self) -> WeakHub {
        WeakHub {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn info(&self) -> &ServerInfo {
        &self.inner.info
    }

    pub fn settings(&self) -> &Map<String, Value> {
        &self.inner.settings
    }

    pub fn cache(&self, name: &str) -> Option<Arc<dyn CacheClient>> {
        self.inner.caches.get(name).map(|slot| slot.client.clone())
    }

    /// Provisioned caches as `(name, engine)` pairs, sorted by name
    pub fn caches(&self) -> Vec<(String, String)> {
        self.inner
            .caches
            .iter()
            .map(|(name, slot)| (name.clone(), slot.engine.clone()))
            .collect()
    }

    /// Values exposed by each plugin, keyed by plugin name
    pub fn plugins(&self) -> BTreeMap<String, Map<String, Value>> {
        self.state().exposed.clone()
    }

    pub fn exposed(&self, plugin: &str, key: &str) -> Option<Value> {
        self.state()
            .exposed
            .get(plugin)
            .and_then(|values| values.get(key))
            .cloned()
    }

    /// Registrations in the order they completed
    pub fn registrations(&self) -> Vec<Registration> {
        self.state().registrations.clone()
    }

    pub fn registered_names(&self) -> Vec<String> {
        self.state()
            .registrations
            .iter()
            .map(|r| r.name.clone())
            .collect()
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.state().registrations.iter().any(|r| r.name == name)
    }

    pub fn routes(&self) -> Vec<RouteInfo> {
        self.state().routes.iter().map(RouteInfo::from).collect()
    }

    /// Run a request through the routing table without a network listener.
    pub fn inject(&self, method: &str, path: &str) -> Response {
        self.dispatch(&Request::new(method, path))
    }

    pub fn dispatch(&self, request: &Request) -> Response {
        let route = self
            .state()
            .routes
            .iter()
            .find(|route| route.matches(request))
            .cloned();

        match route {
            Some(route) => route.handle(request),
            None => Response::not_found(),
        }
    }

    pub(crate) fn expose(&self, plugin: &str, key: String, value: Value) {
        self.state()
            .exposed
            .entry(plugin.to_string())
            .or_default()
            .insert(key, value);
    }

    /// Hand `plugin` the cache named `name`, claiming it if it is not shared.
    pub(crate) fn claim_cache(&self, name: &str, plugin: &str) -> Result<Arc<dyn CacheClient>, HubError> {
        let slot = self
            .inner
            .caches
            .get(name)
            .ok_or_else(|| HubError::UnknownCache(name.to_string()))?;
        if slot.shared {
            return Ok(slot.client.clone());
        }

        let mut state = self.state();
        let owner = state
            .cache_owners
            .entry(name.to_string())
            .or_insert_with(|| plugin.to_string());
        if owner.as_str() != plugin {
            return Err(HubError::CacheNotShared {
                name: name.to_string(),
                owner: owner.clone(),
            });
        }
        Ok(slot.client.clone())
    }

    pub(crate) fn add_route(&self, route: Route) -> Result<(), HubError> {
        let mut state = self.state();
        if state.routes.iter().any(|r| r.conflicts_with(&route)) {
            return Err(HubError::RouteConflict {
                method: route.method,
                path: route.path,
            });
        }
        tracing::debug!(method = %route.method, path = %route.path, plugin = %route.plugin, "Added route");
        state.routes.push(route);
        Ok(())
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_dependencies(&self) -> Result<(), HubError> {
        let state = self.state();
        for registration in &state.registrations {
            for dependency in &registration.dependencies {
                if !state.registrations.iter().any(|r| &r.name == dependency) {
                    return Err(HubError::MissingDependency {
                        plugin: registration.name.clone(),
                        dependency: dependency.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ServerHandle for Hub {
    /// Register plugins in slice order.
    ///
    /// Per-entry registration options override `shared` field by field.
    /// Errors returned by a plugin's own `register` are passed through as-is.
    async fn register(
        &self,
        plugins: Vec<PluginDescriptor>,
        shared: &RegistrationOptions,
    ) -> Result<(), BoxError> {
        for descriptor in plugins {
            let effective = descriptor.registration.merged_over(shared);
            let plugin = descriptor.plugin;
            let name = plugin.name().to_string();

            if self.is_registered(&name) {
                if effective.once == Some(true) {
                    tracing::debug!(plugin = %name, "Skipping repeated registration (once)");
                    continue;
                }
                if !plugin.multiple() {
                    return Err(HubError::DuplicatePlugin(name).into());
                }
            }

            let routes = effective.routes.unwrap_or_default();
            let realm = Realm::new(self.clone(), &name, routes.prefix, routes.vhost);
            let options = descriptor
                .options
                .unwrap_or_else(|| Arc::new(Value::Object(Map::new())));

            plugin.register(&realm, options).await?;

            tracing::debug!(plugin = %name, "Registered plugin");
            self.state().registrations.push(Registration {
                name,
                version: plugin.version().map(str::to_string),
                dependencies: plugin.dependencies().to_vec(),
            });
        }

        self.check_dependencies()?;
        Ok(())
    }
}

/// Builds [`Hub`] servers.
#[derive(Debug, Default, Clone, Copy)]
pub struct HubFactory;

impl ServerFactory for HubFactory {
    type Server = Hub;

    fn create(&self, options: ServerOptions) -> Result<Hub, BoxError> {
        Hub::new(options).map_err(Into::into)
    }
}
