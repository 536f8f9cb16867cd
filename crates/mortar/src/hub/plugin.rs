use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use super::Hub;
use super::cache::CacheClient;
use super::route::{Handler, Request, Response, Route, prefixed_path};
use crate::error::BoxError;

/// The hub's plugin contract.
///
/// A plugin is identified by `name`; registering the same name twice fails
/// unless `multiple` is true. `register` receives a [`Realm`] scoped to this
/// registration and the per-plugin options from the manifest (an empty
/// object when none were given).
#[async_trait]
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    fn version(&self) -> Option<&str> {
        None
    }

    fn multiple(&self) -> bool {
        false
    }

    /// Names of plugins that must also be registered on the server
    fn dependencies(&self) -> &[String] {
        &[]
    }

    async fn register(&self, realm: &Realm, options: Arc<Value>) -> Result<(), BoxError>;
}

impl fmt::Debug for dyn Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.name())
            .field("version", &self.version())
            .finish_non_exhaustive()
    }
}

type RegisterFn = dyn Fn(&Realm, Arc<Value>) -> Result<(), BoxError> + Send + Sync;

/// A plugin assembled from a closure, for manifests built in code.
///
/// ```rust
/// use mortar::hub::FnPlugin;
///
/// let plugin = FnPlugin::new("increment", |realm, options| {
///     let by = options.get("by").cloned().unwrap_or(1.into());
///     realm.expose("by", by);
///     Ok(())
/// })
/// .version("1.0.0");
/// ```
#[derive(Clone)]
pub struct FnPlugin {
    name: String,
    version: Option<String>,
    multiple: bool,
    dependencies: Vec<String>,
    register: Arc<RegisterFn>,
}

impl FnPlugin {
    pub fn new<F>(name: impl Into<String>, register: F) -> Self
    where
        F: Fn(&Realm, Arc<Value>) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            version: None,
            multiple: false,
            dependencies: Vec::new(),
            register: Arc::new(register),
        }
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn multiple(mut self, multiple: bool) -> Self {
        self.multiple = multiple;
        self
    }

    pub fn depends_on(mut self, dependency: impl Into<String>) -> Self {
        self.dependencies.push(dependency.into());
        self
    }
}

#[async_trait]
impl Plugin for FnPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    fn multiple(&self) -> bool {
        self.multiple
    }

    fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    async fn register(&self, realm: &Realm, options: Arc<Value>) -> Result<(), BoxError> {
        (self.register)(realm, options)
    }
}

/// The view of the server a plugin gets while it registers.
///
/// Routes added through a realm carry the registration's prefix and vhost;
/// exposed values land under the plugin's name.
#[derive(Debug, Clone)]
pub struct Realm {
    hub: Hub,
    plugin: String,
    prefix: Option<String>,
    vhost: Option<String>,
}

impl Realm {
    pub(crate) fn new(hub: Hub, plugin: &str, prefix: Option<String>, vhost: Option<String>) -> Self {
        Self {
            hub,
            plugin: plugin.to_string(),
            prefix,
            vhost,
        }
    }

    pub fn hub(&self) -> &Hub {
        &self.hub
    }

    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Publish a value under `hub.plugins()[plugin][key]`.
    pub fn expose(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.hub.expose(&self.plugin, key.into(), value.into());
    }

    /// Add a route. The path is joined to the registration prefix.
    pub fn route<F>(&self, method: &str, path: &str, handler: F) -> Result<(), BoxError>
    where
        F: Fn(&Request) -> Response + Send + Sync + 'static,
    {
        let handler: Handler = Arc::new(handler);
        let route = Route {
            method: method.to_ascii_uppercase(),
            path: prefixed_path(self.prefix.as_deref(), path),
            vhost: self.vhost.clone(),
            plugin: self.plugin.clone(),
            handler,
        };
        self.hub.add_route(route).map_err(Into::into)
    }

    /// Use a cache provisioned from the manifest's `server.cache`.
    ///
    /// Fails for unknown names, and for a cache that is not `shared` once
    /// another plugin has used it.
    pub fn cache(&self, name: &str) -> Result<Arc<dyn CacheClient>, BoxError> {
        self.hub.claim_cache(name, &self.plugin).map_err(Into::into)
    }
}
