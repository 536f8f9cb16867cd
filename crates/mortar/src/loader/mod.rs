//! Module loading
//!
//! Turning a specifier into a usable value happens in two steps:
//!
//! 1. **Locate**: the [`ModuleSource`] maps the (already base-joined)
//!    specifier to a [`ModuleHandle`], or reports that nothing lives there.
//! 2. **Load and extract**: the source loads the module behind the handle,
//!    then the [`ExportPolicy`] picks the value to use from it.
//!
//! A miss in step 1 is a [`ComposeError::Resolution`] naming the specifier.
//! A failure inside the module's own initialisation in step 2 passes through
//! as [`ComposeError::Module`], unchanged.
//!
//! Export extraction exists because modules are written against different
//! export conventions. The default policy prefers a named `Engine` export,
//! then `default`, then the module's own value:
//!
//! ```text
//! { Engine: E, default: D, value: V }  → E
//! {            default: D, value: V }  → D
//! {                        value: V }  → V
//! {                                 }  → the module itself
//! ```

pub mod registry;

pub use registry::ModuleRegistry;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::error::{BoxError, ComposeError};
use crate::hub::{CacheEngine, Plugin};
use crate::resolve::PathResolver;

/// A value a module can export.
#[derive(Clone)]
pub enum Export {
    Plugin(Arc<dyn Plugin>),
    Engine(Arc<dyn CacheEngine>),
    Data(Value),
    Module(Arc<Module>),
}

impl Export {
    pub fn kind(&self) -> &'static str {
        match self {
            Export::Plugin(_) => "plugin",
            Export::Engine(_) => "cache engine",
            Export::Data(_) => "data",
            Export::Module(_) => "module",
        }
    }
}

impl fmt::Debug for Export {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Export::Plugin(p) => f.debug_tuple("Plugin").field(&p.name()).finish(),
            Export::Engine(e) => f.debug_tuple("Engine").field(&e.name()).finish(),
            Export::Data(v) => f.debug_tuple("Data").field(v).finish(),
            Export::Module(m) => f.debug_tuple("Module").field(m).finish(),
        }
    }
}

/// A loaded module: an optional own value plus named exports.
#[derive(Debug, Clone, Default)]
pub struct Module {
    value: Option<Export>,
    named: BTreeMap<String, Export>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    /// A module that is itself a plugin.
    pub fn plugin(plugin: impl Plugin + 'static) -> Self {
        Self::new().with_value(Export::Plugin(Arc::new(plugin)))
    }

    /// A module exporting a cache engine under `Engine`.
    pub fn engine(engine: impl CacheEngine + 'static) -> Self {
        Self::new().with_export("Engine", Export::Engine(Arc::new(engine)))
    }

    pub fn with_value(mut self, value: Export) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_export(mut self, name: impl Into<String>, export: Export) -> Self {
        self.named.insert(name.into(), export);
        self
    }

    pub fn with_default(self, export: Export) -> Self {
        self.with_export("default", export)
    }

    pub fn value(&self) -> Option<&Export> {
        self.value.as_ref()
    }

    pub fn export(&self, name: &str) -> Option<&Export> {
        self.named.get(name)
    }

    pub fn export_names(&self) -> impl Iterator<Item = &str> {
        self.named.keys().map(String::as_str)
    }
}

/// Where a module source found a specifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleHandle {
    id: String,
}

impl ModuleHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// The primitive beneath specifier resolution.
#[async_trait]
pub trait ModuleSource: Send + Sync {
    /// Locate a specifier. `None` means nothing is there.
    async fn try_resolve(&self, specifier: &str) -> Option<ModuleHandle>;

    /// Load the module behind a handle. Errors come from the module's own
    /// initialisation and are reported unchanged.
    async fn load(&self, handle: &ModuleHandle) -> Result<Arc<Module>, BoxError>;
}

/// Ordered export names to prefer before falling back to the module's value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPolicy {
    preferred: Vec<String>,
}

impl Default for ExportPolicy {
    fn default() -> Self {
        Self::new(["Engine", "default"])
    }
}

impl ExportPolicy {
    pub fn new<I, S>(preferred: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            preferred: preferred.into_iter().map(Into::into).collect(),
        }
    }

    pub fn extract(&self, module: &Arc<Module>) -> Export {
        self.preferred
            .iter()
            .find_map(|name| module.export(name))
            .or_else(|| module.value())
            .cloned()
            .unwrap_or_else(|| Export::Module(module.clone()))
    }
}

/// Resolves specifiers against a base and loads them from a [`ModuleSource`].
#[derive(Clone)]
pub struct ModuleLoader {
    source: Arc<dyn ModuleSource>,
    resolver: PathResolver,
    policy: ExportPolicy,
}

impl fmt::Debug for ModuleLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleLoader")
            .field("resolver", &self.resolver)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl ModuleLoader {
    pub fn new(source: Arc<dyn ModuleSource>) -> Self {
        Self {
            source,
            resolver: PathResolver::new(),
            policy: ExportPolicy::default(),
        }
    }

    pub fn with_resolver(mut self, resolver: PathResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_policy(mut self, policy: ExportPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Resolve `spec` against `base`, load it, and extract its export.
    pub async fn load(&self, spec: &str, base: Option<&Path>) -> Result<Export, ComposeError> {
        let specifier = self.resolver.resolve(spec, base);
        self.load_resolved(&specifier).await
    }

    async fn load_resolved(&self, specifier: &str) -> Result<Export, ComposeError> {
        let handle = self
            .source
            .try_resolve(specifier)
            .await
            .ok_or_else(|| ComposeError::Resolution {
                specifier: specifier.to_string(),
            })?;

        let module = self
            .source
            .load(&handle)
            .await
            .map_err(ComposeError::Module)?;

        let export = self.policy.extract(&module);
        tracing::debug!(specifier, module = handle.id(), export = export.kind(), "Loaded module");
        Ok(export)
    }

    pub async fn load_plugin(
        &self,
        spec: &str,
        base: Option<&Path>,
    ) -> Result<Arc<dyn Plugin>, ComposeError> {
        let specifier = self.resolver.resolve(spec, base);
        match self.load_resolved(&specifier).await? {
            Export::Plugin(plugin) => Ok(plugin),
            _ => Err(ComposeError::InvalidExport {
                specifier,
                expected: "plugin",
            }),
        }
    }

    pub async fn load_engine(
        &self,
        spec: &str,
        base: Option<&Path>,
    ) -> Result<Arc<dyn CacheEngine>, ComposeError> {
        let specifier = self.resolver.resolve(spec, base);
        match self.load_resolved(&specifier).await? {
            Export::Engine(engine) => Ok(engine),
            _ => Err(ComposeError::InvalidExport {
                specifier,
                expected: "cache engine",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::{FnPlugin, MemoryEngine};
    use serde_json::json;

    fn plugin(name: &str) -> Export {
        Export::Plugin(Arc::new(FnPlugin::new(name, |_, _| Ok(()))))
    }

    fn name_of(export: &Export) -> String {
        match export {
            Export::Plugin(p) => p.name().to_string(),
            Export::Engine(e) => e.name().to_string(),
            other => other.kind().to_string(),
        }
    }

    #[test]
    fn test_policy_prefers_engine_then_default_then_value() {
        let policy = ExportPolicy::default();

        let module = Arc::new(
            Module::new()
                .with_value(plugin("value"))
                .with_default(plugin("default"))
                .with_export("Engine", Export::Engine(Arc::new(MemoryEngine))),
        );
        assert_eq!(name_of(&policy.extract(&module)), "memory");

        let module = Arc::new(
            Module::new()
                .with_value(plugin("value"))
                .with_default(plugin("default")),
        );
        assert_eq!(name_of(&policy.extract(&module)), "default");

        let module = Arc::new(Module::new().with_value(plugin("value")));
        assert_eq!(name_of(&policy.extract(&module)), "value");
    }

    #[test]
    fn test_policy_falls_back_to_module_itself() {
        let module = Arc::new(Module::new().with_export("helper", Export::Data(json!(1))));
        match ExportPolicy::default().extract(&module) {
            Export::Module(m) => assert!(Arc::ptr_eq(&m, &module)),
            other => panic!("expected the module itself, got {:?}", other),
        }
    }

    #[test]
    fn test_custom_policy() {
        let policy = ExportPolicy::new(["plugin"]);
        let module = Arc::new(
            Module::new()
                .with_default(plugin("default"))
                .with_export("plugin", plugin("named")),
        );
        assert_eq!(name_of(&policy.extract(&module)), "named");
    }

    #[tokio::test]
    async fn test_loader_reports_unresolvable_specifier() {
        let loader = ModuleLoader::new(Arc::new(ModuleRegistry::new()))
            .with_resolver(PathResolver::with_fallback("/app"));

        let err = loader.load("./missing", None).await.unwrap_err();
        assert!(matches!(
            err,
            ComposeError::Resolution { ref specifier } if specifier == "/app/missing"
        ));
    }

    #[tokio::test]
    async fn test_loader_checks_export_kind() {
        let mut registry = ModuleRegistry::new();
        registry.register("mortar/memory", Module::engine(MemoryEngine));
        let loader = ModuleLoader::new(Arc::new(registry));

        assert!(loader.load_engine("mortar/memory", None).await.is_ok());

        let err = loader.load_plugin("mortar/memory", None).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "module at 'mortar/memory' does not export a plugin"
        );
    }
}
