//! The composition sequence
//!
//! ```text
//! validate options, manifest
//!        │
//!        ▼
//! server options ◄── normalize_cache(server.cache)
//!        │
//!        ▼
//! factory.create(options) ──► pre_register(&server)
//!                                   │
//!                                   ▼
//!        normalize_plugins(register.plugins)   (concurrent, order kept)
//!                                   │
//!                                   ▼
//!        server.register(descriptors, register.options)
//! ```
//!
//! Every step is fail-fast and nothing is retried. Errors from the factory,
//! the hook, module initialisation, and registration pass through unchanged.

use std::path::Path;
use std::sync::Arc;

use crate::error::ComposeError;
use crate::framework::{ServerFactory, ServerHandle, ServerOptions};
use crate::loader::{ModuleLoader, ModuleSource};
use crate::manifest::{Manifest, RegistrationOptions};
use crate::normalize::{normalize_cache, normalize_plugins};
use crate::options::ComposeOptions;

/// Composes servers from manifests for one server framework.
#[derive(Debug, Clone)]
pub struct Composer<F> {
    factory: F,
    loader: ModuleLoader,
}

impl<F: ServerFactory> Composer<F> {
    pub fn new(factory: F, modules: Arc<dyn ModuleSource>) -> Self {
        Self {
            factory,
            loader: ModuleLoader::new(modules),
        }
    }

    /// Replace the loader, e.g. to change the resolver fallback or export policy.
    pub fn with_loader(mut self, loader: ModuleLoader) -> Self {
        self.loader = loader;
        self
    }

    pub fn loader(&self) -> &ModuleLoader {
        &self.loader
    }

    /// Build server construction options from the manifest's `server` table.
    ///
    /// The result is a copy: settings are cloned and `cache`, when present,
    /// is replaced by its normalized descriptors.
    pub async fn server_options(
        &self,
        manifest: &Manifest,
        base: Option<&Path>,
    ) -> Result<ServerOptions, ComposeError> {
        let Some(server) = &manifest.server else {
            return Ok(ServerOptions::default());
        };

        let cache = match &server.cache {
            Some(spec) => Some(normalize_cache(spec, base, &self.loader).await?),
            None => None,
        };

        Ok(ServerOptions {
            settings: server.settings.clone(),
            cache,
        })
    }

    /// Compose a server from `manifest`.
    ///
    /// The manifest is only read. On failure no server is returned, although
    /// the factory may already have constructed one.
    pub async fn compose(
        &self,
        manifest: &Manifest,
        options: &ComposeOptions<F::Server>,
    ) -> Result<F::Server, ComposeError> {
        options.validate().map_err(ComposeError::invalid_options)?;
        manifest.validate().map_err(ComposeError::invalid_manifest)?;

        let base = options.relative_to.as_deref();

        let server_options = self.server_options(manifest, base).await?;
        let server = self
            .factory
            .create(server_options)
            .map_err(ComposeError::Server)?;

        options
            .pre_register
            .run(&server)
            .await
            .map_err(ComposeError::Hook)?;

        let mut registered = 0;
        if let Some(specs) = manifest.plugins() {
            let descriptors = normalize_plugins(specs, base, &self.loader).await?;
            registered = descriptors.len();

            let default_shared = RegistrationOptions::default();
            let shared = manifest
                .register
                .as_ref()
                .and_then(|r| r.options.as_ref())
                .unwrap_or(&default_shared);

            server
                .register(descriptors, shared)
                .await
                .map_err(ComposeError::Registration)?;
        }

        tracing::info!(
            plugins = registered,
            relative_to = ?base,
            "Composed server from manifest"
        );
        Ok(server)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::{FnPlugin, HubFactory, MemoryEngine};
    use crate::loader::{Module, ModuleRegistry};
    use crate::manifest::{CacheSpec, ServerManifest};
    use crate::options::PreRegister;
    use crate::resolve::PathResolver;
    use serde_json::json;

    fn composer() -> Composer<HubFactory> {
        let mut registry = ModuleRegistry::new();
        registry
            .register("mortar/memory", Module::engine(MemoryEngine))
            .register(
                "/app/pluginA",
                Module::plugin(FnPlugin::new("pluginA", |realm, _| {
                    realm.expose("loaded", true);
                    Ok(())
                })),
            );
        let loader =
            ModuleLoader::new(Arc::new(registry)).with_resolver(PathResolver::with_fallback("/srv"));
        Composer::new(HubFactory, Arc::new(ModuleRegistry::new())).with_loader(loader)
    }

    #[tokio::test]
    async fn test_server_options_copy_settings_and_normalize_cache() {
        let manifest = Manifest::new().server(
            ServerManifest::new()
                .setting("port", 8080)
                .cache(CacheSpec::from("mortar/memory")),
        );

        let options = composer().server_options(&manifest, None).await.unwrap();
        assert_eq!(options.settings.get("port"), Some(&json!(8080)));
        assert!(!options.settings.contains_key("cache"));
        assert_eq!(options.cache.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_server_options_without_server_table() {
        let options = composer()
            .server_options(&Manifest::new(), None)
            .await
            .unwrap();
        assert!(options.settings.is_empty());
        assert!(options.cache.is_none());
    }

    #[tokio::test]
    async fn test_compose_registers_relative_plugin() {
        let manifest = Manifest::new().plugin("./pluginA");
        let options = ComposeOptions::new().relative_to("/app");

        let hub = composer().compose(&manifest, &options).await.unwrap();
        assert_eq!(hub.registered_names(), vec!["pluginA"]);
        assert_eq!(hub.exposed("pluginA", "loaded"), Some(json!(true)));
    }

    #[tokio::test]
    async fn test_invalid_options_fail_before_hook() {
        let options = ComposeOptions::new()
            .relative_to("")
            .pre_register(PreRegister::sync(|_| panic!("hook must not run")));

        let err = composer()
            .compose(&Manifest::new(), &options)
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Invalid options"));
    }
}
