use futures_util::future::try_join_all;
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::error::ComposeError;
use crate::hub::Plugin;
use crate::loader::ModuleLoader;
use crate::manifest::{PluginRef, PluginSpec, RegistrationOptions};

/// Canonical plugin entry: a loaded plugin, its options, and the
/// registration options declared next to it.
#[derive(Clone)]
pub struct PluginDescriptor {
    pub plugin: Arc<dyn Plugin>,
    /// The manifest's `options`, shared with the manifest rather than copied
    pub options: Option<Arc<Value>>,
    pub registration: RegistrationOptions,
}

impl PluginDescriptor {
    /// A descriptor with no options and no registration overrides.
    pub fn bare(plugin: Arc<dyn Plugin>) -> Self {
        Self {
            plugin,
            options: None,
            registration: RegistrationOptions::default(),
        }
    }
}

impl PartialEq for PluginDescriptor {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.plugin, &other.plugin)
            && self.options == other.options
            && self.registration == other.registration
    }
}

impl fmt::Debug for PluginDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginDescriptor")
            .field("plugin", &self.plugin.name())
            .field("options", &self.options)
            .field("registration", &self.registration)
            .finish()
    }
}

/// Normalize one `register.plugins` entry.
pub async fn normalize_plugin(
    spec: &PluginSpec,
    base: Option<&Path>,
    loader: &ModuleLoader,
) -> Result<PluginDescriptor, ComposeError> {
    match spec {
        PluginSpec::Specifier(spec) => {
            let plugin = loader.load_plugin(spec, base).await?;
            Ok(PluginDescriptor::bare(plugin))
        }
        PluginSpec::Entry(entry) => {
            let plugin = match &entry.plugin {
                PluginRef::Specifier(spec) => loader.load_plugin(spec, base).await?,
                PluginRef::Plugin(plugin) => plugin.clone(),
            };
            Ok(PluginDescriptor {
                plugin,
                options: entry.options.clone(),
                registration: entry.registration.clone(),
            })
        }
    }
}

/// Normalize every entry concurrently.
///
/// The result is in input order regardless of which module finishes loading
/// first. The first failure is returned and no descriptors are produced.
pub async fn normalize_plugins(
    specs: &[PluginSpec],
    base: Option<&Path>,
    loader: &ModuleLoader,
) -> Result<Vec<PluginDescriptor>, ComposeError> {
    let descriptors =
        try_join_all(specs.iter().map(|spec| normalize_plugin(spec, base, loader))).await?;
    tracing::debug!(count = descriptors.len(), "Normalized plugins");
    Ok(descriptors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;
    use crate::hub::FnPlugin;
    use crate::loader::{Module, ModuleRegistry};
    use crate::manifest::PluginEntry;
    use crate::resolve::PathResolver;
    use serde_json::json;
    use std::time::Duration;

    fn noop(name: &str) -> FnPlugin {
        FnPlugin::new(name, |_, _| Ok(()))
    }

    fn loader() -> ModuleLoader {
        let mut registry = ModuleRegistry::new();
        registry
            .register("/app/plugins/helloworld", Module::plugin(noop("helloworld")))
            .register("acme-auth", Module::plugin(noop("auth")));
        registry.register_lazy("/app/plugins/slow", || async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok::<_, BoxError>(Module::plugin(noop("slow")))
        });
        ModuleLoader::new(Arc::new(registry)).with_resolver(PathResolver::with_fallback("/srv"))
    }

    fn names(descriptors: &[PluginDescriptor]) -> Vec<&str> {
        descriptors.iter().map(|d| d.plugin.name()).collect()
    }

    #[tokio::test]
    async fn test_specifier_shorthand() {
        let descriptor = normalize_plugin(
            &PluginSpec::from("./plugins/helloworld"),
            Some(Path::new("/app")),
            &loader(),
        )
        .await
        .unwrap();

        assert_eq!(descriptor.plugin.name(), "helloworld");
        assert!(descriptor.options.is_none());
        assert!(descriptor.registration.is_empty());
    }

    #[tokio::test]
    async fn test_entry_keeps_options_by_reference() {
        let options = Arc::new(json!({ "who": "earth" }));
        let spec = PluginSpec::from(
            PluginEntry::new("acme-auth")
                .options(options.clone())
                .prefix("/auth"),
        );

        let descriptor = normalize_plugin(&spec, None, &loader()).await.unwrap();
        assert_eq!(descriptor.plugin.name(), "auth");
        assert!(Arc::ptr_eq(descriptor.options.as_ref().unwrap(), &options));
        assert_eq!(
            descriptor.registration.routes.unwrap().prefix.as_deref(),
            Some("/auth")
        );
    }

    #[tokio::test]
    async fn test_plugin_values_pass_through() {
        let plugin: Arc<dyn Plugin> = Arc::new(noop("inline"));
        let spec = PluginSpec::from(PluginEntry::new(plugin.clone()));

        let descriptor = normalize_plugin(&spec, None, &loader()).await.unwrap();
        assert!(Arc::ptr_eq(&descriptor.plugin, &plugin));
    }

    #[tokio::test]
    async fn test_order_preserved_when_first_loads_slowest() {
        let specs = vec![
            PluginSpec::from("./plugins/slow"),
            PluginSpec::from("acme-auth"),
            PluginSpec::from("./plugins/helloworld"),
        ];

        let descriptors = normalize_plugins(&specs, Some(Path::new("/app")), &loader())
            .await
            .unwrap();
        assert_eq!(names(&descriptors), vec!["slow", "auth", "helloworld"]);
    }

    #[tokio::test]
    async fn test_any_unresolvable_entry_fails_the_batch() {
        let specs = vec![
            PluginSpec::from("acme-auth"),
            PluginSpec::from("./plugins/missing"),
        ];

        let err = normalize_plugins(&specs, Some(Path::new("/app")), &loader())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ComposeError::Resolution { ref specifier } if specifier == "/app/plugins/missing"
        ));
    }

    #[tokio::test]
    async fn test_normalizing_twice_yields_equal_descriptors() {
        let specs = vec![
            PluginSpec::from("./plugins/helloworld"),
            PluginSpec::from(PluginEntry::new("acme-auth").options(json!({ "a": 1 })).once(true)),
        ];
        let loader = loader();

        let first = normalize_plugins(&specs, Some(Path::new("/app")), &loader)
            .await
            .unwrap();
        let second = normalize_plugins(&specs, Some(Path::new("/app")), &loader)
            .await
            .unwrap();
        assert_eq!(first, second);
    }
}
