use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::error::ComposeError;
use crate::hub::CacheEngine;
use crate::loader::ModuleLoader;
use crate::manifest::{CacheItem, CacheSpec, ConstructorRef, ProviderSpec};

/// Canonical cache provider: `{ provider: { constructor, options? }, name? }`
#[derive(Clone)]
pub struct CacheDescriptor {
    pub provider: ProviderDescriptor,
    pub name: Option<String>,
    /// Other per-cache settings from the manifest, verbatim
    pub settings: Map<String, Value>,
}

#[derive(Clone)]
pub struct ProviderDescriptor {
    pub constructor: Arc<dyn CacheEngine>,
    pub options: Option<Value>,
}

impl PartialEq for CacheDescriptor {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.provider.constructor, &other.provider.constructor)
            && self.provider.options == other.provider.options
            && self.name == other.name
            && self.settings == other.settings
    }
}

impl fmt::Debug for CacheDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheDescriptor")
            .field("engine", &self.provider.constructor.name())
            .field("options", &self.provider.options)
            .field("name", &self.name)
            .field("settings", &self.settings)
            .finish()
    }
}

/// One item with its constructor not yet resolved.
struct Pending<'a> {
    constructor: Constructor<'a>,
    options: Option<Value>,
    name: Option<String>,
    settings: Map<String, Value>,
}

enum Constructor<'a> {
    Specifier(&'a str),
    Engine(&'a Arc<dyn CacheEngine>),
}

impl<'a> From<&'a ConstructorRef> for Constructor<'a> {
    fn from(constructor: &'a ConstructorRef) -> Self {
        match constructor {
            ConstructorRef::Specifier(spec) => Constructor::Specifier(spec),
            ConstructorRef::Engine(engine) => Constructor::Engine(engine),
        }
    }
}

fn expand(item: &CacheItem) -> Pending<'_> {
    match item {
        CacheItem::Specifier(spec) => Pending {
            constructor: Constructor::Specifier(spec),
            options: None,
            name: None,
            settings: Map::new(),
        },
        CacheItem::Entry(entry) => {
            let (constructor, options) = match &entry.provider {
                ProviderSpec::Specifier(spec) => (Constructor::Specifier(spec), None),
                ProviderSpec::Engine(engine) => (Constructor::Engine(engine), None),
                ProviderSpec::Config(config) => {
                    (Constructor::from(&config.constructor), config.options.clone())
                }
            };
            Pending {
                constructor,
                options,
                name: entry.name.clone(),
                settings: entry.settings.clone(),
            }
        }
    }
}

/// Expand `server.cache` into descriptors, loading specifier constructors.
///
/// Items are processed in order. Engines given as values are shared, not
/// copied; option values are copied into the descriptors so the manifest
/// is left as it was.
pub async fn normalize_cache(
    spec: &CacheSpec,
    base: Option<&Path>,
    loader: &ModuleLoader,
) -> Result<Vec<CacheDescriptor>, ComposeError> {
    let mut descriptors = Vec::with_capacity(spec.items().len());

    for item in spec.items() {
        let pending = expand(item);
        let constructor = match pending.constructor {
            Constructor::Specifier(spec) => loader.load_engine(spec, base).await?,
            Constructor::Engine(engine) => engine.clone(),
        };

        tracing::debug!(engine = constructor.name(), name = ?pending.name, "Normalized cache provider");
        descriptors.push(CacheDescriptor {
            provider: ProviderDescriptor {
                constructor,
                options: pending.options,
            },
            name: pending.name,
            settings: pending.settings,
        });
    }

    Ok(descriptors)
}
