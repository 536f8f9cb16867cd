//! In-memory module source
//!
//! Modules are registered under ids, which are either package names
//! (`mortar/memory`) or absolute paths (`/srv/app/plugins/hello`). Path ids
//! are normalized lexically at registration and at lookup, so
//! `/srv/app/lib/../plugins/hello` finds the module above.
//!
//! A module is registered ready-made or as a lazy factory. A factory runs on
//! first load only; later loads return the same `Arc<Module>`. If it fails,
//! nothing is cached and the next load runs it again.

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::OnceCell;

use super::{Module, ModuleHandle, ModuleSource};
use crate::error::BoxError;
use crate::resolve::normalize;

type ModuleFactory = Arc<dyn Fn() -> BoxFuture<'static, Result<Module, BoxError>> + Send + Sync>;

enum Entry {
    Ready(Arc<Module>),
    Lazy {
        factory: ModuleFactory,
        loaded: OnceCell<Arc<Module>>,
    },
}

#[derive(Default)]
pub struct ModuleRegistry {
    entries: HashMap<String, Entry>,
    extensions: Vec<String>,
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<_> = self.entries.keys().collect();
        ids.sort();
        f.debug_struct("ModuleRegistry")
            .field("modules", &ids)
            .field("extensions", &self.extensions)
            .finish()
    }
}

fn canonical_id(id: &str) -> String {
    if id.starts_with('/') || id.starts_with('.') {
        normalize(Path::new(id)).to_string_lossy().into_owned()
    } else {
        id.to_string()
    }
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extensions to try, in order, when a path id has no exact match.
    ///
    /// With `[".toml"]`, `/app/hello` also finds a module registered as
    /// `/app/hello.toml`.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn register(&mut self, id: &str, module: Module) -> &mut Self {
        self.entries
            .insert(canonical_id(id), Entry::Ready(Arc::new(module)));
        self
    }

    /// Register a module whose initialisation runs on first load.
    pub fn register_lazy<F, Fut>(&mut self, id: &str, factory: F) -> &mut Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Module, BoxError>> + Send + 'static,
    {
        let factory: ModuleFactory =
            Arc::new(move || -> BoxFuture<'static, Result<Module, BoxError>> {
                Box::pin(factory())
            });
        self.entries.insert(
            canonical_id(id),
            Entry::Lazy {
                factory,
                loaded: OnceCell::new(),
            },
        );
        self
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn find(&self, specifier: &str) -> Option<String> {
        let id = canonical_id(specifier);
        if self.entries.contains_key(&id) {
            return Some(id);
        }

        if id.starts_with('/') || id.starts_with('.') {
            return self
                .extensions
                .iter()
                .map(|ext| format!("{}{}", id, ext))
                .find(|candidate| self.entries.contains_key(candidate));
        }

        None
    }
}

#[async_trait]
impl ModuleSource for ModuleRegistry {
    async fn try_resolve(&self, specifier: &str) -> Option<ModuleHandle> {
        self.find(specifier).map(ModuleHandle::new)
    }

    async fn load(&self, handle: &ModuleHandle) -> Result<Arc<Module>, BoxError> {
        let entry = self
            .entries
            .get(handle.id())
            .ok_or_else(|| format!("module '{}' is no longer registered", handle.id()))?;

        match entry {
            Entry::Ready(module) => Ok(module.clone()),
            Entry::Lazy { factory, loaded } => {
                let module = loaded
                    .get_or_try_init(|| async {
                        tracing::debug!(module = handle.id(), "Initialising module");
                        factory().await.map(Arc::new)
                    })
                    .await?;
                Ok(module.clone())
            }
        }
    }
}
