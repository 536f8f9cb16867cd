//! The narrow contract between the composer and a server framework
//!
//! The composer constructs exactly one server per `compose` call and then
//! hands it the full, ordered list of plugin descriptors in a single batch.
//! Everything else about the framework (routing, lifecycle, how plugins run)
//! stays on the framework's side of this boundary.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::BoxError;
use crate::manifest::RegistrationOptions;
use crate::normalize::{CacheDescriptor, PluginDescriptor};

/// Server construction options: the manifest's `server` table with its
/// `cache` field replaced by normalized descriptors.
#[derive(Debug, Clone, Default)]
pub struct ServerOptions {
    /// Every `server` key except `cache`, verbatim
    pub settings: Map<String, Value>,
    /// `None` when the manifest declares no cache
    pub cache: Option<Vec<CacheDescriptor>>,
}

pub trait ServerFactory: Send + Sync {
    type Server: ServerHandle;

    /// Construct a server. Side-effecting and never retried.
    fn create(&self, options: ServerOptions) -> Result<Self::Server, BoxError>;
}

#[async_trait]
pub trait ServerHandle: Send + Sync + 'static {
    /// Register `plugins` in slice order with `shared` as the batch-wide
    /// registration options.
    async fn register(
        &self,
        plugins: Vec<PluginDescriptor>,
        shared: &RegistrationOptions,
    ) -> Result<(), BoxError>;
}
