//! mortar: compose a running server from a declarative manifest
//!
//! A [`Manifest`] names a server's settings, its cache providers, and the
//! plugins to register, as data. [`Composer::compose`] resolves every module
//! specifier in it (relative to a caller-chosen base directory), normalizes
//! the accepted shorthands, constructs the server through a
//! [`ServerFactory`], and registers the plugins in declaration order.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use mortar::{ComposeOptions, Manifest, Module, ModuleRegistry};
//! use mortar::hub::{FnPlugin, Response};
//!
//! # async fn run() -> Result<(), mortar::ComposeError> {
//! let mut modules = ModuleRegistry::new();
//! modules.register(
//!     "/app/hello",
//!     Module::plugin(FnPlugin::new("hello", |realm, _| {
//!         realm.route("GET", "/", |_| Response::text("hello"))?;
//!         Ok(())
//!     })),
//! );
//!
//! let manifest = Manifest::from_json_str(r#"{ "register": { "plugins": ["./hello"] } }"#)?;
//! let hub = mortar::compose(
//!     &manifest,
//!     &ComposeOptions::new().relative_to("/app"),
//!     Arc::new(modules),
//! )
//! .await?;
//!
//! assert_eq!(hub.inject("GET", "/").body, "hello");
//! # Ok(())
//! # }
//! ```

pub mod compose;
pub mod error;
pub mod framework;
pub mod hub;
pub mod loader;
pub mod manifest;
pub mod normalize;
pub mod options;
pub mod resolve;

pub use compose::Composer;
pub use error::{BoxError, ComposeError};
pub use framework::{ServerFactory, ServerHandle, ServerOptions};
pub use hub::{Hub, HubFactory};
pub use loader::{Export, ExportPolicy, Module, ModuleHandle, ModuleLoader, ModuleRegistry, ModuleSource};
pub use manifest::{
    CacheEntry, CacheItem, CacheSpec, ConstructorRef, Manifest, PluginEntry, PluginRef,
    PluginSpec, ProviderConfig, ProviderSpec, Register, RegistrationOptions, RouteOptions,
    ServerManifest,
};
pub use normalize::{CacheDescriptor, PluginDescriptor, ProviderDescriptor};
pub use options::{ComposeOptions, PreRegister};
pub use resolve::PathResolver;

use std::sync::Arc;

/// Compose a [`Hub`] from `manifest`, loading modules from `modules`.
pub async fn compose(
    manifest: &Manifest,
    options: &ComposeOptions<Hub>,
    modules: Arc<dyn ModuleSource>,
) -> Result<Hub, ComposeError> {
    Composer::new(HubFactory, modules)
        .compose(manifest, options)
        .await
}
