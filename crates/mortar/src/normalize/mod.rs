//! Normalization of manifest shorthands into canonical descriptors
//!
//! Normalization never modifies the manifest: descriptors are built fresh,
//! with loaded modules and plugin options shared by `Arc`.

pub mod cache;
pub mod plugins;

pub use cache::{CacheDescriptor, ProviderDescriptor, normalize_cache};
pub use plugins::{PluginDescriptor, normalize_plugin, normalize_plugins};
