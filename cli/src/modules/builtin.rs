//! Built-in modules available to every manifest
//!
//! | Specifier       | Export                                        |
//! |-----------------|-----------------------------------------------|
//! | `mortar/memory` | memory cache engine (`Engine`)                |
//! | `mortar/status` | plugin serving `GET /status`                  |
//! | `mortar/echo`   | plugin serving `GET /echo` with `options.message` |

use mortar::hub::{FnPlugin, MemoryEngine, Response};
use mortar::{Module, ModuleRegistry};
use serde_json::json;

pub const MEMORY: &str = "mortar/memory";
pub const STATUS: &str = "mortar/status";
pub const ECHO: &str = "mortar/echo";

/// Plugin answering `GET /status` with the server's info and plugin names.
///
/// The handler looks the hub up on each request, so plugins registered
/// after this one are listed too.
pub fn status() -> FnPlugin {
    FnPlugin::new("status", |realm, _| {
        let hub = realm.hub().downgrade();
        realm.route("GET", "/status", move |_| match hub.upgrade() {
            Some(hub) => Response::json(&json!({
                "host": hub.info().host,
                "port": hub.info().port,
                "plugins": hub.registered_names(),
            })),
            None => Response::text("server stopped").with_status(503),
        })?;
        Ok(())
    })
    .version(env!("CARGO_PKG_VERSION"))
}

/// Plugin answering `GET /echo` with its `message` option.
pub fn echo() -> FnPlugin {
    FnPlugin::new("echo", |realm, options| {
        let message = options
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or_default()
            .to_string();
        realm.route("GET", "/echo", move |_| Response::text(message.clone()))?;
        Ok(())
    })
    .version(env!("CARGO_PKG_VERSION"))
    .multiple(true)
}

/// Registry holding every built-in module.
pub fn catalogue() -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    registry
        .register(MEMORY, Module::engine(MemoryEngine))
        .register(STATUS, Module::plugin(status()))
        .register(ECHO, Module::plugin(echo()));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use mortar::{ComposeOptions, Manifest, PluginEntry};
    use serde_json::Value;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_status_lists_plugins_registered_later() {
        let manifest = Manifest::new()
            .plugin(STATUS)
            .plugin(PluginEntry::new(ECHO).options(json!({ "message": "hi" })));
        let hub = mortar::compose(&manifest, &ComposeOptions::new(), Arc::new(catalogue()))
            .await
            .unwrap();

        let response = hub.inject("GET", "/status");
        assert_eq!(response.status, 200);
        let body: Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body["plugins"], json!(["status", "echo"]));
    }

    #[tokio::test]
    async fn test_echo_uses_message_option_and_prefix() {
        let manifest = Manifest::new()
            .plugin(PluginEntry::new(ECHO).options(json!({ "message": "hello" })))
            .plugin(PluginEntry::new(ECHO).prefix("/quiet"));
        let hub = mortar::compose(&manifest, &ComposeOptions::new(), Arc::new(catalogue()))
            .await
            .unwrap();

        assert_eq!(hub.inject("GET", "/echo").body, "hello");
        assert_eq!(hub.inject("GET", "/quiet/echo").body, "");
    }
}
