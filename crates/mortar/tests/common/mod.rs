//! Common test utilities and fixtures
//!
//! Fixture modules live under the virtual directory `/app/test`, so tests
//! compose with `relative_to("/app/test")` or `relative_to("/app/lib")` and
//! reach them as `./plugins/..` or `../test/plugins/..`.

#![allow(dead_code)]

use async_trait::async_trait;
use mortar::hub::{FnPlugin, MemoryEngine, Response};
use mortar::{
    BoxError, Export, Hub, HubFactory, Module, ModuleRegistry, PluginDescriptor,
    RegistrationOptions, ServerFactory, ServerHandle, ServerOptions,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const FIXTURES: &str = "/app/test";
pub const LIB: &str = "/app/lib";

/// A `MemoryEngine` with a different name, to tell providers apart.
#[derive(Debug, Clone, Copy)]
pub struct NamedEngine(pub &'static str);

impl mortar::hub::CacheEngine for NamedEngine {
    fn name(&self) -> &str {
        self.0
    }

    fn create(
        &self,
        options: &serde_json::Value,
    ) -> Result<Arc<dyn mortar::hub::CacheClient>, BoxError> {
        mortar::hub::CacheEngine::create(&MemoryEngine, options)
    }
}

pub fn helloworld() -> FnPlugin {
    FnPlugin::new("helloworld", |realm, _| {
        realm.expose("hello", "world");
        Ok(())
    })
    .version("1.0.0")
}

pub fn second() -> FnPlugin {
    FnPlugin::new("second", |realm, options| {
        let value = options
            .get("value")
            .and_then(|v| v.as_str())
            .unwrap_or("none")
            .to_string();
        realm.route("GET", "second", move |_| Response::text(value.clone()))?;
        Ok(())
    })
}

pub fn route() -> FnPlugin {
    FnPlugin::new("route", |realm, _| {
        realm.route("GET", "plugin", |_| Response::text("ok"))?;
        Ok(())
    })
}

/// The module registry every integration test composes against.
pub fn fixtures() -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    registry
        .register("mortar/memory", Module::engine(MemoryEngine))
        .register("/app/test/plugins/helloworld", Module::plugin(helloworld()))
        .register("/app/test/plugins/second", Module::plugin(second()))
        .register("/app/test/plugins/route", Module::plugin(route()))
        .register(
            "/app/test/plugins/esm",
            Module::new().with_default(Export::Plugin(Arc::new(FnPlugin::new(
                "esm",
                |realm, _| {
                    realm.expose("hello", "esm");
                    Ok(())
                },
            )))),
        )
        .register(
            "/app/test/plugins/broken",
            Module::plugin(FnPlugin::new("broken", |_, _| Err("plugin failed".into()))),
        )
        .register(
            "/app/test/cache/named",
            Module::engine(NamedEngine("named")),
        )
        .register(
            "/app/test/cache/default",
            Module::new().with_default(Export::Engine(Arc::new(NamedEngine("default-export")))),
        )
        .register("/app/test/data", Module::new().with_value(Export::Data("data".into())));

    registry.register_lazy("/app/test/plugins/slow", || async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok::<_, BoxError>(Module::plugin(FnPlugin::new("slow", |_, _| Ok(()))))
    });
    registry.register_lazy("/app/test/plugins/boot-failure", || async {
        Err::<Module, BoxError>(Box::new(BootFailure))
    });
    registry
}

#[derive(Debug, thiserror::Error)]
#[error("module failed to boot")]
pub struct BootFailure;

/// What a [`RecordingFactory`] saw.
#[derive(Debug, Default)]
pub struct Recorded {
    pub created: Vec<ServerOptions>,
    pub registered: Vec<(Vec<String>, RegistrationOptions)>,
}

/// A server factory that records every call made through the framework
/// contract and otherwise behaves like [`HubFactory`].
#[derive(Debug, Clone, Default)]
pub struct RecordingFactory {
    pub recorded: Arc<Mutex<Recorded>>,
}

#[derive(Debug, Clone)]
pub struct RecordingServer {
    pub hub: Hub,
    recorded: Arc<Mutex<Recorded>>,
}

impl ServerFactory for RecordingFactory {
    type Server = RecordingServer;

    fn create(&self, options: ServerOptions) -> Result<RecordingServer, BoxError> {
        self.recorded.lock().unwrap().created.push(options.clone());
        Ok(RecordingServer {
            hub: HubFactory.create(options)?,
            recorded: self.recorded.clone(),
        })
    }
}

#[async_trait]
impl ServerHandle for RecordingServer {
    async fn register(
        &self,
        plugins: Vec<PluginDescriptor>,
        shared: &RegistrationOptions,
    ) -> Result<(), BoxError> {
        let names = plugins.iter().map(|d| d.plugin.name().to_string()).collect();
        self.recorded
            .lock()
            .unwrap()
            .registered
            .push((names, shared.clone()));
        self.hub.register(plugins, shared).await
    }
}
