//! Script injection: creating a new context on a surface from a registered script.

use std::{collections::HashMap, sync::Arc};

use shared::{
    domain::{ContextId, OverlayId, SurfaceId},
    error::RelayError,
};
use tracing::debug;
use uuid::Uuid;

use crate::{
    bus::Bus,
    document::Document,
    overlay::{OverlayHandle, OverlayHost},
    router::{ForwardPolicy, Router},
    table::CommandTable,
    transport::Transport,
};

/// Everything a script sees when it starts.
pub struct ScriptEnv {
    pub identity: ContextId,
    pub surface: SurfaceId,
    pub overlay: Option<OverlayId>,
    pub transport: Arc<dyn Transport>,
    pub document: Document,
    pub injector: Injector,
}

pub trait Script: Send + Sync {
    fn identity(&self) -> ContextId;

    /// Builds the context's command table. Startup messages may be sent from here.
    fn build(&self, env: ScriptEnv) -> CommandTable;
}

#[derive(Default)]
pub struct ScriptRegistry {
    scripts: HashMap<String, Arc<dyn Script>>,
}

impl ScriptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, path: impl Into<String>, script: Arc<dyn Script>) -> &mut Self {
        self.scripts.insert(path.into(), script);
        self
    }

    pub fn get(&self, path: &str) -> Option<Arc<dyn Script>> {
        self.scripts.get(path).cloned()
    }
}

/// Page an overlay context is loaded from.
pub fn overlay_page(overlay: &ContextId) -> String {
    format!("{overlay}.html")
}

#[derive(Clone)]
pub struct Injector {
    bus: Bus,
    scripts: Arc<ScriptRegistry>,
}

impl Injector {
    pub fn new(bus: Bus, scripts: ScriptRegistry) -> Self {
        Self {
            bus,
            scripts: Arc::new(scripts),
        }
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Starts a new context running `script_path` on `surface`. Must be called from
    /// within a tokio runtime.
    pub fn inject(&self, surface: &SurfaceId, script_path: &str) -> Result<Uuid, RelayError> {
        self.start(surface, script_path, None)
    }

    fn start(
        &self,
        surface: &SurfaceId,
        script_path: &str,
        overlay: Option<OverlayId>,
    ) -> Result<Uuid, RelayError> {
        let script = self
            .scripts
            .get(script_path)
            .ok_or_else(|| RelayError::UnknownScript(script_path.to_string()))?;
        let document = self
            .bus
            .document(surface)
            .ok_or_else(|| RelayError::SurfaceNotFound(surface.clone()))?;

        let identity = script.identity();
        let (endpoint, inbox) = self.bus.attach(surface, identity.clone(), overlay.clone())?;
        let instance = endpoint.sender().instance;
        let transport: Arc<dyn Transport> = Arc::new(endpoint);

        let table = script.build(ScriptEnv {
            identity: identity.clone(),
            surface: surface.clone(),
            overlay,
            transport: Arc::clone(&transport),
            document,
            injector: self.clone(),
        });
        debug!(
            surface = %surface,
            script = script_path,
            context = %identity,
            commands = ?table.commands(),
            "inject: script started"
        );
        Router::new(identity, table, ForwardPolicy::Ignore, transport).spawn(inbox);
        Ok(instance)
    }
}

impl OverlayHost for Injector {
    fn mount(&self, handle: &OverlayHandle) -> Result<(), RelayError> {
        self.start(
            &handle.target_surface,
            &overlay_page(&handle.overlay),
            Some(handle.id.clone()),
        )
        .map(|_| ())
    }

    fn unmount(&self, handle: &OverlayHandle) {
        self.bus.detach_overlay(&handle.target_surface, &handle.id);
    }
}

#[cfg(test)]
#[path = "tests/inject_tests.rs"]
mod tests;
