//! The privileged side of the relay: owns the only router other contexts send
//! to, injects scripts into surfaces and turns menu clicks into overlay requests.

use std::sync::Arc;

use parking_lot::Mutex;
use pixelate::ImageLoader;
use relay_core::{
    overlay_page,
    scripts::{ContentScript, LogicScript, ScrapeScript, CONTENT_SCRIPT, LOGIC_SCRIPT},
    Bus, Document, Endpoint, ForwardPolicy, Injector, Router, ScriptRegistry, Transport,
};
use shared::{
    domain::{ContextId, MenuId, OverlayId, OverlayIdGenerator, SurfaceId},
    error::RelayError,
    protocol::{commands, ClickEvent, Message, OpenOverlayArgs},
};
use tokio::task::JoinHandle;
use tracing::{debug, info};

pub mod background;
pub mod config;
pub mod menu;

use config::Settings;
use menu::{MenuContext, MenuItem, MenuRegistry};

pub struct Coordinator {
    settings: Settings,
    bus: Bus,
    injector: Injector,
    endpoint: Arc<Endpoint>,
    menus: MenuRegistry,
    overlay_ids: Mutex<OverlayIdGenerator>,
    router_task: JoinHandle<()>,
}

impl Coordinator {
    /// Starts the coordinator's router. Must be called from within a tokio runtime.
    pub fn start(settings: Settings, loader: Arc<dyn ImageLoader>) -> Self {
        let mut scripts = ScriptRegistry::new();
        scripts
            .register(CONTENT_SCRIPT, Arc::new(ContentScript))
            .register(
                LOGIC_SCRIPT,
                Arc::new(LogicScript::new(settings.instance_id.clone())),
            )
            .register(
                overlay_page(&ContextId::scrape()),
                Arc::new(ScrapeScript::new(loader)),
            );

        let bus = Bus::new();
        let injector = Injector::new(bus.clone(), scripts);
        let (endpoint, inbox) = bus.attach_coordinator(ContextId::background());
        let endpoint = Arc::new(endpoint);
        let menus = MenuRegistry::new();

        let table = background::command_table(
            injector.clone(),
            endpoint.clone(),
            menus.clone(),
            MenuItem {
                id: MenuId::new(settings.menu_id.clone()),
                title: settings.menu_title.clone(),
                contexts: MenuContext::Image,
            },
        );
        let router_task = Router::new(
            ContextId::background(),
            table,
            ForwardPolicy::Relay,
            endpoint.clone(),
        )
        .spawn(inbox);
        info!(instance = %settings.instance_id, "coordinator: started");

        Self {
            overlay_ids: Mutex::new(OverlayIdGenerator::new(settings.instance_id.clone())),
            settings,
            bus,
            injector,
            endpoint,
            menus,
            router_task,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn menus(&self) -> &MenuRegistry {
        &self.menus
    }

    pub fn menu_id(&self) -> MenuId {
        MenuId::new(self.settings.menu_id.clone())
    }

    /// Opens the surface and injects the content script, which bootstraps the
    /// page logic through `runLogic`. An already attached surface keeps its
    /// document and contexts.
    pub fn attach_surface(&self, surface: SurfaceId, document: Document) -> Result<(), RelayError> {
        if !self.bus.open_surface(surface.clone(), document) {
            return Err(RelayError::SurfaceAlreadyAttached(surface));
        }
        self.injector.inject(&surface, CONTENT_SCRIPT)?;
        Ok(())
    }

    pub fn detach_surface(&self, surface: &SurfaceId) -> bool {
        self.bus.close_surface(surface)
    }

    /// Resolves once the page logic has installed the menu.
    pub async fn wait_for_menu(&self) {
        self.menus.wait_for(&self.menu_id()).await;
    }

    /// Asks the logic on the clicked surface to open a scrape overlay for the
    /// image. Clicks on other or not yet installed menus are ignored.
    pub fn on_menu_click(&self, event: ClickEvent) -> Result<Option<OverlayId>, RelayError> {
        if event.menu_id.as_str() != self.settings.menu_id || !self.menus.contains(&event.menu_id)
        {
            debug!(menu = %event.menu_id, "coordinator: click on unknown menu ignored");
            return Ok(None);
        }

        let id = self.overlay_ids.lock().next_id();
        let message = Message::addressed(ContextId::logic(), commands::OPEN_OVERLAY).with_args(
            &OpenOverlayArgs {
                overlay: ContextId::scrape(),
                hidden: self.settings.overlay_hidden,
                id: id.clone(),
                old_image_src: event.source_image_locator,
            },
        )?;
        info!(id = %id, surface = %event.target_surface, "coordinator: overlay requested");
        self.endpoint.send(message, Some(event.target_surface));
        Ok(Some(id))
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.router_task.abort();
        self.bus.close_all();
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
