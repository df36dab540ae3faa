//! Ephemeral overlay contexts, one per transformation request.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use shared::{
    domain::{ContextId, OverlayId, OverlayIdGenerator, SurfaceId},
    error::RelayError,
    protocol::{commands, Message, RenderArgs},
};
use tracing::{debug, info, trace};

use crate::transport::Transport;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlaySpec {
    /// Identity of the context the overlay runs, e.g. `scrape`.
    pub overlay: ContextId,
    pub hidden: bool,
    /// Chosen by the requester. The coordinator always supplies one through
    /// `openOverlay`; only direct callers of `OverlayManager::open` rely on the
    /// generated fallback.
    pub id: Option<OverlayId>,
    pub source_locator: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayHandle {
    pub id: OverlayId,
    pub hidden: bool,
    pub target_surface: SurfaceId,
    pub overlay: ContextId,
    pub source_locator: String,
}

/// Where overlays are physically created and destroyed.
pub trait OverlayHost: Send + Sync {
    fn mount(&self, handle: &OverlayHandle) -> Result<(), RelayError>;
    fn unmount(&self, handle: &OverlayHandle);
}

pub struct OverlayManager {
    host: Arc<dyn OverlayHost>,
    transport: Arc<dyn Transport>,
    ids: OverlayIdGenerator,
    live: HashMap<OverlayId, OverlayHandle>,
    used: HashSet<OverlayId>,
}

impl OverlayManager {
    pub fn new(
        instance_id: impl Into<String>,
        host: Arc<dyn OverlayHost>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            host,
            transport,
            ids: OverlayIdGenerator::new(instance_id),
            live: HashMap::new(),
            used: HashSet::new(),
        }
    }

    /// Mounts the overlay and sends it a routed `render` carrying the source
    /// locator and the overlay id. A failed mount sends nothing and is not retried;
    /// its id stays burnt.
    pub fn open(
        &mut self,
        target_surface: SurfaceId,
        spec: OverlaySpec,
    ) -> Result<OverlayHandle, RelayError> {
        let id = match spec.id {
            Some(id) => id,
            None => self.ids.next_id(),
        };
        if !self.used.insert(id.clone()) {
            return Err(RelayError::DuplicateOverlay(id));
        }

        let handle = OverlayHandle {
            id,
            hidden: spec.hidden,
            target_surface,
            overlay: spec.overlay,
            source_locator: spec.source_locator,
        };
        let render = Message::addressed(handle.overlay.clone(), commands::RENDER).with_args(
            &RenderArgs {
                old_image_src: handle.source_locator.clone(),
                id: handle.id.clone(),
            },
        )?;

        self.host.mount(&handle)?;
        self.transport.send(render, None);
        info!(
            id = %handle.id,
            surface = %handle.target_surface,
            overlay = %handle.overlay,
            hidden = handle.hidden,
            "overlay: opened"
        );
        self.live.insert(handle.id.clone(), handle.clone());
        Ok(handle)
    }

    /// Unknown or already closed ids are ignored.
    pub fn close(&mut self, id: &OverlayId) -> bool {
        let Some(handle) = self.live.remove(id) else {
            trace!(id = %id, "overlay: close for unknown id ignored");
            return false;
        };
        self.host.unmount(&handle);
        debug!(id = %id, surface = %handle.target_surface, "overlay: closed");
        true
    }

    pub fn is_live(&self, id: &OverlayId) -> bool {
        self.live.contains_key(id)
    }

    pub fn get(&self, id: &OverlayId) -> Option<&OverlayHandle> {
        self.live.get(id)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}

#[cfg(test)]
#[path = "tests/overlay_tests.rs"]
mod tests;
