//! In-process delivery between the coordinator and the contexts attached to each
//! surface.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use futures::future::select_ok;
use parking_lot::Mutex;
use serde_json::Value;
use shared::{
    domain::{ContextId, OverlayId, SurfaceId},
    error::RelayError,
    protocol::{Message, Reply, SenderInfo},
};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::{document::Document, table::Responder, transport::Transport};

pub struct Envelope {
    pub message: Message,
    pub sender: SenderInfo,
    pub responder: Responder,
}

struct Slot {
    identity: ContextId,
    instance: Uuid,
    overlay: Option<OverlayId>,
    tx: mpsc::UnboundedSender<Envelope>,
}

struct SurfaceState {
    document: Document,
    slots: Vec<Slot>,
}

#[derive(Default)]
struct BusState {
    coordinator: Option<Slot>,
    surfaces: HashMap<SurfaceId, SurfaceState>,
}

struct Delivery {
    recipients: usize,
    acks: Vec<oneshot::Receiver<Value>>,
}

#[derive(Clone, Default)]
pub struct Bus {
    state: Arc<Mutex<BusState>>,
}

impl Bus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the surface was already open; its document is kept.
    pub fn open_surface(&self, surface: SurfaceId, document: Document) -> bool {
        let mut state = self.state.lock();
        if state.surfaces.contains_key(&surface) {
            return false;
        }
        debug!(surface = %surface, "bus: surface opened");
        state.surfaces.insert(
            surface,
            SurfaceState {
                document,
                slots: Vec::new(),
            },
        );
        true
    }

    /// Drops every context attached to the surface; their routers stop once their
    /// inboxes drain.
    pub fn close_surface(&self, surface: &SurfaceId) -> bool {
        let closed = self.state.lock().surfaces.remove(surface).is_some();
        if closed {
            debug!(surface = %surface, "bus: surface closed");
        }
        closed
    }

    /// Closes every surface and forgets the coordinator, which ends every router
    /// attached to this bus.
    pub fn close_all(&self) {
        let mut state = self.state.lock();
        let surfaces = state.surfaces.len();
        state.surfaces.clear();
        state.coordinator = None;
        debug!(surfaces, "bus: closed");
    }

    pub fn has_surface(&self, surface: &SurfaceId) -> bool {
        self.state.lock().surfaces.contains_key(surface)
    }

    pub fn document(&self, surface: &SurfaceId) -> Option<Document> {
        self.state
            .lock()
            .surfaces
            .get(surface)
            .map(|state| state.document.clone())
    }

    /// Identities of the live contexts on a surface, in attach order.
    pub fn contexts(&self, surface: &SurfaceId) -> Vec<ContextId> {
        self.state
            .lock()
            .surfaces
            .get(surface)
            .map(|state| {
                state
                    .slots
                    .iter()
                    .filter(|slot| !slot.tx.is_closed())
                    .map(|slot| slot.identity.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn overlays(&self, surface: &SurfaceId) -> Vec<OverlayId> {
        self.state
            .lock()
            .surfaces
            .get(surface)
            .map(|state| {
                state
                    .slots
                    .iter()
                    .filter_map(|slot| slot.overlay.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Replaces any previous coordinator; only one is reachable at a time.
    pub fn attach_coordinator(
        &self,
        identity: ContextId,
    ) -> (Endpoint, mpsc::UnboundedReceiver<Envelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let instance = Uuid::new_v4();
        self.state.lock().coordinator = Some(Slot {
            identity: identity.clone(),
            instance,
            overlay: None,
            tx,
        });
        let endpoint = Endpoint {
            bus: self.clone(),
            sender: SenderInfo {
                context: identity,
                surface: None,
                instance,
            },
        };
        (endpoint, rx)
    }

    pub fn attach(
        &self,
        surface: &SurfaceId,
        identity: ContextId,
        overlay: Option<OverlayId>,
    ) -> Result<(Endpoint, mpsc::UnboundedReceiver<Envelope>), RelayError> {
        let mut state = self.state.lock();
        let surface_state = state
            .surfaces
            .get_mut(surface)
            .ok_or_else(|| RelayError::SurfaceNotFound(surface.clone()))?;

        let (tx, rx) = mpsc::unbounded_channel();
        let instance = Uuid::new_v4();
        surface_state.slots.push(Slot {
            identity: identity.clone(),
            instance,
            overlay,
            tx,
        });
        debug!(surface = %surface, context = %identity, %instance, "bus: context attached");

        let endpoint = Endpoint {
            bus: self.clone(),
            sender: SenderInfo {
                context: identity,
                surface: Some(surface.clone()),
                instance,
            },
        };
        Ok((endpoint, rx))
    }

    pub fn detach_overlay(&self, surface: &SurfaceId, id: &OverlayId) -> usize {
        let mut state = self.state.lock();
        let Some(surface_state) = state.surfaces.get_mut(surface) else {
            return 0;
        };
        let before = surface_state.slots.len();
        surface_state
            .slots
            .retain(|slot| slot.overlay.as_ref() != Some(id));
        before - surface_state.slots.len()
    }

    fn deliver(
        &self,
        message: Message,
        sender: &SenderInfo,
        target: Option<&SurfaceId>,
        with_ack: bool,
    ) -> Delivery {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let slots: Vec<&Slot> = match target {
            None => state.coordinator.iter().collect(),
            Some(surface) => match state.surfaces.get_mut(surface) {
                Some(surface_state) => {
                    surface_state.slots.retain(|slot| !slot.tx.is_closed());
                    surface_state.slots.iter().collect()
                }
                None => Vec::new(),
            },
        };

        let mut delivery = Delivery {
            recipients: 0,
            acks: Vec::new(),
        };
        for slot in slots {
            let responder = if with_ack {
                let (tx, rx) = oneshot::channel();
                delivery.acks.push(rx);
                Responder::new(tx)
            } else {
                Responder::none()
            };
            let envelope = Envelope {
                message: message.clone(),
                sender: sender.clone(),
                responder,
            };
            if slot.tx.send(envelope).is_ok() {
                delivery.recipients += 1;
            } else {
                trace!(context = %slot.identity, instance = %slot.instance, "bus: inbox closed");
            }
        }
        delivery
    }
}

/// A context's handle on the bus. Every message it sends is stamped with its own
/// identity and surface.
#[derive(Clone)]
pub struct Endpoint {
    bus: Bus,
    sender: SenderInfo,
}

impl Endpoint {
    pub fn sender(&self) -> &SenderInfo {
        &self.sender
    }
}

#[async_trait]
impl Transport for Endpoint {
    fn send(&self, message: Message, target: Option<SurfaceId>) {
        let cmd = message.cmd.clone();
        let delivery = self.bus.deliver(message, &self.sender, target.as_ref(), false);
        trace!(
            from = %self.sender.context,
            cmd = %cmd,
            recipients = delivery.recipients,
            "bus: sent"
        );
    }

    async fn send_with_ack(&self, message: Message, target: Option<SurfaceId>) -> Reply {
        let delivery = self.bus.deliver(message, &self.sender, target.as_ref(), true);
        if delivery.acks.is_empty() {
            return Reply::NoListener;
        }
        match select_ok(delivery.acks).await {
            Ok((value, _)) => Reply::Replied(value),
            Err(_) => Reply::NoListener,
        }
    }
}

#[cfg(test)]
#[path = "tests/bus_tests.rs"]
mod tests;
