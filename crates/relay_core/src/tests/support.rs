use async_trait::async_trait;
use parking_lot::Mutex;
use shared::{
    domain::{ContextId, OverlayId, SurfaceId},
    error::RelayError,
    protocol::{Message, Reply, SenderInfo},
};
use uuid::Uuid;

use crate::{
    overlay::{OverlayHandle, OverlayHost},
    transport::Transport,
};

#[derive(Default)]
pub(crate) struct RecordingTransport {
    sent: Mutex<Vec<(Message, Option<SurfaceId>)>>,
}

impl RecordingTransport {
    pub(crate) fn sent(&self) -> Vec<(Message, Option<SurfaceId>)> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    fn send(&self, message: Message, target: Option<SurfaceId>) {
        self.sent.lock().push((message, target));
    }

    async fn send_with_ack(&self, message: Message, target: Option<SurfaceId>) -> Reply {
        self.sent.lock().push((message, target));
        Reply::NoListener
    }
}

#[derive(Default)]
pub(crate) struct RecordingHost {
    pub(crate) reject: bool,
    pub(crate) mounted: Mutex<Vec<OverlayHandle>>,
    pub(crate) unmounted: Mutex<Vec<OverlayId>>,
}

impl RecordingHost {
    pub(crate) fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::default()
        }
    }
}

impl OverlayHost for RecordingHost {
    fn mount(&self, handle: &OverlayHandle) -> Result<(), RelayError> {
        if self.reject {
            return Err(RelayError::SurfaceNotFound(handle.target_surface.clone()));
        }
        self.mounted.lock().push(handle.clone());
        Ok(())
    }

    fn unmount(&self, handle: &OverlayHandle) {
        self.unmounted.lock().push(handle.id.clone());
    }
}

pub(crate) fn sender(context: &str, surface: Option<&str>) -> SenderInfo {
    SenderInfo {
        context: ContextId::new(context),
        surface: surface.map(SurfaceId::new),
        instance: Uuid::new_v4(),
    }
}
