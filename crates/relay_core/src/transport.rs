use async_trait::async_trait;
use shared::{
    domain::SurfaceId,
    protocol::{Message, Reply},
};

/// Cross-context send primitives. A `None` target means the coordinator; `Some`
/// means every context currently attached to that surface.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fire and forget. Delivery to nobody is not an error.
    fn send(&self, message: Message, target: Option<SurfaceId>);

    /// Resolves with the first answer, or `Reply::NoListener` once every receiver
    /// has finished with the message without answering.
    async fn send_with_ack(&self, message: Message, target: Option<SurfaceId>) -> Reply;
}
