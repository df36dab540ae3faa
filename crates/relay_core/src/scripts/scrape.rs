use std::sync::Arc;

use pixelate::ImageLoader;
use serde_json::Value;
use shared::{
    domain::{ContextId, OverlayId},
    protocol::{commands, CloseOverlayArgs, ImageDataArgs, Message, RenderArgs},
};
use tracing::{debug, warn};

use crate::{
    inject::{Script, ScriptEnv},
    table::CommandTable,
    transport::Transport,
};

/// Overlay context that pixelates one image and reports back through the
/// coordinator.
pub struct ScrapeScript {
    loader: Arc<dyn ImageLoader>,
}

impl ScrapeScript {
    pub fn new(loader: Arc<dyn ImageLoader>) -> Self {
        Self { loader }
    }
}

impl Script for ScrapeScript {
    fn identity(&self) -> ContextId {
        ContextId::scrape()
    }

    fn build(&self, env: ScriptEnv) -> CommandTable {
        let mut table = CommandTable::new();
        let own_id = env.overlay.clone();
        let loader = Arc::clone(&self.loader);
        let transport = Arc::clone(&env.transport);

        // Every scrape on the surface hears every render; an overlay only takes its own.
        table.register_once_where(
            commands::RENDER,
            move |message| is_for_overlay(message, own_id.as_ref()),
            move |invocation| {
                let args: RenderArgs = match invocation.message.args_as() {
                    Ok(args) => args,
                    Err(err) => {
                        debug!(error = %err, "scrape: ignoring malformed render");
                        return;
                    }
                };
                tokio::spawn(render(Arc::clone(&loader), Arc::clone(&transport), args));
            },
        );

        table
    }
}

fn is_for_overlay(message: &Message, own_id: Option<&OverlayId>) -> bool {
    match own_id {
        Some(own_id) => message.args.get("id").and_then(Value::as_str) == Some(own_id.as_str()),
        None => true,
    }
}

async fn render(loader: Arc<dyn ImageLoader>, transport: Arc<dyn Transport>, args: RenderArgs) {
    let result = pixelate::transform(loader.as_ref(), &args.old_image_src).await;

    match result.new_image_locator {
        Some(new_image_src) => {
            let image_data = Message::new(commands::HANDLE_IMAGE_DATA).with_args(&ImageDataArgs {
                old_image_src: result.old_image_locator,
                new_image_src,
            });
            match image_data {
                Ok(message) => {
                    let reply = transport.send_with_ack(message, None).await;
                    debug!(id = %args.id, ?reply, "scrape: image data delivered");
                }
                Err(err) => warn!(id = %args.id, error = %err, "scrape: could not build image data"),
            }
        }
        None => debug!(
            id = %args.id,
            source = %args.old_image_src,
            "scrape: source did not load, leaving it unchanged"
        ),
    }

    let close = Message::addressed(ContextId::logic(), commands::CLOSE_OVERLAY)
        .with_args(&CloseOverlayArgs { id: args.id });
    match close {
        Ok(message) => transport.send(message, None),
        Err(err) => warn!(error = %err, "scrape: could not build close request"),
    }
}
