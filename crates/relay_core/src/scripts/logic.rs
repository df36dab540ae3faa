use std::sync::Arc;

use parking_lot::Mutex;
use shared::{
    domain::ContextId,
    protocol::{commands, CloseOverlayArgs, ImageDataArgs, Message, OpenOverlayArgs},
};
use tracing::{debug, info};

use crate::{
    inject::{Script, ScriptEnv},
    overlay::{OverlayManager, OverlaySpec},
    table::CommandTable,
};

/// Page logic: owns the overlays on its surface and swaps rendered images into
/// the document.
pub struct LogicScript {
    instance_id: String,
}

impl LogicScript {
    pub fn new(instance_id: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
        }
    }
}

impl Script for LogicScript {
    fn identity(&self) -> ContextId {
        ContextId::logic()
    }

    fn build(&self, env: ScriptEnv) -> CommandTable {
        env.transport.send(Message::new(commands::ADD_MENU), None);

        let overlays = Arc::new(Mutex::new(OverlayManager::new(
            self.instance_id.clone(),
            Arc::new(env.injector.clone()),
            Arc::clone(&env.transport),
        )));
        let mut table = CommandTable::new();

        let open_overlays = Arc::clone(&overlays);
        let surface = env.surface.clone();
        table.register(commands::OPEN_OVERLAY, move |invocation| {
            let args: OpenOverlayArgs = match invocation.message.args_as() {
                Ok(args) => args,
                Err(err) => {
                    debug!(error = %err, "logic: ignoring malformed overlay request");
                    return;
                }
            };
            let spec = OverlaySpec {
                overlay: args.overlay,
                hidden: args.hidden,
                id: Some(args.id),
                source_locator: args.old_image_src,
            };
            if let Err(err) = open_overlays.lock().open(surface.clone(), spec) {
                debug!(surface = %surface, error = %err, "logic: overlay not opened");
            }
        });

        table.register(commands::CLOSE_OVERLAY, move |invocation| {
            match invocation.message.args_as::<CloseOverlayArgs>() {
                Ok(args) => {
                    overlays.lock().close(&args.id);
                }
                Err(err) => debug!(error = %err, "logic: ignoring malformed close request"),
            }
        });

        let document = env.document.clone();
        table.register(commands::RENDER_ALTERED_IMAGE, move |invocation| {
            let args: ImageDataArgs = match invocation.message.args_as() {
                Ok(args) => args,
                Err(err) => {
                    debug!(error = %err, "logic: ignoring malformed render result");
                    return;
                }
            };
            let replaced = document.replace_source(&args.old_image_src, &args.new_image_src);
            info!(
                source = %args.old_image_src,
                replaced,
                "logic: swapped in rendered image"
            );
        });

        table
    }
}
