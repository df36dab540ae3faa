//! Commands the coordinator runs on behalf of page contexts.

use std::sync::Arc;

use relay_core::{scripts::LOGIC_SCRIPT, CommandTable, Injector, Transport};
use shared::{
    domain::ContextId,
    protocol::{commands, ImageDataArgs, Message},
};
use tracing::{debug, info, trace, warn};

use crate::menu::{MenuItem, MenuRegistry};

pub fn command_table(
    injector: Injector,
    transport: Arc<dyn Transport>,
    menus: MenuRegistry,
    menu_item: MenuItem,
) -> CommandTable {
    let mut table = CommandTable::new();

    table.register(commands::RUN_LOGIC, move |invocation| {
        let Some(surface) = invocation.sender.surface.as_ref() else {
            trace!("background: runLogic without a surface ignored");
            return;
        };
        if let Err(err) = injector.inject(surface, LOGIC_SCRIPT) {
            warn!(surface = %surface, error = %err, "background: logic injection failed");
        }
    });

    table.register(commands::ADD_MENU, move |_| {
        menus.remove_all();
        menus.create(menu_item.clone());
        info!(menu = %menu_item.id, "background: menu installed");
    });

    table.register(commands::HANDLE_IMAGE_DATA, move |invocation| {
        let Some(surface) = invocation.sender.surface.clone() else {
            trace!("background: image data without a surface ignored");
            return;
        };
        let relayed = invocation
            .message
            .args_as::<ImageDataArgs>()
            .and_then(|args| {
                Message::addressed(ContextId::logic(), commands::RENDER_ALTERED_IMAGE)
                    .with_args(&args)
            });
        match relayed {
            Ok(message) => {
                debug!(surface = %surface, "background: relaying rendered image to logic");
                transport.send(message, Some(surface));
            }
            Err(err) => debug!(error = %err, "background: ignoring malformed image data"),
        }
    });

    table
}

#[cfg(test)]
#[path = "tests/background_tests.rs"]
mod tests;
