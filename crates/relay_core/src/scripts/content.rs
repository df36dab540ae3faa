use shared::{
    domain::ContextId,
    protocol::{commands, Message},
};

use crate::{
    inject::{Script, ScriptEnv},
    table::CommandTable,
};

/// Injected into every attached surface; asks the coordinator for the page logic.
pub struct ContentScript;

impl Script for ContentScript {
    fn identity(&self) -> ContextId {
        ContextId::content()
    }

    fn build(&self, env: ScriptEnv) -> CommandTable {
        env.transport.send(Message::new(commands::RUN_LOGIC), None);
        CommandTable::new()
    }
}
