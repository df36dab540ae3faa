use std::sync::Arc;

use shared::{
    domain::{ContextId, SurfaceId},
    protocol::{Message, SenderInfo},
};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, trace};

use crate::{
    bus::Envelope,
    table::{CommandTable, Dispatch, Invocation, Responder},
    transport::Transport,
};

/// What a router does with messages addressed to some other context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardPolicy {
    /// Send them on, unchanged, to every context on the sender's surface.
    Relay,
    /// Drop them.
    Ignore,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    Dispatched,
    Forwarded(SurfaceId),
    NotAddressed,
    Unhandled,
}

pub struct Router {
    identity: ContextId,
    table: CommandTable,
    policy: ForwardPolicy,
    transport: Arc<dyn Transport>,
}

impl Router {
    pub fn new(
        identity: ContextId,
        table: CommandTable,
        policy: ForwardPolicy,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            identity,
            table,
            policy,
            transport,
        }
    }

    pub fn identity(&self) -> &ContextId {
        &self.identity
    }

    pub fn table(&self) -> &CommandTable {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut CommandTable {
        &mut self.table
    }

    /// Never waits on a handler. Handlers with async work spawn it themselves.
    pub fn route(
        &mut self,
        message: Message,
        sender: SenderInfo,
        responder: Responder,
    ) -> RouteOutcome {
        if !message.is_for(&self.identity) {
            return self.forward(message, &sender);
        }

        let invocation = Invocation {
            message: &message,
            sender: &sender,
            responder,
        };
        match self.table.dispatch(invocation) {
            Dispatch::Invoked => {
                debug!(
                    context = %self.identity,
                    cmd = %message.cmd,
                    from = %sender.context,
                    "router: dispatched command"
                );
                RouteOutcome::Dispatched
            }
            Dispatch::Missing => {
                trace!(
                    context = %self.identity,
                    cmd = %message.cmd,
                    from = %sender.context,
                    "router: no handler, dropping"
                );
                RouteOutcome::Unhandled
            }
        }
    }

    fn forward(&self, message: Message, sender: &SenderInfo) -> RouteOutcome {
        match (self.policy, &sender.surface) {
            (ForwardPolicy::Relay, Some(surface)) => {
                debug!(
                    context = %self.identity,
                    cmd = %message.cmd,
                    to = ?message.to,
                    surface = %surface,
                    "router: forwarded message"
                );
                self.transport.send(message, Some(surface.clone()));
                RouteOutcome::Forwarded(surface.clone())
            }
            _ => {
                trace!(
                    context = %self.identity,
                    cmd = %message.cmd,
                    to = ?message.to,
                    "router: not addressed here, dropping"
                );
                RouteOutcome::NotAddressed
            }
        }
    }

    /// Runs this router as the context's only task. The task ends when every
    /// sender for `inbox` is gone.
    pub fn spawn(mut self, mut inbox: mpsc::UnboundedReceiver<Envelope>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(envelope) = inbox.recv().await {
                self.route(envelope.message, envelope.sender, envelope.responder);
            }
            debug!(context = %self.identity, "router: inbox closed");
        })
    }
}

#[cfg(test)]
#[path = "tests/router_tests.rs"]
mod tests;
