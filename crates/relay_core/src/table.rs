//! Per-context command tables.

use std::{collections::HashMap, fmt};

use serde_json::Value;
use shared::protocol::{Message, SenderInfo};
use tokio::sync::oneshot;

/// Answers a `send_with_ack`. Dropping it unanswered resolves the sender's wait
/// as `Reply::NoListener`.
#[derive(Debug, Default)]
pub struct Responder(Option<oneshot::Sender<Value>>);

impl Responder {
    pub fn new(tx: oneshot::Sender<Value>) -> Self {
        Self(Some(tx))
    }

    pub fn none() -> Self {
        Self(None)
    }

    pub fn expects_reply(&self) -> bool {
        self.0.is_some()
    }

    /// Returns false when nobody is waiting for the answer any more.
    pub fn reply(mut self, value: Value) -> bool {
        match self.0.take() {
            Some(tx) => tx.send(value).is_ok(),
            None => false,
        }
    }
}

pub struct Invocation<'a> {
    pub message: &'a Message,
    pub sender: &'a SenderInfo,
    pub responder: Responder,
}

pub type Handler = Box<dyn FnMut(Invocation<'_>) + Send>;
pub type Guard = Box<dyn Fn(&Message) -> bool + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OneShotState {
    Pending,
    Consumed,
}

enum Firing {
    Repeating,
    OneShot {
        state: OneShotState,
        guard: Option<Guard>,
    },
}

struct Entry {
    handler: Handler,
    firing: Firing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Invoked,
    /// No live entry: never registered, removed, consumed, or refused by its guard.
    Missing,
}

#[derive(Default)]
pub struct CommandTable {
    entries: HashMap<String, Entry>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, cmd: impl Into<String>, handler: F) -> &mut Self
    where
        F: FnMut(Invocation<'_>) + Send + 'static,
    {
        self.insert(cmd.into(), Box::new(handler), Firing::Repeating)
    }

    /// The handler runs at most once for the lifetime of this table.
    pub fn register_once<F>(&mut self, cmd: impl Into<String>, handler: F) -> &mut Self
    where
        F: FnMut(Invocation<'_>) + Send + 'static,
    {
        self.insert(
            cmd.into(),
            Box::new(handler),
            Firing::OneShot {
                state: OneShotState::Pending,
                guard: None,
            },
        )
    }

    /// Like [`register_once`](Self::register_once), but messages refused by `guard`
    /// are treated as missing and leave the entry pending.
    pub fn register_once_where<G, F>(
        &mut self,
        cmd: impl Into<String>,
        guard: G,
        handler: F,
    ) -> &mut Self
    where
        G: Fn(&Message) -> bool + Send + 'static,
        F: FnMut(Invocation<'_>) + Send + 'static,
    {
        self.insert(
            cmd.into(),
            Box::new(handler),
            Firing::OneShot {
                state: OneShotState::Pending,
                guard: Some(Box::new(guard)),
            },
        )
    }

    fn insert(&mut self, cmd: String, handler: Handler, firing: Firing) -> &mut Self {
        self.entries.insert(cmd, Entry { handler, firing });
        self
    }

    pub fn remove(&mut self, cmd: &str) -> bool {
        self.entries.remove(cmd).is_some()
    }

    /// True when dispatching `cmd` could still run a handler.
    pub fn contains(&self, cmd: &str) -> bool {
        self.entries.get(cmd).is_some_and(|entry| {
            !matches!(
                entry.firing,
                Firing::OneShot {
                    state: OneShotState::Consumed,
                    ..
                }
            )
        })
    }

    pub fn one_shot_state(&self, cmd: &str) -> Option<OneShotState> {
        match self.entries.get(cmd)?.firing {
            Firing::OneShot { state, .. } => Some(state),
            Firing::Repeating => None,
        }
    }

    pub fn commands(&self) -> Vec<&str> {
        let mut commands: Vec<&str> = self
            .entries
            .keys()
            .map(String::as_str)
            .filter(|cmd| self.contains(cmd))
            .collect();
        commands.sort_unstable();
        commands
    }

    pub fn dispatch(&mut self, invocation: Invocation<'_>) -> Dispatch {
        let Some(entry) = self.entries.get_mut(&invocation.message.cmd) else {
            return Dispatch::Missing;
        };

        if let Firing::OneShot { state, guard } = &mut entry.firing {
            if *state == OneShotState::Consumed {
                return Dispatch::Missing;
            }
            if guard
                .as_ref()
                .is_some_and(|accepts| !accepts(invocation.message))
            {
                return Dispatch::Missing;
            }
            *state = OneShotState::Consumed;
        }

        (entry.handler)(invocation);
        Dispatch::Invoked
    }
}

impl fmt::Debug for CommandTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandTable")
            .field("commands", &self.commands())
            .finish()
    }
}

#[cfg(test)]
#[path = "tests/table_tests.rs"]
mod tests;
