//! In-memory command bridge for tests.
//!
//! Records every command and either answers immediately through a
//! responder closure or parks the call until the test resolves it, in any
//! order it likes.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::error::{Error, Result};
use crate::protocol::Command;

use super::CommandBridge;

type Responder = Box<dyn Fn(&Command) -> Result<Value> + Send + Sync>;

/// A parked command.
struct Parked {
    command: Command,
    reply: oneshot::Sender<Result<Value>>,
}

#[derive(Default)]
struct ScriptedState {
    calls: Vec<Command>,
    parked: Vec<Parked>,
    responder: Option<Responder>,
    closed: bool,
}

/// Scripted [`CommandBridge`].
#[derive(Clone, Default)]
pub(crate) struct ScriptedBridge {
    state: Arc<Mutex<ScriptedState>>,
}

impl ScriptedBridge {
    /// Parks every command until resolved by the test.
    pub(crate) fn manual() -> Self {
        Self::default()
    }

    /// Answers every command immediately.
    pub(crate) fn auto<F>(responder: F) -> Self
    where
        F: Fn(&Command) -> Result<Value> + Send + Sync + 'static,
    {
        let bridge = Self::default();
        bridge.state.lock().responder = Some(Box::new(responder));
        bridge
    }

    /// Number of commands received so far.
    pub(crate) fn call_count(&self) -> usize {
        self.state.lock().calls.len()
    }

    /// Commands received so far, in arrival order.
    pub(crate) fn calls(&self) -> Vec<Command> {
        self.state.lock().calls.clone()
    }

    /// Number of parked commands.
    pub(crate) fn parked_count(&self) -> usize {
        self.state.lock().parked.len()
    }

    /// Command parked at `index`.
    pub(crate) fn parked_command(&self, index: usize) -> Option<Command> {
        self.state.lock().parked.get(index).map(|p| p.command.clone())
    }

    /// Resolves the parked command at `index`.
    pub(crate) fn resolve(&self, index: usize, result: Result<Value>) {
        let parked = self.state.lock().parked.remove(index);
        let _ = parked.reply.send(result);
    }

    /// Resolves the oldest parked command.
    pub(crate) fn resolve_next(&self, result: Result<Value>) {
        self.resolve(0, result);
    }

    /// Yields until at least `count` commands are parked.
    pub(crate) async fn wait_for_parked(&self, count: usize) {
        for _ in 0..10_000 {
            if self.parked_count() >= count {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!(
            "expected {count} parked commands, found {}",
            self.parked_count()
        );
    }

    /// Simulates the target going away.
    pub(crate) fn close(&self) {
        let parked: Vec<_> = {
            let mut state = self.state.lock();
            state.closed = true;
            state.parked.drain(..).collect()
        };
        for p in parked {
            let _ = p.reply.send(Err(Error::ConnectionClosed));
        }
    }
}

#[async_trait]
impl CommandBridge for ScriptedBridge {
    async fn send(&self, command: Command) -> Result<Value> {
        let rx = {
            let mut state = self.state.lock();
            state.calls.push(command.clone());

            if state.closed {
                return Err(Error::ConnectionClosed);
            }
            if let Some(responder) = state.responder.as_ref() {
                return responder(&command);
            }

            let (reply, rx) = oneshot::channel();
            state.parked.push(Parked { command, reply });
            rx
        };

        rx.await.map_err(|_| Error::ConnectionClosed)?
    }
}
