//! The command bridge abstraction.
//!
//! A [`CommandBridge`] sends one command to the inspected target and yields
//! its result at some later time. Outstanding calls may complete in any
//! order. Implementations must always resolve a call: when the target is
//! gone the call resolves with an error rather than never.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::trace;

use crate::error::Result;
use crate::protocol::Command;

// ============================================================================
// CommandBridge
// ============================================================================

/// Asynchronous request/response channel to the inspected target.
#[async_trait]
pub trait CommandBridge: Send + Sync {
    /// Sends a command and resolves with its raw result.
    ///
    /// # Errors
    ///
    /// Any transport or remote failure, for this call only.
    async fn send(&self, command: Command) -> Result<Value>;
}

// ============================================================================
// Typed Calls
// ============================================================================

/// Sends a command and deserializes its result.
///
/// # Errors
///
/// Bridge failures, or [`Error::Json`](crate::Error::Json) when the result
/// does not have the expected shape.
pub async fn call<T>(bridge: &dyn CommandBridge, command: Command) -> Result<T>
where
    T: DeserializeOwned,
{
    let method = command.method();
    let value = bridge.send(command).await?;
    trace!(method, "Bridge call resolved");
    Ok(serde_json::from_value(value)?)
}

// ============================================================================
// Tests
// ============================================================================
