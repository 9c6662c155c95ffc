//! Command definitions organized by protocol domain.
//!
//! Commands follow the CDP `Domain.methodName` format.
//!
//! # Command Domains
//!
//! | Domain | Commands |
//! |--------|----------|
//! | `Network` | `enable`, `getResponseBody` |
//! | `Page` | `enable`, `getResourceTree`, `getResourceContent` |
//! | `Debugger` | `enable`, `getScriptSource` |

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::identifiers::{FrameId, RequestId, ScriptId};

// ============================================================================
// Command Wrapper
// ============================================================================

/// All protocol commands organized by domain.
///
/// This enum wraps domain-specific command enums for unified serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Command {
    /// Network domain commands.
    Network(NetworkCommand),
    /// Page domain commands.
    Page(PageCommand),
    /// Debugger domain commands.
    Debugger(DebuggerCommand),
}

impl Command {
    /// Returns the `Domain.methodName` string of this command.
    #[must_use]
    pub fn method(&self) -> &'static str {
        match self {
            Self::Network(NetworkCommand::Enable) => "Network.enable",
            Self::Network(NetworkCommand::GetResponseBody { .. }) => "Network.getResponseBody",
            Self::Page(PageCommand::Enable) => "Page.enable",
            Self::Page(PageCommand::GetResourceTree) => "Page.getResourceTree",
            Self::Page(PageCommand::GetResourceContent { .. }) => "Page.getResourceContent",
            Self::Debugger(DebuggerCommand::Enable) => "Debugger.enable",
            Self::Debugger(DebuggerCommand::GetScriptSource { .. }) => "Debugger.getScriptSource",
        }
    }
}

impl From<NetworkCommand> for Command {
    #[inline]
    fn from(command: NetworkCommand) -> Self {
        Self::Network(command)
    }
}

impl From<PageCommand> for Command {
    #[inline]
    fn from(command: PageCommand) -> Self {
        Self::Page(command)
    }
}

impl From<DebuggerCommand> for Command {
    #[inline]
    fn from(command: DebuggerCommand) -> Self {
        Self::Debugger(command)
    }
}

// ============================================================================
// Network Commands
// ============================================================================

/// Network domain commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum NetworkCommand {
    /// Start emitting network events.
    #[serde(rename = "Network.enable")]
    Enable,

    /// Fetch the body of a finished response.
    #[serde(rename = "Network.getResponseBody")]
    GetResponseBody {
        /// Request whose response body to return.
        #[serde(rename = "requestId")]
        request_id: RequestId,
    },
}

// ============================================================================
// Page Commands
// ============================================================================

/// Page domain commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum PageCommand {
    /// Start emitting page events.
    #[serde(rename = "Page.enable")]
    Enable,

    /// Snapshot the frame tree with its subresources.
    #[serde(rename = "Page.getResourceTree")]
    GetResourceTree,

    /// Fetch the content of one frame resource.
    #[serde(rename = "Page.getResourceContent")]
    GetResourceContent {
        /// Frame the resource belongs to.
        #[serde(rename = "frameId")]
        frame_id: FrameId,
        /// Resource URL.
        url: String,
    },
}

// ============================================================================
// Debugger Commands
// ============================================================================

/// Debugger domain commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum DebuggerCommand {
    /// Start emitting `Debugger.scriptParsed`.
    #[serde(rename = "Debugger.enable")]
    Enable,

    /// Fetch the source of a parsed script.
    #[serde(rename = "Debugger.getScriptSource")]
    GetScriptSource {
        /// Script to fetch.
        #[serde(rename = "scriptId")]
        script_id: ScriptId,
    },
}

// ============================================================================
// Tests
// ============================================================================
