//! CDP-style protocol message types.
//!
//! This module defines the message format exchanged between the panel and
//! the inspected target.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `Request` | Panel → Target | Command request |
//! | `Response` | Target → Panel | Command response |
//! | `Event` | Target → Panel | Unsolicited notification |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | Command definitions by domain |
//! | `event` | Event and typed payloads |
//! | `request` | Request and Response envelopes |
//! | `types` | Shared payload and result types |

// ============================================================================
// Submodules
// ============================================================================

/// Command definitions organized by domain.
pub mod command;

/// Event message types.
pub mod event;

/// Request and Response message types.
pub mod request;

/// Shared payload types.
pub mod types;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::{Command, DebuggerCommand, NetworkCommand, PageCommand};
pub use event::{
    Event, FrameNavigated, LoadingFailed, LoadingFinished, ParsedEvent, RequestData,
    RequestWillBeSent, ResponseData, ResponseReceived, ScriptParsed,
};
pub use request::{Request, Response, ResponseError};
pub use types::{
    FrameInfo, FrameResource, FrameResourceTree, Headers, ResourceContentResult,
    ResourceTreeResult, ResourceType, ResponseBodyResult, ScriptSourceResult,
};
