//! Devtools Panel - event-driven state engine for a CDP developer-tools panel.
//!
//! This library rebuilds the Network and Sources views of an inspected page
//! from Chrome DevTools Protocol events, and fetches bodies and source text
//! on demand through an asynchronous command bridge.
//!
//! # Architecture
//!
//! The panel follows an event-sourced model:
//!
//! - **Inbound**: protocol events are routed by [`Panel::dispatch`] to the
//!   [`NetworkModel`] and the [`SourcesModel`]
//! - **Outbound**: content fetches go through a [`CommandBridge`], by default
//!   a WebSocket [`Connection`]
//! - **View**: reads owned snapshots ([`NetworkModel::list`],
//!   [`SourcesModel::tree`]) and re-renders
//!
//! Key design principles:
//!
//! - Events for unknown request ids are ignored, never synthesized
//! - Each record or file is fetched at most once at a time (single-flight)
//! - Successful fetches are cached, failed ones are retryable
//! - No global state: a [`Panel`] is explicitly constructed
//!
//! # Quick Start
//!
//! ```no_run
//! use devtools_panel::{Panel, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let panel = Panel::builder()
//!         .endpoint("ws://127.0.0.1:9222/devtools/page/ABCD")
//!         .build()
//!         .await?;
//!
//!     for request in panel.network().list() {
//!         println!("{} {} {:?}", request.method, request.name(), request.status);
//!     }
//!
//!     let tree = panel.sources().tree();
//!     println!("{} hosts", tree.children.len());
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`model`] | [`NetworkModel`], [`SourcesModel`], [`SourceTree`] |
//! | [`panel`] | [`Panel`] session, builder and options |
//! | [`protocol`] | CDP command, response and event types |
//! | [`transport`] | [`CommandBridge`] and WebSocket [`Connection`] |

// ============================================================================
// Modules
// ============================================================================

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
///
/// Newtype wrappers prevent mixing incompatible IDs at compile time.
pub mod identifiers;

/// Network and Sources models.
pub mod model;

/// Panel session and configuration.
///
/// Use [`Panel::builder()`] to create a configured panel.
pub mod panel;

/// CDP message types.
pub mod protocol;

/// Command bridge and WebSocket transport.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{CommandId, FrameId, NodeId, RequestId, ScriptId};

// Model types
pub use model::{
    ContentState, NetworkModel, NetworkRequest, NodeKind, RequestFilter, ResponseBody,
    SourceEntry, SourceKind, SourceTree, SourcesModel,
};

// Panel types
pub use panel::{Panel, PanelBuilder, PanelOptions};

// Protocol types
pub use protocol::{Command, Event, ParsedEvent, ResourceType};

// Transport types
pub use transport::{CommandBridge, Connection};
