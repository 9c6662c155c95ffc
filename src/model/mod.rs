//! Panel data models.
//!
//! | Module | Description |
//! |--------|-------------|
//! | `network` | Request table rebuilt from `Network.*` events |
//! | `sources` | Source tree and content fetches |
//! | `tree` | Arena-backed path tree |
//! | `fetch` | Single-flight fetch slots |
//!
//! Both models are cheap to clone handles over shared state. Event handlers
//! are synchronous; only content fetches await the command bridge.

// ============================================================================
// Submodules
// ============================================================================

mod fetch;

/// Network request table.
pub mod network;

/// Source tree and content.
pub mod sources;

/// Arena-backed path tree.
pub mod tree;

// ============================================================================
// Re-exports
// ============================================================================

pub use fetch::ContentState;
pub use network::{NetworkModel, NetworkRequest, RequestFilter, ResponseBody};
pub use sources::{SourceEntry, SourcesModel};
pub use tree::{ContentOrigin, NodeKind, SourceFile, SourceKind, SourceNode, SourceTree};
