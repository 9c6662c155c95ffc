//! Command bridge and WebSocket transport.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Panel models   │                              │  Inspected      │
//! │                 │         WebSocket            │  target (CDP)   │
//! │  CommandBridge  │◄────────────────────────────►│                 │
//! │  → Connection   │   commands / responses /     │                 │
//! │                 │   events                     │                 │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `bridge` | The [`CommandBridge`] trait and typed calls |
//! | `connection` | WebSocket connection and event loop |

// ============================================================================
// Submodules
// ============================================================================

/// The command bridge abstraction.
pub mod bridge;

/// WebSocket connection and event loop.
pub mod connection;

#[cfg(test)]
pub(crate) mod scripted;

// ============================================================================
// Re-exports
// ============================================================================

pub use bridge::{CommandBridge, call};
pub use connection::{Connection, EventHandler};
