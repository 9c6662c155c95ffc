//! Panel session, builder and options.
//!
//! | Module | Description |
//! |--------|-------------|
//! | `core` | [`Panel`] session and event routing |
//! | `builder` | [`PanelBuilder`] fluent construction |
//! | `options` | [`PanelOptions`] configuration |

// ============================================================================
// Submodules
// ============================================================================

/// Panel builder.
pub mod builder;

/// Panel session.
pub mod core;

/// Panel options.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::PanelBuilder;
pub use core::Panel;
pub use options::{DEFAULT_COMMAND_TIMEOUT, DEFAULT_MAX_PENDING_COMMANDS, PanelOptions};
