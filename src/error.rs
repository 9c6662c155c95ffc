//! Error types for the devtools panel engine.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use devtools_panel::{Result, RequestId};
//!
//! async fn show_body(panel: &Panel, id: &RequestId) -> Result<()> {
//!     let body = panel.network().get_body(id).await?;
//!     println!("{}", body.body);
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionTimeout`], [`Error::ConnectionClosed`] |
//! | Protocol | [`Error::Protocol`], [`Error::Command`], [`Error::RequestTimeout`] |
//! | Lookup | [`Error::RequestNotFound`], [`Error::NodeNotFound`], [`Error::NotAFile`] |
//! | Fetch | [`Error::FetchFailed`], [`Error::Superseded`] |
//! | External | [`Error::Json`], [`Error::WebSocket`], [`Error::Base64`] |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use base64::DecodeError;
use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::{CommandId, NodeId, RequestId};

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when [`PanelOptions`](crate::PanelOptions) are invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket connection failed.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Timed out establishing the connection.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// The inspected target went away.
    ///
    /// Every command still pending when the connection drops resolves with
    /// this error.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Protocol violation or unexpected payload.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// The inspected target rejected a command.
    #[error("Command {method} failed ({code}): {message}")]
    Command {
        /// Method that failed.
        method: String,
        /// Remote error code.
        code: i64,
        /// Remote error message.
        message: String,
    },

    /// Command response not received in time.
    #[error("Command {command_id} timed out after {timeout_ms}ms")]
    RequestTimeout {
        /// The command that timed out.
        command_id: CommandId,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // Lookup Errors
    // ========================================================================
    /// No network record with this id.
    #[error("Network request not found: {request_id}")]
    RequestNotFound {
        /// The missing request id.
        request_id: RequestId,
    },

    /// No source tree node with this id.
    #[error("Source node not found: {node_id}")]
    NodeNotFound {
        /// The missing node id.
        node_id: NodeId,
    },

    /// Content was requested for a directory node.
    #[error("Source node is not a file: {node_id}")]
    NotAFile {
        /// The directory node.
        node_id: NodeId,
    },

    // ========================================================================
    // Fetch Errors
    // ========================================================================
    /// A shared fetch failed.
    ///
    /// Delivered to every caller joined on the same in-flight fetch.
    #[error("Fetching {target} failed: {message}")]
    FetchFailed {
        /// What was being fetched (request id or URL).
        target: String,
        /// Underlying failure.
        message: String,
    },

    /// The record a fetch belonged to was cleared or replaced mid-flight.
    #[error("Fetch for {target} superseded")]
    Superseded {
        /// What was being fetched.
        target: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// Base64 decode error.
    #[error("Base64 error: {0}")]
    Base64(#[from] DecodeError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a remote command error.
    #[inline]
    pub fn command(method: impl Into<String>, code: i64, message: impl Into<String>) -> Self {
        Self::Command {
            method: method.into(),
            code,
            message: message.into(),
        }
    }

    /// Creates a request timeout error.
    #[inline]
    pub fn request_timeout(command_id: CommandId, timeout_ms: u64) -> Self {
        Self::RequestTimeout {
            command_id,
            timeout_ms,
        }
    }

    /// Creates a request not found error.
    #[inline]
    pub fn request_not_found(request_id: RequestId) -> Self {
        Self::RequestNotFound { request_id }
    }

    /// Creates a node not found error.
    #[inline]
    pub fn node_not_found(node_id: NodeId) -> Self {
        Self::NodeNotFound { node_id }
    }

    /// Creates a not-a-file error.
    #[inline]
    pub fn not_a_file(node_id: NodeId) -> Self {
        Self::NotAFile { node_id }
    }

    /// Creates a fetch failed error.
    #[inline]
    pub fn fetch_failed(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FetchFailed {
            target: target.into(),
            message: message.into(),
        }
    }

    /// Creates a superseded error.
    #[inline]
    pub fn superseded(target: impl Into<String>) -> Self {
        Self::Superseded {
            target: target.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ConnectionTimeout { .. } | Self::RequestTimeout { .. }
        )
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this is a lookup error.
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::RequestNotFound { .. } | Self::NodeNotFound { .. }
        )
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed when the same operation is retried.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::RequestTimeout { .. }
                | Self::Command { .. }
                | Self::FetchFailed { .. }
                | Self::Superseded { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
