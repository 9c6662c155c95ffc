//! Request and Response message types.
//!
//! Defines the CDP framing for commands sent to the inspected target and
//! the replies it sends back.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::CommandId;

use super::Command;

// ============================================================================
// Request
// ============================================================================

/// A command request from the panel to the inspected target.
///
/// # Format
///
/// ```json
/// {
///   "id": 7,
///   "method": "Domain.methodName",
///   "params": { ... }
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    /// Identifier for request/response correlation.
    pub id: CommandId,

    /// Command with method and params.
    #[serde(flatten)]
    pub command: Command,
}

impl Request {
    /// Creates a new request with an auto-allocated id.
    #[inline]
    #[must_use]
    pub fn new(command: Command) -> Self {
        Self {
            id: CommandId::next(),
            command,
        }
    }

    /// Creates a new request with a specific id.
    #[inline]
    #[must_use]
    pub fn with_id(id: CommandId, command: Command) -> Self {
        Self { id, command }
    }

    /// Returns the command method.
    #[inline]
    #[must_use]
    pub fn method(&self) -> &'static str {
        self.command.method()
    }
}

// ============================================================================
// Response
// ============================================================================

/// A response from the inspected target.
///
/// # Format
///
/// Success:
/// ```json
/// { "id": 7, "result": { ... } }
/// ```
///
/// Error:
/// ```json
/// { "id": 7, "error": { "code": -32000, "message": "..." } }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    /// Matches the request `id`.
    pub id: CommandId,

    /// Result data (if success).
    #[serde(default)]
    pub result: Option<Value>,

    /// Error details (if error).
    #[serde(default)]
    pub error: Option<ResponseError>,
}

/// Error object of a failed command.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseError {
    /// Protocol error code.
    #[serde(default)]
    pub code: i64,

    /// Human-readable message.
    #[serde(default)]
    pub message: String,
}

impl Response {
    /// Returns `true` if this is a success response.
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Returns `true` if this is an error response.
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Extracts the result value, returning error if response was error.
    ///
    /// `method` is only used to label the error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Command`] if the target rejected the command.
    pub fn into_result(self, method: &str) -> Result<Value> {
        match self.error {
            None => Ok(self.result.unwrap_or(Value::Null)),
            Some(error) => Err(Error::command(method, error.code, error.message)),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifiers::ScriptId;
    use crate::protocol::DebuggerCommand;

    #[test]
    fn test_request_serialization() {
        let command = Command::Debugger(DebuggerCommand::GetScriptSource {
            script_id: ScriptId::from("42"),
        });
        let request = Request::with_id(CommandId::from(3), command);
        let json = serde_json::to_string(&request).expect("serialize");

        assert!(json.contains("\"id\":3"));
        assert!(json.contains("Debugger.getScriptSource"));
        assert!(json.contains("\"scriptId\":\"42\""));
        assert_eq!(request.method(), "Debugger.getScriptSource");
    }

    #[test]
    fn test_success_response() {
        let json_str = r#"{ "id": 3, "result": { "scriptSource": "let a = 1;" } }"#;

        let response: Response = serde_json::from_str(json_str).expect("parse");
        assert!(response.is_success());
        assert!(!response.is_error());

        let value = response.into_result("Debugger.getScriptSource").expect("ok");
        assert_eq!(value["scriptSource"], "let a = 1;");
    }

    #[test]
    fn test_error_response() {
        let json_str = r#"{
            "id": 4,
            "error": { "code": -32000, "message": "No script for id: 42" }
        }"#;

        let response: Response = serde_json::from_str(json_str).expect("parse");
        assert!(response.is_error());

        let err = response
            .into_result("Debugger.getScriptSource")
            .expect_err("should fail");
        assert!(matches!(err, Error::Command { code: -32000, .. }));
    }

    #[test]
    fn test_missing_result_is_null() {
        let response: Response = serde_json::from_str(r#"{ "id": 5 }"#).expect("parse");
        assert_eq!(response.into_result("Page.enable").expect("ok"), Value::Null);
    }
}
