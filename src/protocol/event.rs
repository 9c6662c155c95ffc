//! Event message types.
//!
//! Events are unsolicited notifications pushed by the inspected target.
//!
//! # Event Types
//!
//! | Domain | Events |
//! |--------|--------|
//! | `Network` | `requestWillBeSent`, `responseReceived`, `loadingFinished`, `loadingFailed` |
//! | `Debugger` | `scriptParsed` |
//! | `Page` | `frameNavigated` |

// ============================================================================
// Imports
// ============================================================================

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::identifiers::{RequestId, ScriptId};

use super::types::{FrameInfo, Headers, ResourceType, lenient, lenient_headers};

// ============================================================================
// Event
// ============================================================================

/// An event notification from the inspected target.
///
/// # Format
///
/// ```json
/// {
///   "method": "Domain.eventName",
///   "params": { ... }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Event name in `Domain.eventName` format.
    pub method: String,

    /// Event-specific data.
    #[serde(default)]
    pub params: Value,
}

impl Event {
    /// Creates an event from its parts.
    #[inline]
    #[must_use]
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }

    /// Returns the domain name from the method.
    #[inline]
    #[must_use]
    pub fn domain(&self) -> &str {
        self.method.split('.').next().unwrap_or_default()
    }

    /// Returns the event name from the method.
    #[inline]
    #[must_use]
    pub fn event_name(&self) -> &str {
        self.method.split('.').nth(1).unwrap_or_default()
    }

    /// Parses the event into a typed variant.
    ///
    /// Missing fields and fields of the wrong type fall back to their
    /// defaults. Scalar params yield [`ParsedEvent::Unknown`].
    #[must_use]
    pub fn parse(&self) -> ParsedEvent {
        match self.method.as_str() {
            "Network.requestWillBeSent" => self
                .payload()
                .map_or_else(|| self.unknown(), ParsedEvent::RequestWillBeSent),
            "Network.responseReceived" => self
                .payload()
                .map_or_else(|| self.unknown(), ParsedEvent::ResponseReceived),
            "Network.loadingFinished" => self
                .payload()
                .map_or_else(|| self.unknown(), ParsedEvent::LoadingFinished),
            "Network.loadingFailed" => self
                .payload()
                .map_or_else(|| self.unknown(), ParsedEvent::LoadingFailed),
            "Debugger.scriptParsed" => self
                .payload()
                .map_or_else(|| self.unknown(), ParsedEvent::ScriptParsed),
            "Page.frameNavigated" => self
                .payload()
                .map_or_else(|| self.unknown(), ParsedEvent::FrameNavigated),
            _ => self.unknown(),
        }
    }

    /// Deserializes params into a payload struct.
    fn payload<T: DeserializeOwned>(&self) -> Option<T> {
        let params = if self.params.is_null() {
            Value::Object(Default::default())
        } else {
            self.params.clone()
        };

        match serde_json::from_value(params) {
            Ok(payload) => Some(payload),
            Err(e) => {
                warn!(method = %self.method, error = %e, "Malformed event payload");
                None
            }
        }
    }

    fn unknown(&self) -> ParsedEvent {
        ParsedEvent::Unknown {
            method: self.method.clone(),
            params: self.params.clone(),
        }
    }
}

// ============================================================================
// ParsedEvent
// ============================================================================

/// Parsed event types for type-safe handling.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedEvent {
    /// `Network.requestWillBeSent`.
    RequestWillBeSent(RequestWillBeSent),
    /// `Network.responseReceived`.
    ResponseReceived(ResponseReceived),
    /// `Network.loadingFinished`.
    LoadingFinished(LoadingFinished),
    /// `Network.loadingFailed`.
    LoadingFailed(LoadingFailed),
    /// `Debugger.scriptParsed`.
    ScriptParsed(ScriptParsed),
    /// `Page.frameNavigated`.
    FrameNavigated(FrameNavigated),
    /// Unknown or malformed event.
    Unknown {
        /// Event method.
        method: String,
        /// Event params.
        params: Value,
    },
}

// ============================================================================
// Network Payloads
// ============================================================================

/// Payload of `Network.requestWillBeSent`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestWillBeSent {
    /// Request id.
    #[serde(deserialize_with = "lenient")]
    pub request_id: Option<RequestId>,
    /// Request data.
    #[serde(deserialize_with = "lenient")]
    pub request: RequestData,
    /// Declared resource type.
    #[serde(rename = "type", deserialize_with = "lenient")]
    pub resource_type: Option<ResourceType>,
    /// Monotonic timestamp in seconds.
    #[serde(deserialize_with = "lenient")]
    pub timestamp: Option<f64>,
}

/// The `request` object of `Network.requestWillBeSent`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestData {
    /// Request URL.
    #[serde(deserialize_with = "lenient")]
    pub url: String,
    /// HTTP method.
    #[serde(deserialize_with = "lenient")]
    pub method: Option<String>,
    /// Request headers.
    #[serde(deserialize_with = "lenient_headers")]
    pub headers: Headers,
    /// Request body, if any.
    #[serde(deserialize_with = "lenient")]
    pub post_data: Option<String>,
}

/// Payload of `Network.responseReceived`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResponseReceived {
    /// Request id.
    #[serde(deserialize_with = "lenient")]
    pub request_id: Option<RequestId>,
    /// Response data.
    #[serde(deserialize_with = "lenient")]
    pub response: ResponseData,
    /// Declared resource type.
    #[serde(rename = "type", deserialize_with = "lenient")]
    pub resource_type: Option<ResourceType>,
}

/// The `response` object of `Network.responseReceived`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResponseData {
    /// HTTP status code.
    #[serde(deserialize_with = "lenient")]
    pub status: Option<u16>,
    /// HTTP status text.
    #[serde(deserialize_with = "lenient")]
    pub status_text: Option<String>,
    /// Response MIME type.
    #[serde(deserialize_with = "lenient")]
    pub mime_type: Option<String>,
    /// Response headers.
    #[serde(deserialize_with = "lenient_headers")]
    pub headers: Headers,
}

/// Payload of `Network.loadingFinished`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoadingFinished {
    /// Request id.
    #[serde(deserialize_with = "lenient")]
    pub request_id: Option<RequestId>,
    /// Bytes received over the wire.
    #[serde(deserialize_with = "lenient")]
    pub encoded_data_length: Option<f64>,
    /// Monotonic timestamp in seconds.
    #[serde(deserialize_with = "lenient")]
    pub timestamp: Option<f64>,
}

/// Payload of `Network.loadingFailed`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoadingFailed {
    /// Request id.
    #[serde(deserialize_with = "lenient")]
    pub request_id: Option<RequestId>,
    /// Failure description.
    #[serde(deserialize_with = "lenient")]
    pub error_text: Option<String>,
    /// Whether the request was canceled.
    #[serde(deserialize_with = "lenient")]
    pub canceled: Option<bool>,
    /// Monotonic timestamp in seconds.
    #[serde(deserialize_with = "lenient")]
    pub timestamp: Option<f64>,
}

// ============================================================================
// Debugger / Page Payloads
// ============================================================================

/// Payload of `Debugger.scriptParsed`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScriptParsed {
    /// Script id, the fetch key for its source.
    #[serde(deserialize_with = "lenient")]
    pub script_id: Option<ScriptId>,
    /// Script URL. Empty for inline or eval'd scripts.
    #[serde(deserialize_with = "lenient")]
    pub url: Option<String>,
}

/// Payload of `Page.frameNavigated`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FrameNavigated {
    /// The navigated frame.
    #[serde(deserialize_with = "lenient")]
    pub frame: FrameInfo,
}

// ============================================================================
// Tests
// ============================================================================
