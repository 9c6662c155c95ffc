//! Shared payload types.
//!
//! Resource classification, header maps and the result shapes of the
//! commands the panel issues.

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::identifiers::FrameId;

// ============================================================================
// Headers
// ============================================================================

/// HTTP headers as reported by the protocol.
pub type Headers = BTreeMap<String, String>;

/// Deserializes a header object, stringifying non-string values.
///
/// A missing or non-object value yields an empty map.
pub(crate) fn lenient_headers<'de, D>(deserializer: D) -> Result<Headers, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let Some(Value::Object(map)) = value else {
        return Ok(Headers::new());
    };

    Ok(map
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            (key, value)
        })
        .collect())
}

// ============================================================================
// Lenient Fields
// ============================================================================

/// Deserializes one field, falling back to its default on a type mismatch.
///
/// Keeps a single bad field from discarding the rest of its payload.
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_else(|e| {
        debug!(error = %e, "Malformed field replaced by default");
        T::default()
    }))
}

/// Deserializes a list, skipping entries that fail to parse.
///
/// A missing or non-array value yields an empty list.
pub(crate) fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let Value::Array(entries) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };

    Ok(entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value(entry) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!(error = %e, "Malformed list entry skipped");
                None
            }
        })
        .collect())
}

// ============================================================================
// ResourceType
// ============================================================================

/// Resource type declared by the inspected page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceType {
    /// Top-level or frame document.
    Document,
    /// CSS stylesheet.
    Stylesheet,
    /// Image.
    Image,
    /// Audio or video.
    Media,
    /// Web font.
    Font,
    /// JavaScript.
    Script,
    /// `XMLHttpRequest`.
    #[serde(rename = "XHR")]
    Xhr,
    /// `fetch()` request.
    Fetch,
    /// WebSocket handshake.
    WebSocket,
    /// Web app manifest.
    Manifest,
    /// Anything else.
    #[default]
    #[serde(other)]
    Other,
}

impl ResourceType {
    /// Classifies a MIME type.
    ///
    /// Used when a request was declared as [`ResourceType::Other`].
    #[must_use]
    pub fn from_mime(mime: &str) -> Self {
        let mime = mime.to_ascii_lowercase();
        if mime.contains("javascript") || mime.contains("ecmascript") {
            Self::Script
        } else if mime.contains("html") {
            Self::Document
        } else if mime.contains("css") {
            Self::Stylesheet
        } else if mime.starts_with("image/") || mime.contains("image") {
            Self::Image
        } else if mime.contains("json") || mime.contains("xml") {
            Self::Fetch
        } else if mime.starts_with("font/") {
            Self::Font
        } else if mime.starts_with("audio/") || mime.starts_with("video/") {
            Self::Media
        } else {
            Self::Other
        }
    }

    /// Protocol name of this type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Document => "Document",
            Self::Stylesheet => "Stylesheet",
            Self::Image => "Image",
            Self::Media => "Media",
            Self::Font => "Font",
            Self::Script => "Script",
            Self::Xhr => "XHR",
            Self::Fetch => "Fetch",
            Self::WebSocket => "WebSocket",
            Self::Manifest => "Manifest",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Page.getResourceTree
// ============================================================================

/// Result of `Page.getResourceTree`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceTreeResult {
    /// Root of the frame tree.
    #[serde(deserialize_with = "lenient")]
    pub frame_tree: FrameResourceTree,
}

/// One frame with its subresources and child frames.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FrameResourceTree {
    /// Frame information.
    #[serde(deserialize_with = "lenient")]
    pub frame: FrameInfo,
    /// Subresources loaded by this frame.
    #[serde(deserialize_with = "lenient_list")]
    pub resources: Vec<FrameResource>,
    /// Nested frames.
    #[serde(deserialize_with = "lenient_list")]
    pub child_frames: Vec<FrameResourceTree>,
}

impl FrameResourceTree {
    /// Visits every `(frame, resource)` pair depth-first.
    pub fn for_each_resource<F>(&self, visit: &mut F)
    where
        F: FnMut(&FrameInfo, &FrameResource),
    {
        for resource in &self.resources {
            visit(&self.frame, resource);
        }
        for child in &self.child_frames {
            child.for_each_resource(visit);
        }
    }
}

/// Frame descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FrameInfo {
    /// Frame id.
    #[serde(deserialize_with = "lenient")]
    pub id: Option<FrameId>,
    /// Parent frame id. `None` for the top frame.
    #[serde(deserialize_with = "lenient")]
    pub parent_id: Option<FrameId>,
    /// Frame document URL.
    #[serde(deserialize_with = "lenient")]
    pub url: String,
    /// Security origin.
    #[serde(deserialize_with = "lenient")]
    pub security_origin: Option<String>,
}

impl FrameInfo {
    /// Returns `true` for the top-level frame.
    #[inline]
    #[must_use]
    pub fn is_top(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// A frame subresource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FrameResource {
    /// Resource URL.
    #[serde(deserialize_with = "lenient")]
    pub url: String,
    /// Declared type.
    #[serde(rename = "type", deserialize_with = "lenient")]
    pub resource_type: ResourceType,
    /// MIME type.
    #[serde(deserialize_with = "lenient")]
    pub mime_type: Option<String>,
}

// ============================================================================
// Content Results
// ============================================================================

/// Result of `Network.getResponseBody`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResponseBodyResult {
    /// Body text, base64 when `base64_encoded` is set.
    pub body: String,
    /// Whether `body` is base64.
    pub base64_encoded: bool,
}

/// Result of `Debugger.getScriptSource`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScriptSourceResult {
    /// Script text.
    pub script_source: String,
}

/// Result of `Page.getResourceContent`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceContentResult {
    /// Resource content, base64 when `base64_encoded` is set.
    pub content: String,
    /// Whether `content` is base64.
    pub base64_encoded: bool,
}

// ============================================================================
// Tests
// ============================================================================
