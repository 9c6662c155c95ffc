//! Network model.
//!
//! Reconstructs one [`NetworkRequest`] per request id from independently
//! arriving protocol events:
//!
//! | Event | Effect |
//! |-------|--------|
//! | `Network.requestWillBeSent` | Creates (or overwrites) the record |
//! | `Network.responseReceived` | Merges status, MIME type, headers |
//! | `Network.loadingFinished` | Merges size and end time, completes |
//! | `Network.loadingFailed` | Records the error, completes |
//!
//! Events referencing an unknown id are ignored. Response bodies are fetched
//! lazily through the [`CommandBridge`], once per record.
//!
//! # Example
//!
//! ```ignore
//! let network = NetworkModel::new(bridge, false);
//! network.handle_event(&event);
//!
//! for request in network.list() {
//!     println!("{} {} {:?}", request.method, request.name(), request.status);
//! }
//! let body = network.get_body(&request_id).await?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as Base64Standard;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::{debug, trace};
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::RequestId;
use crate::protocol::{
    Event, Headers, LoadingFailed, LoadingFinished, NetworkCommand, ParsedEvent,
    RequestWillBeSent, ResourceType, ResponseBodyResult, ResponseReceived,
};
use crate::transport::{CommandBridge, call};

use super::fetch::{Begin, ContentState, FetchSlot, wait};

// ============================================================================
// NetworkRequest
// ============================================================================

/// One reconstructed request/response exchange.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkRequest {
    /// Correlation key.
    pub id: RequestId,
    /// Request URL.
    pub url: String,
    /// HTTP method.
    pub method: String,
    /// Declared or inferred resource type.
    pub resource_type: ResourceType,
    /// Request headers.
    pub request_headers: Headers,
    /// Request body.
    pub post_data: Option<String>,
    /// Start time in protocol seconds.
    pub start_timestamp: Option<f64>,

    /// HTTP status code, once the response arrived.
    pub status: Option<u16>,
    /// HTTP status text.
    pub status_text: Option<String>,
    /// Response MIME type.
    pub mime_type: Option<String>,
    /// Response headers.
    pub response_headers: Option<Headers>,

    /// Bytes received, once loading finished.
    pub encoded_data_length: Option<u64>,
    /// End time in protocol seconds.
    pub end_timestamp: Option<f64>,
    /// Set by loading-finished or loading-failed.
    pub finished: bool,

    /// Failure text from `Network.loadingFailed`.
    pub error_text: Option<String>,
    /// Whether the failure was a cancellation.
    pub canceled: bool,
}

impl NetworkRequest {
    /// Builds a fresh record from a request-sent payload.
    fn from_sent(id: RequestId, payload: RequestWillBeSent) -> Self {
        let request = payload.request;
        Self {
            id,
            url: request.url,
            method: request.method.unwrap_or_else(|| "GET".to_string()),
            resource_type: payload.resource_type.unwrap_or_default(),
            request_headers: request.headers,
            post_data: request.post_data,
            start_timestamp: payload.timestamp,
            status: None,
            status_text: None,
            mime_type: None,
            response_headers: None,
            encoded_data_length: None,
            end_timestamp: None,
            finished: false,
            error_text: None,
            canceled: false,
        }
    }

    fn merge_response(&mut self, payload: ResponseReceived) {
        let response = payload.response;
        self.status = response.status;
        self.status_text = response.status_text;
        self.response_headers = Some(response.headers);

        if self.resource_type == ResourceType::Other {
            self.resource_type = match (payload.resource_type, response.mime_type.as_deref()) {
                (Some(declared), _) if declared != ResourceType::Other => declared,
                (_, Some(mime)) => ResourceType::from_mime(mime),
                _ => ResourceType::Other,
            };
        }
        self.mime_type = response.mime_type;
    }

    fn merge_finished(&mut self, payload: LoadingFinished) {
        self.encoded_data_length = payload.encoded_data_length.map(|len| len.max(0.0) as u64);
        self.end_timestamp = payload.timestamp;
        self.finished = true;
    }

    fn merge_failed(&mut self, payload: LoadingFailed) {
        self.error_text = Some(payload.error_text.unwrap_or_else(|| "failed".to_string()));
        self.canceled = payload.canceled.unwrap_or_default();
        if payload.timestamp.is_some() {
            self.end_timestamp = payload.timestamp;
        }
        self.finished = true;
    }
}

// ============================================================================
// NetworkRequest - Accessors
// ============================================================================

impl NetworkRequest {
    /// Display name: last path segment, else host, else the raw URL.
    #[must_use]
    pub fn name(&self) -> String {
        let Ok(url) = Url::parse(&self.url) else {
            return self.url.clone();
        };

        url.path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .map(|s| {
                urlencoding::decode(s)
                    .map(|decoded| decoded.into_owned())
                    .unwrap_or_else(|_| s.to_string())
            })
            .or_else(|| url.host_str().map(str::to_string))
            .unwrap_or_else(|| self.url.clone())
    }

    /// Time between request-sent and loading-finished.
    #[must_use]
    pub fn duration(&self) -> Option<Duration> {
        let (start, end) = (self.start_timestamp?, self.end_timestamp?);
        (end >= start).then(|| Duration::from_secs_f64(end - start))
    }

    /// Returns `true` once loading finished or failed.
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.finished
    }

    /// Returns `true` if loading failed.
    #[inline]
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.error_text.is_some()
    }

    /// Returns `true` for failures and HTTP error statuses.
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.is_failed() || self.status.is_some_and(|status| status >= 400)
    }

    /// Renders the request as a `curl` command line.
    #[must_use]
    pub fn to_curl(&self) -> String {
        let mut curl = format!("curl {}", shell_quote(&self.url));
        curl.push_str(&format!(" \\\n  -X {}", shell_quote(&self.method)));

        for (key, value) in &self.request_headers {
            curl.push_str(&format!(" \\\n  -H {}", shell_quote(&format!("{key}: {value}"))));
        }

        if let Some(data) = &self.post_data {
            curl.push_str(&format!(" \\\n  --data-raw {}", shell_quote(data)));
        }

        curl.push_str(" \\\n  --compressed");
        curl
    }
}

/// Single-quotes `s` for a POSIX shell.
fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

// ============================================================================
// ResponseBody
// ============================================================================

/// A fetched response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseBody {
    /// Body text, base64 when `base64_encoded` is set.
    pub body: String,
    /// Whether `body` is base64.
    pub base64_encoded: bool,
}

impl From<ResponseBodyResult> for ResponseBody {
    fn from(result: ResponseBodyResult) -> Self {
        Self {
            body: result.body,
            base64_encoded: result.base64_encoded,
        }
    }
}

impl ResponseBody {
    /// Returns the raw bytes, decoding base64 bodies.
    ///
    /// # Errors
    ///
    /// [`Error::Base64`] if a base64 body is malformed.
    pub fn decode(&self) -> Result<Vec<u8>> {
        if self.base64_encoded {
            Ok(Base64Standard.decode(&self.body)?)
        } else {
            Ok(self.body.clone().into_bytes())
        }
    }

    /// Returns the text of a non-base64 body.
    #[inline]
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        (!self.base64_encoded).then_some(self.body.as_str())
    }

    /// Returns the body for display, pretty-printing JSON.
    ///
    /// Bodies that are not valid JSON, or not JSON by MIME type, are
    /// returned unchanged.
    #[must_use]
    pub fn pretty(&self, mime_type: Option<&str>) -> String {
        let Some(text) = self.text() else {
            return self.body.clone();
        };
        if !mime_type.is_some_and(|mime| mime.contains("json")) {
            return text.to_string();
        }

        serde_json::from_str::<serde_json::Value>(text)
            .and_then(|value| serde_json::to_string_pretty(&value))
            .unwrap_or_else(|_| text.to_string())
    }
}

// ============================================================================
// RequestFilter
// ============================================================================

/// Resource type filter for [`NetworkModel::list_filtered`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RequestFilter {
    /// Every request.
    #[default]
    All,
    /// Requests of one type. `Fetch` also matches XHR.
    Type(ResourceType),
}

impl RequestFilter {
    /// Returns `true` if `request` passes the filter.
    #[must_use]
    pub fn matches(&self, request: &NetworkRequest) -> bool {
        match self {
            Self::All => true,
            Self::Type(ResourceType::Fetch) => matches!(
                request.resource_type,
                ResourceType::Fetch | ResourceType::Xhr
            ),
            Self::Type(kind) => request.resource_type == *kind,
        }
    }
}

// ============================================================================
// NetworkModel
// ============================================================================

/// One tracked record with its body cache.
struct Entry {
    request: NetworkRequest,
    body: FetchSlot<ResponseBody>,
    /// Distinguishes a record from a later one reusing its id.
    serial: u64,
}

#[derive(Default)]
struct NetworkState {
    /// Insertion order.
    order: Vec<RequestId>,
    entries: FxHashMap<RequestId, Entry>,
    next_serial: u64,
}

impl NetworkState {
    fn clear(&mut self) {
        self.order.clear();
        self.entries.clear();
    }
}

struct NetworkInner {
    bridge: Arc<dyn CommandBridge>,
    preserve_log: AtomicBool,
    state: Mutex<NetworkState>,
}

/// Network request table.
///
/// Cloning yields another handle to the same table.
#[derive(Clone)]
pub struct NetworkModel {
    inner: Arc<NetworkInner>,
}

impl std::fmt::Debug for NetworkModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkModel")
            .field("requests", &self.len())
            .field("preserve_log", &self.preserve_log())
            .finish_non_exhaustive()
    }
}

impl NetworkModel {
    /// Creates an empty model fetching bodies through `bridge`.
    #[must_use]
    pub fn new(bridge: Arc<dyn CommandBridge>, preserve_log: bool) -> Self {
        Self {
            inner: Arc::new(NetworkInner {
                bridge,
                preserve_log: AtomicBool::new(preserve_log),
                state: Mutex::new(NetworkState::default()),
            }),
        }
    }
}

// ============================================================================
// NetworkModel - Events
// ============================================================================

impl NetworkModel {
    /// Parses and applies one protocol event.
    ///
    /// Returns `true` if a record was created or changed.
    pub fn handle_event(&self, event: &Event) -> bool {
        self.apply(event.parse())
    }

    /// Applies one parsed event.
    ///
    /// Returns `true` if a record was created or changed. Events for other
    /// domains and events for unknown ids return `false`.
    pub fn apply(&self, event: ParsedEvent) -> bool {
        match event {
            ParsedEvent::RequestWillBeSent(payload) => self.on_request_sent(payload),
            ParsedEvent::ResponseReceived(payload) => {
                let id = payload.request_id.clone();
                self.merge(id, "responseReceived", |request| request.merge_response(payload))
            }
            ParsedEvent::LoadingFinished(payload) => {
                let id = payload.request_id.clone();
                self.merge(id, "loadingFinished", |request| request.merge_finished(payload))
            }
            ParsedEvent::LoadingFailed(payload) => {
                let id = payload.request_id.clone();
                self.merge(id, "loadingFailed", |request| request.merge_failed(payload))
            }
            _ => false,
        }
    }

    fn on_request_sent(&self, mut payload: RequestWillBeSent) -> bool {
        let Some(id) = payload.request_id.take() else {
            debug!("requestWillBeSent without requestId ignored");
            return false;
        };

        let mut state = self.inner.state.lock();
        let serial = state.next_serial;
        state.next_serial += 1;

        let entry = Entry {
            request: NetworkRequest::from_sent(id.clone(), payload),
            body: FetchSlot::default(),
            serial,
        };

        if state.entries.insert(id.clone(), entry).is_some() {
            debug!(request_id = %id, "Request id reused, record overwritten");
        } else {
            trace!(request_id = %id, "Request recorded");
            state.order.push(id);
        }
        true
    }

    fn merge<F>(&self, id: Option<RequestId>, kind: &'static str, update: F) -> bool
    where
        F: FnOnce(&mut NetworkRequest),
    {
        let Some(id) = id else {
            debug!(kind, "Network event without requestId ignored");
            return false;
        };

        let mut state = self.inner.state.lock();
        match state.entries.get_mut(&id) {
            Some(entry) => {
                update(&mut entry.request);
                trace!(request_id = %id, kind, "Request updated");
                true
            }
            None => {
                debug!(request_id = %id, kind, "Event for unknown request ignored");
                false
            }
        }
    }

    /// Handles a top-frame navigation.
    ///
    /// Clears the table unless the log is preserved.
    pub fn handle_navigation(&self) {
        if self.preserve_log() {
            trace!("Navigation with preserved log");
            return;
        }
        self.clear();
    }

    /// Drops every record.
    ///
    /// In-flight body fetches resolve with [`Error::Superseded`].
    pub fn clear(&self) {
        let mut state = self.inner.state.lock();
        let count = state.order.len();
        state.clear();
        debug!(count, "Network log cleared");
    }

    /// Returns whether records survive navigation.
    #[inline]
    #[must_use]
    pub fn preserve_log(&self) -> bool {
        self.inner.preserve_log.load(Ordering::Relaxed)
    }

    /// Sets whether records survive navigation.
    #[inline]
    pub fn set_preserve_log(&self, preserve: bool) {
        self.inner.preserve_log.store(preserve, Ordering::Relaxed);
    }
}

// ============================================================================
// NetworkModel - Queries
// ============================================================================

impl NetworkModel {
    /// Snapshot of every record in creation order.
    #[must_use]
    pub fn list(&self) -> Vec<NetworkRequest> {
        self.list_filtered(RequestFilter::All)
    }

    /// Snapshot of the records passing `filter`, in creation order.
    #[must_use]
    pub fn list_filtered(&self, filter: RequestFilter) -> Vec<NetworkRequest> {
        let state = self.inner.state.lock();
        state
            .order
            .iter()
            .filter_map(|id| state.entries.get(id))
            .map(|entry| &entry.request)
            .filter(|request| filter.matches(request))
            .cloned()
            .collect()
    }

    /// Snapshot of one record.
    #[must_use]
    pub fn get(&self, id: &RequestId) -> Option<NetworkRequest> {
        self.inner
            .state
            .lock()
            .entries
            .get(id)
            .map(|entry| entry.request.clone())
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.state.lock().order.len()
    }

    /// Returns `true` if there are no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// State of the body cache of one record.
    #[must_use]
    pub fn body_state(&self, id: &RequestId) -> Option<ContentState> {
        self.inner
            .state
            .lock()
            .entries
            .get(id)
            .map(|entry| entry.body.state())
    }
}

// ============================================================================
// NetworkModel - Bodies
// ============================================================================

impl NetworkModel {
    /// Returns the response body of a record.
    ///
    /// The first call issues `Network.getResponseBody`; calls made while it
    /// is in flight share its outcome; a successful result is cached. After
    /// a failure the next call fetches again.
    ///
    /// # Errors
    ///
    /// - [`Error::RequestNotFound`] for an unknown id (no bridge call)
    /// - [`Error::FetchFailed`] if the bridge call failed
    /// - [`Error::Superseded`] if the record was cleared or replaced meanwhile
    pub async fn get_body(&self, id: &RequestId) -> Result<ResponseBody> {
        let (begin, serial) = {
            let mut state = self.inner.state.lock();
            let entry = state
                .entries
                .get_mut(id)
                .ok_or_else(|| Error::request_not_found(id.clone()))?;
            (entry.body.begin(), entry.serial)
        };

        match begin {
            Begin::Ready(body) => Ok(body),
            Begin::Join(rx) => {
                trace!(request_id = %id, "Joining in-flight body fetch");
                wait(rx, id.as_str()).await
            }
            Begin::Start(rx) => {
                self.spawn_body_fetch(id.clone(), serial);
                wait(rx, id.as_str()).await
            }
        }
    }

    /// Issues the bridge call and settles the record's slot.
    fn spawn_body_fetch(&self, id: RequestId, serial: u64) {
        debug!(request_id = %id, "Fetching response body");
        let inner = Arc::clone(&self.inner);

        tokio::spawn(async move {
            let command = NetworkCommand::GetResponseBody {
                request_id: id.clone(),
            };
            let result = call::<ResponseBodyResult>(inner.bridge.as_ref(), command.into())
                .await
                .map(ResponseBody::from);

            if let Err(e) = &result {
                debug!(request_id = %id, error = %e, "Response body fetch failed");
            }

            let mut state = inner.state.lock();
            match state.entries.get_mut(&id) {
                Some(entry) if entry.serial == serial => entry.body.complete(id.as_str(), result),
                _ => debug!(request_id = %id, "Stale body fetch discarded"),
            }
        });
    }
}

// ============================================================================
// Tests
// ============================================================================
