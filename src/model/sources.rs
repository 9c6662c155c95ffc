//! Sources model.
//!
//! Builds the [`SourceTree`] from `Debugger.scriptParsed` notifications and
//! the page resource tree, and fetches file content on demand.
//!
//! | Origin | Fetch command |
//! |--------|---------------|
//! | [`ContentOrigin::Script`] | `Debugger.getScriptSource` |
//! | [`ContentOrigin::Resource`] | `Page.getResourceContent` |

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as Base64Standard;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::identifiers::NodeId;
use crate::protocol::{
    Command, DebuggerCommand, Event, PageCommand, ParsedEvent, ResourceContentResult,
    ResourceTreeResult, ScriptParsed, ScriptSourceResult,
};
use crate::transport::{CommandBridge, call};

use super::fetch::{Begin, ContentState, wait};
use super::tree::{ContentOrigin, NodeKind, SourceKind, SourceTree};

// ============================================================================
// SourceEntry
// ============================================================================

/// Owned snapshot of a tree node and its descendants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    /// Node id, usable with [`SourcesModel::get_content`].
    pub id: NodeId,
    /// Display name.
    pub name: String,
    /// Structural kind.
    pub kind: NodeKind,
    /// Resource URL, for files.
    pub url: Option<String>,
    /// Content kind, for files.
    pub source_kind: Option<SourceKind>,
    /// Content cache state, for files.
    pub content_state: Option<ContentState>,
    /// Children, containers first.
    pub children: Vec<SourceEntry>,
}

impl SourceEntry {
    fn build(tree: &SourceTree, id: NodeId) -> Option<Self> {
        let node = tree.node(id)?;
        let file = node.file.as_ref();

        Some(Self {
            id,
            name: node.name.clone(),
            kind: node.kind,
            url: file.map(|f| f.url.clone()),
            source_kind: file.map(|f| f.kind),
            content_state: file.map(|f| f.content_state()),
            children: tree
                .sorted_children(id)
                .into_iter()
                .filter_map(|child| Self::build(tree, child))
                .collect(),
        })
    }

    /// Finds a direct child by name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&SourceEntry> {
        self.children.iter().find(|c| c.name == name)
    }
}

// ============================================================================
// SourcesModel
// ============================================================================

struct SourcesInner {
    bridge: Arc<dyn CommandBridge>,
    tree: Mutex<SourceTree>,
}

/// Source file tree with lazily fetched content.
///
/// Cloning yields another handle to the same tree.
#[derive(Clone)]
pub struct SourcesModel {
    inner: Arc<SourcesInner>,
}

impl std::fmt::Debug for SourcesModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourcesModel")
            .field("nodes", &self.len())
            .finish_non_exhaustive()
    }
}

impl SourcesModel {
    /// Creates an empty model fetching content through `bridge`.
    #[must_use]
    pub fn new(bridge: Arc<dyn CommandBridge>) -> Self {
        Self {
            inner: Arc::new(SourcesInner {
                bridge,
                tree: Mutex::new(SourceTree::new()),
            }),
        }
    }

    /// Parses one protocol event and applies it if it is `scriptParsed`.
    ///
    /// Returns `true` if the tree was touched.
    pub fn handle_event(&self, event: &Event) -> bool {
        match event.parse() {
            ParsedEvent::ScriptParsed(payload) => self.handle_script_parsed(&payload).is_some(),
            _ => false,
        }
    }

    /// Adds or merges the script leaf for a parsed script.
    ///
    /// Scripts without a URL or id (inline, eval'd) are ignored.
    pub fn handle_script_parsed(&self, payload: &ScriptParsed) -> Option<NodeId> {
        let url = payload.url.as_deref().filter(|url| !url.is_empty())?;
        let script_id = payload.script_id.clone()?;

        let id = self
            .inner
            .tree
            .lock()
            .insert(url, SourceKind::Script, ContentOrigin::Script(script_id));
        if let Some(id) = id {
            trace!(url, node = %id, "Script added");
        }
        id
    }

    /// Merges every resource of the page frame tree.
    ///
    /// Child frames are walked recursively. Script leaves already known
    /// from `scriptParsed` keep fetching through the debugger. Repeating the
    /// call leaves the tree shape unchanged.
    ///
    /// Returns the number of resources merged.
    ///
    /// # Errors
    ///
    /// Bridge failure of `Page.getResourceTree`. The tree is left untouched.
    pub async fn load_resources(&self) -> Result<usize> {
        let result: ResourceTreeResult =
            call(self.inner.bridge.as_ref(), PageCommand::GetResourceTree.into()).await?;

        let mut merged = 0;
        let mut tree = self.inner.tree.lock();
        result.frame_tree.for_each_resource(&mut |frame, resource| {
            let Some(frame_id) = frame.id.clone() else {
                trace!(url = %resource.url, "Resource of frame without id skipped");
                return;
            };
            let kind = SourceKind::classify(
                Some(resource.resource_type),
                resource.mime_type.as_deref(),
                &resource.url,
            );
            if tree
                .insert(&resource.url, kind, ContentOrigin::Resource(frame_id))
                .is_some()
            {
                merged += 1;
            }
        });

        debug!(merged, nodes = tree.len(), "Page resources loaded");
        Ok(merged)
    }
}

// ============================================================================
// SourcesModel - Queries
// ============================================================================

impl SourcesModel {
    /// Owned snapshot of the whole tree.
    #[must_use]
    pub fn tree(&self) -> SourceEntry {
        let tree = self.inner.tree.lock();
        SourceEntry::build(&tree, NodeId::ROOT).unwrap_or_else(|| SourceEntry {
            id: NodeId::ROOT,
            name: "root".to_string(),
            kind: NodeKind::Root,
            url: None,
            source_kind: None,
            content_state: None,
            children: Vec::new(),
        })
    }

    /// Runs `f` with read access to the tree.
    pub fn with_tree<R>(&self, f: impl FnOnce(&SourceTree) -> R) -> R {
        f(&self.inner.tree.lock())
    }

    /// Returns the leaf holding `url`.
    #[must_use]
    pub fn find_by_url(&self, url: &str) -> Option<NodeId> {
        self.inner.tree.lock().find_by_url(url)
    }

    /// Snapshot of one node and its descendants.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<SourceEntry> {
        SourceEntry::build(&self.inner.tree.lock(), id)
    }

    /// Number of nodes, root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.tree.lock().len()
    }

    /// Returns `true` if the tree holds only the root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.tree.lock().is_empty()
    }

    /// Content cache state of a file leaf.
    #[must_use]
    pub fn content_state(&self, id: NodeId) -> Option<ContentState> {
        self.inner
            .tree
            .lock()
            .node(id)
            .and_then(|n| n.file.as_ref())
            .map(|f| f.content_state())
    }
}

// ============================================================================
// SourcesModel - Content
// ============================================================================

/// What a spawned content fetch needs.
struct FetchTicket {
    node: NodeId,
    url: String,
    origin: ContentOrigin,
    generation: u64,
}

impl SourcesModel {
    /// Returns the content of a file leaf.
    ///
    /// Loaded content is returned without a bridge call. Otherwise one fetch
    /// runs for all concurrent callers; a failure is reported to them and
    /// the next call retries.
    ///
    /// # Errors
    ///
    /// - [`Error::NodeNotFound`] for an id not in the tree
    /// - [`Error::NotAFile`] for the root, a domain or a directory
    /// - [`Error::FetchFailed`] if the bridge call failed
    /// - [`Error::Superseded`] if the leaf was re-bound to a new script
    pub async fn get_content(&self, id: NodeId) -> Result<String> {
        let (begin, ticket) = {
            let mut tree = self.inner.tree.lock();
            let node = tree.node_mut(id).ok_or_else(|| Error::node_not_found(id))?;
            let file = node.file.as_mut().ok_or_else(|| Error::not_a_file(id))?;

            let ticket = FetchTicket {
                node: id,
                url: file.url.clone(),
                origin: file.origin.clone(),
                generation: file.generation,
            };
            (file.content.begin(), ticket)
        };
        let url = ticket.url.clone();

        match begin {
            Begin::Ready(content) => Ok(content),
            Begin::Join(rx) => {
                trace!(url = %url, "Joining in-flight content fetch");
                wait(rx, &url).await
            }
            Begin::Start(rx) => {
                self.spawn_content_fetch(ticket);
                wait(rx, &url).await
            }
        }
    }

    fn spawn_content_fetch(&self, ticket: FetchTicket) {
        debug!(url = %ticket.url, node = %ticket.node, "Fetching source content");
        let inner = Arc::clone(&self.inner);

        tokio::spawn(async move {
            let result = fetch_content(inner.bridge.as_ref(), &ticket).await;
            if let Err(e) = &result {
                debug!(url = %ticket.url, error = %e, "Source content fetch failed");
            }

            let mut tree = inner.tree.lock();
            match tree.node_mut(ticket.node).and_then(|n| n.file.as_mut()) {
                Some(file) if file.generation == ticket.generation => {
                    file.content.complete(&ticket.url, result);
                }
                _ => debug!(url = %ticket.url, "Stale content fetch discarded"),
            }
        });
    }
}

/// Issues the fetch command for one leaf and decodes the content.
async fn fetch_content(bridge: &dyn CommandBridge, ticket: &FetchTicket) -> Result<String> {
    match &ticket.origin {
        ContentOrigin::Script(script_id) => {
            let command: Command = DebuggerCommand::GetScriptSource {
                script_id: script_id.clone(),
            }
            .into();
            let result: ScriptSourceResult = call(bridge, command).await?;
            Ok(result.script_source)
        }
        ContentOrigin::Resource(frame_id) => {
            let command: Command = PageCommand::GetResourceContent {
                frame_id: frame_id.clone(),
                url: ticket.url.clone(),
            }
            .into();
            let result: ResourceContentResult = call(bridge, command).await?;
            if result.base64_encoded {
                let bytes = Base64Standard.decode(result.content)?;
                Ok(String::from_utf8_lossy(&bytes).into_owned())
            } else {
                Ok(result.content)
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
