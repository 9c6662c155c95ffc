//! Path-segmented source tree.
//!
//! Nodes live in an arena indexed by [`NodeId`]. The synthetic root has one
//! domain node per host; below it every URL path segment is a directory and
//! the last segment (plus the query string) is the file leaf.
//!
//! ```text
//! (root)
//! └── x                      Domain
//!     ├── js                 Directory
//!     │   └── app.js         File
//!     └── (index)?v=2        File (empty path)
//! ```
//!
//! Host-less URLs (`file:///home/u/app.js`) hang under a `file://` domain.
//! Inserting the same URL twice reuses the existing leaf.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use rustc_hash::FxHashMap;
use tracing::trace;
use url::Url;

use crate::identifiers::{FrameId, NodeId, ScriptId};
use crate::protocol::ResourceType;

use super::fetch::{ContentState, FetchSlot};

/// URL schemes never shown in the tree.
const EXCLUDED_SCHEMES: &[&str] = &["chrome-extension", "devtools", "data"];

/// Leaf name for a URL with an empty path.
const INDEX_NAME: &str = "(index)";

// ============================================================================
// Node Types
// ============================================================================

/// Structural kind of a tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// The synthetic root.
    Root,
    /// One host.
    Domain,
    /// A path segment with children.
    Directory,
    /// A leaf resource.
    File,
}

impl NodeKind {
    /// Returns `true` for nodes that hold children.
    #[inline]
    #[must_use]
    pub const fn is_container(&self) -> bool {
        !matches!(self, Self::File)
    }
}

/// Content kind of a file leaf.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// JavaScript.
    Script,
    /// CSS.
    Stylesheet,
    /// Anything else.
    #[default]
    Other,
}

impl SourceKind {
    /// Classifies a leaf from its declared type, then MIME type, then the
    /// extension of its URL path.
    #[must_use]
    pub fn classify(declared: Option<ResourceType>, mime_type: Option<&str>, path: &str) -> Self {
        let from_type = |kind: ResourceType| match kind {
            ResourceType::Script => Some(Self::Script),
            ResourceType::Stylesheet => Some(Self::Stylesheet),
            _ => None,
        };

        declared
            .and_then(from_type)
            .or_else(|| mime_type.map(ResourceType::from_mime).and_then(from_type))
            .or_else(|| Self::from_extension(path))
            .unwrap_or_default()
    }

    fn from_extension(path: &str) -> Option<Self> {
        let (_, extension) = path.rsplit_once('.')?;
        match extension.to_ascii_lowercase().as_str() {
            "js" | "mjs" | "cjs" => Some(Self::Script),
            "css" => Some(Self::Stylesheet),
            _ => None,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Script => "script",
            Self::Stylesheet => "stylesheet",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}

/// Where a file's content is fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContentOrigin {
    /// `Debugger.getScriptSource`.
    Script(ScriptId),
    /// `Page.getResourceContent`.
    Resource(FrameId),
}

impl ContentOrigin {
    #[inline]
    const fn is_script(&self) -> bool {
        matches!(self, Self::Script(_))
    }
}

/// File data of a leaf.
#[derive(Debug)]
pub struct SourceFile {
    /// Full resource URL.
    pub url: String,
    /// Content kind.
    pub kind: SourceKind,
    /// Fetch key.
    pub origin: ContentOrigin,
    pub(crate) content: FetchSlot<String>,
    /// Tree-unique stamp, renewed whenever the content slot is reset.
    pub(crate) generation: u64,
}

impl SourceFile {
    /// State of the content cache.
    #[inline]
    #[must_use]
    pub fn content_state(&self) -> ContentState {
        self.content.state()
    }

    /// Cached content, once loaded.
    #[inline]
    #[must_use]
    pub fn cached_content(&self) -> Option<&str> {
        self.content.cached().map(String::as_str)
    }

    /// Message of the last failed fetch, while failed.
    #[inline]
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.content.failure()
    }
}

/// One tree node.
#[derive(Debug)]
pub struct SourceNode {
    /// Display name.
    pub name: String,
    /// Structural kind.
    pub kind: NodeKind,
    /// Host-relative path, e.g. `x/js/app.js`.
    pub path: String,
    /// Parent node. `None` for the root.
    pub parent: Option<NodeId>,
    /// Children in insertion order.
    pub children: Vec<NodeId>,
    /// File data. `Some` only for [`NodeKind::File`].
    pub file: Option<SourceFile>,
}

impl SourceNode {
    fn container(name: &str, kind: NodeKind, path: String, parent: Option<NodeId>) -> Self {
        Self {
            name: name.to_string(),
            kind,
            path,
            parent,
            children: Vec::new(),
            file: None,
        }
    }
}

// ============================================================================
// SourceTree
// ============================================================================

/// Arena-backed source tree.
#[derive(Debug)]
pub struct SourceTree {
    nodes: Vec<SourceNode>,
    /// `(parent, name, is_file)` to child.
    index: FxHashMap<(NodeId, String, bool), NodeId>,
    by_url: FxHashMap<String, NodeId>,
    next_generation: u64,
}

impl Default for SourceTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceTree {
    /// Creates a tree holding only the root.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![SourceNode::container("root", NodeKind::Root, String::new(), None)],
            index: FxHashMap::default(),
            by_url: FxHashMap::default(),
            next_generation: 0,
        }
    }

    /// Returns a node.
    #[inline]
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&SourceNode> {
        self.nodes.get(id.index())
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut SourceNode> {
        self.nodes.get_mut(id.index())
    }

    /// Number of nodes, root included.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the tree holds only the root.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Returns the leaf holding `url`.
    #[must_use]
    pub fn find_by_url(&self, url: &str) -> Option<NodeId> {
        self.by_url.get(url).copied()
    }

    /// Finds a direct child by name.
    #[must_use]
    pub fn child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        let key = |is_file| (parent, name.to_string(), is_file);
        self.index
            .get(&key(false))
            .or_else(|| self.index.get(&key(true)))
            .copied()
    }

    /// Resolves a chain of names from the root.
    #[must_use]
    pub fn resolve(&self, names: &[&str]) -> Option<NodeId> {
        names
            .iter()
            .try_fold(NodeId::ROOT, |node, name| self.child(node, name))
    }

    /// Children of `id` with containers first, otherwise in insertion order.
    #[must_use]
    pub fn sorted_children(&self, id: NodeId) -> Vec<NodeId> {
        let Some(node) = self.node(id) else {
            return Vec::new();
        };

        let mut children = node.children.clone();
        children.sort_by_key(|child| {
            self.node(*child)
                .is_none_or(|n| !n.kind.is_container())
        });
        children
    }

    /// Number of file leaves.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.file.is_some()).count()
    }
}

// ============================================================================
// SourceTree - Insertion
// ============================================================================

impl SourceTree {
    /// Inserts or merges the leaf for `url`.
    ///
    /// Returns `None` for URLs that are unparsable, opaque (`about:blank`)
    /// or use an excluded scheme. Hierarchical URLs without a host, such as
    /// `file:///`, are grouped under a `scheme://` domain. An existing leaf keeps a script origin when merged
    /// with a resource origin; a new script id resets its cached content.
    pub fn insert(&mut self, url: &str, kind: SourceKind, origin: ContentOrigin) -> Option<NodeId> {
        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(e) => {
                trace!(url, error = %e, "Unparsable source URL skipped");
                return None;
            }
        };
        if EXCLUDED_SCHEMES.contains(&parsed.scheme()) {
            return None;
        }
        let host = match parsed.host_str() {
            Some(host) => host.to_string(),
            None if !parsed.cannot_be_a_base() => format!("{}://", parsed.scheme()),
            None => {
                trace!(url, "Host-less source URL skipped");
                return None;
            }
        };

        let segments: Vec<&str> = parsed
            .path_segments()
            .map(|segments| segments.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();
        let query = parsed.query().map(|q| format!("?{q}")).unwrap_or_default();

        let (dirs, leaf) = match segments.split_last() {
            Some((last, dirs)) => (dirs, format!("{last}{query}")),
            None => (&[][..], format!("{INDEX_NAME}{query}")),
        };

        let mut current = self.container(NodeId::ROOT, &host, NodeKind::Domain);
        for dir in dirs {
            current = self.container(current, dir, NodeKind::Directory);
        }

        let id = self.file(current, &leaf, url, kind, origin);
        self.by_url.insert(url.to_string(), id);
        Some(id)
    }

    /// Returns the container child `name` of `parent`, creating it.
    fn container(&mut self, parent: NodeId, name: &str, kind: NodeKind) -> NodeId {
        let key = (parent, name.to_string(), false);
        if let Some(id) = self.index.get(&key) {
            return *id;
        }

        let path = self.child_path(parent, name);
        let id = self.push(parent, SourceNode::container(name, kind, path, Some(parent)));
        self.index.insert(key, id);
        id
    }

    /// Returns the file child `name` of `parent`, creating or merging it.
    fn file(
        &mut self,
        parent: NodeId,
        name: &str,
        url: &str,
        kind: SourceKind,
        origin: ContentOrigin,
    ) -> NodeId {
        let key = (parent, name.to_string(), true);

        if let Some(id) = self.index.get(&key).copied() {
            let generation = self.next_generation;
            let reset = self
                .node_mut(id)
                .and_then(|n| n.file.as_mut())
                .is_some_and(|file| merge_file(file, url, kind, origin, generation));
            if reset {
                self.next_generation += 1;
            }
            return id;
        }

        let file = SourceFile {
            url: url.to_string(),
            kind,
            origin,
            content: FetchSlot::default(),
            generation: self.next_generation,
        };
        self.next_generation += 1;

        let path = self.child_path(parent, name);
        let mut node = SourceNode::container(name, NodeKind::File, path, Some(parent));
        node.file = Some(file);

        let id = self.push(parent, node);
        self.index.insert(key, id);
        trace!(url, node = %id, "Source file added");
        id
    }

    fn push(&mut self, parent: NodeId, node: SourceNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        if let Some(parent) = self.node_mut(parent) {
            parent.children.push(id);
        }
        id
    }

    fn child_path(&self, parent: NodeId, name: &str) -> String {
        match self.node(parent) {
            Some(node) if !node.path.is_empty() => format!("{}/{name}", node.path),
            _ => name.to_string(),
        }
    }
}

/// Merges a repeated insertion into an existing leaf.
///
/// Returns `true` if the content slot was reset and took `generation`.
fn merge_file(
    file: &mut SourceFile,
    url: &str,
    kind: SourceKind,
    origin: ContentOrigin,
    generation: u64,
) -> bool {
    if file.origin.is_script() && !origin.is_script() {
        return false;
    }

    let reset = file.origin.is_script() && file.origin != origin;
    file.url = url.to_string();
    if kind != SourceKind::Other {
        file.kind = kind;
    }
    file.origin = origin;

    if reset {
        file.content = FetchSlot::default();
        file.generation = generation;
    }
    reset
}

// ============================================================================
// Tests
// ============================================================================
