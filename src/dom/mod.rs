//! Host document access
//!
//! Everything the overlay does to the page goes through [`HostDocument`]. The
//! page owns its elements; the overlay only holds [`NodeId`] lookups into it.

mod memory;

pub use memory::{Delivery, MemoryDocument};

use std::fmt;

use serde::{Deserialize, Serialize};

/// Handle to an element in a [`HostDocument`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A synthesized DOM event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticEvent {
    pub kind: String,
    pub bubbles: bool,
}

impl SyntheticEvent {
    pub fn bubbling(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            bubbles: true,
        }
    }
}

pub type DomResult<T> = std::result::Result<T, DomError>;

/// Errors raised while inspecting or mutating the host document
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    #[error("node {0} is not attached to the document")]
    Detached(NodeId),

    #[error("cannot append {child} to {parent}")]
    HierarchyRequest { parent: NodeId, child: NodeId },
}

/// The slice of the DOM the overlay needs.
pub trait HostDocument {
    /// The `<body>` element
    fn body(&self) -> NodeId;

    fn create_element(&mut self, tag: &str) -> NodeId;

    /// Append `child` to `parent`, detaching it from any previous parent
    fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()>;

    /// Detach `node` from its parent. Removing a detached node is a no-op.
    fn remove(&mut self, node: NodeId) -> DomResult<()>;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    fn children(&self, node: NodeId) -> DomResult<Vec<NodeId>>;

    /// Whether `node` is reachable from the body
    fn is_attached(&self, node: NodeId) -> bool;

    fn attribute(&self, node: NodeId, name: &str) -> DomResult<Option<String>>;

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> DomResult<()>;

    fn remove_attribute(&mut self, node: NodeId, name: &str) -> DomResult<()>;

    fn set_style(&mut self, node: NodeId, property: &str, value: &str) -> DomResult<()>;

    /// Replace the node's children with a single text run
    fn set_text(&mut self, node: NodeId, text: &str) -> DomResult<()>;

    /// Replace the node's children with parsed markup, like `innerHTML`
    fn set_inner_html(&mut self, node: NodeId, html: &str) -> DomResult<()>;

    /// Deliver `event` to `node`, then to each ancestor if it bubbles
    fn dispatch_event(&mut self, node: NodeId, event: &SyntheticEvent) -> DomResult<()>;

    fn has_class(&self, node: NodeId, class: &str) -> DomResult<bool> {
        Ok(self
            .attribute(node, "class")?
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class)))
    }

    /// Whether `node` is `ancestor` or one of its descendants
    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }
}
