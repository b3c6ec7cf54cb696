//! Arena-backed in-memory document

use std::collections::BTreeMap;
use std::fmt::Write as _;

use super::{DomError, DomResult, HostDocument, NodeId, SyntheticEvent};

/// One observation of a dispatched event by a node on its propagation path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub kind: String,
    pub target: NodeId,
    pub current: NodeId,
}

#[derive(Debug, Clone)]
struct NodeData {
    tag: String,
    attributes: BTreeMap<String, String>,
    styles: BTreeMap<String, String>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
    text: Option<String>,
    inner_html: Option<String>,
}

impl NodeData {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            attributes: BTreeMap::new(),
            styles: BTreeMap::new(),
            children: Vec::new(),
            parent: None,
            text: None,
            inner_html: None,
        }
    }
}

/// A [`HostDocument`] kept entirely in memory.
///
/// Nodes are never freed; a removed node keeps its id and can be re-attached.
/// Every event delivery is recorded so callers can see what the page's own
/// listeners would have observed.
#[derive(Debug, Clone)]
pub struct MemoryDocument {
    nodes: Vec<NodeData>,
    body: NodeId,
    deliveries: Vec<Delivery>,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData::new("body")],
            body: NodeId(0),
            deliveries: Vec::new(),
        }
    }

    fn node(&self, id: NodeId) -> DomResult<&NodeData> {
        self.nodes.get(id.0).ok_or(DomError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> DomResult<&mut NodeData> {
        self.nodes.get_mut(id.0).ok_or(DomError::UnknownNode(id))
    }

    fn detach_children(&mut self, id: NodeId) -> DomResult<()> {
        let children = std::mem::take(&mut self.node_mut(id)?.children);
        for child in children {
            self.node_mut(child)?.parent = None;
        }
        Ok(())
    }

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(node.0).map(|n| n.tag.as_str())
    }

    pub fn style(&self, node: NodeId, property: &str) -> Option<&str> {
        self.nodes
            .get(node.0)
            .and_then(|n| n.styles.get(property))
            .map(String::as_str)
    }

    pub fn text(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(node.0).and_then(|n| n.text.as_deref())
    }

    pub fn inner_html(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(node.0).and_then(|n| n.inner_html.as_deref())
    }

    /// All attached elements carrying `id`, in document order
    pub fn elements_by_id(&self, id: &str) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut stack = vec![self.body];
        while let Some(node) = stack.pop() {
            let Some(data) = self.nodes.get(node.0) else {
                continue;
            };
            if data.attributes.get("id").map(String::as_str) == Some(id) {
                found.push(node);
            }
            stack.extend(data.children.iter().rev().copied());
        }
        found
    }

    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.elements_by_id(id).into_iter().next()
    }

    pub fn deliveries(&self) -> &[Delivery] {
        &self.deliveries
    }

    /// Deliveries of `kind` observed at `node`
    pub fn deliveries_at(&self, node: NodeId, kind: &str) -> usize {
        self.deliveries
            .iter()
            .filter(|d| d.current == node && d.kind == kind)
            .count()
    }

    /// Indented outline of the attached tree
    pub fn outline(&self) -> String {
        let mut out = String::new();
        self.outline_node(self.body, 0, &mut out);
        out
    }

    fn outline_node(&self, node: NodeId, depth: usize, out: &mut String) {
        let Some(data) = self.nodes.get(node.0) else {
            return;
        };
        let _ = write!(out, "{}<{}", "  ".repeat(depth), data.tag);
        for (name, value) in &data.attributes {
            let _ = write!(out, " {name}=\"{value}\"");
        }
        out.push('>');
        if let Some(text) = &data.text {
            let _ = write!(out, " {text:?}");
        }
        if let Some(html) = &data.inner_html {
            let _ = write!(out, " {html}");
        }
        out.push('\n');
        for child in &data.children {
            self.outline_node(*child, depth + 1, out);
        }
    }
}

impl HostDocument for MemoryDocument {
    fn body(&self) -> NodeId {
        self.body
    }

    fn create_element(&mut self, tag: &str) -> NodeId {
        self.nodes.push(NodeData::new(tag));
        NodeId(self.nodes.len() - 1)
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        self.node(parent)?;
        self.node(child)?;
        if self.contains(child, parent) {
            return Err(DomError::HierarchyRequest { parent, child });
        }
        self.remove(child)?;
        self.node_mut(parent)?.children.push(child);
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    fn remove(&mut self, node: NodeId) -> DomResult<()> {
        let Some(parent) = self.node_mut(node)?.parent.take() else {
            return Ok(());
        };
        self.node_mut(parent)?.children.retain(|c| *c != node);
        Ok(())
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0).and_then(|n| n.parent)
    }

    fn children(&self, node: NodeId) -> DomResult<Vec<NodeId>> {
        Ok(self.node(node)?.children.clone())
    }

    fn is_attached(&self, node: NodeId) -> bool {
        self.nodes.get(node.0).is_some() && self.contains(self.body, node)
    }

    fn attribute(&self, node: NodeId, name: &str) -> DomResult<Option<String>> {
        Ok(self.node(node)?.attributes.get(name).cloned())
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> DomResult<()> {
        self.node_mut(node)?
            .attributes
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) -> DomResult<()> {
        self.node_mut(node)?.attributes.remove(name);
        Ok(())
    }

    fn set_style(&mut self, node: NodeId, property: &str, value: &str) -> DomResult<()> {
        self.node_mut(node)?
            .styles
            .insert(property.to_string(), value.to_string());
        Ok(())
    }

    fn set_text(&mut self, node: NodeId, text: &str) -> DomResult<()> {
        self.detach_children(node)?;
        let data = self.node_mut(node)?;
        data.text = Some(text.to_string());
        data.inner_html = None;
        Ok(())
    }

    fn set_inner_html(&mut self, node: NodeId, html: &str) -> DomResult<()> {
        self.detach_children(node)?;
        let data = self.node_mut(node)?;
        data.inner_html = Some(html.to_string());
        data.text = None;
        Ok(())
    }

    fn dispatch_event(&mut self, node: NodeId, event: &SyntheticEvent) -> DomResult<()> {
        self.node(node)?;
        let mut current = Some(node);
        while let Some(n) = current {
            self.deliveries.push(Delivery {
                kind: event.kind.clone(),
                target: node,
                current: n,
            });
            if !event.bubbles {
                break;
            }
            current = self.parent(n);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attach_and_detach() {
        let mut doc = MemoryDocument::new();
        let div = doc.create_element("div");
        assert!(!doc.is_attached(div));

        doc.append_child(doc.body(), div).unwrap();
        assert!(doc.is_attached(div));

        doc.remove(div).unwrap();
        assert!(!doc.is_attached(div));
        // second removal is a no-op
        doc.remove(div).unwrap();
    }

    #[test]
    fn test_inner_html_detaches_children() {
        let mut doc = MemoryDocument::new();
        let field = doc.create_element("div");
        let icon = doc.create_element("span");
        doc.append_child(doc.body(), field).unwrap();
        doc.append_child(field, icon).unwrap();

        doc.set_inner_html(field, "<p>hi</p>").unwrap();

        assert!(!doc.is_attached(icon));
        assert!(doc.children(field).unwrap().is_empty());
        assert_eq!(doc.inner_html(field), Some("<p>hi</p>"));
    }

    #[test]
    fn test_bubbling_reaches_ancestors() {
        let mut doc = MemoryDocument::new();
        let form = doc.create_element("form");
        let field = doc.create_element("div");
        doc.append_child(doc.body(), form).unwrap();
        doc.append_child(form, field).unwrap();

        doc.dispatch_event(field, &SyntheticEvent::bubbling("input")).unwrap();
        assert_eq!(doc.deliveries_at(field, "input"), 1);
        assert_eq!(doc.deliveries_at(form, "input"), 1);
        assert_eq!(doc.deliveries_at(doc.body(), "input"), 1);

        let plain = SyntheticEvent {
            kind: "change".to_string(),
            bubbles: false,
        };
        doc.dispatch_event(field, &plain).unwrap();
        assert_eq!(doc.deliveries_at(field, "change"), 1);
        assert_eq!(doc.deliveries_at(form, "change"), 0);
    }

    #[test]
    fn test_cycle_rejected() {
        let mut doc = MemoryDocument::new();
        let outer = doc.create_element("div");
        let inner = doc.create_element("div");
        doc.append_child(outer, inner).unwrap();
        assert!(matches!(
            doc.append_child(inner, outer),
            Err(DomError::HierarchyRequest { .. })
        ));
    }

    #[test]
    fn test_unknown_node_is_error() {
        let doc = MemoryDocument::new();
        let bogus = NodeId(42);
        assert_eq!(doc.attribute(bogus, "id"), Err(DomError::UnknownNode(bogus)));
        assert!(doc.has_class(bogus, "x").is_err());
        assert!(!doc.is_attached(bogus));
    }

    #[test]
    fn test_has_class_matches_tokens() {
        let mut doc = MemoryDocument::new();
        let div = doc.create_element("div");
        doc.set_attribute(div, "class", "msg-form__contenteditable t-14").unwrap();
        assert!(doc.has_class(div, "t-14").unwrap());
        assert!(!doc.has_class(div, "msg-form").unwrap());
    }
}
