//! Document-wide focus observation
//!
//! The content script listens for focus and blur in the capture phase on the
//! whole document. Those notifications arrive here as [`HostEvent`]s from any
//! `Stream`, so tests can feed synthetic events instead of registering real
//! listeners.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use crate::config::FieldContract;
use crate::dom::{DomResult, HostDocument, NodeId};
use crate::Result;

/// A notification from the host document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEvent {
    FocusIn { target: NodeId },
    FocusOut { target: NodeId },
    Click { target: NodeId },
    /// The value of an input element changed
    Input { target: NodeId, value: String },
}

/// Parse a recorded event log: a JSON array of tagged [`HostEvent`]s
pub fn parse_events(json: &str) -> Result<Vec<HostEvent>> {
    Ok(serde_json::from_str(json)?)
}

/// Sending half of a channel-backed event source
pub type EventSender = mpsc::Sender<HostEvent>;

/// Channel-backed event source; the receiver is a `Stream` of [`HostEvent`]
pub fn channel(capacity: usize) -> (EventSender, ReceiverStream<HostEvent>) {
    let (tx, rx) = mpsc::channel(capacity);
    (tx, ReceiverStream::new(rx))
}

/// Recognises the host page's composition field
#[derive(Debug, Clone)]
pub struct FieldMatcher {
    contract: FieldContract,
}

impl FieldMatcher {
    pub fn new(contract: FieldContract) -> Self {
        Self { contract }
    }

    /// Focused composition field: marker attribute set and composition class
    pub fn matches<D: HostDocument>(&self, doc: &D, node: NodeId) -> DomResult<bool> {
        let marker = doc.attribute(node, &self.contract.marker_attribute)?;
        if marker.as_deref() != Some(self.contract.marker_value.as_str()) {
            return Ok(false);
        }
        self.is_composition_field(doc, node)
    }

    pub fn is_composition_field<D: HostDocument>(&self, doc: &D, node: NodeId) -> DomResult<bool> {
        doc.has_class(node, &self.contract.composition_class)
    }
}

/// What the observer concluded from a focus change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSignal {
    Activated(NodeId),
    Deactivated(NodeId),
}

/// Turns focus/blur notifications into field activation signals
#[derive(Debug, Clone)]
pub struct FieldObserver {
    matcher: FieldMatcher,
}

impl FieldObserver {
    pub fn new(matcher: FieldMatcher) -> Self {
        Self { matcher }
    }

    /// Classify `event`. Elements that cannot be inspected never match.
    pub fn observe<D: HostDocument>(&self, doc: &D, event: &HostEvent) -> Option<FieldSignal> {
        match event {
            HostEvent::FocusIn { target } => match self.matcher.matches(doc, *target) {
                Ok(true) => Some(FieldSignal::Activated(*target)),
                Ok(false) => None,
                Err(e) => {
                    debug!("Ignoring focus on {target}: {e}");
                    None
                }
            },
            HostEvent::FocusOut { target } => match self.matcher.is_composition_field(doc, *target) {
                Ok(true) => Some(FieldSignal::Deactivated(*target)),
                Ok(false) => None,
                Err(e) => {
                    debug!("Ignoring blur on {target}: {e}");
                    None
                }
            },
            HostEvent::Click { .. } | HostEvent::Input { .. } => None,
        }
    }
}

/// The field the overlay currently believes is active.
///
/// The page owns the element; this only remembers which one it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObservedField {
    pub node: NodeId,
    pub focused: bool,
}

impl ObservedField {
    pub fn new(node: NodeId) -> Self {
        Self { node, focused: true }
    }

    pub fn is_live<D: HostDocument>(&self, doc: &D) -> bool {
        self.focused && doc.is_attached(self.node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MemoryDocument;

    fn observer() -> FieldObserver {
        FieldObserver::new(FieldMatcher::new(FieldContract::default()))
    }

    fn composer(doc: &mut MemoryDocument, focused: bool) -> NodeId {
        let field = doc.create_element("div");
        doc.set_attribute(field, "class", "msg-form__contenteditable t-14").unwrap();
        doc.set_attribute(field, "data-artdeco-is-focused", if focused { "true" } else { "false" })
            .unwrap();
        doc.append_child(doc.body(), field).unwrap();
        field
    }

    #[test]
    fn test_focus_on_composer_activates() {
        let mut doc = MemoryDocument::new();
        let field = composer(&mut doc, true);
        assert_eq!(
            observer().observe(&doc, &HostEvent::FocusIn { target: field }),
            Some(FieldSignal::Activated(field))
        );
    }

    #[test]
    fn test_marker_must_be_set() {
        let mut doc = MemoryDocument::new();
        let field = composer(&mut doc, false);
        assert_eq!(observer().observe(&doc, &HostEvent::FocusIn { target: field }), None);
    }

    #[test]
    fn test_marker_without_class_ignored() {
        let mut doc = MemoryDocument::new();
        let search = doc.create_element("input");
        doc.set_attribute(search, "data-artdeco-is-focused", "true").unwrap();
        doc.append_child(doc.body(), search).unwrap();
        assert_eq!(observer().observe(&doc, &HostEvent::FocusIn { target: search }), None);
    }

    #[test]
    fn test_blur_needs_only_class() {
        let mut doc = MemoryDocument::new();
        let field = composer(&mut doc, false);
        assert_eq!(
            observer().observe(&doc, &HostEvent::FocusOut { target: field }),
            Some(FieldSignal::Deactivated(field))
        );
    }

    #[test]
    fn test_unknown_node_does_not_match() {
        let doc = MemoryDocument::new();
        let mut other = MemoryDocument::new();
        for _ in 0..3 {
            other.create_element("div");
        }
        let foreign = other.create_element("div");
        assert_eq!(observer().observe(&doc, &HostEvent::FocusIn { target: foreign }), None);
        assert_eq!(observer().observe(&doc, &HostEvent::FocusOut { target: foreign }), None);
    }

    #[test]
    fn test_parse_recorded_events() {
        let events = parse_events(
            r#"[
                {"type": "focus_in", "target": 1},
                {"type": "input", "target": 4, "value": "Hello"},
                {"type": "click", "target": 2}
            ]"#,
        )
        .unwrap();

        assert_eq!(
            events,
            vec![
                HostEvent::FocusIn { target: NodeId(1) },
                HostEvent::Input {
                    target: NodeId(4),
                    value: "Hello".to_string()
                },
                HostEvent::Click { target: NodeId(2) },
            ]
        );
    }

    #[test]
    fn test_parse_rejects_unknown_event() {
        let err = parse_events(r#"[{"type": "scroll", "target": 1}]"#).unwrap_err();
        assert!(matches!(err, crate::OverlayError::Json(_)));
    }

    #[test]
    fn test_observed_field_liveness() {
        let mut doc = MemoryDocument::new();
        let field = composer(&mut doc, true);
        let mut observed = ObservedField::new(field);
        assert!(observed.is_live(&doc));

        observed.focused = false;
        assert!(!observed.is_live(&doc));

        let observed = ObservedField::new(field);
        doc.remove(field).unwrap();
        assert!(!observed.is_live(&doc));
    }
}
