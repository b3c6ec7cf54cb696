//! Writing replies back into the host page's field

use tracing::{debug, info, warn};

use crate::dom::{DomResult, HostDocument, NodeId, SyntheticEvent};

/// What happened to an insert request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// The field was gone; nothing was written
    StaleTarget,
}

/// Replaces a field's content and tells the host page it changed.
///
/// The write goes through the same path typing would take: new content, then
/// a bubbling input event. Focus and any other field state are left alone.
#[derive(Debug, Clone)]
pub struct InjectionWriter {
    event_kind: String,
}

impl InjectionWriter {
    pub fn new(event_kind: impl Into<String>) -> Self {
        Self {
            event_kind: event_kind.into(),
        }
    }

    pub fn insert<D: HostDocument>(&self, doc: &mut D, field: NodeId, text: &str) -> InsertOutcome {
        if !doc.is_attached(field) {
            debug!("Insert target {field} is no longer attached");
            return InsertOutcome::StaleTarget;
        }

        match self.write(doc, field, text) {
            Ok(()) => {
                info!("Inserted {} chars into {field}", text.chars().count());
                InsertOutcome::Inserted
            }
            Err(e) => {
                warn!("Insert into {field} failed: {e}");
                InsertOutcome::StaleTarget
            }
        }
    }

    fn write<D: HostDocument>(&self, doc: &mut D, field: NodeId, text: &str) -> DomResult<()> {
        doc.set_inner_html(field, &format!("<p>{}</p>", escape_html(text)))?;
        doc.dispatch_event(field, &SyntheticEvent::bubbling(self.event_kind.as_str()))
    }
}

impl Default for InjectionWriter {
    fn default() -> Self {
        Self::new("input")
    }
}

/// Escape text for use as element content
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
