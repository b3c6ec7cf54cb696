//! Builds and refreshes the panel's DOM inside the host layer

use crate::assets::Icon;
use crate::dom::{DomResult, HostDocument, NodeId};
use crate::panel::{PanelController, TurnRole};

/// Clickable parts of the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelControl {
    Clear,
    Insert,
    Generate,
    Close,
}

/// Node handles for a mounted panel's content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelControls {
    pub content: NodeId,
    pub transcript: NodeId,
    pub status: NodeId,
    pub prompt: NodeId,
    pub clear: NodeId,
    pub insert: NodeId,
    pub generate: NodeId,
    pub generate_icon: NodeId,
    pub generate_label: NodeId,
    pub close: NodeId,
}

impl PanelControls {
    /// The control containing `target`, if any
    pub fn control_at<D: HostDocument>(&self, doc: &D, target: NodeId) -> Option<PanelControl> {
        [
            (self.clear, PanelControl::Clear),
            (self.insert, PanelControl::Insert),
            (self.generate, PanelControl::Generate),
            (self.close, PanelControl::Close),
        ]
        .into_iter()
        .find(|(node, _)| doc.contains(*node, target))
        .map(|(_, control)| control)
    }
}

fn element<D: HostDocument>(
    doc: &mut D,
    tag: &str,
    class: &str,
    styles: &[(&str, &str)],
) -> DomResult<NodeId> {
    let node = doc.create_element(tag);
    if !class.is_empty() {
        doc.set_attribute(node, "class", class)?;
    }
    for (property, value) in styles {
        doc.set_style(node, property, value)?;
    }
    Ok(node)
}

fn icon<D: HostDocument>(doc: &mut D, which: Icon, asset_base: &str, size: &str) -> DomResult<NodeId> {
    let img = element(doc, "img", "overlay-icon", &[("width", size), ("height", size), ("margin-right", "8px")])?;
    doc.set_attribute(img, "src", &which.url(asset_base))?;
    doc.set_attribute(img, "alt", which.alt())?;
    Ok(img)
}

/// A button holding an icon and a text label; returns (button, icon, label)
fn button<D: HostDocument>(
    doc: &mut D,
    class: &str,
    which: Icon,
    text: &str,
    asset_base: &str,
) -> DomResult<(NodeId, NodeId, NodeId)> {
    let node = element(
        doc,
        "button",
        class,
        &[("display", "flex"), ("align-items", "center"), ("padding", "8px 16px"), ("border-radius", "8px")],
    )?;
    let img = icon(doc, which, asset_base, "24px")?;
    let label = doc.create_element("span");
    doc.set_text(label, text)?;
    doc.append_child(node, img)?;
    doc.append_child(node, label)?;
    Ok((node, img, label))
}

/// Create the panel content tree. The caller attaches `content`.
pub fn build<D: HostDocument>(doc: &mut D, asset_base: &str) -> DomResult<PanelControls> {
    let content = element(
        doc,
        "div",
        "overlay-panel",
        &[
            ("background-color", "white"),
            ("padding", "24px"),
            ("border-radius", "8px"),
            ("box-shadow", "0 4px 8px rgba(0, 0, 0, 0.1)"),
            ("z-index", "40"),
            ("width", "500px"),
            ("max-height", "100vh"),
            ("display", "flex"),
            ("flex-direction", "column"),
        ],
    )?;
    let transcript = element(
        doc,
        "div",
        "overlay-transcript",
        &[("overflow-y", "auto"), ("max-height", "400px"), ("flex-grow", "1")],
    )?;
    let status = element(doc, "div", "overlay-status", &[("font-style", "italic")])?;
    doc.set_text(status, "Writing a reply...")?;

    let input_row = element(doc, "div", "overlay-input-row", &[("margin-top", "16px"), ("display", "flex")])?;
    let prompt = element(doc, "input", "overlay-prompt", &[("width", "80%"), ("padding", "8px")])?;
    doc.set_attribute(prompt, "type", "text")?;
    doc.set_attribute(prompt, "placeholder", "Your prompt")?;
    let (clear, _, _) = button(doc, "overlay-clear", Icon::Clear, "Clear All", asset_base)?;
    doc.append_child(input_row, prompt)?;
    doc.append_child(input_row, clear)?;

    let actions = element(
        doc,
        "div",
        "overlay-actions",
        &[("margin-top", "16px"), ("display", "flex"), ("justify-content", "flex-end"), ("gap", "16px")],
    )?;
    let (insert, _, _) = button(doc, "overlay-insert", Icon::Insert, "Insert", asset_base)?;
    let (generate, generate_icon, generate_label) =
        button(doc, "overlay-generate", Icon::Generate, "Generate", asset_base)?;
    let close = element(doc, "button", "overlay-close", &[])?;
    doc.set_text(close, "Close")?;
    for node in [insert, generate, close] {
        doc.append_child(actions, node)?;
    }

    for node in [transcript, status, input_row, actions] {
        doc.append_child(content, node)?;
    }

    Ok(PanelControls {
        content,
        transcript,
        status,
        prompt,
        clear,
        insert,
        generate,
        generate_icon,
        generate_label,
        close,
    })
}

fn set_flag<D: HostDocument>(doc: &mut D, node: NodeId, name: &str, on: bool) -> DomResult<()> {
    if on {
        doc.set_attribute(node, name, "")
    } else {
        doc.remove_attribute(node, name)
    }
}

fn turn_node<D: HostDocument>(doc: &mut D, role: TurnRole, text: &str) -> DomResult<NodeId> {
    let (modifier, align, justify, background) = match role {
        TurnRole::Requester => ("requester", "right", "flex-end", "#E5E7EB"),
        TurnRole::Responder => ("responder", "left", "flex-start", "#BFDBFE"),
    };
    let node = element(
        doc,
        "div",
        &format!("overlay-turn overlay-turn--{modifier}"),
        &[
            ("text-align", align),
            ("align-self", justify),
            ("background-color", background),
            ("margin", "8px 0"),
            ("padding", "8px"),
            ("border-radius", "8px"),
            ("max-width", "75%"),
        ],
    )?;
    doc.set_text(node, text)?;
    Ok(node)
}

/// Bring the panel DOM in line with `panel`.
///
/// Rendered turns are never rewritten: new turns are appended, and a cleared
/// conversation empties the transcript.
pub fn render<D: HostDocument>(
    doc: &mut D,
    controls: &PanelControls,
    panel: &PanelController,
    asset_base: &str,
) -> DomResult<()> {
    let turns = panel.conversation().turns();
    let rendered = doc.children(controls.transcript)?;
    let start = if rendered.len() > turns.len() {
        for node in rendered {
            doc.remove(node)?;
        }
        0
    } else {
        rendered.len()
    };
    for turn in &turns[start..] {
        let node = turn_node(doc, turn.role, &turn.text)?;
        doc.append_child(controls.transcript, node)?;
    }

    let empty = panel.conversation().is_empty();
    let mode = panel.mode();

    doc.set_attribute(controls.prompt, "value", panel.input())?;
    set_flag(doc, controls.status, "hidden", !panel.is_pending())?;
    set_flag(doc, controls.clear, "hidden", empty)?;
    set_flag(doc, controls.clear, "disabled", !panel.can_clear())?;
    set_flag(doc, controls.insert, "hidden", empty)?;
    set_flag(doc, controls.insert, "disabled", !panel.can_insert())?;
    set_flag(doc, controls.generate, "disabled", !panel.can_submit())?;
    doc.set_attribute(controls.generate, "aria-busy", if panel.is_pending() { "true" } else { "false" })?;
    doc.set_style(
        controls.generate,
        "background-color",
        if panel.can_submit() { "#3B82F6" } else { "#A1A1AA" },
    )?;
    doc.set_text(controls.generate_label, mode.label())?;
    doc.set_attribute(controls.generate_icon, "src", &mode.icon().url(asset_base))?;
    doc.set_attribute(controls.generate_icon, "alt", mode.icon().alt())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MemoryDocument;
    use crate::panel::SessionId;

    fn mounted() -> (MemoryDocument, PanelControls) {
        let mut doc = MemoryDocument::new();
        let controls = build(&mut doc, "").unwrap();
        doc.append_child(doc.body(), controls.content).unwrap();
        (doc, controls)
    }

    #[test]
    fn test_empty_panel_hides_clear_and_insert() {
        let (mut doc, controls) = mounted();
        let panel = PanelController::new(SessionId(0));
        render(&mut doc, &controls, &panel, "").unwrap();

        assert!(doc.attribute(controls.clear, "hidden").unwrap().is_some());
        assert!(doc.attribute(controls.insert, "hidden").unwrap().is_some());
        assert!(doc.attribute(controls.generate, "disabled").unwrap().is_some());
        assert_eq!(doc.text(controls.generate_label), Some("Generate"));
        assert_eq!(
            doc.attribute(controls.generate_icon, "src").unwrap().as_deref(),
            Some("icon/Arrow-icon.svg")
        );
    }

    #[test]
    fn test_turns_append_in_order() {
        let (mut doc, controls) = mounted();
        let mut panel = PanelController::new(SessionId(0));
        panel.set_input("Hello");
        let request = panel.submit().unwrap();
        render(&mut doc, &controls, &panel, "").unwrap();
        let first = doc.children(controls.transcript).unwrap();
        assert_eq!(first.len(), 1);
        assert!(doc.attribute(controls.status, "hidden").unwrap().is_none());

        panel.complete(request.ticket, Ok("Hi!".to_string()));
        render(&mut doc, &controls, &panel, "").unwrap();
        let turns = doc.children(controls.transcript).unwrap();
        assert_eq!(turns.len(), 2);
        // the first node was kept, not rebuilt
        assert_eq!(turns[0], first[0]);
        assert_eq!(doc.style(turns[0], "text-align"), Some("right"));
        assert_eq!(doc.style(turns[1], "text-align"), Some("left"));
        assert_eq!(doc.text(turns[1]), Some("Hi!"));
        assert_eq!(doc.text(controls.generate_label), Some("Regenerate"));

        panel.clear();
        render(&mut doc, &controls, &panel, "").unwrap();
        assert!(doc.children(controls.transcript).unwrap().is_empty());
    }

    #[test]
    fn test_insert_disabled_until_a_reply_arrives() {
        let (mut doc, controls) = mounted();
        let mut panel = PanelController::new(SessionId(0));
        panel.set_input("Hello");
        let request = panel.submit().unwrap();
        render(&mut doc, &controls, &panel, "").unwrap();
        assert!(doc.attribute(controls.insert, "hidden").unwrap().is_none());
        assert!(doc.attribute(controls.insert, "disabled").unwrap().is_some());

        panel.complete(request.ticket, Ok("Hi!".to_string()));
        render(&mut doc, &controls, &panel, "").unwrap();
        assert!(doc.attribute(controls.insert, "disabled").unwrap().is_none());
    }

    #[test]
    fn test_control_lookup_includes_icon() {
        let (doc, controls) = mounted();
        let icon = doc.children(controls.insert).unwrap()[0];
        assert_eq!(controls.control_at(&doc, icon), Some(PanelControl::Insert));
        assert_eq!(controls.control_at(&doc, controls.prompt), None);
    }
}
