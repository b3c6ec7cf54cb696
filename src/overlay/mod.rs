//! Trigger and panel lifecycle
//!
//! The manager holds at most one handle per overlay node kind. A handle is
//! checked before anything is created and dropped when its node is removed, so
//! a second trigger or panel can never be mounted.

mod panel_dom;

pub use panel_dom::{PanelControl, PanelControls};

use tracing::{debug, info};

use crate::assets::Icon;
use crate::config::OverlayConfig;
use crate::dom::{DomResult, HostDocument, NodeId};
use crate::panel::{PanelController, SessionId};

/// Which overlay nodes exist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayState {
    Hidden,
    TriggerVisible,
    PanelOpen,
}

/// Where a click landed, from the overlay's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickRoute {
    /// The trigger for this field was activated
    OpenPanel(NodeId),
    /// The dimmed layer itself, outside the panel content
    DismissPanel,
    Control(PanelControl),
    /// Inside the panel, but not on a control
    PanelContent,
}

#[derive(Debug, Clone, Copy)]
struct Trigger {
    node: NodeId,
    field: NodeId,
}

struct PanelMount {
    layer: NodeId,
    field: NodeId,
    controls: PanelControls,
    controller: PanelController,
}

pub struct OverlayManager {
    trigger_id: String,
    panel_id: String,
    trigger_inset: String,
    asset_base: String,
    trigger: Option<Trigger>,
    panel: Option<PanelMount>,
    next_session: u64,
}

impl OverlayManager {
    pub fn new(config: &OverlayConfig) -> Self {
        Self {
            trigger_id: config.trigger_id.clone(),
            panel_id: config.panel_id.clone(),
            trigger_inset: format!("{}px", config.trigger_inset_px),
            asset_base: config.asset_base.clone(),
            trigger: None,
            panel: None,
            next_session: 0,
        }
    }

    pub fn state(&self) -> OverlayState {
        if self.panel.is_some() {
            OverlayState::PanelOpen
        } else if self.trigger.is_some() {
            OverlayState::TriggerVisible
        } else {
            OverlayState::Hidden
        }
    }

    pub fn trigger_node(&self) -> Option<NodeId> {
        self.trigger.map(|t| t.node)
    }

    pub fn has_trigger(&self) -> bool {
        self.trigger.is_some()
    }

    pub fn panel_layer(&self) -> Option<NodeId> {
        self.panel.as_ref().map(|p| p.layer)
    }

    /// The field the open panel will insert into
    pub fn panel_field(&self) -> Option<NodeId> {
        self.panel.as_ref().map(|p| p.field)
    }

    pub fn panel_controls(&self) -> Option<&PanelControls> {
        self.panel.as_ref().map(|p| &p.controls)
    }

    pub fn panel(&self) -> Option<&PanelController> {
        self.panel.as_ref().map(|p| &p.controller)
    }

    pub fn panel_mut(&mut self) -> Option<&mut PanelController> {
        self.panel.as_mut().map(|p| &mut p.controller)
    }

    /// Show the trigger inside `field`. Returns false if one already exists.
    pub fn show_trigger<D: HostDocument>(&mut self, doc: &mut D, field: NodeId) -> DomResult<bool> {
        if let Some(existing) = self.trigger {
            debug!("Trigger already shown on {}", existing.field);
            return Ok(false);
        }

        let node = doc.create_element("span");
        doc.set_attribute(node, "id", &self.trigger_id)?;
        doc.set_style(node, "cursor", "pointer")?;
        doc.set_style(node, "position", "absolute")?;
        doc.set_style(node, "bottom", &self.trigger_inset)?;
        doc.set_style(node, "right", &self.trigger_inset)?;
        doc.set_style(node, "z-index", "99")?;

        let badge = doc.create_element("div");
        doc.set_attribute(badge, "class", "overlay-trigger-badge")?;
        doc.set_style(badge, "border-radius", "9999px")?;
        doc.set_style(badge, "background-color", "white")?;
        let img = doc.create_element("img");
        doc.set_attribute(img, "src", &Icon::Trigger.url(&self.asset_base))?;
        doc.set_attribute(img, "alt", Icon::Trigger.alt())?;
        doc.append_child(badge, img)?;
        doc.append_child(node, badge)?;

        doc.append_child(field, node)?;
        self.trigger = Some(Trigger { node, field });
        info!("Trigger shown on {field}");
        Ok(true)
    }

    /// Remove the trigger. Safe to call when none is shown.
    pub fn hide_trigger<D: HostDocument>(&mut self, doc: &mut D) -> DomResult<bool> {
        let Some(trigger) = self.trigger.take() else {
            return Ok(false);
        };
        doc.remove(trigger.node)?;
        info!("Trigger hidden");
        Ok(true)
    }

    /// Mount the panel over the page for `field`. Returns false if one is
    /// already mounted. Every mount starts an empty conversation.
    pub fn open_panel<D: HostDocument>(&mut self, doc: &mut D, field: NodeId) -> DomResult<bool> {
        if self.panel.is_some() {
            debug!("Panel already open");
            return Ok(false);
        }

        let layer = doc.create_element("div");
        doc.set_attribute(layer, "id", &self.panel_id)?;
        for (property, value) in [
            ("position", "fixed"),
            ("top", "0"),
            ("left", "0"),
            ("width", "100vw"),
            ("height", "100vh"),
            ("display", "flex"),
            ("align-items", "center"),
            ("justify-content", "center"),
            ("background-color", "rgba(0, 0, 0, 0.5)"),
            ("z-index", "9999"),
        ] {
            doc.set_style(layer, property, value)?;
        }

        let controls = panel_dom::build(doc, &self.asset_base)?;
        doc.append_child(layer, controls.content)?;

        let session = SessionId(self.next_session);
        self.next_session += 1;
        let controller = PanelController::new(session);
        panel_dom::render(doc, &controls, &controller, &self.asset_base)?;

        doc.append_child(doc.body(), layer)?;
        self.panel = Some(PanelMount {
            layer,
            field,
            controls,
            controller,
        });
        info!("Panel opened for {field} (session {})", session.0);
        Ok(true)
    }

    /// Unmount the panel and drop its conversation. Safe to call when closed.
    pub fn close_panel<D: HostDocument>(&mut self, doc: &mut D) -> DomResult<bool> {
        let Some(mount) = self.panel.take() else {
            return Ok(false);
        };
        doc.remove(mount.layer)?;
        info!(
            "Panel closed (session {}, {} turns discarded)",
            mount.controller.session().0,
            mount.controller.conversation().len()
        );
        Ok(true)
    }

    /// Refresh the mounted panel's DOM from its controller
    pub fn render_panel<D: HostDocument>(&self, doc: &mut D) -> DomResult<()> {
        if let Some(mount) = &self.panel {
            panel_dom::render(doc, &mount.controls, &mount.controller, &self.asset_base)?;
        }
        Ok(())
    }

    /// Classify a click. `None` means it is not the overlay's business.
    pub fn route_click<D: HostDocument>(&self, doc: &D, target: NodeId) -> Option<ClickRoute> {
        if let Some(mount) = &self.panel {
            if target == mount.layer {
                return Some(ClickRoute::DismissPanel);
            }
            if doc.contains(mount.controls.content, target) {
                return Some(
                    mount
                        .controls
                        .control_at(doc, target)
                        .map_or(ClickRoute::PanelContent, ClickRoute::Control),
                );
            }
        }
        if let Some(trigger) = self.trigger {
            if doc.contains(trigger.node, target) {
                return Some(ClickRoute::OpenPanel(trigger.field));
            }
        }
        None
    }

    /// Forget handles whose nodes the host page has detached
    pub fn release_stale<D: HostDocument>(&mut self, doc: &D) {
        if let Some(trigger) = self.trigger {
            if !doc.is_attached(trigger.node) {
                debug!("Trigger on {} was detached by the page", trigger.field);
                self.trigger = None;
            }
        }
        if let Some(layer) = self.panel_layer() {
            if !doc.is_attached(layer) {
                debug!("Panel layer was detached by the page");
                self.panel = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MemoryDocument;

    fn setup() -> (MemoryDocument, OverlayManager, NodeId) {
        let mut doc = MemoryDocument::new();
        let field = doc.create_element("div");
        doc.append_child(doc.body(), field).unwrap();
        (doc, OverlayManager::new(&OverlayConfig::default()), field)
    }

    #[test]
    fn test_trigger_singleton() {
        let (mut doc, mut overlay, field) = setup();
        let other = doc.create_element("div");
        doc.append_child(doc.body(), other).unwrap();

        assert!(overlay.show_trigger(&mut doc, field).unwrap());
        assert!(!overlay.show_trigger(&mut doc, field).unwrap());
        assert!(!overlay.show_trigger(&mut doc, other).unwrap());

        assert_eq!(doc.elements_by_id("ai-icon").len(), 1);
        assert_eq!(overlay.state(), OverlayState::TriggerVisible);
        let trigger = overlay.trigger_node().unwrap();
        assert_eq!(doc.parent(trigger), Some(field));
        assert_eq!(doc.style(trigger, "position"), Some("absolute"));
        assert_eq!(doc.style(trigger, "bottom"), Some("15px"));
        assert_eq!(doc.style(trigger, "right"), Some("15px"));
    }

    #[test]
    fn test_hide_trigger_idempotent() {
        let (mut doc, mut overlay, field) = setup();
        assert!(!overlay.hide_trigger(&mut doc).unwrap());

        overlay.show_trigger(&mut doc, field).unwrap();
        assert!(overlay.hide_trigger(&mut doc).unwrap());
        assert!(!overlay.hide_trigger(&mut doc).unwrap());
        assert!(doc.element_by_id("ai-icon").is_none());
        assert_eq!(overlay.state(), OverlayState::Hidden);
    }

    #[test]
    fn test_panel_lifecycle() {
        let (mut doc, mut overlay, field) = setup();
        overlay.show_trigger(&mut doc, field).unwrap();

        assert!(overlay.open_panel(&mut doc, field).unwrap());
        assert!(!overlay.open_panel(&mut doc, field).unwrap());
        assert_eq!(doc.elements_by_id("ai-modal").len(), 1);
        assert_eq!(overlay.state(), OverlayState::PanelOpen);

        let layer = overlay.panel_layer().unwrap();
        assert_eq!(doc.parent(layer), Some(doc.body()));
        assert_eq!(doc.style(layer, "position"), Some("fixed"));
        assert_eq!(doc.style(layer, "background-color"), Some("rgba(0, 0, 0, 0.5)"));

        assert!(overlay.close_panel(&mut doc).unwrap());
        assert!(!overlay.close_panel(&mut doc).unwrap());
        assert!(doc.element_by_id("ai-modal").is_none());
        // the trigger outlives the panel
        assert_eq!(overlay.state(), OverlayState::TriggerVisible);
    }

    #[test]
    fn test_reopen_starts_fresh_session() {
        let (mut doc, mut overlay, field) = setup();
        overlay.open_panel(&mut doc, field).unwrap();
        let first = overlay.panel().unwrap().session();
        overlay.panel_mut().unwrap().set_input("draft");
        overlay.panel_mut().unwrap().submit().unwrap();

        overlay.close_panel(&mut doc).unwrap();
        overlay.open_panel(&mut doc, field).unwrap();

        let panel = overlay.panel().unwrap();
        assert_ne!(panel.session(), first);
        assert!(panel.conversation().is_empty());
        assert!(!panel.is_pending());
    }

    #[test]
    fn test_click_routing() {
        let (mut doc, mut overlay, field) = setup();
        overlay.show_trigger(&mut doc, field).unwrap();
        let trigger = overlay.trigger_node().unwrap();
        let badge = doc.children(trigger).unwrap()[0];

        assert_eq!(overlay.route_click(&doc, badge), Some(ClickRoute::OpenPanel(field)));
        assert_eq!(overlay.route_click(&doc, field), None);

        overlay.open_panel(&mut doc, field).unwrap();
        let layer = overlay.panel_layer().unwrap();
        let controls = *overlay.panel_controls().unwrap();

        assert_eq!(overlay.route_click(&doc, layer), Some(ClickRoute::DismissPanel));
        assert_eq!(overlay.route_click(&doc, controls.content), Some(ClickRoute::PanelContent));
        assert_eq!(overlay.route_click(&doc, controls.prompt), Some(ClickRoute::PanelContent));
        assert_eq!(
            overlay.route_click(&doc, controls.generate_label),
            Some(ClickRoute::Control(PanelControl::Generate))
        );
        assert_eq!(
            overlay.route_click(&doc, controls.close),
            Some(ClickRoute::Control(PanelControl::Close))
        );
    }

    #[test]
    fn test_release_stale_trigger() {
        let (mut doc, mut overlay, field) = setup();
        overlay.show_trigger(&mut doc, field).unwrap();

        // the page rewrites the field, taking our trigger with it
        doc.set_inner_html(field, "<p>typed</p>").unwrap();
        overlay.release_stale(&doc);

        assert_eq!(overlay.state(), OverlayState::Hidden);
        assert!(overlay.show_trigger(&mut doc, field).unwrap());
    }
}
