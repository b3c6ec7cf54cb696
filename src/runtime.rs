//! The content-script event loop
//!
//! One [`OverlayRuntime`] runs per page. Host events are handled one at a time
//! on the caller's task; generations run as futures polled by the same loop, so
//! the panel stays responsive while a reply is outstanding.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, Stream, StreamExt};
use futures::FutureExt;
use tracing::{debug, info, warn};

use crate::config::OverlayConfig;
use crate::dom::{HostDocument, NodeId};
use crate::generator::{generate_with_timeout, GenerateError, MessageGenerator};
use crate::injection::{InjectionWriter, InsertOutcome};
use crate::observer::{FieldMatcher, FieldObserver, FieldSignal, HostEvent, ObservedField};
use crate::overlay::{ClickRoute, OverlayManager, OverlayState, PanelControl, PanelControls};
use crate::panel::{GenerationRequest, PanelController, SessionId};
use crate::Result;

/// Snapshot handed to a [`Renderer`] after every change
#[derive(Debug, Clone, Copy)]
pub struct OverlayView<'a> {
    pub state: OverlayState,
    pub observed: Option<ObservedField>,
    pub panel: Option<&'a PanelController>,
}

/// Called after every change to the overlay state or the conversation
pub trait Renderer {
    fn redraw(&mut self, view: &OverlayView<'_>);
}

impl<F> Renderer for F
where
    F: FnMut(&OverlayView<'_>),
{
    fn redraw(&mut self, view: &OverlayView<'_>) {
        self(view)
    }
}

struct GenerationOutcome {
    session: SessionId,
    ticket: u64,
    result: std::result::Result<String, GenerateError>,
}

pub struct OverlayRuntime<D: HostDocument> {
    doc: D,
    config: OverlayConfig,
    observer: FieldObserver,
    overlay: OverlayManager,
    writer: InjectionWriter,
    generator: Arc<dyn MessageGenerator>,
    observed: Option<ObservedField>,
    renderer: Option<Box<dyn Renderer>>,
    in_flight: FuturesUnordered<BoxFuture<'static, GenerationOutcome>>,
}

impl<D: HostDocument> OverlayRuntime<D> {
    pub fn new(doc: D, config: OverlayConfig, generator: Arc<dyn MessageGenerator>) -> Self {
        Self {
            observer: FieldObserver::new(FieldMatcher::new(config.field.clone())),
            overlay: OverlayManager::new(&config),
            writer: InjectionWriter::new(config.input_event.clone()),
            doc,
            config,
            generator,
            observed: None,
            renderer: None,
            in_flight: FuturesUnordered::new(),
        }
    }

    pub fn with_renderer(mut self, renderer: impl Renderer + 'static) -> Self {
        self.renderer = Some(Box::new(renderer));
        self
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    pub fn document(&self) -> &D {
        &self.doc
    }

    pub fn document_mut(&mut self) -> &mut D {
        &mut self.doc
    }

    pub fn into_document(self) -> D {
        self.doc
    }

    pub fn state(&self) -> OverlayState {
        self.overlay.state()
    }

    pub fn observed_field(&self) -> Option<ObservedField> {
        self.observed
    }

    pub fn trigger_node(&self) -> Option<NodeId> {
        self.overlay.trigger_node()
    }

    pub fn panel_layer(&self) -> Option<NodeId> {
        self.overlay.panel_layer()
    }

    pub fn panel_controls(&self) -> Option<&PanelControls> {
        self.overlay.panel_controls()
    }

    pub fn panel(&self) -> Option<&PanelController> {
        self.overlay.panel()
    }

    /// Number of generations still outstanding
    pub fn pending_generations(&self) -> usize {
        self.in_flight.len()
    }

    /// Process events until `events` ends, then wait for outstanding
    /// generations.
    pub async fn run<S>(&mut self, mut events: S)
    where
        S: Stream<Item = HostEvent> + Unpin,
    {
        info!("Overlay runtime started");
        loop {
            tokio::select! {
                event = events.next() => match event {
                    Some(event) => self.handle_event(event),
                    None => break,
                },
                Some(outcome) = self.in_flight.next(), if !self.in_flight.is_empty() => {
                    self.handle_outcome(outcome);
                }
            }
        }
        self.settle().await;
        info!("Overlay runtime stopped");
    }

    /// Wait for every outstanding generation and apply its result
    pub async fn settle(&mut self) {
        while let Some(outcome) = self.in_flight.next().await {
            self.handle_outcome(outcome);
        }
    }

    /// Handle one host event. Failures are logged, never propagated.
    pub fn handle_event(&mut self, event: HostEvent) {
        self.release_detached();
        if let Err(e) = self.dispatch(&event) {
            warn!("Overlay failed to handle {event:?}: {e}");
        }
    }

    fn dispatch(&mut self, event: &HostEvent) -> Result<()> {
        match event {
            HostEvent::FocusIn { .. } | HostEvent::FocusOut { .. } => {
                match self.observer.observe(&self.doc, event) {
                    Some(FieldSignal::Activated(field)) => self.field_activated(field),
                    Some(FieldSignal::Deactivated(field)) => self.field_deactivated(field),
                    None => Ok(()),
                }
            }
            HostEvent::Click { target } => self.click(*target),
            HostEvent::Input { target, value } => {
                if self.overlay.panel_controls().map(|c| c.prompt) != Some(*target) {
                    return Ok(());
                }
                if let Some(panel) = self.overlay.panel_mut() {
                    panel.set_input(value.clone());
                }
                self.redraw();
                Ok(())
            }
        }
    }

    fn field_activated(&mut self, field: NodeId) -> Result<()> {
        if self.overlay.has_trigger() {
            debug!("Focus on {field} while a trigger is shown");
            return Ok(());
        }
        self.observed = Some(ObservedField::new(field));
        self.overlay.show_trigger(&mut self.doc, field)?;
        self.redraw();
        Ok(())
    }

    fn field_deactivated(&mut self, field: NodeId) -> Result<()> {
        if self.observed.is_some_and(|o| o.node == field) {
            self.observed = None;
        }
        // an open panel stays until the user closes it
        if self.overlay.hide_trigger(&mut self.doc)? {
            self.redraw();
        }
        Ok(())
    }

    fn click(&mut self, target: NodeId) -> Result<()> {
        let Some(route) = self.overlay.route_click(&self.doc, target) else {
            return Ok(());
        };
        match route {
            ClickRoute::OpenPanel(field) => {
                if self.overlay.open_panel(&mut self.doc, field)? {
                    self.redraw();
                }
            }
            ClickRoute::DismissPanel | ClickRoute::Control(PanelControl::Close) => self.close_panel()?,
            ClickRoute::Control(PanelControl::Generate) => self.submit(),
            ClickRoute::Control(PanelControl::Clear) => {
                if self.overlay.panel_mut().is_some_and(|p| p.clear()) {
                    self.redraw();
                }
            }
            ClickRoute::Control(PanelControl::Insert) => self.insert()?,
            ClickRoute::PanelContent => {}
        }
        Ok(())
    }

    fn close_panel(&mut self) -> Result<()> {
        if self.overlay.close_panel(&mut self.doc)? {
            self.redraw();
        }
        Ok(())
    }

    fn submit(&mut self) {
        let Some(request) = self.overlay.panel_mut().and_then(|p| p.submit()) else {
            return;
        };
        self.spawn_generation(request);
        self.redraw();
    }

    fn spawn_generation(&mut self, request: GenerationRequest) {
        let generator = Arc::clone(&self.generator);
        let timeout = self.config.generation_timeout();
        let GenerationRequest {
            session,
            ticket,
            history,
        } = request;
        debug!("Generation {ticket} started for session {}", session.0);

        self.in_flight.push(
            async move {
                let result = AssertUnwindSafe(generate_with_timeout(generator.as_ref(), history, timeout))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|_| Err(GenerateError::Failed("generator panicked".to_string())));
                GenerationOutcome {
                    session,
                    ticket,
                    result,
                }
            }
            .boxed(),
        );
    }

    fn handle_outcome(&mut self, outcome: GenerationOutcome) {
        if let Err(e) = &outcome.result {
            warn!("Generation {} failed: {e}", outcome.ticket);
        }
        let Some(panel) = self
            .overlay
            .panel_mut()
            .filter(|p| p.session() == outcome.session)
        else {
            debug!(
                "Discarding generation {} for closed session {}",
                outcome.ticket, outcome.session.0
            );
            return;
        };
        if panel.complete(outcome.ticket, outcome.result) {
            self.redraw();
        }
    }

    fn insert(&mut self) -> Result<()> {
        let (Some(text), Some(field)) = (
            self.overlay.panel().and_then(|p| p.request_insert()),
            self.overlay.panel_field(),
        ) else {
            return Ok(());
        };

        if self.writer.insert(&mut self.doc, field, &text) == InsertOutcome::StaleTarget {
            debug!("Nothing to insert into; closing panel");
        }
        self.overlay.close_panel(&mut self.doc)?;
        // rewriting the field may have taken the trigger with it
        self.release_detached();
        self.redraw();
        Ok(())
    }

    fn release_detached(&mut self) {
        if let Some(observed) = self.observed {
            if !self.doc.is_attached(observed.node) {
                debug!("Observed field {} left the document", observed.node);
                self.observed = None;
            }
        }
        self.overlay.release_stale(&self.doc);
    }

    fn redraw(&mut self) {
        if let Err(e) = self.overlay.render_panel(&mut self.doc) {
            warn!("Panel render failed: {e}");
        }
        if let Some(renderer) = self.renderer.as_mut() {
            let view = OverlayView {
                state: self.overlay.state(),
                observed: self.observed,
                panel: self.overlay.panel(),
            };
            renderer.redraw(&view);
        }
    }
}
