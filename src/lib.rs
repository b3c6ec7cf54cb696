//! Compose Overlay
//!
//! Host-page integration for an assistant overlay on a message-composition field:
//! - Watch document focus/blur and recognise the host page's composition field
//! - Show a trigger affordance on that field and open a reply panel from it
//! - Write the chosen reply back into the field and notify the host page

pub mod assets;
pub mod config;
pub mod dom;
pub mod generator;
pub mod injection;
pub mod observer;
pub mod overlay;
pub mod panel;
pub mod runtime;

pub use config::{FieldContract, OverlayConfig};
pub use dom::{DomError, HostDocument, MemoryDocument, NodeId, SyntheticEvent};
pub use generator::{CannedGenerator, GenerateError, MessageGenerator};
pub use injection::{InjectionWriter, InsertOutcome};
pub use observer::{FieldMatcher, FieldObserver, FieldSignal, HostEvent, ObservedField};
pub use overlay::{OverlayManager, OverlayState, PanelControl};
pub use panel::{Conversation, ConversationTurn, GenerationMode, PanelController, TurnRole};
pub use runtime::{OverlayRuntime, OverlayView, Renderer};

/// Result type for overlay operations
pub type Result<T> = std::result::Result<T, OverlayError>;

/// Errors that can occur in the overlay
#[derive(Debug, thiserror::Error)]
pub enum OverlayError {
    #[error("DOM error: {0}")]
    Dom(#[from] DomError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
