//! Reply panel state
//!
//! The panel owns the conversation for as long as it is mounted. Generation is
//! asynchronous: [`PanelController::submit`] hands out a [`GenerationRequest`]
//! and the caller reports back through [`PanelController::complete`].

mod preview;
mod theme;

pub use preview::PanelPreview;
pub use theme::Theme;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::assets::Icon;
use crate::generator::GenerateError;

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    Requester,
    Responder,
}

/// One immutable entry in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub text: String,
    pub at: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn requester(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Requester,
            text: text.into(),
            at: Utc::now(),
        }
    }

    pub fn responder(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Responder,
            text: text.into(),
            at: Utc::now(),
        }
    }
}

/// Append-only turn history, cleared wholesale
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    turns: Vec<ConversationTurn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
    }

    fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&ConversationTurn> {
        self.turns.last()
    }

    /// The chronologically last responder turn
    pub fn last_response(&self) -> Option<&ConversationTurn> {
        self.turns.iter().rev().find(|t| t.role == TurnRole::Responder)
    }
}

/// Whether the primary action starts or redoes a conversation.
///
/// Always derived from the conversation length, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationMode {
    Generate,
    Regenerate,
}

impl GenerationMode {
    pub fn for_conversation(conversation: &Conversation) -> Self {
        if conversation.is_empty() {
            GenerationMode::Generate
        } else {
            GenerationMode::Regenerate
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GenerationMode::Generate => "Generate",
            GenerationMode::Regenerate => "Regenerate",
        }
    }

    pub fn icon(self) -> Icon {
        match self {
            GenerationMode::Generate => Icon::Generate,
            GenerationMode::Regenerate => Icon::Regenerate,
        }
    }
}

/// Identifies one mount of the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub u64);

/// A generation the controller is waiting on
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub session: SessionId,
    pub ticket: u64,
    pub history: Vec<ConversationTurn>,
}

/// Conversation state behind the panel
#[derive(Debug, Clone)]
pub struct PanelController {
    session: SessionId,
    conversation: Conversation,
    input: String,
    pending: Option<u64>,
    next_ticket: u64,
}

impl PanelController {
    pub fn new(session: SessionId) -> Self {
        Self {
            session,
            conversation: Conversation::new(),
            input: String::new(),
            pending: None,
            next_ticket: 0,
        }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn mode(&self) -> GenerationMode {
        GenerationMode::for_conversation(&self.conversation)
    }

    pub fn can_submit(&self) -> bool {
        !self.input.is_empty() && self.pending.is_none()
    }

    pub fn can_clear(&self) -> bool {
        !self.conversation.is_empty() && self.pending.is_none()
    }

    pub fn can_insert(&self) -> bool {
        self.conversation.last_response().is_some()
    }

    /// Record the pending input as a requester turn and ask for a response.
    ///
    /// Rejected while the input is empty or another generation is pending.
    pub fn submit(&mut self) -> Option<GenerationRequest> {
        if self.input.is_empty() {
            debug!("Ignoring submit with empty input");
            return None;
        }
        if let Some(ticket) = self.pending {
            debug!("Ignoring submit while generation {ticket} is pending");
            return None;
        }

        let text = std::mem::take(&mut self.input);
        self.conversation.push(ConversationTurn::requester(text));

        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.pending = Some(ticket);

        Some(GenerationRequest {
            session: self.session,
            ticket,
            history: self.conversation.turns().to_vec(),
        })
    }

    /// Settle generation `ticket`. Failures become a visible responder turn so
    /// no requester turn is left unanswered. Returns false for unknown tickets.
    pub fn complete(&mut self, ticket: u64, result: Result<String, GenerateError>) -> bool {
        if self.pending != Some(ticket) {
            debug!("Discarding result for stale generation {ticket}");
            return false;
        }
        self.pending = None;

        let text = match result {
            Ok(text) => text,
            Err(err) => failure_text(&err),
        };
        self.conversation.push(ConversationTurn::responder(text));
        true
    }

    /// Empty the conversation. Only available with turns and nothing pending.
    pub fn clear(&mut self) -> bool {
        if !self.can_clear() {
            return false;
        }
        self.conversation.clear();
        true
    }

    /// Text of the most recent responder turn
    pub fn request_insert(&self) -> Option<String> {
        self.conversation.last_response().map(|t| t.text.clone())
    }
}

fn failure_text(err: &GenerateError) -> String {
    format!("Sorry, I couldn't write a reply ({err}). Please try again.")
}
