//! Colors for the panel preview - ANSI colors for terminal compatibility

use ratatui::style::{Color, Modifier, Style};

use super::TurnRole;

/// Theme using ANSI colors that work well across terminal themes
pub struct Theme;

impl Theme {
    pub const BLUE: Color = Color::Blue;
    pub const CYAN: Color = Color::Cyan;
    pub const GRAY: Color = Color::Gray;
    pub const DARK_GRAY: Color = Color::DarkGray;

    pub fn title() -> Style {
        Style::default()
            .fg(Self::CYAN)
            .add_modifier(Modifier::BOLD)
    }

    pub fn text() -> Style {
        Style::default()
    }

    pub fn muted() -> Style {
        Style::default().fg(Self::DARK_GRAY)
    }

    pub fn border() -> Style {
        Style::default().fg(Self::CYAN)
    }

    /// Gray bubble on the right for the requester, blue on the left for replies
    pub fn turn(role: TurnRole) -> Style {
        match role {
            TurnRole::Requester => Style::default().fg(Color::Black).bg(Self::GRAY),
            TurnRole::Responder => Style::default().fg(Color::Black).bg(Self::BLUE),
        }
    }

    pub fn key() -> Style {
        Style::default()
            .fg(Self::CYAN)
            .add_modifier(Modifier::BOLD)
    }

    pub fn key_disabled() -> Style {
        Style::default()
            .fg(Self::DARK_GRAY)
            .add_modifier(Modifier::DIM)
    }

    pub fn thinking() -> Style {
        Style::default()
            .fg(Self::GRAY)
            .add_modifier(Modifier::ITALIC)
    }
}
