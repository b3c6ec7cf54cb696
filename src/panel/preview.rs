//! Terminal preview of the panel

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::Stylize,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget},
};
use unicode_width::UnicodeWidthChar;

use super::theme::Theme;
use super::{PanelController, TurnRole};

/// Renders a [`PanelController`] as a centered box, the way the page shows it
/// over the dimmed layer.
pub struct PanelPreview<'a> {
    panel: &'a PanelController,
}

impl<'a> PanelPreview<'a> {
    pub fn new(panel: &'a PanelController) -> Self {
        Self { panel }
    }

    pub fn render(&self, area: Rect, buf: &mut Buffer) {
        let width = (area.width / 4 * 3).clamp(24, 72).min(area.width);
        let height = area.height.saturating_sub(2).max(3).min(area.height);
        let x = area.x + (area.width - width) / 2;
        let y = area.y + (area.height - height) / 2;
        let panel_area = Rect::new(x, y, width, height);

        Clear.render(panel_area, buf);

        let inner_width = width.saturating_sub(2) as usize;
        let bubble_width = (inner_width * 3 / 4).max(1);
        let mut lines: Vec<Line> = Vec::new();

        if self.panel.conversation().is_empty() {
            lines.push(Line::styled("Ask for a reply draft.", Theme::muted()));
        }
        for turn in self.panel.conversation().turns() {
            let alignment = match turn.role {
                TurnRole::Requester => Alignment::Right,
                TurnRole::Responder => Alignment::Left,
            };
            for row in wrap_to_width(&turn.text, bubble_width) {
                lines.push(Line::styled(row, Theme::turn(turn.role)).alignment(alignment));
            }
            lines.push(Line::default());
        }
        if self.panel.is_pending() {
            lines.push(Line::styled("Writing a reply...", Theme::thinking()));
        }

        // Keep the newest turns visible; two rows are reserved for the prompt
        let body_rows = (height.saturating_sub(2) as usize).saturating_sub(2);
        if lines.len() > body_rows {
            lines.drain(..lines.len() - body_rows);
        }

        lines.push(Line::styled("─".repeat(inner_width), Theme::muted()));
        lines.push(if self.panel.input().is_empty() {
            Line::styled("> Your prompt", Theme::muted())
        } else {
            Line::from(vec![
                Span::styled("> ", Theme::key()),
                Span::styled(self.panel.input().to_string(), Theme::text()),
            ])
        });

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Theme::border())
            .title_top(Line::styled(" Reply assistant ", Theme::title()))
            .title_bottom(self.controls_line());

        Paragraph::new(lines).block(block).render(panel_area, buf);
    }

    fn controls_line(&self) -> Line<'static> {
        let control = |label: &'static str, enabled: bool| {
            if enabled {
                Span::styled(format!(" {label} "), Theme::key()).bold()
            } else {
                Span::styled(format!(" {label} "), Theme::key_disabled())
            }
        };

        let mut spans = Vec::new();
        if !self.panel.conversation().is_empty() {
            spans.push(control("Clear All", self.panel.can_clear()));
            spans.push(control("Insert", self.panel.can_insert()));
        }
        spans.push(control(self.panel.mode().label(), self.panel.can_submit()));
        spans.push(control("Close", true));
        Line::from(spans)
    }

    /// Render into a fresh buffer and return its rows as plain text
    pub fn render_to_string(&self, width: u16, height: u16) -> String {
        let area = Rect::new(0, 0, width, height);
        let mut buf = Buffer::empty(area);
        self.render(area, &mut buf);

        buf.content()
            .chunks(width.max(1) as usize)
            .map(|row| {
                let line: String = row.iter().map(|cell| cell.symbol()).collect();
                line.trim_end().to_string()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn wrap_to_width(text: &str, max_width: usize) -> Vec<String> {
    let mut rows = Vec::new();
    for raw in text.lines() {
        let mut current = String::new();
        let mut current_width = 0usize;
        for ch in raw.chars() {
            let ch_width = UnicodeWidthChar::width(ch).unwrap_or(1);
            if current_width + ch_width > max_width && !current.is_empty() {
                rows.push(std::mem::take(&mut current));
                current_width = 0;
            }
            current.push(ch);
            current_width += ch_width;
        }
        rows.push(current);
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::SessionId;

    #[test]
    fn test_preview_shows_turns_and_mode() {
        let mut panel = PanelController::new(SessionId(0));
        let empty = PanelPreview::new(&panel).render_to_string(60, 16);
        assert!(empty.contains("Generate"));
        assert!(!empty.contains("Insert"));

        panel.set_input("Hello");
        let request = panel.submit().unwrap();
        panel.complete(request.ticket, Ok("Sounds good".to_string()));

        let text = PanelPreview::new(&panel).render_to_string(60, 16);
        assert!(text.contains("Hello"));
        assert!(text.contains("Sounds good"));
        assert!(text.contains("Regenerate"));
        assert!(text.contains("Insert"));
    }

    #[test]
    fn test_very_wide_area_keeps_panel_width() {
        let panel = PanelController::new(SessionId(0));
        let area = Rect::new(0, 0, 30_000, 20);
        let mut buf = Buffer::empty(area);
        PanelPreview::new(&panel).render(area, &mut buf);
        assert_eq!(buf.area.width, 30_000);
    }

    #[test]
    fn test_wrap_splits_long_text() {
        let rows = wrap_to_width("abcdefgh", 3);
        assert_eq!(rows, vec!["abc", "def", "gh"]);
    }
}
