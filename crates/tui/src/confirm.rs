use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};

pub struct ConfirmDialog {
    pub message: String,
    pub selected: bool, // true = Yes, false = No
}

impl ConfirmDialog {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            selected: false,
        }
    }

    pub fn toggle(&mut self) {
        self.selected = !self.selected;
    }

    pub fn render(&self, f: &mut Frame) {
        let area = centered_rect(40, 7, f.area());
        f.render_widget(Clear, area);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(" Confirm ");
        let inner = block.inner(area);
        f.render_widget(block, area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(1), // message
                Constraint::Length(1),
                Constraint::Length(1), // buttons
            ])
            .split(inner);

        let msg = Paragraph::new(Line::from(Span::styled(&self.message, Style::default().fg(Color::White))))
            .alignment(Alignment::Center);
        f.render_widget(msg, rows[1]);

        let button = |label: &'static str, active: bool, bg: Color| {
            if active {
                Span::styled(label, Style::default().fg(Color::Black).bg(bg).add_modifier(Modifier::BOLD))
            } else {
                Span::styled(label, Style::default().fg(Color::DarkGray))
            }
        };
        let buttons = Line::from(vec![
            button("  [Yes]  ", self.selected, Color::Green),
            Span::raw("   "),
            button("  [No]  ", !self.selected, Color::Red),
        ]);
        f.render_widget(Paragraph::new(buttons).alignment(Alignment::Center), rows[3]);
    }
}

/// A `width` x `height` rect centered in `area`, clipped to it.
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}
