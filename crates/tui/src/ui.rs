use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Rectangle},
        Block, Borders, Paragraph, Wrap,
    },
};

use emergent_core::layout::{Container, APP_ATTR, CELL_ATTR, DOCK_ATTR};
use emergent_core::logger::{self, Level, LogRecord};
use emergent_core::types::RunnerState;

use crate::app::{lock, App};

pub fn draw(f: &mut Frame, app: &App) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(f.area());

    draw_left(f, app, columns[0]);

    if app.log_visible {
        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(55), Constraint::Min(0)])
            .split(columns[1]);
        draw_desktop(f, app, right[0]);
        draw_logs(f, app, right[1]);
    } else {
        draw_desktop(f, app, columns[1]);
    }

    if let Some(dialog) = &app.confirm {
        dialog.render(f);
    }
}

fn key(k: &'static str) -> Span<'static> {
    Span::styled(k, Style::default().fg(Color::Yellow))
}

fn draw_left(f: &mut Frame, app: &App, area: Rect) {
    let (banner_label, banner_bg) = match app.runner_state() {
        RunnerState::Running => ("RUNNING (Press S to stop)", Color::Green),
        RunnerState::Stopping => ("STOPPING...", Color::Yellow),
        RunnerState::Idle => ("IDLE (Press Enter to run)", Color::Red),
    };

    let mut lines: Vec<Line> = vec![
        Line::from(vec![
            key(" j"),
            Span::raw("/"),
            key("k"),
            Span::raw(" select, "),
            key("enter"),
            Span::raw(" run, "),
            key("r"),
            Span::raw(" reset, "),
            key("l"),
            Span::raw(" logs"),
        ]),
        Line::from(""),
    ];

    for (i, wf) in app.catalog.iter().enumerate() {
        let prefix = if i == app.selected { "> " } else { "  " };
        lines.push(Line::from(vec![
            Span::raw(prefix),
            Span::styled(wf.name.clone(), Style::default().fg(Color::White).add_modifier(Modifier::BOLD)),
            Span::styled(format!("  {} steps", wf.actions.len()), Style::default().fg(Color::DarkGray)),
        ]));
        if i == app.selected && !wf.description.is_empty() {
            lines.push(Line::from(Span::styled(
                format!("    {}", wf.description),
                Style::default().fg(Color::DarkGray),
            )));
        }
    }

    lines.push(Line::from(""));
    lines.extend(agent_lines(app));
    lines.push(Line::from(""));
    lines.extend(store_lines(app));

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(area);

    let width = rows[0].width as usize;
    let pad_total = width.saturating_sub(banner_label.len());
    let pad_left = pad_total / 2;
    let centered = format!("{}{}{}", " ".repeat(pad_left), banner_label, " ".repeat(pad_total - pad_left));
    f.render_widget(
        Paragraph::new(Line::from(Span::styled(
            centered,
            Style::default().fg(Color::Black).bg(banner_bg).add_modifier(Modifier::BOLD),
        ))),
        rows[0],
    );

    let body = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::LEFT | Borders::RIGHT | Borders::BOTTOM)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    f.render_widget(body, rows[1]);
}

fn pulse(label: &'static str, on: bool, color: Color) -> Span<'static> {
    if on {
        Span::styled(label, Style::default().fg(Color::Black).bg(color))
    } else {
        Span::styled(label, Style::default().fg(Color::DarkGray))
    }
}

fn agent_lines(app: &App) -> Vec<Line<'static>> {
    let agent = lock(&app.agent).clone();
    let windows = lock(&app.windows).join(", ");
    let label = if agent.workflow_name.is_empty() { "-".to_string() } else { agent.workflow_name };
    vec![
        Line::from(vec![
            Span::styled(" agent ", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
            Span::raw(label),
        ]),
        Line::from(vec![
            Span::raw(format!("   cursor ({:>6.1}, {:>6.1})  ", agent.position.x, agent.position.y)),
            pulse(" click ", agent.is_clicking, Color::Red),
            Span::raw(" "),
            pulse(" type ", agent.is_typing, Color::Yellow),
        ]),
        Line::from(Span::styled(
            format!("   windows: {}", if windows.is_empty() { "-" } else { &windows }),
            Style::default().fg(Color::Cyan),
        )),
    ]
}

fn store_lines(app: &App) -> Vec<Line<'static>> {
    let s = lock(&app.desktop).clone();
    let dim = Style::default().fg(Color::DarkGray);
    let last_cmd = s
        .terminal
        .commands
        .last()
        .map(|c| format!("$ {} -> {}", c.command, c.output.lines().next().unwrap_or("")))
        .unwrap_or_else(|| "-".into());
    let draft = s
        .gmail
        .composing
        .as_ref()
        .map(|d| format!("draft to {:?} re {:?}", d.to, d.subject))
        .unwrap_or_else(|| "no draft".into());
    let team = s.messages.conversations.get("team").map_or(0, |c| c.len());
    vec![
        Line::from(Span::styled(" store", Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD))),
        Line::from(Span::styled(
            format!(
                "   numbers: {} cells, selected {}",
                s.spreadsheet.cells.len(),
                s.spreadsheet.selected_cell.as_deref().unwrap_or("-")
            ),
            dim,
        )),
        Line::from(Span::styled(format!("   mail: {} in inbox, {}", s.gmail.emails.len(), draft), dim)),
        Line::from(Span::styled(
            format!(
                "   messages: team {}  composing {:?}",
                team,
                s.messages.composing_message.as_deref().unwrap_or("")
            ),
            dim,
        )),
        Line::from(Span::styled(format!("   terminal: {}", last_cmd), dim)),
        Line::from(Span::styled(
            format!(
                "   notes: {}  textedit: {} chars",
                s.selected_note().map_or("-".to_string(), |n| n.title.clone()),
                s.text_edit.documents.get(&s.text_edit.active_document_id).map_or(0, |d| d.content.len())
            ),
            dim,
        )),
    ]
}

fn draw_desktop(f: &mut Frame, app: &App, area: Rect) {
    let bounds = app.layout.bounds();
    let agent = lock(&app.agent).clone();
    let windows = lock(&app.windows).clone();
    let show_cells = windows.iter().any(|w| w == "numbers");
    let height = bounds.h;
    // Canvas y grows upwards; layout y grows downwards.
    let flip = move |y: f64| height - y;

    let canvas = Canvas::default()
        .block(Block::default().borders(Borders::ALL).title(" Desktop ").border_style(Style::default().fg(Color::Cyan)))
        .x_bounds([0.0, bounds.w])
        .y_bounds([0.0, bounds.h])
        .paint(|ctx| {
            for (selector, rect) in app.layout.elements() {
                let color = match selector.attr.as_str() {
                    APP_ATTR => Color::Blue,
                    DOCK_ATTR => Color::Gray,
                    CELL_ATTR if show_cells => Color::DarkGray,
                    _ => continue,
                };
                let r = rect.center_within(&bounds);
                ctx.draw(&Rectangle {
                    x: rect.x - bounds.x,
                    y: flip(rect.y - bounds.y + rect.h),
                    width: rect.w,
                    height: rect.h,
                    color,
                });
                if selector.attr != CELL_ATTR {
                    if let Some(id) = &selector.value {
                        ctx.print(r.x - rect.w / 2.0, flip(r.y), Span::styled(id.clone(), Style::default().fg(color)));
                    }
                }
            }
            ctx.layer();
            let cursor_color = if agent.is_clicking {
                Color::Red
            } else if agent.is_typing {
                Color::Yellow
            } else {
                Color::White
            };
            ctx.print(
                agent.position.x,
                flip(agent.position.y),
                Span::styled("◆", Style::default().fg(cursor_color).add_modifier(Modifier::BOLD)),
            );
        });
    f.render_widget(canvas, area);
}

fn draw_logs(f: &mut Frame, app: &App, area: Rect) {
    let visible_height = area.height.saturating_sub(2) as usize;
    let total = app.log_messages.len();
    let max_scroll = total.saturating_sub(visible_height);
    let scroll = app.log_scroll.min(max_scroll);
    let start = total.saturating_sub(visible_height + scroll);
    let end = total.saturating_sub(scroll);
    let log_lines: Vec<Line> = app.log_messages[start..end].iter().map(log_line).collect();

    let panel = Paragraph::new(log_lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Logs ")
                .border_style(Style::default().fg(Color::Yellow)),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(panel, area);
}

fn log_line(record: &LogRecord) -> Line<'_> {
    let color = match record.color {
        logger::COLOR_GRAY => Color::DarkGray,
        logger::COLOR_BLUE => Color::LightBlue,
        logger::COLOR_GREEN => Color::LightGreen,
        logger::COLOR_MAGENTA => Color::LightMagenta,
        _ => Color::White,
    };

    let mut spans = vec![
        Span::styled(record.timestamp.as_str(), Style::default().fg(Color::DarkGray)),
        Span::raw(" "),
    ];
    match record.level {
        Level::Error => spans.push(Span::styled("error ", Style::default().fg(Color::Red))),
        Level::Warn => spans.push(Span::styled("warn ", Style::default().fg(Color::Yellow))),
        Level::Info => {}
    }
    if !record.prefix.is_empty() {
        spans.push(Span::styled(record.prefix.as_str(), Style::default().fg(color).add_modifier(Modifier::BOLD)));
        spans.push(Span::raw(" "));
    }
    spans.push(Span::styled(record.message.as_str(), Style::default().fg(color)));
    Line::from(spans)
}
