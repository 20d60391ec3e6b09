use std::io;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind, MouseEventKind};
use ratatui::{Terminal, backend::CrosstermBackend};

use crate::App;
use crate::ui;

pub fn run(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> anyhow::Result<()> {
    loop {
        if app.should_quit {
            return Ok(());
        }

        app.drain_logs();
        terminal.draw(|f| ui::draw(f, app))?;

        // ~30fps redraw keeps the cursor animation smooth
        if !event::poll(Duration::from_millis(33))? {
            continue;
        }
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                if let Some(dialog) = app.confirm.as_mut() {
                    match key.code {
                        KeyCode::Left | KeyCode::Right | KeyCode::Tab | KeyCode::Char('h') | KeyCode::Char('l') => {
                            dialog.toggle();
                        }
                        KeyCode::Enter => {
                            let accept = dialog.selected;
                            app.answer_confirm(accept);
                        }
                        KeyCode::Char('y') | KeyCode::Char('Y') => app.answer_confirm(true),
                        KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => app.answer_confirm(false),
                        _ => {}
                    }
                    continue;
                }
                match key.code {
                    KeyCode::Char('q') | KeyCode::Char('Q') => app.quit(),
                    KeyCode::Up | KeyCode::Char('k') | KeyCode::Char('K') => app.move_up(),
                    KeyCode::Down | KeyCode::Char('j') | KeyCode::Char('J') => app.move_down(),
                    KeyCode::Enter | KeyCode::Char(' ') => app.run_selected(),
                    KeyCode::Char('s') | KeyCode::Char('S') => app.stop(),
                    KeyCode::Char('r') | KeyCode::Char('R') => app.request_reset(),
                    KeyCode::Char('l') | KeyCode::Char('L') => app.toggle_log(),
                    _ => {}
                }
            }
            Event::Mouse(mouse) => match mouse.kind {
                MouseEventKind::ScrollUp => app.scroll_log_up(3),
                MouseEventKind::ScrollDown => app.scroll_log_down(3),
                _ => {}
            },
            _ => {}
        }
    }
}
