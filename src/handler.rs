use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use crate::app::{App, FocusPane};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick_animation(),
        AppEvent::Reply { phone, text } => app.deliver_reply(&phone, &text),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any pane
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    // A status notice survives exactly until the next key press
    app.clear_status();

    match app.focus {
        FocusPane::PhoneInput => handle_phone_input(app, key),
        FocusPane::Conversations => handle_conversations(app, key),
        FocusPane::MessageInput => handle_message_input(app, key),
    }
}

fn handle_phone_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => app.open_phone(),
        KeyCode::Tab => app.focus = FocusPane::Conversations,
        KeyCode::Esc => {
            app.phone_input.clear();
            app.focus = FocusPane::Conversations;
        }
        KeyCode::Backspace => {
            app.phone_input.pop();
        }
        KeyCode::Char(c) => {
            // Phone numbers are written with the leading + even when the
            // user doesn't type it
            if app.phone_input.is_empty() && c != '+' {
                app.phone_input.push('+');
            }
            app.phone_input.push(c);
        }
        _ => {}
    }
}

fn handle_conversations(app: &mut App, key: KeyEvent) {
    match key.code {
        // Quit
        KeyCode::Char('q') => app.should_quit = true,

        // Navigation
        KeyCode::Char('j') | KeyCode::Down => app.list_down(),
        KeyCode::Char('k') | KeyCode::Up => app.list_up(),
        KeyCode::Char('g') => app.select_index(0),
        KeyCode::Char('G') => {
            let len = app.store.len();
            if len > 0 {
                app.select_index(len - 1);
            }
        }

        // Enter/Select
        KeyCode::Enter | KeyCode::Char('l') | KeyCode::Right => {
            if app.store.current().is_some() {
                app.focus = FocusPane::MessageInput;
            }
        }

        KeyCode::Tab => app.focus = FocusPane::MessageInput,
        KeyCode::Esc => app.focus = FocusPane::PhoneInput,

        KeyCode::PageUp => app.scroll_thread_up(),
        KeyCode::PageDown => app.scroll_thread_down(),

        _ => {}
    }
}

fn handle_message_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => app.send_message(),
        KeyCode::Tab => app.focus = FocusPane::PhoneInput,
        KeyCode::Esc => app.focus = FocusPane::Conversations,

        KeyCode::PageUp => app.scroll_thread_up(),
        KeyCode::PageDown => app.scroll_thread_down(),

        KeyCode::Backspace => {
            if app.message_cursor > 0 {
                app.message_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.message_input, app.message_cursor);
                app.message_input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.message_input.chars().count();
            if app.message_cursor < char_count {
                let byte_pos = char_to_byte_index(&app.message_input, app.message_cursor);
                app.message_input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.message_cursor = app.message_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.message_input.chars().count();
            app.message_cursor = (app.message_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.message_cursor = 0;
        }
        KeyCode::End => {
            app.message_cursor = app.message_input.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.message_input, app.message_cursor);
            app.message_input.insert(byte_pos, c);
            app.message_cursor += 1;
        }
        _ => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let x = mouse.column;
    let y = mouse.row;

    let in_sidebar = app.sidebar_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);
    let in_thread = app.thread_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);

    match mouse.kind {
        MouseEventKind::ScrollDown => {
            if in_sidebar {
                app.list_down();
            } else if in_thread {
                app.scroll_thread_down();
                app.scroll_thread_down();
                app.scroll_thread_down();
            }
        }
        MouseEventKind::ScrollUp => {
            if in_sidebar {
                app.list_up();
            } else if in_thread {
                app.scroll_thread_up();
                app.scroll_thread_up();
                app.scroll_thread_up();
            }
        }
        _ => {}
    }
}
