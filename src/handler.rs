use std::time::Instant;

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use crate::app::{App, FocusPane, InputMode};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => {}
        AppEvent::Tick => {
            let now = Instant::now();
            app.tick(now);
            app.poll_tasks(now).await;
        }
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    if key.code == KeyCode::Tab {
        cycle_focus(app);
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

/// Path -> Input -> Chat -> Path. Entering an editable pane starts editing.
fn cycle_focus(app: &mut App) {
    app.focus = match app.focus {
        FocusPane::Path => FocusPane::Input,
        FocusPane::Input => FocusPane::Chat,
        FocusPane::Chat => FocusPane::Path,
    };
    match app.focus {
        FocusPane::Path => {
            app.input_mode = InputMode::Editing;
            app.path_cursor = app.path_input.chars().count();
        }
        FocusPane::Input => {
            app.input_mode = InputMode::Editing;
            app.question_cursor = app.question_input.chars().count();
        }
        FocusPane::Chat => {
            app.input_mode = InputMode::Normal;
        }
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        // Chat scrolling
        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(1),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_down(app.chat_height / 2);
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_up(app.chat_height / 2);
        }
        KeyCode::Char('g') => app.scroll_to_top(),
        KeyCode::Char('G') => app.scroll_to_bottom(),

        // Quick questions, same gate as typed submission
        KeyCode::Char(c @ '1'..='4') => {
            app.submit_quick_question(c as usize - '1' as usize);
        }

        // Jump straight into an editor
        KeyCode::Char('i') | KeyCode::Char('a') => {
            app.focus = FocusPane::Input;
            app.input_mode = InputMode::Editing;
            app.question_cursor = app.question_input.chars().count();
        }
        KeyCode::Char('p') => {
            app.focus = FocusPane::Path;
            app.input_mode = InputMode::Editing;
            app.path_cursor = app.path_input.chars().count();
        }

        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    let now = Instant::now();

    // Which buffer is being edited follows the focused pane.
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
            app.focus = FocusPane::Chat;
        }
        KeyCode::Enter => match app.focus {
            FocusPane::Path => app.start_load(now),
            FocusPane::Input => {
                let question = app.question_input.clone();
                app.submit_question(&question);
            }
            FocusPane::Chat => {}
        },
        _ => {
            let (buffer, cursor) = match app.focus {
                FocusPane::Path => (&mut app.path_input, &mut app.path_cursor),
                FocusPane::Input => (&mut app.question_input, &mut app.question_cursor),
                FocusPane::Chat => return,
            };
            edit_line(buffer, cursor, key);
        }
    }
}

fn edit_line(buffer: &mut String, cursor: &mut usize, key: KeyEvent) {
    match key.code {
        KeyCode::Backspace => {
            if *cursor > 0 {
                *cursor -= 1;
                let byte_pos = char_to_byte_index(buffer, *cursor);
                buffer.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = buffer.chars().count();
            if *cursor < char_count {
                let byte_pos = char_to_byte_index(buffer, *cursor);
                buffer.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            *cursor = cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = buffer.chars().count();
            *cursor = (*cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            *cursor = 0;
        }
        KeyCode::End => {
            *cursor = buffer.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(buffer, *cursor);
            buffer.insert(byte_pos, c);
            *cursor += 1;
        }
        _ => {}
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(3),
        MouseEventKind::ScrollUp => app.scroll_up(3),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_char_to_byte_index_multibyte() {
        let s = "héllo";
        assert_eq!(char_to_byte_index(s, 0), 0);
        assert_eq!(char_to_byte_index(s, 2), 3);
        assert_eq!(char_to_byte_index(s, 5), s.len());
    }

    #[test]
    fn test_edit_line_insert_and_delete() {
        let mut buffer = String::new();
        let mut cursor = 0;
        for c in "répo".chars() {
            edit_line(&mut buffer, &mut cursor, key(KeyCode::Char(c)));
        }
        assert_eq!(buffer, "répo");
        assert_eq!(cursor, 4);

        edit_line(&mut buffer, &mut cursor, key(KeyCode::Backspace));
        assert_eq!(buffer, "rép");

        edit_line(&mut buffer, &mut cursor, key(KeyCode::Home));
        edit_line(&mut buffer, &mut cursor, key(KeyCode::Delete));
        assert_eq!(buffer, "ép");
    }

    #[test]
    fn test_edit_line_cursor_bounds() {
        let mut buffer = "ab".to_string();
        let mut cursor = 0;
        edit_line(&mut buffer, &mut cursor, key(KeyCode::Left));
        assert_eq!(cursor, 0);
        edit_line(&mut buffer, &mut cursor, key(KeyCode::End));
        assert_eq!(cursor, 2);
        edit_line(&mut buffer, &mut cursor, key(KeyCode::Right));
        assert_eq!(cursor, 2);
    }
}
