use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::path::Path;

use crate::app::{App, InputMode};
use crate::conversation::Message;
use crate::tui::AppEvent;

/// File written by the save action, in the working directory.
pub const EXPORT_FILE: &str = "conversation.json";

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick_animation();
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

    if app.show_model_picker {
        handle_picker_key(app, key);
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        // Quit
        KeyCode::Char('q') => app.should_quit = true,

        // Back to writing
        KeyCode::Char('i') | KeyCode::Char('e') => {
            app.input_mode = InputMode::Editing;
        }

        // Transcript scrolling
        KeyCode::Char('j') | KeyCode::Down => app.scroll_chat_down(),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_chat_up(),
        KeyCode::Char('g') => app.scroll_chat_to_top(),
        KeyCode::Char('G') => app.scroll_chat_to_bottom(),

        // Conversation actions
        KeyCode::Char('c') => app.clear_conversation(),
        KeyCode::Char('s') => export_conversation(app),
        KeyCode::Char('m') => app.open_model_picker(),

        // Settings adjustments
        KeyCode::Char('+') | KeyCode::Char('=') => app.raise_max_length(),
        KeyCode::Char('-') => app.lower_max_length(),
        KeyCode::Char(']') => app.raise_frequency_penalty(),
        KeyCode::Char('[') => app.lower_frequency_penalty(),

        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            app.submit_prompt();
        }
        KeyCode::Backspace => {
            if app.input_cursor > 0 {
                app.input_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.input.chars().count();
            if app.input_cursor < char_count {
                let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.input_cursor = app.input_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.input.chars().count();
            app.input_cursor = (app.input_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.input_cursor = 0;
        }
        KeyCode::End => {
            app.input_cursor = app.input.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
            app.input.insert(byte_pos, c);
            app.input_cursor += 1;
        }
        _ => {}
    }
}

fn handle_picker_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.close_model_picker(),
        KeyCode::Char('j') | KeyCode::Down => app.model_picker_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.model_picker_nav_up(),
        KeyCode::Enter => app.select_model(),
        _ => {}
    }
}

fn export_conversation(app: &mut App) {
    match write_snapshot(app.conversation.snapshot(), Path::new(EXPORT_FILE)) {
        Ok(()) => {
            app.last_error = None;
            app.notice = Some(format!("Saved {}", EXPORT_FILE));
        }
        Err(err) => {
            app.last_error = Some(format!("save failed: {:#}", err));
        }
    }
}

/// Serialize the live message history as pretty-printed JSON.
fn write_snapshot(messages: &[Message], path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(messages)?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{Conversation, Role};

    #[test]
    fn char_to_byte_index_handles_multibyte_chars() {
        let s = "héllo wörld";
        assert_eq!(char_to_byte_index(s, 0), 0);
        assert_eq!(char_to_byte_index(s, 1), 1);
        // 'é' is two bytes, so char 2 starts at byte 3
        assert_eq!(char_to_byte_index(s, 2), 3);
        // Past the end clamps to the string length
        assert_eq!(char_to_byte_index(s, 100), s.len());
    }

    #[test]
    fn snapshot_export_is_the_live_history() {
        let mut conversation = Conversation::new();
        conversation.push_user("Do you have anything by Borges?".to_string());
        conversation.push_assistant("Ficciones is on the shelf.".to_string());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(EXPORT_FILE);
        write_snapshot(conversation.snapshot(), &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let restored: Vec<Message> = serde_json::from_str(&contents).unwrap();

        assert_eq!(restored.len(), 3);
        assert_eq!(restored[0].role, Role::Assistant);
        assert_eq!(restored[1].content, "Do you have anything by Borges?");
        assert_eq!(restored[2].content, "Ficciones is on the shelf.");
    }
}
