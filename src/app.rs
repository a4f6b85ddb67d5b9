use ratatui::widgets::ListState;
use tokio::task::JoinHandle;

use crate::config::{Config, DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::conversation::Conversation;
use crate::ollama::{GenerateOptions, OllamaClient};
use crate::prompt;

pub const MAX_LENGTH_STEP: u32 = 10;
pub const FREQUENCY_PENALTY_STEP: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// All mutable session state, owned by the event loop and passed by
/// reference into the handler and the renderer. No globals.
pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,

    // Conversation state
    pub conversation: Conversation,

    // Prompt input state
    pub input: String,
    pub input_cursor: usize, // cursor position in input, in chars

    // Chat viewport state
    pub chat_scroll: u16,
    pub chat_height: u16, // inner height of the chat area, set during render
    pub chat_width: u16,  // inner width of the chat area, for wrap calculations

    // Turn state: at most one completion in flight
    pub completion_task: Option<JoinHandle<anyhow::Result<String>>>,
    pub animation_frame: u8, // 0-2 for ellipsis animation
    pub last_error: Option<String>,
    pub notice: Option<String>,

    // Model picker state
    pub show_model_picker: bool,
    pub available_models: Vec<String>,
    pub model_picker_state: ListState,
    pub models_task: Option<JoinHandle<anyhow::Result<Vec<String>>>>,

    // Backend
    pub client: OllamaClient,
    pub selected_model: String,
}

impl App {
    pub fn new() -> Self {
        let config = Config::load().unwrap_or_else(|_| Config::new());

        let base_url = config
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let selected_model = config
            .default_model
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Self {
            should_quit: false,
            input_mode: InputMode::Editing,

            conversation: Conversation::new(),

            input: String::new(),
            input_cursor: 0,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,

            completion_task: None,
            animation_frame: 0,
            last_error: None,
            notice: None,

            show_model_picker: false,
            available_models: Vec::new(),
            model_picker_state: ListState::default(),
            models_task: None,

            client: OllamaClient::new(&base_url),
            selected_model,
        }
    }

    pub fn awaiting_response(&self) -> bool {
        self.completion_task.is_some()
    }

    /// Submit the current input as a user turn. Gated on a non-empty input
    /// (empty prompts are silently ignored) and on no turn being in flight.
    pub fn submit_prompt(&mut self) {
        if self.input.is_empty() || self.completion_task.is_some() {
            return;
        }

        let content = std::mem::take(&mut self.input);
        self.input_cursor = 0;
        self.last_error = None;
        self.notice = None;

        self.conversation.push_user(content);

        // The model sees the full role-labeled transcript, not just the
        // latest prompt, so earlier turns carry into the answer.
        let transcript = prompt::assemble(self.conversation.exchanges());
        let options = GenerateOptions::new(
            self.conversation.settings.max_length(),
            self.conversation.settings.frequency_penalty(),
        );

        let client = self.client.clone();
        let model = self.selected_model.clone();
        self.completion_task = Some(tokio::spawn(async move {
            client.generate(&model, &transcript, options).await
        }));

        self.scroll_chat_to_bottom();
    }

    /// Apply the outcome of a completed turn. On failure nothing is appended:
    /// the history keeps exactly the messages it had when the turn started.
    pub fn finish_turn(&mut self, result: anyhow::Result<String>) {
        match result {
            Ok(text) => {
                self.conversation.push_assistant(text);
                self.scroll_chat_to_bottom();
            }
            Err(err) => {
                self.last_error = Some(format!("{:#}", err));
            }
        }
    }

    /// Reap finished background tasks. Called once per event-loop pass; the
    /// 300ms tick guarantees a pass soon after a task completes.
    pub async fn poll_tasks(&mut self) {
        // is_finished means the awaits below do not block the loop
        if let Some(task) = self
            .completion_task
            .take_if(|task| task.is_finished())
        {
            match task.await {
                Ok(result) => self.finish_turn(result),
                Err(err) => self.last_error = Some(format!("completion task failed: {}", err)),
            }
        }

        if let Some(task) = self.models_task.take_if(|task| task.is_finished()) {
            match task.await {
                Ok(Ok(models)) => {
                    self.available_models = models;
                    if !self.available_models.is_empty() {
                        let selected = self
                            .available_models
                            .iter()
                            .position(|m| *m == self.selected_model)
                            .unwrap_or(0);
                        self.model_picker_state.select(Some(selected));
                    }
                }
                Ok(Err(err)) => {
                    self.show_model_picker = false;
                    self.last_error = Some(format!("{:#}", err));
                }
                Err(err) => {
                    self.show_model_picker = false;
                    self.last_error = Some(format!("model listing task failed: {}", err));
                }
            }
        }
    }

    pub fn clear_conversation(&mut self) {
        self.conversation.reset();
        self.chat_scroll = 0;
        self.last_error = None;
        self.notice = None;
    }

    // Settings adjustments; the store clamps to the valid ranges
    pub fn raise_max_length(&mut self) {
        let value = self.conversation.settings.max_length();
        self.conversation
            .settings
            .set_max_length(value.saturating_add(MAX_LENGTH_STEP));
    }

    pub fn lower_max_length(&mut self) {
        let value = self.conversation.settings.max_length();
        self.conversation
            .settings
            .set_max_length(value.saturating_sub(MAX_LENGTH_STEP));
    }

    pub fn raise_frequency_penalty(&mut self) {
        let value = self.conversation.settings.frequency_penalty();
        self.conversation
            .settings
            .set_frequency_penalty(value + FREQUENCY_PENALTY_STEP);
    }

    pub fn lower_frequency_penalty(&mut self) {
        let value = self.conversation.settings.frequency_penalty();
        self.conversation
            .settings
            .set_frequency_penalty(value - FREQUENCY_PENALTY_STEP);
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.awaiting_response() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Chat scrolling
    pub fn scroll_chat_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    pub fn scroll_chat_down(&mut self) {
        let max_scroll = self.chat_line_count().saturating_sub(self.chat_height);
        if self.chat_scroll < max_scroll {
            self.chat_scroll += 1;
        }
    }

    pub fn scroll_chat_to_top(&mut self) {
        self.chat_scroll = 0;
    }

    /// Scroll so the newest message (or the "Thinking..." line) is visible.
    pub fn scroll_chat_to_bottom(&mut self) {
        let total_lines = self.chat_line_count();

        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        if total_lines > visible_height {
            self.chat_scroll = total_lines - visible_height;
        } else {
            self.chat_scroll = 0;
        }
    }

    /// Rendered line count of the transcript at the current chat width.
    fn chat_line_count(&self) -> u16 {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;

        for msg in self.conversation.messages() {
            total_lines += 1; // Role line ("You:" or "AI:")
            for line in msg.content.lines() {
                // Character count, not byte length, for proper UTF-8 handling
                let char_count = line.chars().count();
                if char_count == 0 {
                    total_lines += 1;
                } else {
                    total_lines += ((char_count / wrap_width) + 1) as u16;
                }
            }
            total_lines += 1; // Blank line after message
        }

        if self.awaiting_response() {
            total_lines += 2; // "AI:" + "Thinking..."
        }

        total_lines
    }

    // Model picker
    pub fn open_model_picker(&mut self) {
        self.show_model_picker = true;
        self.available_models.clear();
        self.model_picker_state = ListState::default();

        let client = self.client.clone();
        self.models_task = Some(tokio::spawn(async move { client.list_models().await }));
    }

    pub fn close_model_picker(&mut self) {
        self.show_model_picker = false;
    }

    pub fn model_picker_nav_down(&mut self) {
        let len = self.available_models.len();
        if len > 0 {
            let i = self.model_picker_state.selected().unwrap_or(0);
            self.model_picker_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn model_picker_nav_up(&mut self) {
        let i = self.model_picker_state.selected().unwrap_or(0);
        self.model_picker_state.select(Some(i.saturating_sub(1)));
    }

    pub fn select_model(&mut self) {
        if let Some(i) = self.model_picker_state.selected() {
            if let Some(model) = self.available_models.get(i) {
                self.selected_model = model.clone();
                self.show_model_picker = false;
                // Save to config
                let _ = Config::save_default_model(&self.selected_model);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn failed_turn_leaves_history_untouched() {
        let mut app = App::new();
        app.conversation.push_user("Hello".to_string());
        let before: Vec<_> = app.conversation.messages().to_vec();

        app.finish_turn(Err(anyhow!("connection refused")));

        assert_eq!(app.conversation.messages(), before.as_slice());
        assert!(app.last_error.is_some());
    }

    #[test]
    fn successful_turn_appends_one_assistant_message() {
        let mut app = App::new();
        app.conversation.push_user("Hello".to_string());
        let before = app.conversation.len();

        app.finish_turn(Ok("Hi! What are you looking for?".to_string()));

        assert_eq!(app.conversation.len(), before + 1);
        let last = app.conversation.messages().last().unwrap();
        assert_eq!(last.content, "Hi! What are you looking for?");
        assert!(app.last_error.is_none());
    }

    #[test]
    fn settings_steps_stay_clamped() {
        let mut app = App::new();

        for _ in 0..100 {
            app.raise_max_length();
            app.raise_frequency_penalty();
        }
        assert_eq!(app.conversation.settings.max_length(), 500);
        assert_eq!(app.conversation.settings.frequency_penalty(), 1.0);

        for _ in 0..100 {
            app.lower_max_length();
            app.lower_frequency_penalty();
        }
        assert_eq!(app.conversation.settings.max_length(), 50);
        assert_eq!(app.conversation.settings.frequency_penalty(), 0.0);
    }

    #[test]
    fn clear_conversation_resets_to_the_greeting() {
        let mut app = App::new();
        app.conversation.push_user("one".to_string());
        app.conversation.push_assistant("two".to_string());
        app.last_error = Some("stale".to_string());

        app.clear_conversation();

        assert_eq!(app.conversation.len(), 1);
        assert!(app.last_error.is_none());
        assert_eq!(app.chat_scroll, 0);
    }
}
