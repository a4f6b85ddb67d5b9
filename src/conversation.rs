use serde::{Deserialize, Serialize};

/// Assistant message seeded into every fresh conversation.
pub const GREETING: &str = "How may I assist you today?";

pub const MAX_LENGTH_MIN: u32 = 50;
pub const MAX_LENGTH_MAX: u32 = 500;
pub const FREQUENCY_PENALTY_MIN: f32 = 0.0;
pub const FREQUENCY_PENALTY_MAX: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

/// Generation settings exposed in the sidebar. Setters clamp, so the stored
/// values are always inside the advertised ranges.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Settings {
    max_length: u32,
    frequency_penalty: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_length: 150,
            frequency_penalty: 0.2,
        }
    }
}

impl Settings {
    pub fn max_length(&self) -> u32 {
        self.max_length
    }

    pub fn set_max_length(&mut self, value: u32) {
        self.max_length = value.clamp(MAX_LENGTH_MIN, MAX_LENGTH_MAX);
    }

    pub fn frequency_penalty(&self) -> f32 {
        self.frequency_penalty
    }

    pub fn set_frequency_penalty(&mut self, value: f32) {
        self.frequency_penalty = value.clamp(FREQUENCY_PENALTY_MIN, FREQUENCY_PENALTY_MAX);
    }
}

/// Ordered, append-only message history for one session.
///
/// Invariant: the first message is always the seeded assistant greeting, so
/// the history is never empty and `exchanges()` can skip it by position.
pub struct Conversation {
    messages: Vec<Message>,
    pub settings: Settings,
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            messages: vec![Message {
                role: Role::Assistant,
                content: GREETING.to_string(),
            }],
            settings: Settings::default(),
        }
    }

    /// Drop the history back to the single seeded greeting. Settings survive.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.messages.push(Message {
            role: Role::Assistant,
            content: GREETING.to_string(),
        });
    }

    pub fn push_user(&mut self, content: String) {
        self.messages.push(Message {
            role: Role::User,
            content,
        });
    }

    pub fn push_assistant(&mut self, content: String) {
        self.messages.push(Message {
            role: Role::Assistant,
            content,
        });
    }

    /// Full history in chronological order, greeting included.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The turns that go into the model transcript. The canned greeting is
    /// interface chrome, not model output, so it stays out of the prompt.
    pub fn exchanges(&self) -> &[Message] {
        &self.messages[1..]
    }

    /// Serializable view of the live history for "Save Conversation".
    pub fn snapshot(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_conversation_holds_only_the_greeting() {
        let conversation = Conversation::new();
        assert_eq!(conversation.len(), 1);
        assert_eq!(conversation.messages()[0].role, Role::Assistant);
        assert_eq!(conversation.messages()[0].content, GREETING);
        assert!(conversation.exchanges().is_empty());
    }

    #[test]
    fn reset_restores_the_single_greeting() {
        let mut conversation = Conversation::new();
        conversation.push_user("Hello".to_string());
        conversation.push_assistant("Hi there".to_string());
        conversation.reset();

        assert_eq!(conversation.len(), 1);
        assert_eq!(conversation.messages()[0].role, Role::Assistant);
        assert_eq!(conversation.messages()[0].content, GREETING);
    }

    #[test]
    fn n_pairs_after_reset_yield_one_plus_two_n_messages() {
        let mut conversation = Conversation::new();
        conversation.reset();

        let n = 4;
        for i in 0..n {
            conversation.push_user(format!("question {}", i));
            conversation.push_assistant(format!("answer {}", i));
        }

        assert_eq!(conversation.len(), 1 + 2 * n);
        assert_eq!(conversation.exchanges().len(), 2 * n);
    }

    #[test]
    fn max_length_clamps_to_range() {
        let mut settings = Settings::default();
        assert_eq!(settings.max_length(), 150);

        settings.set_max_length(10);
        assert_eq!(settings.max_length(), MAX_LENGTH_MIN);

        settings.set_max_length(9999);
        assert_eq!(settings.max_length(), MAX_LENGTH_MAX);

        settings.set_max_length(300);
        assert_eq!(settings.max_length(), 300);
    }

    #[test]
    fn frequency_penalty_clamps_to_range() {
        let mut settings = Settings::default();
        assert!((settings.frequency_penalty() - 0.2).abs() < f32::EPSILON);

        settings.set_frequency_penalty(-0.5);
        assert_eq!(settings.frequency_penalty(), FREQUENCY_PENALTY_MIN);

        settings.set_frequency_penalty(2.0);
        assert_eq!(settings.frequency_penalty(), FREQUENCY_PENALTY_MAX);

        settings.set_frequency_penalty(0.7);
        assert!((settings.frequency_penalty() - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let mut conversation = Conversation::new();
        conversation.push_user("¿Qué libros recomiendas?".to_string());
        conversation.push_assistant("Here are a few.".to_string());

        let json = serde_json::to_string(conversation.snapshot()).unwrap();
        let restored: Vec<Message> = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, conversation.snapshot());
        assert_eq!(restored[1].role, Role::User);
    }
}
