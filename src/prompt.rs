use crate::conversation::{Message, Role};

/// Fixed system instruction placed ahead of the transcript.
pub const SYSTEM_PREAMBLE: &str = "You are a helpful assistant. You do not respond as 'User' or pretend to be 'User'. You only respond once as 'Assistant'.";

/// Render a message sequence into the transcript sent to the model.
///
/// Pure function of (preamble, messages): the same sequence always produces
/// the same string. Each message becomes `"<Role>: <content>\n\n"`.
pub fn assemble(messages: &[Message]) -> String {
    let mut transcript = String::from(SYSTEM_PREAMBLE);

    for message in messages {
        let label = match message.role {
            Role::User => "User",
            Role::Assistant => "Assistant",
        };
        transcript.push_str(&format!("{}: {}\n\n", label, message.content));
    }

    transcript
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Conversation;

    #[test]
    fn single_user_turn_renders_after_the_preamble() {
        let mut conversation = Conversation::new();
        conversation.reset();
        conversation.push_user("Hello".to_string());

        let transcript = assemble(conversation.exchanges());
        assert_eq!(transcript, format!("{}User: Hello\n\n", SYSTEM_PREAMBLE));
    }

    #[test]
    fn roles_are_labeled_in_chronological_order() {
        let mut conversation = Conversation::new();
        conversation.push_user("What do you have on beekeeping?".to_string());
        conversation.push_assistant("Two shelves worth.".to_string());
        conversation.push_user("Start me with one book.".to_string());

        let transcript = assemble(conversation.exchanges());
        let expected = format!(
            "{}User: What do you have on beekeeping?\n\nAssistant: Two shelves worth.\n\nUser: Start me with one book.\n\n",
            SYSTEM_PREAMBLE
        );
        assert_eq!(transcript, expected);
    }

    #[test]
    fn identical_sequences_produce_identical_transcripts() {
        let build = || {
            let mut conversation = Conversation::new();
            conversation.push_user("same input".to_string());
            conversation.push_assistant("same output".to_string());
            assemble(conversation.exchanges())
        };

        assert_eq!(build(), build());
    }

    #[test]
    fn empty_sequence_is_just_the_preamble() {
        let conversation = Conversation::new();
        assert_eq!(assemble(conversation.exchanges()), SYSTEM_PREAMBLE);
    }
}
