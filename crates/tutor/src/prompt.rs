//! System prompts for the two request kinds.
//!
//! Every function here is pure: the same inputs always produce the same text.

use rethink_protocol::{ChatTurn, Subject};

/// What the detector should evaluate for a subject.
#[must_use]
pub const fn subject_context(subject: Subject) -> &'static str {
    match subject {
        Subject::Writing => "grammar, logical consistency, factual accuracy and clarity",
        Subject::Math => {
            "mathematical correctness, calculation mistakes and the logic of each step in an equation or proof"
        }
        Subject::Science => {
            "scientific and factual accuracy in biology, chemistry, physics and related fields"
        }
        Subject::Other => "general correctness, logical consistency and factual accuracy",
    }
}

#[must_use]
pub fn analysis_system_prompt(subject: Subject) -> String {
    format!(
        r#"You detect mistakes in student work. Evaluate it for {context}.

Each request contains two parts:
- full text: the whole document. Use it only as context.
- new content: the sentence or line the student just finished. Check only this part.

Answer with a single JSON object and nothing else.

When the new content contains a mistake:
{{"hasError": true, "internalError": "<precise explanation of the mistake, read only by a tutor>", "location": "<where the student should look, such as In your most recent sentence.>"}}

When it does not:
{{"hasError": false}}

Constraints:
- Never flag anything outside the new content.
- The location names where to look and must not hint at what is wrong.
- The internalError must be specific enough for a tutor to guide the student toward it."#,
        context = subject_context(subject)
    )
}

#[must_use]
pub fn analysis_user_message(full_text: &str, new_content: &str) -> String {
    format!(
        "Full text:\n\"\"\"\n{full_text}\n\"\"\"\n\nNew content to check:\n\"\"\"\n{new_content}\n\"\"\""
    )
}

#[must_use]
pub fn chat_system_prompt(full_text: &str, error_internal: &str) -> String {
    format!(
        r#"You are a Socratic tutor. The student made a mistake and you help them find and fix it on their own.

The student's work:
"""
{full_text}
"""

The mistake (never reveal it directly):
"""
{error_internal}
"""

How to respond:
1. Do not state the mistake or its correction.
2. Guide with questions so the student discovers it.
3. Begin broadly; become more specific only after the student has been stuck for several turns.
4. Stay patient and encouraging.
5. When the student identifies the mistake correctly, confirm it warmly.
6. Keep every reply to two or three sentences."#
    )
}

/// Messages for an analysis request: system prompt, then the document and the unit to check.
#[must_use]
pub fn analysis_messages(subject: Subject, full_text: &str, new_content: &str) -> Vec<ChatTurn> {
    vec![
        ChatTurn::system(analysis_system_prompt(subject)),
        ChatTurn::user(analysis_user_message(full_text, new_content)),
    ]
}

/// Messages for a chat request: system prompt, the episode's history in order, then the new
/// user message.
#[must_use]
pub fn chat_messages(
    full_text: &str,
    error_internal: &str,
    history: &[ChatTurn],
    message: &str,
) -> Vec<ChatTurn> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatTurn::system(chat_system_prompt(full_text, error_internal)));
    messages.extend(history.iter().cloned());
    messages.push(ChatTurn::user(message));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rethink_protocol::ChatRole;

    #[test]
    fn every_subject_has_distinct_context() {
        let contexts: std::collections::HashSet<_> =
            Subject::ALL.iter().map(|s| subject_context(*s)).collect();
        assert_eq!(contexts.len(), Subject::ALL.len());
        assert!(subject_context(Subject::Math).contains("calculation"));
        assert!(subject_context(Subject::Writing).contains("grammar"));
    }

    #[test]
    fn analysis_prompt_is_deterministic_and_names_contract() {
        let a = analysis_system_prompt(Subject::Science);
        let b = analysis_system_prompt(Subject::Science);
        assert_eq!(a, b);
        assert!(a.contains(subject_context(Subject::Science)));
        assert!(a.contains(r#"{"hasError": false}"#));
        assert!(a.contains("internalError"));
        assert!(a.contains("location"));
    }

    #[test]
    fn analysis_messages_lead_with_system_turn() {
        let messages = analysis_messages(Subject::Math, "2+2=5", "2+2=5");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, ChatRole::System);
        assert_eq!(messages[1].role, ChatRole::User);
        assert!(messages[1].content.contains("2+2=5"));
    }

    #[test]
    fn chat_messages_keep_history_order() {
        let history = vec![ChatTurn::user("is it step 2?"), ChatTurn::assistant("look again")];
        let messages = chat_messages("2+2=5", "2+2 equals 4", &history, "is it the sum?");

        let roles: Vec<_> = messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![ChatRole::System, ChatRole::User, ChatRole::Assistant, ChatRole::User]
        );
        assert!(messages[0].content.contains("2+2 equals 4"));
        assert!(messages[0].content.contains("2+2=5"));
        assert_eq!(messages[3].content, "is it the sum?");
    }
}
