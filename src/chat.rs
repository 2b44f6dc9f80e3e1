//! Tutor chat session state.

use crate::models::ChatMessage;

/// One lesson's conversation with the tutor.
///
/// Messages are append-only. Sends are serialized: while a reply is pending the
/// session refuses new sends and the UI keeps the input disabled. Sends are
/// also refused until the seed has arrived, so the seed always initializes the
/// message sequence and every forwarded history starts with it.
#[derive(Debug, Default)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
    pending: bool,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the conversation with the opening explanation. Invoked once per
    /// lesson entry.
    pub fn seed(&mut self, explanation: impl Into<String>) {
        self.messages.push(ChatMessage::model(explanation));
    }

    /// Start sending a learner message. Appends it and returns the prior
    /// history to forward to the provider (the new message excluded). Returns
    /// `None` while a send is pending, before the session has been seeded, or
    /// when the trimmed text is empty.
    pub fn begin_send(&mut self, text: &str) -> Option<Vec<ChatMessage>> {
        let text = text.trim();
        if self.pending || self.messages.is_empty() || text.is_empty() {
            return None;
        }
        let history = self.messages.clone();
        self.messages.push(ChatMessage::user(text));
        self.pending = true;
        Some(history)
    }

    /// Append the tutor's reply to the pending send.
    pub fn apply_reply(&mut self, text: impl Into<String>) {
        self.messages.push(ChatMessage::model(text));
        self.pending = false;
    }

    /// Whether a send is awaiting its reply.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    #[test]
    fn seed_creates_a_single_model_message() {
        let mut chat = ChatSession::new();
        chat.seed("周长就是围着图形走一圈的长度。");
        assert_eq!(chat.messages().len(), 1);
        assert_eq!(chat.messages()[0].role, Role::Model);
    }

    #[test]
    fn send_history_excludes_the_new_message() {
        let mut chat = ChatSession::new();
        chat.seed("开场讲解");
        let history = chat.begin_send("我不明白，请再讲讲").unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(chat.messages().len(), 2);
        assert_eq!(chat.messages()[1].role, Role::User);
    }

    #[test]
    fn sends_are_serialized_while_pending() {
        let mut chat = ChatSession::new();
        chat.seed("开场讲解");
        assert!(chat.begin_send("第一个问题").is_some());
        assert!(chat.begin_send("第二个问题").is_none());

        chat.apply_reply("老师的回答");
        assert!(!chat.is_pending());
        assert!(chat.begin_send("第二个问题").is_some());
    }

    #[test]
    fn sends_are_refused_before_the_seed() {
        let mut chat = ChatSession::new();
        assert!(chat.begin_send("周长是什么").is_none());
        assert!(chat.messages().is_empty());

        chat.seed("周长就是围着图形走一圈的长度。");
        let history = chat.begin_send("周长是什么").unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role, Role::Model);
    }

    #[test]
    fn blank_input_is_ignored() {
        let mut chat = ChatSession::new();
        assert!(chat.begin_send("   ").is_none());
        assert!(chat.messages().is_empty());
    }

    #[test]
    fn messages_append_in_completion_order() {
        let mut chat = ChatSession::new();
        chat.seed("开场");
        chat.begin_send("问题一");
        chat.apply_reply("回答一");
        chat.begin_send("问题二");
        chat.apply_reply("回答二");

        let roles: Vec<Role> = chat.messages().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            [Role::Model, Role::User, Role::Model, Role::User, Role::Model]
        );
    }
}
