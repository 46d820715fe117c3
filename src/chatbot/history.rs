use std::collections::VecDeque;

use serde::Serialize;

use crate::chatbot::types::{ChatMessage, Role};

/// Number of entries kept in the conversation window.
pub const MAX_HISTORY: usize = 10;

/// Sliding window of the most recent conversation turns.
///
/// Entries are dropped from the front once the window exceeds
/// [`MAX_HISTORY`], so the retained entries are always the newest ones in
/// their original order.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct ConversationHistory {
    entries: VecDeque<ChatMessage>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a user turn followed by the assistant reply, then truncates.
    pub fn push_exchange(&mut self, user: impl Into<String>, assistant: impl Into<String>) {
        self.entries.push_back(ChatMessage::new(Role::User, user));
        self.entries
            .push_back(ChatMessage::new(Role::Assistant, assistant));
        while self.entries.len() > MAX_HISTORY {
            self.entries.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChatMessage> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<ChatMessage> {
        self.entries.iter().cloned().collect()
    }
}
