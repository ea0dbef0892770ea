//! Append-only conversation transcript.

use chrono::Utc;
use shared::domain::{Message, MessageDraft, MessageId, MessageKind};

pub const DEFAULT_GREETING: &str =
    "Welcome to KubeChat! How can I help you manage your Kubernetes cluster today?";

/// Ordered transcript. Entries are never mutated, removed, or reordered once appended.
///
/// Ids come from a counter owned by the log, so two entries created within the same clock
/// tick still get distinct, increasing ids.
#[derive(Debug, Clone)]
pub struct ConversationLog {
    messages: Vec<Message>,
    next_id: u64,
}

impl Default for ConversationLog {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationLog {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            next_id: 1,
        }
    }

    /// Starts the log with a system greeting.
    pub fn with_greeting(greeting: impl Into<String>) -> Self {
        let mut log = Self::new();
        log.append(MessageDraft::system(MessageKind::Plain, greeting));
        log
    }

    pub fn append(&mut self, draft: MessageDraft) -> &Message {
        let id = MessageId(self.next_id);
        self.next_id += 1;
        self.messages.push(Message {
            id,
            content: draft.content,
            sender: draft.sender,
            created_at: Utc::now(),
            kind: draft.kind,
            command_text: draft.command_text,
        });
        &self.messages[self.messages.len() - 1]
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        // Ids are strictly increasing in storage order.
        self.messages
            .binary_search_by_key(&id, |message| message.id)
            .ok()
            .map(|index| &self.messages[index])
    }

    /// Entries appended after `id`, or the whole log when `id` is `None`.
    pub fn since(&self, id: Option<MessageId>) -> &[Message] {
        let Some(id) = id else {
            return &self.messages;
        };
        let start = self.messages.partition_point(|message| message.id <= id);
        &self.messages[start..]
    }

    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }
}
