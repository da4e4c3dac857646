use std::collections::VecDeque;
use log::debug;
use crate::models::chat::ChatMessage;

/// Maximum number of turns a session keeps before evicting the oldest.
pub const DEFAULT_HISTORY_CAPACITY: usize = 20;

/// Number of prior turns included in a model prompt.
pub const HISTORY_FOR_PROMPT_LEN: usize = 5;

/// Bounded, insertion-ordered log of chat turns for a single session.
///
/// Appending past capacity drops entries from the front until the buffer is
/// back at capacity. Eviction does not try to keep user/assistant pairs
/// together.
#[derive(Clone, Debug)]
pub struct ConversationBuffer {
    messages: VecDeque<ChatMessage>,
    capacity: usize,
}

impl Default for ConversationBuffer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

impl ConversationBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            messages: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn append(&mut self, message: ChatMessage) {
        self.messages.push_back(message);
        while self.messages.len() > self.capacity {
            if let Some(evicted) = self.messages.pop_front() {
                debug!("History full, evicted oldest {} turn", evicted.role());
            }
        }
    }

    /// Last `n` entries in insertion order, or all of them if fewer exist.
    pub fn window(&self, n: usize) -> Vec<ChatMessage> {
        let skip = self.messages.len().saturating_sub(n);
        self.messages.iter().skip(skip).cloned().collect()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.messages.iter().cloned().collect()
    }
}

/// Same windowing policy as [`ConversationBuffer::window`], applied to
/// history that arrives over the wire.
pub fn window_slice(history: &[ChatMessage], n: usize) -> &[ChatMessage] {
    &history[history.len().saturating_sub(n)..]
}

pub fn format_history_for_prompt(history: &[ChatMessage]) -> String {
    let mut result = String::new();
    for msg in history {
        result.push_str(&format!("{}: {}\n", msg.role(), msg.content()));
    }
    result
}
