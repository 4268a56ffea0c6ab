use std::sync::Arc;

use arc_swap::ArcSwap;
use swesh_protocol::Message;

/// Append-only conversation log.
///
/// Only the step loop appends. Readers take cheap immutable snapshots and
/// never block the writer.
#[derive(Debug, Default)]
pub struct MessageLog {
    messages: ArcSwap<Vec<Message>>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one message and return the new length.
    pub fn push(&self, message: Message) -> usize {
        let mut len = 0;
        self.messages.rcu(|current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(message.clone());
            len = next.len();
            next
        });
        len
    }

    pub fn snapshot(&self) -> Arc<Vec<Message>> {
        self.messages.load_full()
    }

    pub fn len(&self) -> usize {
        self.messages.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
