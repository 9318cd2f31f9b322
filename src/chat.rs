//! Append-only conversation log.
//!
//! Entries are immutable once appended. The one structural exception is the
//! typing placeholder: a transient assistant-shaped entry inserted before an
//! ask call starts and removed by identity before the terminal answer or
//! error entry is appended, so it is always the tail while it exists.

use crate::markup::Fragment;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// Identity of a typing placeholder entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypingId(u64);

#[derive(Debug, Clone)]
pub struct ChatEntry {
    pub role: Role,
    pub body: Fragment,
    /// Strictly increasing across the log's lifetime.
    pub ordinal: u64,
    typing_id: Option<TypingId>,
}

impl ChatEntry {
    pub fn is_typing(&self) -> bool {
        self.typing_id.is_some()
    }
}

#[derive(Debug, Default)]
pub struct ChatLog {
    entries: Vec<ChatEntry>,
    next_ordinal: u64,
    next_typing_id: u64,
}

impl ChatLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn push_user(&mut self, body: Fragment) {
        self.push(Role::User, body);
    }

    pub fn push_assistant(&mut self, body: Fragment) {
        self.push(Role::Assistant, body);
    }

    fn push(&mut self, role: Role, body: Fragment) {
        let ordinal = self.next_ordinal;
        self.next_ordinal += 1;
        self.entries.push(ChatEntry {
            role,
            body,
            ordinal,
            typing_id: None,
        });
    }

    /// Append the typing placeholder and return its identity.
    pub fn insert_typing(&mut self) -> TypingId {
        let id = TypingId(self.next_typing_id);
        self.next_typing_id += 1;
        let ordinal = self.next_ordinal;
        self.next_ordinal += 1;
        self.entries.push(ChatEntry {
            role: Role::Assistant,
            body: Fragment::default(),
            ordinal,
            typing_id: Some(id),
        });
        id
    }

    /// Remove the placeholder with the given identity. Returns false when it
    /// is already gone; removal is idempotent and only ever targets
    /// placeholder entries, never real messages.
    pub fn remove_typing(&mut self, id: TypingId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.typing_id != Some(id));
        self.entries.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::format_answer;

    #[test]
    fn test_ordinals_strictly_increasing() {
        let mut log = ChatLog::new();
        log.push_user(format_answer("q1"));
        let id = log.insert_typing();
        log.remove_typing(id);
        log.push_assistant(format_answer("a1"));
        let ordinals: Vec<u64> = log.entries().iter().map(|e| e.ordinal).collect();
        assert_eq!(ordinals, vec![0, 2]);
        assert!(ordinals.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_typing_placeholder_is_tail_while_present() {
        let mut log = ChatLog::new();
        log.push_user(format_answer("q"));
        let _id = log.insert_typing();
        assert!(log.entries().last().unwrap().is_typing());
    }

    #[test]
    fn test_remove_typing_by_identity() {
        let mut log = ChatLog::new();
        log.push_user(format_answer("q"));
        let id = log.insert_typing();
        assert!(log.remove_typing(id));
        assert!(log.entries().iter().all(|e| !e.is_typing()));
        // Idempotent second removal.
        assert!(!log.remove_typing(id));
        assert_eq!(log.entries().len(), 1);
    }

    #[test]
    fn test_remove_typing_leaves_real_messages() {
        let mut log = ChatLog::new();
        log.push_user(format_answer("q"));
        let id = log.insert_typing();
        log.remove_typing(id);
        log.push_assistant(format_answer("answer"));
        assert_eq!(log.entries().len(), 2);
        assert_eq!(log.entries()[1].role, Role::Assistant);
        assert!(!log.entries()[1].is_typing());
    }
}
