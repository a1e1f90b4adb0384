//! In-memory conversation store.
//!
//! Conversations are keyed by caller-supplied ids and bounded two ways:
//! each conversation keeps at most `max_turns` turns (oldest dropped first),
//! and at most `max_conversations` conversations are kept (least recently
//! used evicted first).

use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};

use lru::LruCache;
use tracing::debug;

use answer_types::{ConversationSettings, Turn, TurnRole};

/// Keyed, bounded conversation history.
///
/// - LRU cache of turn deques protected by one Mutex
/// - Appends happen under the lock, so a user/assistant pair lands together
pub struct ConversationStore {
    conversations: Mutex<LruCache<String, VecDeque<Turn>>>,
    max_turns: usize,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::from_settings(&ConversationSettings::default())
    }
}

impl std::fmt::Debug for ConversationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationStore")
            .field("conversations", &self.len())
            .field("max_turns", &self.max_turns)
            .finish()
    }
}

impl ConversationStore {
    pub fn new(max_turns: usize, max_conversations: usize) -> Self {
        let capacity = NonZeroUsize::new(max_conversations).unwrap_or(NonZeroUsize::MIN);
        Self {
            conversations: Mutex::new(LruCache::new(capacity)),
            max_turns: max_turns.max(2),
        }
    }

    pub fn from_settings(settings: &ConversationSettings) -> Self {
        Self::new(settings.max_turns, settings.max_conversations)
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, VecDeque<Turn>>> {
        self.conversations.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Copy of the turns recorded for `id`, oldest first.
    pub fn snapshot(&self, id: &str) -> Vec<Turn> {
        self.lock()
            .get(id)
            .map(|turns| turns.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Append turns to `id` as one step, creating the conversation if needed.
    pub fn append(&self, id: &str, turns: impl IntoIterator<Item = Turn>) {
        let mut conversations = self.lock();

        if !conversations.contains(id) && conversations.len() == conversations.cap().get() {
            if let Some((evicted, _)) = conversations.peek_lru() {
                debug!(conversation = %evicted, "Evicting least recently used conversation");
            }
        }

        let history = conversations.get_or_insert_mut(id.to_string(), VecDeque::new);
        history.extend(turns);
        while history.len() > self.max_turns {
            history.pop_front();
        }
        // history never opens with an answer whose question was trimmed
        while history.front().is_some_and(|turn| turn.role == TurnRole::Assistant) {
            history.pop_front();
        }
    }

    /// Forget `id`. Returns whether it existed.
    pub fn clear(&self, id: &str) -> bool {
        self.lock().pop(id).is_some()
    }

    pub fn turn_count(&self, id: &str) -> usize {
        self.lock().peek(id).map_or(0, |turns| turns.len())
    }

    /// Number of conversations held.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_append_and_snapshot() {
        let store = ConversationStore::default();
        store.append("c1", [Turn::user("hi"), Turn::assistant("hello")]);

        let turns = store.snapshot("c1");
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, TurnRole::User);
        assert_eq!(turns[1].content, "hello");
        assert!(store.snapshot("other").is_empty());
    }

    #[test]
    fn test_conversations_are_isolated() {
        let store = ConversationStore::default();
        store.append("a", [Turn::user("from a")]);
        store.append("b", [Turn::user("from b")]);

        assert_eq!(store.snapshot("a")[0].content, "from a");
        assert_eq!(store.snapshot("b")[0].content, "from b");
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_oldest_turns_dropped() {
        let store = ConversationStore::new(4, 10);
        for i in 0..3 {
            store.append(
                "c",
                [Turn::user(format!("q{}", i)), Turn::assistant(format!("a{}", i))],
            );
        }

        let turns = store.snapshot("c");
        let contents: Vec<_> = turns.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["q1", "a1", "q2", "a2"]);
    }

    #[test]
    fn test_odd_turn_cap_keeps_history_starting_with_user() {
        let store = ConversationStore::new(3, 10);
        store.append("c", [Turn::user("q0"), Turn::assistant("a0")]);
        store.append("c", [Turn::user("q1"), Turn::assistant("a1")]);

        let roles: Vec<_> = store.snapshot("c").iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![TurnRole::User, TurnRole::Assistant]);
    }

    #[test]
    fn test_least_recently_used_evicted() {
        let store = ConversationStore::new(10, 2);
        store.append("a", [Turn::user("1")]);
        store.append("b", [Turn::user("2")]);
        // touch "a" so "b" becomes the eviction candidate
        store.snapshot("a");
        store.append("c", [Turn::user("3")]);

        assert_eq!(store.len(), 2);
        assert_eq!(store.turn_count("a"), 1);
        assert_eq!(store.turn_count("b"), 0);
        assert_eq!(store.turn_count("c"), 1);
    }

    #[test]
    fn test_zero_capacity_keeps_one() {
        let store = ConversationStore::new(0, 0);
        store.append("a", [Turn::user("1"), Turn::assistant("2")]);
        store.append("b", [Turn::user("3")]);

        assert_eq!(store.len(), 1);
        assert_eq!(store.turn_count("b"), 1);
    }

    #[test]
    fn test_clear() {
        let store = ConversationStore::default();
        store.append("c", [Turn::user("x")]);
        assert!(store.clear("c"));
        assert!(!store.clear("c"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_concurrent_appends_keep_pairs_together() {
        let store = Arc::new(ConversationStore::new(1000, 10));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for j in 0..20 {
                        store.append(
                            "shared",
                            [
                                Turn::user(format!("q{}-{}", i, j)),
                                Turn::assistant(format!("a{}-{}", i, j)),
                            ],
                        );
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let turns = store.snapshot("shared");
        assert_eq!(turns.len(), 320);
        for pair in turns.chunks(2) {
            assert_eq!(pair[0].role, TurnRole::User);
            assert_eq!(pair[1].content, pair[0].content.replacen('q', "a", 1));
        }
    }
}
