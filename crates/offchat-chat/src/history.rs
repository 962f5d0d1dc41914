use std::collections::VecDeque;

use offchat_types::{Role, Turn, ASSISTANT_TAG, DEFAULT_HISTORY_MAX_TURNS};

/// Bounded, ordered chat transcript.
///
/// Holds at most `2 × max_turns` turns; appending beyond that evicts the
/// oldest turn first. One instance per conversation, single writer.
#[derive(Debug, Clone)]
pub struct ConversationManager {
    history: VecDeque<Turn>,
    capacity: usize,
}

impl ConversationManager {
    pub fn new(max_turns: usize) -> Self {
        let capacity = max_turns * 2;
        Self {
            history: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a user turn; whitespace-only input is ignored
    pub fn add_user_message(&mut self, message: &str) {
        self.push(Role::User, message);
    }

    /// Append an assistant turn; whitespace-only input is ignored
    pub fn add_assistant_message(&mut self, message: &str) {
        self.push(Role::Assistant, message);
    }

    fn push(&mut self, role: Role, message: &str) {
        let content = message.trim();
        if content.is_empty() || self.capacity == 0 {
            return;
        }
        while self.history.len() >= self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(Turn::new(role, content));
    }

    /// Render the history plus `user_input` as a prompt.
    ///
    /// Must be called before `user_input` is added to the history,
    /// otherwise it appears twice.
    pub fn build_prompt(&self, user_input: &str) -> String {
        let mut prompt_parts: Vec<String> = self.history.iter().map(Turn::render).collect();

        prompt_parts.push(Turn::user(user_input).render());
        prompt_parts.push(ASSISTANT_TAG.to_string());

        prompt_parts.join("\n")
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn history_count(&self) -> usize {
        self.history.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_history_full(&self) -> bool {
        self.history.len() >= self.capacity
    }

    /// Keep only the most recent `keep_turns × 2` turns
    pub fn trim_history(&mut self, keep_turns: usize) {
        let keep = keep_turns * 2;
        if self.history.len() <= keep {
            return;
        }
        let excess = self.history.len() - keep;
        self.history.drain(..excess);
    }

    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.history.iter()
    }
}

impl Default for ConversationManager {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_MAX_TURNS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn contents(manager: &ConversationManager) -> Vec<&str> {
        manager.turns().map(Turn::content).collect()
    }

    #[test]
    fn test_oldest_turn_evicted_first() {
        let mut manager = ConversationManager::new(2);
        manager.add_user_message("a");
        manager.add_assistant_message("b");
        manager.add_user_message("c");
        manager.add_assistant_message("d");
        manager.add_user_message("e");

        assert_eq!(contents(&manager), vec!["b", "c", "d", "e"]);
        assert_eq!(manager.turns().next().unwrap().role(), Role::Assistant);
    }

    #[test]
    fn test_build_prompt_on_empty_history() {
        let manager = ConversationManager::new(2);
        assert_eq!(manager.build_prompt("hi"), "### Human: hi\n### Assistant:");
    }

    #[test]
    fn test_build_prompt_renders_history_in_order() {
        let mut manager = ConversationManager::new(6);
        manager.add_user_message("What is Rust?");
        manager.add_assistant_message("A systems programming language.");

        assert_eq!(
            manager.build_prompt("Is it fast?"),
            "### Human: What is Rust?\n\
             ### Assistant: A systems programming language.\n\
             ### Human: Is it fast?\n\
             ### Assistant:"
        );
    }

    #[test]
    fn test_build_prompt_does_not_mutate() {
        let mut manager = ConversationManager::new(2);
        manager.add_user_message("a");
        let first = manager.build_prompt("next");
        let second = manager.build_prompt("next");

        assert_eq!(first, second);
        assert_eq!(manager.history_count(), 1);
    }

    #[test]
    fn test_whitespace_only_message_ignored() {
        let mut manager = ConversationManager::new(2);
        manager.add_user_message("   ");
        manager.add_assistant_message("\n\t");
        assert_eq!(manager.history_count(), 0);
    }

    #[test]
    fn test_messages_are_stored_trimmed() {
        let mut manager = ConversationManager::new(2);
        manager.add_user_message("  hello \n");
        assert_eq!(contents(&manager), vec!["hello"]);
    }

    #[test]
    fn test_trim_history_keeps_most_recent() {
        let mut manager = ConversationManager::new(2);
        for m in ["a", "b", "c", "d"] {
            manager.add_user_message(m);
        }
        manager.trim_history(1);
        assert_eq!(contents(&manager), vec!["c", "d"]);
    }

    #[test]
    fn test_trim_history_noop_when_small() {
        let mut manager = ConversationManager::new(6);
        manager.add_user_message("a");
        manager.add_assistant_message("b");
        manager.trim_history(3);
        assert_eq!(contents(&manager), vec!["a", "b"]);
    }

    #[test]
    fn test_is_history_full_and_clear() {
        let mut manager = ConversationManager::new(1);
        assert!(!manager.is_history_full());
        manager.add_user_message("q");
        manager.add_assistant_message("a");
        assert!(manager.is_history_full());
        assert_eq!(manager.capacity(), 2);

        manager.clear_history();
        assert_eq!(manager.history_count(), 0);
        assert!(!manager.is_history_full());
    }

    #[test]
    fn test_zero_capacity_holds_nothing() {
        let mut manager = ConversationManager::new(0);
        manager.add_user_message("a");
        assert_eq!(manager.history_count(), 0);
        assert_eq!(manager.build_prompt("a"), "### Human: a\n### Assistant:");
    }

    #[test]
    fn test_default_uses_six_turns() {
        assert_eq!(ConversationManager::default().capacity(), 12);
    }

    fn message_op() -> impl Strategy<Value = (bool, String)> {
        (any::<bool>(), "[a-z ]{0,8}")
    }

    proptest! {
        #[test]
        fn prop_history_never_exceeds_capacity(
            max_turns in 0usize..6,
            ops in prop::collection::vec(message_op(), 0..64),
        ) {
            let mut manager = ConversationManager::new(max_turns);
            for (is_user, text) in &ops {
                if *is_user {
                    manager.add_user_message(text);
                } else {
                    manager.add_assistant_message(text);
                }
                prop_assert!(manager.history_count() <= 2 * max_turns);
            }
        }

        #[test]
        fn prop_history_is_suffix_of_accepted_messages(
            max_turns in 1usize..6,
            ops in prop::collection::vec(message_op(), 0..64),
        ) {
            let mut manager = ConversationManager::new(max_turns);
            let mut accepted = Vec::new();
            for (is_user, text) in &ops {
                if *is_user {
                    manager.add_user_message(text);
                } else {
                    manager.add_assistant_message(text);
                }
                if !text.trim().is_empty() {
                    accepted.push(text.trim().to_string());
                }
            }
            let keep = accepted.len().min(2 * max_turns);
            let expected: Vec<&str> = accepted[accepted.len() - keep..].iter().map(String::as_str).collect();
            prop_assert_eq!(contents(&manager), expected);
        }

        #[test]
        fn prop_trim_history_idempotent(
            max_turns in 1usize..6,
            keep in 0usize..6,
            ops in prop::collection::vec(message_op(), 0..32),
        ) {
            let mut manager = ConversationManager::new(max_turns);
            for (is_user, text) in &ops {
                if *is_user {
                    manager.add_user_message(text);
                } else {
                    manager.add_assistant_message(text);
                }
            }
            manager.trim_history(keep);
            let once: Vec<Turn> = manager.turns().cloned().collect();
            manager.trim_history(keep);
            let twice: Vec<Turn> = manager.turns().cloned().collect();
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_build_prompt_is_pure(
            ops in prop::collection::vec(message_op(), 0..16),
            input in "[a-z ]{0,8}",
        ) {
            let mut manager = ConversationManager::new(3);
            for (is_user, text) in &ops {
                if *is_user {
                    manager.add_user_message(text);
                } else {
                    manager.add_assistant_message(text);
                }
            }
            let before = manager.history_count();
            let first = manager.build_prompt(&input);
            prop_assert_eq!(&first, &manager.build_prompt(&input));
            prop_assert_eq!(before, manager.history_count());
            let expected_suffix = format!("### Human: {}\n### Assistant:", input);
            prop_assert!(first.ends_with(&expected_suffix));
        }
    }
}
