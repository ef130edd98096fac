//! Command history with up/down navigation
//!
//! Entries are kept oldest first. While navigating, the text that was being
//! typed before the first step up is kept as a draft and comes back when the
//! user steps down past the newest entry.

/// Maximum number of commands retained
pub const MAX_HISTORY_SIZE: usize = 1000;

/// Submitted commands plus the navigation cursor into them
#[derive(Debug, Clone)]
pub struct HistoryNavigator {
    /// All entries (oldest first)
    entries: Vec<String>,
    /// Maximum number of entries to keep
    max_size: usize,
    /// Index of the recalled entry, `None` when not navigating
    navigation_index: Option<usize>,
    /// Input saved on the first step up
    pending_draft: String,
}

impl Default for HistoryNavigator {
    fn default() -> Self {
        Self::new(MAX_HISTORY_SIZE)
    }
}

impl HistoryNavigator {
    /// `max_size` of 0 is treated as 1
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_size: max_size.max(1),
            navigation_index: None,
            pending_draft: String::new(),
        }
    }

    /// Append a command.
    ///
    /// The command is trimmed first. Blank commands and repeats of the newest
    /// entry are skipped. Navigation is reset either way.
    pub fn record(&mut self, command: &str) {
        self.reset();

        let command = command.trim();
        if command.is_empty() {
            return;
        }
        if self.entries.last().is_some_and(|last| last == command) {
            tracing::debug!("Skipping duplicate history entry");
            return;
        }

        self.entries.push(command.to_string());
        if self.entries.len() > self.max_size {
            let excess = self.entries.len() - self.max_size;
            self.entries.drain(..excess);
        }
        tracing::debug!(size = self.entries.len(), "Recorded history entry");
    }

    /// Step to an older entry, returning the text to show.
    ///
    /// The first step saves `current_draft`. Returns `None` when the history is
    /// empty.
    pub fn navigate_up(&mut self, current_draft: &str) -> Option<&str> {
        if self.entries.is_empty() {
            return None;
        }

        let index = match self.navigation_index {
            None => {
                self.pending_draft = current_draft.to_string();
                self.entries.len() - 1
            }
            Some(index) => index.saturating_sub(1),
        };
        self.navigation_index = Some(index);
        Some(self.current())
    }

    /// Step to a newer entry, or back to the draft past the newest one.
    ///
    /// Returns `None` when not navigating.
    pub fn navigate_down(&mut self) -> Option<&str> {
        let index = self.navigation_index?;
        self.navigation_index = if index + 1 < self.entries.len() {
            Some(index + 1)
        } else {
            None
        };
        Some(self.current())
    }

    /// Recalled entry while navigating, otherwise the saved draft
    pub fn current(&self) -> &str {
        self.navigation_index
            .and_then(|i| self.entries.get(i))
            .map_or(self.pending_draft.as_str(), String::as_str)
    }

    /// Leave navigation and forget the draft
    pub fn reset(&mut self) {
        self.navigation_index = None;
        self.pending_draft.clear();
    }

    /// Drop all entries
    pub fn clear(&mut self) {
        self.entries.clear();
        self.reset();
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    pub fn navigation_index(&self) -> Option<usize> {
        self.navigation_index
    }

    pub fn is_navigating(&self) -> bool {
        self.navigation_index.is_some()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with(commands: &[&str]) -> HistoryNavigator {
        let mut history = HistoryNavigator::default();
        for command in commands {
            history.record(command);
        }
        history
    }

    #[test]
    fn test_record_skips_consecutive_duplicates() {
        let history = with(&["ls", "ls", "pwd"]);
        assert_eq!(history.entries(), ["ls", "pwd"]);
    }

    #[test]
    fn test_record_allows_non_consecutive_duplicates() {
        let history = with(&["ls", "pwd", "ls"]);
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn test_record_trims_and_skips_blank() {
        let history = with(&["  echo hi  ", "", "   ", "echo hi"]);
        assert_eq!(history.entries(), ["echo hi"]);
    }

    #[test]
    fn test_max_size() {
        let mut history = HistoryNavigator::new(3);
        for i in 0..5 {
            history.record(&format!("cmd{i}"));
        }
        assert_eq!(history.entries(), ["cmd2", "cmd3", "cmd4"]);
    }

    #[test]
    fn test_navigate_empty_history() {
        let mut history = HistoryNavigator::default();
        assert_eq!(history.navigate_up("draft"), None);
        assert!(!history.is_navigating());
        assert_eq!(history.navigate_down(), None);
    }

    #[test]
    fn test_up_twice_down_once_returns_draft() {
        let mut history = with(&["ls"]);

        assert_eq!(history.navigate_up(""), Some("ls"));
        assert_eq!(history.navigate_up(""), Some("ls"));
        assert_eq!(history.navigate_down(), Some(""));
        assert!(!history.is_navigating());
    }

    #[test]
    fn test_navigation_walks_entries() {
        let mut history = with(&["first", "second", "third"]);

        assert_eq!(history.navigate_up("typing"), Some("third"));
        assert_eq!(history.navigate_up("ignored"), Some("second"));
        assert_eq!(history.navigate_up(""), Some("first"));
        // Floor at the oldest entry
        assert_eq!(history.navigate_up(""), Some("first"));
        assert_eq!(history.navigation_index(), Some(0));

        assert_eq!(history.navigate_down(), Some("second"));
        assert_eq!(history.navigate_down(), Some("third"));
        assert_eq!(history.navigate_down(), Some("typing"));
        assert_eq!(history.navigate_down(), None);
    }

    #[test]
    fn test_reset_clears_draft() {
        let mut history = with(&["ls"]);
        history.navigate_up("half typed");
        history.reset();

        assert!(!history.is_navigating());
        assert_eq!(history.current(), "");
    }

    #[test]
    fn test_record_resets_navigation() {
        let mut history = with(&["a", "b"]);
        history.navigate_up("");
        history.record("c");
        assert!(!history.is_navigating());
        assert_eq!(history.navigate_up(""), Some("c"));
    }

    #[test]
    fn test_clear() {
        let mut history = with(&["a", "b"]);
        history.navigate_up("");
        history.clear();
        assert!(history.is_empty());
        assert!(!history.is_navigating());
        assert_eq!(history.get(0), None);
    }
}
