//! Budget-bounded request windows over conversation history.

use std::sync::Arc;

use termgpt_types::{ChatMessage, ContextError, HistoryEntry, Role};

use crate::counter::TokenCounter;

/// Token limits for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowBudget {
    /// The model's total context size (prompt plus reply).
    pub max_total_tokens: usize,
    /// Tokens reserved for the reply.
    pub max_response_tokens: usize,
}

impl WindowBudget {
    /// Creates a budget.
    #[must_use]
    pub fn new(max_total_tokens: usize, max_response_tokens: usize) -> Self {
        Self {
            max_total_tokens,
            max_response_tokens,
        }
    }

    /// Tokens the outgoing messages may use.
    #[must_use]
    pub fn available(&self) -> usize {
        self.max_total_tokens.saturating_sub(self.max_response_tokens)
    }
}

/// The messages selected for one request, with their accounting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    /// `[system] + history (oldest first) + [user]`.
    pub messages: Vec<ChatMessage>,
    /// Tokens in the system and user messages.
    pub prompt_tokens: usize,
    /// Tokens in the included history.
    pub history_tokens: usize,
    /// Number of history entries included.
    pub kept: usize,
    /// Number of older history entries left out.
    pub dropped: usize,
}

impl Window {
    /// Tokens of everything in `messages`.
    #[must_use]
    pub fn total_tokens(&self) -> usize {
        self.prompt_tokens + self.history_tokens
    }
}

/// Keeps the newest contiguous run of history that fits the budget.
///
/// The system and user messages are mandatory: if they alone exceed the
/// budget the request is rejected instead of being cut. History is then
/// walked from newest to oldest and stops at the first entry that would
/// overflow, so older turns always drop off first and the kept entries are
/// a suffix of the history.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use termgpt_context::{BudgetWindow, RatioCounter, WindowBudget};
/// use termgpt_types::HistoryEntry;
///
/// let window = BudgetWindow::new(WindowBudget::new(100, 20), Arc::new(RatioCounter::new()));
/// let history = vec![HistoryEntry::user("earlier question")];
/// let built = window.build("Be brief.", "What now?", &history).unwrap();
/// assert_eq!(built.messages.len(), 3);
/// ```
pub struct BudgetWindow {
    budget: WindowBudget,
    counter: Arc<dyn TokenCounter>,
}

impl BudgetWindow {
    /// Creates a window builder over `budget`, measuring with `counter`.
    #[must_use]
    pub fn new(budget: WindowBudget, counter: Arc<dyn TokenCounter>) -> Self {
        Self { budget, counter }
    }

    /// The budget this builder enforces.
    #[must_use]
    pub fn budget(&self) -> WindowBudget {
        self.budget
    }

    /// Assemble the messages for a new user turn.
    ///
    /// Fails with [`ContextError::BudgetExceeded`] when the system and user
    /// messages alone exceed [`WindowBudget::available`].
    pub fn build(
        &self,
        system: &str,
        user: &str,
        history: &[HistoryEntry],
    ) -> Result<Window, ContextError> {
        let available = self.budget.available();
        let prompt_tokens = self.counter.count(system) + self.counter.count(user);
        if prompt_tokens > available {
            return Err(ContextError::BudgetExceeded {
                required: prompt_tokens,
                available,
            });
        }

        let remaining = available - prompt_tokens;
        let mut history_tokens: usize = 0;
        let mut kept = 0;
        for entry in history.iter().rev() {
            let cost = self.entry_tokens(entry);
            // `cost` may come from a hand-edited file.
            match history_tokens.checked_add(cost) {
                Some(total) if total <= remaining => history_tokens = total,
                _ => break,
            }
            kept += 1;
        }
        let dropped = history.len() - kept;
        let selected = &history[dropped..];

        let mut messages = Vec::with_capacity(selected.len() + 2);
        messages.push(ChatMessage::new(Role::System, system));
        messages.extend(selected.iter().map(ChatMessage::from));
        messages.push(ChatMessage::new(Role::User, user));

        tracing::debug!(
            prompt_tokens,
            history_tokens,
            kept,
            dropped,
            available,
            "built request window"
        );

        Ok(Window {
            messages,
            prompt_tokens,
            history_tokens,
            kept,
            dropped,
        })
    }

    // Entries written by hand may lack a count; measure those now.
    fn entry_tokens(&self, entry: &HistoryEntry) -> usize {
        if entry.token_count == 0 && !entry.content.is_empty() {
            self.counter.count(&entry.content)
        } else {
            entry.token_count
        }
    }
}

/// Assemble a request window without keeping a [`BudgetWindow`] around.
pub fn build_window(
    system: &str,
    user: &str,
    history: &[HistoryEntry],
    budget: WindowBudget,
    counter: Arc<dyn TokenCounter>,
) -> Result<Window, ContextError> {
    BudgetWindow::new(budget, counter).build(system, user, history)
}
