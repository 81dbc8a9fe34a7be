//! Property-based tests: window selection invariants.

use std::sync::Arc;

use proptest::prelude::*;
use termgpt_context::{BudgetWindow, RatioCounter, TokenCounter, WindowBudget};
use termgpt_types::{ChatMessage, ContextError, HistoryEntry, Role};

fn arb_entry() -> impl Strategy<Value = HistoryEntry> {
    (
        "[a-zA-Z ]{1,80}",
        prop_oneof![Just(Role::User), Just(Role::Assistant)],
    )
        .prop_map(|(content, role)| {
            let token_count = RatioCounter::new().count(&content);
            HistoryEntry {
                role,
                content,
                token_count,
            }
        })
}

proptest! {
    #[test]
    fn window_is_a_suffix_within_budget(
        history in proptest::collection::vec(arb_entry(), 0..30),
        system in "[a-z ]{0,60}",
        user in "[a-z ]{1,60}",
        max_total in 0usize..400,
        max_response in 0usize..200,
    ) {
        let counter = Arc::new(RatioCounter::new());
        let budget = WindowBudget::new(max_total, max_response);
        let window = BudgetWindow::new(budget, counter.clone());
        let prompt = counter.count(&system) + counter.count(&user);

        match window.build(&system, &user, &history) {
            Ok(built) => {
                prop_assert!(prompt <= budget.available());
                prop_assert!(built.total_tokens() <= budget.available());
                prop_assert_eq!(built.kept + built.dropped, history.len());

                let expected: Vec<ChatMessage> =
                    history[built.dropped..].iter().map(ChatMessage::from).collect();
                let middle = &built.messages[1..built.messages.len() - 1];
                prop_assert_eq!(middle, expected.as_slice());

                // Nothing older would have fit.
                if built.dropped > 0 {
                    let next = &history[built.dropped - 1];
                    prop_assert!(built.total_tokens() + next.token_count > budget.available());
                }
            }
            Err(ContextError::BudgetExceeded { required, available }) => {
                prop_assert_eq!(required, prompt);
                prop_assert!(required > available);
            }
            Err(other) => prop_assert!(false, "unexpected error: {other}"),
        }
    }

    #[test]
    fn larger_budget_never_keeps_less(
        history in proptest::collection::vec(arb_entry(), 0..20),
        base in 50usize..300,
        extra in 0usize..300,
    ) {
        let counter: Arc<dyn TokenCounter> = Arc::new(RatioCounter::new());
        let small = BudgetWindow::new(WindowBudget::new(base, 10), counter.clone());
        let large = BudgetWindow::new(WindowBudget::new(base + extra, 10), counter);
        let a = small.build("sys", "question", &history);
        let b = large.build("sys", "question", &history);
        if let (Ok(a), Ok(b)) = (a, b) {
            prop_assert!(b.kept >= a.kept);
        }
    }
}
