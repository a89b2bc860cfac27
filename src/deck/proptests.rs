//! Property-based tests for the slide document
//!
//! These tests verify key invariants hold across all possible inputs.

use super::*;
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_slide() -> impl Strategy<Value = String> {
    "<h[12]>[a-zA-Z ]{0,12}</h[12]>"
}

fn arb_deck() -> impl Strategy<Value = SlideDeck> {
    (proptest::collection::vec(arb_slide(), 1..8), 0usize..8).prop_map(|(slides, cursor)| {
        let mut deck = SlideDeck::from_slides(slides);
        deck.navigate_to_slide(cursor);
        deck
    })
}

#[derive(Debug, Clone)]
enum DeckOp {
    Add(String, Option<usize>),
    Update(usize, String),
    Delete(usize),
    Reorder(usize, usize),
    Navigate(usize),
    Replace(Vec<String>),
}

fn arb_op() -> impl Strategy<Value = DeckOp> {
    prop_oneof![
        (arb_slide(), proptest::option::of(0usize..10)).prop_map(|(c, p)| DeckOp::Add(c, p)),
        (0usize..10, arb_slide()).prop_map(|(i, c)| DeckOp::Update(i, c)),
        (0usize..10).prop_map(DeckOp::Delete),
        (0usize..10, 0usize..10).prop_map(|(f, t)| DeckOp::Reorder(f, t)),
        (0usize..10).prop_map(DeckOp::Navigate),
        proptest::collection::vec(arb_slide(), 0..4).prop_map(DeckOp::Replace),
    ]
}

fn apply(deck: &mut SlideDeck, op: DeckOp) {
    match op {
        DeckOp::Add(c, p) => {
            deck.add_slide(c, p);
        }
        DeckOp::Update(i, c) => {
            let _ = deck.update_slide(i, c);
        }
        DeckOp::Delete(i) => {
            let _ = deck.delete_slide(i);
        }
        DeckOp::Reorder(f, t) => {
            let _ = deck.reorder_slide(f, t);
        }
        DeckOp::Navigate(i) => {
            deck.navigate_to_slide(i);
        }
        DeckOp::Replace(s) => deck.replace_all_slides(s),
    }
}

proptest! {
    #[test]
    fn prop_update_then_read_back(
        mut deck in arb_deck(),
        idx in 0usize..8,
        content in arb_slide()
    ) {
        let len = deck.total_slides();
        prop_assume!(idx < len);
        deck.update_slide(idx, content.clone()).unwrap();
        prop_assert_eq!(deck.slide_content(idx), Some(content.as_str()));
        prop_assert_eq!(deck.total_slides(), len);
    }

    #[test]
    fn prop_reorder_is_permutation(mut deck in arb_deck(), from in 0usize..8, to in 0usize..8) {
        let mut before = deck.slides().to_vec();
        let len = before.len();
        let result = deck.reorder_slide(from, to);
        if from < len && to < len {
            prop_assert!(result.is_ok());
        } else {
            prop_assert!(result.is_err());
        }
        let mut after = deck.slides().to_vec();
        prop_assert_eq!(after.len(), len);
        before.sort();
        after.sort();
        prop_assert_eq!(before, after);
    }

    #[test]
    fn prop_delete_never_empties(mut deck in arb_deck(), idx in 0usize..8) {
        let len = deck.total_slides();
        let result = deck.delete_slide(idx);
        if len == 1 || idx >= len {
            prop_assert!(result.is_err());
            prop_assert_eq!(deck.total_slides(), len);
        } else {
            prop_assert!(result.is_ok());
            prop_assert_eq!(deck.total_slides(), len - 1);
        }
        prop_assert!(deck.total_slides() >= 1);
    }

    #[test]
    fn prop_cursor_always_in_range(
        mut deck in arb_deck(),
        ops in proptest::collection::vec(arb_op(), 0..20)
    ) {
        for op in ops {
            apply(&mut deck, op);
            if deck.is_empty() {
                prop_assert_eq!(deck.current_index(), 0);
            } else {
                prop_assert!(deck.current_index() < deck.total_slides());
            }
        }
    }
}
