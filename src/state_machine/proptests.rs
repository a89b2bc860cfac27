//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::state::*;
use super::*;
use crate::llm::{Convention, LlmErrorKind};
use crate::tools::{ToolCall, ToolInput, ToolOutput};
use proptest::prelude::*;
use serde_json::json;

// ============================================================================
// Test Helpers
// ============================================================================

fn test_context(max_iterations: u32) -> SessionContext {
    SessionContext::new("test-session", "test-model").with_max_iterations(max_iterations)
}

fn tool_call(id: &str) -> ToolCall {
    ToolCall::new(id, ToolInput::GetTotalSlides)
}

fn llm_response(text: Vec<String>, tool_calls: Vec<ToolCall>) -> Event {
    Event::LlmResponse {
        text_segments: text,
        tool_calls,
        output_text: None,
        convention: Convention::Responses,
    }
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_tool_name() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("get_all_slides"),
        Just("get_total_slides"),
        Just("clear_all_slides"),
        Just("delete_slide"),
        Just("make_coffee"),
    ]
}

fn arb_tool_call() -> impl Strategy<Value = ToolCall> {
    ("[a-z]{8}", arb_tool_name(), 0i64..5).prop_map(|(id, name, index)| {
        ToolCall::new(id, ToolInput::from_name_and_value(name, json!({ "index": index })))
    })
}

fn arb_error_kind() -> impl Strategy<Value = LlmErrorKind> {
    prop_oneof![
        Just(LlmErrorKind::Network),
        Just(LlmErrorKind::RateLimit),
        Just(LlmErrorKind::ServerError),
        Just(LlmErrorKind::Auth),
        Just(LlmErrorKind::InvalidRequest),
        Just(LlmErrorKind::Unsupported),
        Just(LlmErrorKind::TimedOut),
        Just(LlmErrorKind::Unknown),
    ]
}

fn arb_progress() -> impl Strategy<Value = TurnProgress> {
    ("[a-z ]{1,30}", 1u32..10).prop_map(|(intent, iteration)| {
        let mut progress = TurnProgress::new(intent, Convention::Responses);
        progress.iteration = iteration;
        progress
    })
}

fn arb_terminal_state() -> impl Strategy<Value = TurnState> {
    prop_oneof![
        Just(TurnState::Idle),
        Just(TurnState::Done),
        Just(TurnState::Cancelled),
        (1u32..20).prop_map(|iterations| TurnState::Exhausted { iterations }),
        ("[a-zA-Z ]{1,30}", arb_error_kind())
            .prop_map(|(message, error_kind)| TurnState::Failed { message, error_kind }),
    ]
}

fn arb_busy_state() -> impl Strategy<Value = TurnState> {
    prop_oneof![
        arb_progress().prop_map(|progress| TurnState::Requesting { progress }),
        (
            arb_progress(),
            arb_tool_call(),
            proptest::collection::vec(arb_tool_call(), 0..3)
        )
            .prop_map(|(progress, current_tool, remaining_tools)| {
                TurnState::Executing {
                    progress,
                    current_tool,
                    remaining_tools,
                    completed: vec![],
                }
            }),
    ]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        "[a-z ]{0,20}".prop_map(|text| Event::UserMessage { text }),
        Just(Event::UserCancel),
        (
            proptest::collection::vec("[a-z]{1,10}", 0..2),
            proptest::collection::vec(arb_tool_call(), 0..3)
        )
            .prop_map(|(text, calls)| llm_response(text, calls)),
        ("[a-z ]{1,20}", arb_error_kind())
            .prop_map(|(message, error_kind)| Event::LlmError { message, error_kind }),
        Just(Event::LlmAborted),
        ("[a-z]{8}", any::<bool>()).prop_map(|(id, ok)| Event::ToolComplete {
            tool_use_id: id,
            result: if ok {
                ToolOutput::success("ok")
            } else {
                ToolOutput::error("failed")
            },
        }),
    ]
}

/// Drive one whole turn where every response carries exactly one tool call
fn run_always_one_tool(max_iterations: u32) -> (TurnState, u32) {
    let ctx = test_context(max_iterations);
    let mut state = TurnState::Idle;
    let mut requests = 0u32;
    let mut pending = vec![Event::UserMessage {
        text: "go".to_string(),
    }];

    while let Some(event) = pending.pop() {
        let Ok(result) = transition(&state, &ctx, event) else {
            break;
        };
        state = result.new_state;
        for effect in result.effects {
            match effect {
                Effect::RequestLlm { .. } => {
                    requests += 1;
                    let id = format!("call_{requests}");
                    pending.push(llm_response(vec![], vec![tool_call(&id)]));
                }
                Effect::ExecuteTool { tool } => pending.push(Event::ToolComplete {
                    tool_use_id: tool.id,
                    result: ToolOutput::success("3 slides"),
                }),
                _ => {}
            }
        }
    }
    (state, requests)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Busy states reject new submissions
    #[test]
    fn prop_busy_rejects_messages(state in arb_busy_state(), text in "[a-z]{1,20}") {
        let result = transition(&state, &test_context(10), Event::UserMessage { text });
        prop_assert_eq!(result.unwrap_err(), TransitionError::AgentBusy);
    }

    // Idle and terminal states accept a non-empty message
    #[test]
    fn prop_terminal_accepts_messages(state in arb_terminal_state(), text in "[a-z]{1,20}") {
        let result = transition(&state, &test_context(10), Event::UserMessage { text });
        prop_assert!(result.is_ok(), "{:?}", result);
        let result = result.unwrap();
        prop_assert!(
            matches!(
                result.new_state,
                TurnState::Requesting { ref progress } if progress.iteration == 1
            ),
            "expected fresh turn"
        );
    }

    // The iteration counter never exceeds the cap, whatever the event sequence
    #[test]
    fn prop_cap_never_exceeded(
        max in 1u32..6,
        events in proptest::collection::vec(arb_event(), 0..40)
    ) {
        let ctx = test_context(max);
        let mut state = TurnState::Idle;
        for event in events {
            if let Ok(result) = transition(&state, &ctx, event) {
                state = result.new_state;
                match &state {
                    TurnState::Requesting { progress } | TurnState::Executing { progress, .. } => {
                        prop_assert!(progress.iteration <= max);
                    }
                    TurnState::Exhausted { iterations } => prop_assert!(*iterations <= max),
                    _ => {}
                }
            }
        }
    }

    // Each effect list requests at most one of: model call, tool execution
    #[test]
    fn prop_single_suspension_point(state in arb_busy_state(), event in arb_event()) {
        if let Ok(result) = transition(&state, &test_context(10), event) {
            let requests = result
                .effects
                .iter()
                .filter(|e| matches!(e, Effect::RequestLlm { .. }))
                .count();
            let tools = result
                .effects
                .iter()
                .filter(|e| matches!(e, Effect::ExecuteTool { .. }))
                .count();
            prop_assert!(requests + tools <= 1, "{:?}", result.effects);
        }
    }

    // A response without tool calls and without recovery ends the turn
    #[test]
    fn prop_no_tools_is_done(
        progress in arb_progress(),
        text in proptest::collection::vec("[a-z]{1,10}", 0..3)
    ) {
        let state = TurnState::Requesting { progress };
        let result = transition(&state, &test_context(10), llm_response(text, vec![])).unwrap();
        prop_assert_eq!(result.new_state, TurnState::Done);
    }

    // Always one tool call means exactly `max` requests, then Exhausted
    #[test]
    fn prop_always_one_tool_exhausts_at_cap(max in 1u32..15) {
        let (state, requests) = run_always_one_tool(max);
        prop_assert_eq!(state, TurnState::Exhausted { iterations: max });
        prop_assert_eq!(requests, max);
    }
}
