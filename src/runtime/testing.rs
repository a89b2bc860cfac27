//! Mock implementations for testing
//!
//! These mocks enable loop testing without real I/O.

use crate::deck::{DeckObserver, DeckSnapshot};
use crate::llm::{ContentBlock, Convention, LlmError, LlmRequest, LlmResponse, LlmService};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// Mock LLM Service
// ============================================================================

/// Mock LLM service that returns queued responses, then a repeated default
pub struct MockLlm {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    repeat: Option<LlmResponse>,
    delay: Option<Duration>,
    reject_responses_convention: bool,
    /// Record of all requests made, with the convention used
    requests: Mutex<Vec<(Convention, LlmRequest)>>,
}

impl MockLlm {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            repeat: None,
            delay: None,
            reject_responses_convention: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answer every request with the same response
    pub fn always(response: LlmResponse) -> Self {
        Self {
            repeat: Some(response),
            ..Self::new()
        }
    }

    pub fn queued(responses: Vec<LlmResponse>) -> Self {
        let mock = Self::new();
        for response in responses {
            mock.queue_response(response);
        }
        mock
    }

    /// Queue a successful response
    pub fn queue_response(&self, response: LlmResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    /// Queue an error response
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail every responses-convention call as unsupported
    #[must_use]
    pub fn rejecting_responses_convention(mut self) -> Self {
        self.reject_responses_convention = true;
        self
    }

    pub fn recorded_requests(&self) -> Vec<(Convention, LlmRequest)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn conventions(&self) -> Vec<Convention> {
        self.recorded_requests().into_iter().map(|(c, _)| c).collect()
    }
}

impl Default for MockLlm {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmService for MockLlm {
    async fn complete(
        &self,
        request: &LlmRequest,
        convention: Convention,
    ) -> Result<LlmResponse, LlmError> {
        self.requests
            .lock()
            .unwrap()
            .push((convention, request.clone()));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.reject_responses_convention && convention == Convention::Responses {
            return Err(LlmError::unsupported("HTTP 404: Not Found"));
        }

        let queued = self.responses.lock().unwrap().pop_front();
        match (queued, &self.repeat) {
            (Some(result), _) => result,
            (None, Some(response)) => Ok(response.clone()),
            (None, None) => Ok(text_response("Done.")),
        }
    }

    fn model_id(&self) -> &str {
        "mock-model"
    }
}

pub fn text_response(text: &str) -> LlmResponse {
    LlmResponse {
        content: vec![ContentBlock::text(text)],
        ..Default::default()
    }
}

pub fn tool_response(id: &str, name: &str, input: Value) -> LlmResponse {
    LlmResponse {
        content: vec![ContentBlock::tool_use(id, name, input)],
        ..Default::default()
    }
}

// ============================================================================
// Recording Observer
// ============================================================================

/// Deck observer that records every notification
#[derive(Default)]
pub struct RecordingObserver {
    snapshots: Mutex<Vec<DeckSnapshot>>,
    navigations: Mutex<Vec<usize>>,
}

impl RecordingObserver {
    pub fn snapshots(&self) -> Vec<DeckSnapshot> {
        self.snapshots.lock().unwrap().clone()
    }

    pub fn navigations(&self) -> Vec<usize> {
        self.navigations.lock().unwrap().clone()
    }
}

impl DeckObserver for RecordingObserver {
    fn slides_changed(&self, snapshot: DeckSnapshot) {
        self.snapshots.lock().unwrap().push(snapshot);
    }

    fn navigated(&self, index: usize) {
        self.navigations.lock().unwrap().push(index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::{Presentation, SharedPresentation, SlideDeck};
    use crate::llm::{CredentialStore, LlmErrorKind, MessageRole};
    use crate::runtime::{RuntimeOptions, SessionHandle, SseEvent, SubmitError};
    use crate::state_machine::transition::EXHAUSTED_NOTICE;
    use crate::state_machine::{SessionContext, TurnOutcome, TurnState};
    use serde_json::json;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    fn presentation(slides: &[&str]) -> SharedPresentation {
        Arc::new(RwLock::new(Presentation {
            deck: SlideDeck::from_slides(slides.iter().map(ToString::to_string).collect()),
            ..Default::default()
        }))
    }

    fn spawn(llm: &Arc<MockLlm>, slides: &[&str], options: RuntimeOptions) -> SessionHandle {
        SessionHandle::spawn(
            llm.clone(),
            SessionContext::new("test-session", "mock-model"),
            options,
            CredentialStore::new(Some("sk-test".to_string())),
            presentation(slides),
        )
    }

    /// Submit a message and wait for the turn to finish
    async fn run_turn(handle: &SessionHandle, text: &str) -> TurnOutcome {
        let mut rx = handle.subscribe();
        handle.submit(text).await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let Ok(SseEvent::TurnDone { outcome }) = rx.recv().await {
                    return outcome;
                }
            }
        })
        .await
        .expect("turn did not finish")
    }

    async fn wait_until_working(handle: &SessionHandle) {
        for _ in 0..200 {
            if handle.state().is_working() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("session never started working");
    }

    #[tokio::test]
    async fn test_mock_llm_queue_then_default() {
        let mock = MockLlm::queued(vec![text_response("first")]);
        let request = LlmRequest {
            system: vec![],
            messages: vec![],
            tools: vec![],
            max_tokens: None,
        };
        let first = mock.complete(&request, Convention::Responses).await.unwrap();
        assert_eq!(first.text_segments(), vec!["first"]);
        let second = mock.complete(&request, Convention::Responses).await.unwrap();
        assert_eq!(second.text_segments(), vec!["Done."]);
        assert_eq!(mock.recorded_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_zero_tool_calls_done_after_one_request() {
        let llm = Arc::new(MockLlm::always(text_response("Hello there")));
        let handle = spawn(&llm, &["<h1>A</h1>"], RuntimeOptions::default());

        assert_eq!(run_turn(&handle, "hi").await, TurnOutcome::Done);
        assert_eq!(llm.recorded_requests().len(), 1);
        assert_eq!(handle.state(), TurnState::Done);

        let history = handle.history().await;
        let texts: Vec<_> = history.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["hi", "Hello there"]);
    }

    #[tokio::test]
    async fn test_always_one_tool_exhausts_at_cap() {
        let llm = Arc::new(MockLlm::always(tool_response(
            "call_1",
            "get_total_slides",
            json!({}),
        )));
        let handle = spawn(&llm, &["a"], RuntimeOptions::default());

        assert_eq!(run_turn(&handle, "count").await, TurnOutcome::Exhausted);
        assert_eq!(llm.recorded_requests().len(), 10);
        assert_eq!(handle.state(), TurnState::Exhausted { iterations: 10 });
        let history = handle.history().await;
        assert_eq!(history.last().unwrap().text, EXHAUSTED_NOTICE);
    }

    #[tokio::test]
    async fn test_tool_results_fed_back_as_system_turn() {
        let llm = Arc::new(MockLlm::queued(vec![
            tool_response("call_1", "delete_slide", json!({"index": 5})),
            text_response("That slide does not exist."),
        ]));
        let handle = spawn(&llm, &["a", "b"], RuntimeOptions::default());

        assert_eq!(run_turn(&handle, "delete slide 6").await, TurnOutcome::Done);
        let requests = llm.recorded_requests();
        assert_eq!(requests.len(), 2);
        let feedback = requests[1].1.messages.last().unwrap();
        assert_eq!(feedback.role, MessageRole::System);
        assert_eq!(
            feedback.text,
            "Tool results:\n[delete_slide] error: Invalid slide index: 5"
        );
        assert_eq!(handle.snapshot().await.slides, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_batch_runs_sequentially() {
        let llm = Arc::new(MockLlm::queued(vec![
            LlmResponse {
                content: vec![
                    ContentBlock::text("Restructuring."),
                    ContentBlock::tool_use(
                        "c1",
                        "add_slide",
                        json!({"content": "<h2>B</h2>", "position": 0}),
                    ),
                    ContentBlock::tool_use(
                        "c2",
                        "update_slide",
                        json!({"index": 1, "content": "<h1>A2</h1>"}),
                    ),
                ],
                ..Default::default()
            },
            text_response("Done."),
        ]));
        let handle = spawn(&llm, &["<h1>A</h1>"], RuntimeOptions::default());

        assert_eq!(run_turn(&handle, "add a B slide first").await, TurnOutcome::Done);
        let snapshot = handle.snapshot().await;
        assert_eq!(snapshot.slides, vec!["<h2>B</h2>", "<h1>A2</h1>"]);
        assert_eq!(snapshot.current_index, 0);
    }

    #[tokio::test]
    async fn test_recovery_forces_one_extra_pass() {
        let llm = Arc::new(MockLlm::queued(vec![
            tool_response("c1", "get_all_slides", json!({})),
            text_response("I will condense these into two slides."),
            tool_response(
                "c2",
                "replace_all_slides",
                json!({"slides": ["<h1>One</h1>", "<h1>Two</h1>"]}),
            ),
        ]));
        let handle = spawn(&llm, &["a", "b", "c", "d"], RuntimeOptions::default());

        assert_eq!(
            run_turn(&handle, "Reduce this to 2 slides").await,
            TurnOutcome::Done
        );
        let requests = llm.recorded_requests();
        assert_eq!(requests.len(), 3);
        let instruction = requests[2].1.messages.last().unwrap();
        assert_eq!(instruction.role, MessageRole::System);
        assert!(instruction.text.contains("replace_all_slides"));
        assert_eq!(handle.snapshot().await.total_slides, 2);
    }

    #[tokio::test]
    async fn test_protocol_fallback_is_sticky() {
        let llm = Arc::new(
            MockLlm::queued(vec![
                tool_response("c1", "get_total_slides", json!({})),
                text_response("There is one slide."),
            ])
            .rejecting_responses_convention(),
        );
        let handle = spawn(&llm, &["a"], RuntimeOptions::default());

        assert_eq!(run_turn(&handle, "how many slides?").await, TurnOutcome::Done);
        assert_eq!(
            llm.conventions(),
            vec![
                Convention::Responses,
                Convention::ChatCompletions,
                Convention::ChatCompletions
            ]
        );
    }

    #[tokio::test]
    async fn test_second_protocol_failure_fails_turn() {
        let llm = Arc::new(MockLlm::new().rejecting_responses_convention());
        llm.queue_error(LlmError::unsupported("chat also missing"));
        let handle = spawn(&llm, &["a"], RuntimeOptions::default());

        assert_eq!(run_turn(&handle, "hello").await, TurnOutcome::Failed);
        assert!(matches!(
            handle.state(),
            TurnState::Failed { error_kind: LlmErrorKind::Unsupported, .. }
        ));
    }

    #[tokio::test]
    async fn test_timeout_fails_turn() {
        let llm = Arc::new(MockLlm::new().with_delay(Duration::from_secs(5)));
        let options = RuntimeOptions {
            request_timeout: Duration::from_millis(50),
            ..Default::default()
        };
        let handle = spawn(&llm, &["a"], options);

        assert_eq!(run_turn(&handle, "hello").await, TurnOutcome::Failed);
        assert!(matches!(
            handle.state(),
            TurnState::Failed { error_kind: LlmErrorKind::TimedOut, .. }
        ));
    }

    #[tokio::test]
    async fn test_busy_rejects_second_submission() {
        let llm = Arc::new(MockLlm::new().with_delay(Duration::from_millis(300)));
        let handle = spawn(&llm, &["a"], RuntimeOptions::default());

        handle.submit("first").await.unwrap();
        wait_until_working(&handle).await;
        assert_eq!(handle.submit("second").await, Err(SubmitError::Busy));
    }

    #[tokio::test]
    async fn test_back_to_back_submissions_reserve_one_turn() {
        let llm = Arc::new(MockLlm::new().with_delay(Duration::from_millis(200)));
        let handle = spawn(&llm, &["a"], RuntimeOptions::default());
        let mut rx = handle.subscribe();

        // No wait between the two: the second must not be accepted and lost
        assert_eq!(handle.submit("first").await, Ok(()));
        assert_eq!(handle.submit("second").await, Err(SubmitError::Busy));
        assert!(handle.is_busy());

        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let Ok(SseEvent::TurnDone { .. }) = rx.recv().await {
                    return;
                }
            }
        })
        .await
        .expect("turn did not finish");

        let requests = llm.recorded_requests();
        assert_eq!(requests.len(), 1);
        let texts: Vec<_> = requests[0].1.messages.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["first"]);

        assert!(!handle.is_busy());
        assert_eq!(handle.submit("third").await, Ok(()));
    }

    #[tokio::test]
    async fn test_cancel_during_request() {
        let llm = Arc::new(MockLlm::new().with_delay(Duration::from_secs(5)));
        let handle = spawn(&llm, &["a"], RuntimeOptions::default());
        let mut rx = handle.subscribe();

        handle.submit("slow please").await.unwrap();
        wait_until_working(&handle).await;
        handle.cancel().await.unwrap();

        let outcome = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if let Ok(SseEvent::TurnDone { outcome }) = rx.recv().await {
                    return outcome;
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(outcome, TurnOutcome::Cancelled);
        assert_eq!(handle.state(), TurnState::Cancelled);
    }

    #[tokio::test]
    async fn test_missing_credential_blocks_submission() {
        let llm = Arc::new(MockLlm::new());
        let handle = SessionHandle::spawn(
            llm.clone(),
            SessionContext::new("test-session", "mock-model"),
            RuntimeOptions::default(),
            CredentialStore::default(),
            presentation(&["a"]),
        );

        assert_eq!(
            handle.submit("hello").await,
            Err(SubmitError::CredentialRequired)
        );
        assert!(llm.recorded_requests().is_empty());

        handle.credentials().set("sk-late");
        assert_eq!(run_turn(&handle, "hello").await, TurnOutcome::Done);
    }

    #[tokio::test]
    async fn test_prior_turns_carried_into_next_request() {
        let llm = Arc::new(MockLlm::queued(vec![
            text_response("First answer"),
            text_response("Second answer"),
        ]));
        let handle = spawn(&llm, &["a"], RuntimeOptions::default());

        run_turn(&handle, "first question").await;
        run_turn(&handle, "second question").await;

        let requests = llm.recorded_requests();
        let texts: Vec<_> = requests[1]
            .1
            .messages
            .iter()
            .map(|m| (m.role, m.text.as_str()))
            .collect();
        assert_eq!(
            texts,
            vec![
                (MessageRole::User, "first question"),
                (MessageRole::Assistant, "First answer"),
                (MessageRole::User, "second question"),
            ]
        );
    }

    #[tokio::test]
    async fn test_add_slide_broadcasts_deck_and_navigate() {
        let llm = Arc::new(MockLlm::queued(vec![
            tool_response("c1", "add_slide", json!({"content": "<h2>New</h2>"})),
            text_response("Added."),
        ]));
        let handle = spawn(&llm, &["a"], RuntimeOptions::default());
        let mut rx = handle.subscribe();

        run_turn(&handle, "add a slide").await;

        let mut saw_deck = false;
        let mut navigated = None;
        while let Ok(event) = rx.try_recv() {
            match event {
                SseEvent::Deck { presentation } => saw_deck = presentation.total_slides == 2,
                SseEvent::Navigate { index } => navigated = Some(index),
                _ => {}
            }
        }
        assert!(saw_deck);
        assert_eq!(navigated, Some(1));
    }
}
