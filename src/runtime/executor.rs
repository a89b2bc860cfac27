//! Turn runtime executor

use super::traits::ToolExecutor;
use super::{ChatEntry, ChatHistory, RuntimeOptions, SseEvent, HISTORY_WINDOW};

use crate::deck::SharedPresentation;
use crate::llm::{
    complete_negotiated, Convention, LlmError, LlmMessage, LlmRequest, LlmService, MessageRole,
    SystemContent,
};
use crate::state_machine::{transition, Effect, Event, SessionContext, TransitionError, TurnState};
use crate::system_prompt::build_system_prompt;
use crate::tools::{ToolCall, ToolInput};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;

/// Generic turn runtime that can work with any LLM and tool implementations
pub struct TurnRuntime<L, T>
where
    L: LlmService + 'static,
    T: ToolExecutor + 'static,
{
    context: SessionContext,
    state: TurnState,
    llm: Arc<L>,
    tool_executor: Arc<T>,
    options: RuntimeOptions,
    presentation: SharedPresentation,
    history: ChatHistory,
    /// Transcript of the turn in flight
    transcript: Vec<LlmMessage>,
    /// User/assistant messages of finished turns
    conversation: Vec<LlmMessage>,
    event_rx: mpsc::Receiver<Event>,
    event_tx: mpsc::Sender<Event>,
    broadcast_tx: broadcast::Sender<SseEvent>,
    state_tx: watch::Sender<TurnState>,
    /// Single-flight reservation shared with the session handle
    in_flight: Arc<AtomicBool>,
    /// Token to cancel running LLM request
    llm_cancel_token: Option<CancellationToken>,
}

impl<L, T> TurnRuntime<L, T>
where
    L: LlmService + 'static,
    T: ToolExecutor + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        context: SessionContext,
        llm: L,
        tool_executor: T,
        options: RuntimeOptions,
        presentation: SharedPresentation,
        history: ChatHistory,
        event_rx: mpsc::Receiver<Event>,
        event_tx: mpsc::Sender<Event>,
        broadcast_tx: broadcast::Sender<SseEvent>,
        state_tx: watch::Sender<TurnState>,
        in_flight: Arc<AtomicBool>,
    ) -> Self {
        Self {
            context,
            state: TurnState::Idle,
            llm: Arc::new(llm),
            tool_executor: Arc::new(tool_executor),
            options,
            presentation,
            history,
            transcript: Vec::new(),
            conversation: Vec::new(),
            event_rx,
            event_tx,
            broadcast_tx,
            state_tx,
            in_flight,
            llm_cancel_token: None,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(
            session_id = %self.context.session_id,
            model = %self.context.model_id,
            max_iterations = self.context.max_iterations,
            "Starting session runtime"
        );

        // Process events in a loop - no recursion
        while let Some(event) = self.event_rx.recv().await {
            let starts_turn = matches!(event, Event::UserMessage { .. });
            if let Err(e) = self.process_event(event).await {
                if starts_turn {
                    // The reservation made for this message never became a turn
                    self.in_flight.store(false, Ordering::Release);
                }
                match e {
                    TransitionError::InvalidTransition(reason) => {
                        tracing::warn!(%reason, "Ignoring stale event");
                    }
                    other => {
                        tracing::warn!(error = %other, "Rejected event");
                        let _ = self.broadcast_tx.send(SseEvent::Error {
                            message: other.to_string(),
                        });
                    }
                }
            }
        }

        tracing::info!(session_id = %self.context.session_id, "Session runtime stopped");
    }

    async fn process_event(&mut self, event: Event) -> Result<(), TransitionError> {
        // Tool completions are generated inline and handled before the next
        // channel event, so a batch is never interleaved with user input
        let mut events_to_process = vec![event];

        while let Some(current_event) = events_to_process.pop() {
            let result = transition(&self.state, &self.context, current_event)?;
            self.state = result.new_state;

            for effect in result.effects {
                if let Some(generated_event) = self.execute_effect(effect).await {
                    events_to_process.push(generated_event);
                }
            }
        }

        Ok(())
    }

    /// Execute an effect and optionally return a generated event
    async fn execute_effect(&mut self, effect: Effect) -> Option<Event> {
        match effect {
            Effect::StartTurn { text } => {
                tracing::info!(session_id = %self.context.session_id, "Turn started");
                self.transcript = vec![LlmMessage::user(text)];
                None
            }

            Effect::AppendTranscript { message } => {
                self.transcript.push(message);
                None
            }

            Effect::RecordChat { kind, text } => {
                let entry = ChatEntry::new(kind, text);
                self.history.write().await.push(entry.clone());
                let _ = self.broadcast_tx.send(SseEvent::Chat { entry });
                None
            }

            Effect::PublishState => {
                self.state_tx.send_replace(self.state.clone());
                let state_json = serde_json::to_value(&self.state).unwrap_or(Value::Null);
                let _ = self
                    .broadcast_tx
                    .send(SseEvent::StateChange { state: state_json });
                None
            }

            Effect::RequestLlm { convention } => {
                self.spawn_llm_request(convention).await;
                // The event will come from the spawned task
                None
            }

            Effect::AbortLlm => {
                if let Some(token) = self.llm_cancel_token.take() {
                    token.cancel();
                }
                None
            }

            Effect::ExecuteTool { tool } => {
                tracing::info!(tool = %tool.name(), id = %tool.id, "Executing tool");
                let result = self.tool_executor.execute(&tool.input).await;
                Some(Event::ToolComplete {
                    tool_use_id: tool.id,
                    result,
                })
            }

            Effect::TurnFinished { outcome } => {
                tracing::info!(
                    session_id = %self.context.session_id,
                    ?outcome,
                    "Turn finished"
                );
                self.llm_cancel_token = None;
                self.archive_transcript();
                self.in_flight.store(false, Ordering::Release);
                let _ = self.broadcast_tx.send(SseEvent::TurnDone { outcome });
                None
            }
        }
    }

    /// Fold the finished turn's user and assistant messages into the
    /// conversation window. Synthetic system turns stay with their turn.
    fn archive_transcript(&mut self) {
        let finished = std::mem::take(&mut self.transcript);
        self.conversation.extend(
            finished
                .into_iter()
                .filter(|m| m.role != MessageRole::System),
        );
        let excess = self.conversation.len().saturating_sub(HISTORY_WINDOW);
        self.conversation.drain(..excess);
    }

    fn build_messages(&self) -> Vec<LlmMessage> {
        self.conversation
            .iter()
            .chain(self.transcript.iter())
            .cloned()
            .collect()
    }

    async fn spawn_llm_request(&mut self, convention: Convention) {
        let cancel_token = CancellationToken::new();
        self.llm_cancel_token = Some(cancel_token.clone());

        let snapshot = self.presentation.read().await.snapshot();
        let request = LlmRequest {
            system: vec![SystemContent::new(build_system_prompt(&snapshot))],
            messages: self.build_messages(),
            tools: self.tool_executor.definitions(),
            max_tokens: self.options.max_output_tokens,
        };

        let llm = self.llm.clone();
        let event_tx = self.event_tx.clone();
        let timeout = self.options.request_timeout;
        let iteration = match &self.state {
            TurnState::Requesting { progress } => progress.iteration,
            _ => 0,
        };

        tokio::spawn(async move {
            tracing::info!(iteration, %convention, "Making LLM request (background)");

            // Race LLM request against cancellation
            let event = tokio::select! {
                biased;

                () = cancel_token.cancelled() => {
                    tracing::info!("LLM request cancelled");
                    Event::LlmAborted
                }

                result = tokio::time::timeout(
                    timeout,
                    complete_negotiated(llm.as_ref(), &request, convention),
                ) => {
                    match result {
                        Ok(Ok((response, used))) => {
                            let tool_calls = response
                                .tool_uses()
                                .into_iter()
                                .map(|(id, name, input)| {
                                    let input = ToolInput::from_name_and_value(name, input.clone());
                                    ToolCall::new(id, input)
                                })
                                .collect();

                            Event::LlmResponse {
                                text_segments: response
                                    .text_segments()
                                    .into_iter()
                                    .map(ToString::to_string)
                                    .collect(),
                                tool_calls,
                                output_text: response.output_text.clone(),
                                convention: used,
                            }
                        }
                        Ok(Err(e)) => llm_error_event(e),
                        Err(_) => llm_error_event(LlmError::timed_out(format!(
                            "Model request timed out after {}s",
                            timeout.as_secs()
                        ))),
                    }
                }
            };

            let _ = event_tx.send(event).await;
        });
    }
}

fn llm_error_event(e: LlmError) -> Event {
    Event::LlmError {
        message: e.message,
        error_kind: e.kind,
    }
}
