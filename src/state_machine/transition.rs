//! Pure state transition function
//!
//! Given the same state, context and event this always yields the same new
//! state and effects. All I/O happens in the runtime.

use super::effect::{ChatKind, TurnOutcome};
use super::recovery::{should_force_write, FORCE_WRITE_INSTRUCTION};
use super::state::{CompletedTool, RecoveryPhase, SessionContext, TurnProgress, TurnState};
use super::{Effect, Event};
use crate::llm::LlmMessage;
use crate::tools::ToolOutput;
use thiserror::Error;

/// User-visible notice when the iteration cap ends a turn
pub const EXHAUSTED_NOTICE: &str = "Maximum iterations reached, task may be incomplete";

const RECOVERY_NOTICE: &str = "The model only read the slides; asking it to apply the change";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: TurnState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: TurnState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    #[must_use]
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    #[must_use]
    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Agent is busy, cannot accept message (cancel current operation first)")]
    AgentBusy,
    #[error("Cancellation in progress")]
    CancellationInProgress,
    #[error("Message is empty")]
    EmptyMessage,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
pub fn transition(
    state: &TurnState,
    context: &SessionContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // Single-flight: busy states reject new input
        (TurnState::Requesting { .. } | TurnState::Executing { .. }, Event::UserMessage { .. }) => {
            Err(TransitionError::AgentBusy)
        }
        (TurnState::CancellingLlm, Event::UserMessage { .. }) => {
            Err(TransitionError::CancellationInProgress)
        }

        // Idle or any terminal state + UserMessage -> Requesting
        (_, Event::UserMessage { text }) => {
            let text = text.trim();
            if text.is_empty() {
                return Err(TransitionError::EmptyMessage);
            }
            let progress = TurnProgress::new(text, context.convention);
            let convention = progress.convention;
            Ok(TransitionResult::new(TurnState::Requesting { progress })
                .with_effect(Effect::StartTurn {
                    text: text.to_string(),
                })
                .with_effect(Effect::chat(ChatKind::User, text))
                .with_effect(Effect::PublishState)
                .with_effect(Effect::RequestLlm { convention }))
        }

        (
            TurnState::Requesting { progress },
            Event::LlmResponse {
                text_segments,
                tool_calls,
                output_text,
                convention,
            },
        ) => {
            let mut progress = progress.clone();
            progress.convention = convention;
            progress
                .tools_called
                .extend(tool_calls.iter().map(|t| t.name().to_string()));

            let mut effects = Vec::new();
            for segment in &text_segments {
                effects.push(Effect::transcript(LlmMessage::assistant(segment.clone())));
                effects.push(Effect::chat(ChatKind::Assistant, segment.clone()));
            }

            let mut tool_calls = tool_calls.into_iter();
            if let Some(first) = tool_calls.next() {
                let state = TurnState::Executing {
                    progress,
                    current_tool: first.clone(),
                    remaining_tools: tool_calls.collect(),
                    completed: vec![],
                };
                return Ok(TransitionResult::new(state)
                    .with_effects(effects)
                    .with_effect(Effect::PublishState)
                    .with_effect(Effect::execute_tool(first)));
            }

            // No tool calls: the turn ends unless the model stalled after reading
            if progress.recovery == RecoveryPhase::NotUsed
                && should_force_write(&progress.intent, &progress.tools_called)
            {
                progress.recovery = RecoveryPhase::Active;
                let convention = progress.convention;
                return Ok(TransitionResult::new(TurnState::Requesting { progress })
                    .with_effects(effects)
                    .with_effect(Effect::transcript(LlmMessage::system(
                        FORCE_WRITE_INSTRUCTION,
                    )))
                    .with_effect(Effect::chat(ChatKind::Notice, RECOVERY_NOTICE))
                    .with_effect(Effect::PublishState)
                    .with_effect(Effect::RequestLlm { convention }));
            }

            if text_segments.is_empty() {
                if let Some(text) = output_text {
                    effects.push(Effect::transcript(LlmMessage::assistant(text.clone())));
                    effects.push(Effect::chat(ChatKind::Assistant, text));
                }
            }

            Ok(TransitionResult::new(TurnState::Done)
                .with_effects(effects)
                .with_effect(Effect::PublishState)
                .with_effect(Effect::finished(TurnOutcome::Done)))
        }

        (TurnState::Requesting { .. }, Event::LlmError { message, error_kind }) => {
            Ok(TransitionResult::new(TurnState::Failed {
                message: message.clone(),
                error_kind,
            })
            .with_effect(Effect::chat(ChatKind::Error, message))
            .with_effect(Effect::PublishState)
            .with_effect(Effect::finished(TurnOutcome::Failed)))
        }

        (
            TurnState::Executing {
                progress,
                current_tool,
                remaining_tools,
                completed,
            },
            Event::ToolComplete {
                tool_use_id,
                result,
            },
        ) if tool_use_id == current_tool.id => {
            let annotation = tool_annotation(current_tool.name(), &result);
            let mut completed = completed.clone();
            completed.push(CompletedTool {
                tool_use_id,
                name: current_tool.name().to_string(),
                output: result,
            });

            if let Some((next, rest)) = remaining_tools.split_first() {
                return Ok(TransitionResult::new(TurnState::Executing {
                    progress: progress.clone(),
                    current_tool: next.clone(),
                    remaining_tools: rest.to_vec(),
                    completed,
                })
                .with_effect(Effect::chat(ChatKind::Tool, annotation))
                .with_effect(Effect::PublishState)
                .with_effect(Effect::execute_tool(next.clone())));
            }

            let feedback = Effect::transcript(LlmMessage::system(batch_feedback(&completed)));
            let base = TransitionResult::new(TurnState::Idle)
                .with_effect(Effect::chat(ChatKind::Tool, annotation))
                .with_effect(feedback);

            if progress.recovery == RecoveryPhase::Active {
                return Ok(TransitionResult {
                    new_state: TurnState::Done,
                    ..base
                }
                .with_effect(Effect::PublishState)
                .with_effect(Effect::finished(TurnOutcome::Done)));
            }

            if progress.iteration >= context.max_iterations {
                return Ok(TransitionResult {
                    new_state: TurnState::Exhausted {
                        iterations: progress.iteration,
                    },
                    ..base
                }
                .with_effect(Effect::chat(ChatKind::Notice, EXHAUSTED_NOTICE))
                .with_effect(Effect::PublishState)
                .with_effect(Effect::finished(TurnOutcome::Exhausted)));
            }

            let mut progress = progress.clone();
            progress.iteration += 1;
            let convention = progress.convention;
            Ok(TransitionResult {
                new_state: TurnState::Requesting { progress },
                ..base
            }
            .with_effect(Effect::PublishState)
            .with_effect(Effect::RequestLlm { convention }))
        }

        // Cancellation. A batch runs to completion inline, so a cancel sent
        // mid-batch is read at the next Requesting.
        (TurnState::Requesting { .. }, Event::UserCancel) => {
            Ok(TransitionResult::new(TurnState::CancellingLlm)
                .with_effect(Effect::AbortLlm)
                .with_effect(Effect::PublishState))
        }
        (
            TurnState::CancellingLlm,
            Event::LlmResponse { .. } | Event::LlmError { .. } | Event::LlmAborted,
        ) => Ok(TransitionResult::new(TurnState::Cancelled)
            .with_effect(Effect::chat(ChatKind::Notice, "Cancelled"))
            .with_effect(Effect::PublishState)
            .with_effect(Effect::finished(TurnOutcome::Cancelled))),

        // Nothing in flight to cancel
        (TurnState::CancellingLlm | TurnState::Idle, Event::UserCancel) => {
            Ok(TransitionResult::new(state.clone()))
        }
        (s, Event::UserCancel) if s.is_terminal() => Ok(TransitionResult::new(state.clone())),

        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "{} cannot handle {}",
            state.name(),
            event_name(&event)
        ))),
    }
}

fn tool_annotation(name: &str, result: &ToolOutput) -> String {
    if result.success {
        format!("✓ {name}: {}", result.output)
    } else {
        format!("✗ {name}: {}", result.output)
    }
}

/// One synthetic system turn carrying every result of the batch
fn batch_feedback(completed: &[CompletedTool]) -> String {
    let mut text = String::from("Tool results:");
    for tool in completed {
        text.push('\n');
        text.push_str(&tool.output.feedback_line(&tool.name));
    }
    text
}

fn event_name(event: &Event) -> &'static str {
    match event {
        Event::UserMessage { .. } => "user_message",
        Event::UserCancel => "user_cancel",
        Event::LlmResponse { .. } => "llm_response",
        Event::LlmError { .. } => "llm_error",
        Event::LlmAborted => "llm_aborted",
        Event::ToolComplete { .. } => "tool_complete",
    }
}
