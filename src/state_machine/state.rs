//! Turn state types

use crate::llm::{Convention, LlmErrorKind};
use crate::tools::{ToolCall, ToolOutput};
use serde::Serialize;

/// Whether the one-shot forced-completion pass has been spent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryPhase {
    #[default]
    NotUsed,
    /// The extra pass is in flight; the turn ends after it
    Active,
}

/// Bookkeeping carried through one user turn
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnProgress {
    /// The user's utterance that started the turn
    pub intent: String,
    /// 1-based request/execute round trip counter
    pub iteration: u32,
    /// Names of every tool called so far this turn, in order
    pub tools_called: Vec<String>,
    pub recovery: RecoveryPhase,
    /// Convention that last succeeded; sticky for the rest of the turn
    pub convention: Convention,
}

impl TurnProgress {
    pub fn new(intent: impl Into<String>, convention: Convention) -> Self {
        Self {
            intent: intent.into(),
            iteration: 1,
            tools_called: Vec::new(),
            recovery: RecoveryPhase::NotUsed,
            convention,
        }
    }
}

/// A finished tool call within the current batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletedTool {
    pub tool_use_id: String,
    pub name: String,
    pub output: ToolOutput,
}

/// Orchestration state for the single in-flight turn
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnState {
    /// No turn has run yet
    #[default]
    Idle,

    /// Model request in flight
    Requesting { progress: TurnProgress },

    /// Running the batch's tool calls one at a time
    Executing {
        progress: TurnProgress,
        current_tool: ToolCall,
        remaining_tools: Vec<ToolCall>,
        completed: Vec<CompletedTool>,
    },

    /// User cancelled; waiting for the in-flight request to wind down
    CancellingLlm,

    /// Model answered without tool calls
    Done,

    /// Iteration cap reached; the task may be incomplete
    Exhausted { iterations: u32 },

    Cancelled,

    /// Credential, network, timeout or protocol failure
    Failed {
        message: String,
        error_kind: LlmErrorKind,
    },
}

impl TurnState {
    /// A turn is in flight and new submissions are rejected
    pub fn is_working(&self) -> bool {
        matches!(
            self,
            TurnState::Requesting { .. } | TurnState::Executing { .. } | TurnState::CancellingLlm
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TurnState::Done
                | TurnState::Exhausted { .. }
                | TurnState::Cancelled
                | TurnState::Failed { .. }
        )
    }

    /// Stable state name for clients
    pub fn name(&self) -> &'static str {
        match self {
            TurnState::Idle => "idle",
            TurnState::Requesting { .. } => "requesting",
            TurnState::Executing { .. } => "executing",
            TurnState::CancellingLlm => "cancelling_llm",
            TurnState::Done => "done",
            TurnState::Exhausted { .. } => "exhausted",
            TurnState::Cancelled => "cancelled",
            TurnState::Failed { .. } => "failed",
        }
    }
}

/// Context for a session (immutable configuration)
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session_id: String,
    pub model_id: String,
    /// Request/execute round trips allowed per turn
    pub max_iterations: u32,
    /// Convention each turn starts with
    pub convention: Convention,
}

/// Default iteration cap per turn
pub const DEFAULT_MAX_ITERATIONS: u32 = 10;

impl SessionContext {
    pub fn new(session_id: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            model_id: model_id.into(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            convention: Convention::default(),
        }
    }

    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    #[must_use]
    pub fn with_convention(mut self, convention: Convention) -> Self {
        self.convention = convention;
        self
    }
}
