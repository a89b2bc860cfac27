//! Effects produced by state transitions

use crate::llm::{Convention, LlmMessage};
use crate::tools::ToolCall;
use serde::{Deserialize, Serialize};

/// Kind of a caller-visible chat entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatKind {
    User,
    Assistant,
    /// Short success/failure annotation for one tool call
    Tool,
    /// Informational notice, e.g. the iteration cap
    Notice,
    Error,
}

/// How a turn ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnOutcome {
    Done,
    Exhausted,
    Cancelled,
    Failed,
}

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Begin a fresh transcript for a new turn, seeded with the user's words
    StartTurn { text: String },

    /// Append a turn to the current transcript
    AppendTranscript { message: LlmMessage },

    /// Add an entry to the caller-visible chat history
    RecordChat { kind: ChatKind, text: String },

    /// Publish the new state to observers
    PublishState,

    /// Make an LLM request with the given starting convention
    RequestLlm { convention: Convention },

    /// Abort the currently running LLM request
    AbortLlm,

    /// Execute a tool against the document
    ExecuteTool { tool: ToolCall },

    /// The turn reached a terminal state
    TurnFinished { outcome: TurnOutcome },
}

impl Effect {
    pub fn chat(kind: ChatKind, text: impl Into<String>) -> Self {
        Effect::RecordChat {
            kind,
            text: text.into(),
        }
    }

    pub fn transcript(message: LlmMessage) -> Self {
        Effect::AppendTranscript { message }
    }

    pub fn execute_tool(tool: ToolCall) -> Self {
        Effect::ExecuteTool { tool }
    }

    pub fn finished(outcome: TurnOutcome) -> Self {
        Effect::TurnFinished { outcome }
    }
}
