//! Events that can occur during a turn

use crate::llm::{Convention, LlmErrorKind};
use crate::tools::{ToolCall, ToolOutput};

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    UserMessage {
        text: String,
    },
    UserCancel,

    // LLM events
    LlmResponse {
        /// Text segments in emission order
        text_segments: Vec<String>,
        /// Tool calls decoded from the response, in emission order
        tool_calls: Vec<ToolCall>,
        /// Aggregated text fallback from the protocol layer
        output_text: Option<String>,
        /// Convention that produced this response
        convention: Convention,
    },
    LlmError {
        message: String,
        error_kind: LlmErrorKind,
    },
    /// In-flight request stopped after a cancel
    LlmAborted,

    // Tool events
    ToolComplete {
        tool_use_id: String,
        result: ToolOutput,
    },
}
