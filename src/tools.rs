//! Slide tools exposed to the model
//!
//! The registry declares what the model may call, `ToolInput` decodes each
//! call into a typed variant at the boundary, and the dispatcher applies it
//! to the shared presentation.

mod dispatch;
mod input;
mod schema;

pub use dispatch::ToolDispatcher;
pub use input::{ToolCall, ToolInput};
pub use schema::ToolRegistry;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result envelope from tool execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub success: bool,
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl ToolOutput {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            payload: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            output: message.into(),
            payload: None,
        }
    }

    pub fn with_payload(mut self, data: Value) -> Self {
        self.payload = Some(data);
        self
    }

    /// One line of the aggregated feedback turn sent back to the model
    pub fn feedback_line(&self, tool_name: &str) -> String {
        let status = if self.success { "ok" } else { "error" };
        match &self.payload {
            Some(payload) => format!("[{tool_name}] {status}: {} {payload}", self.output),
            None => format!("[{tool_name}] {status}: {}", self.output),
        }
    }
}
