//! API request and response types

use crate::llm::ToolDefinition;
use crate::runtime::ChatEntry;
use serde::{Deserialize, Serialize};

/// Request to send a chat message
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub text: String,
}

/// Request to supply the model credential
#[derive(Debug, Deserialize)]
pub struct CredentialRequest {
    pub api_key: String,
}

/// Renderer cursor change
#[derive(Debug, Deserialize)]
pub struct NavigateRequest {
    pub index: usize,
}

/// Renderer drag-reorder
#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub from: usize,
    pub to: usize,
}

/// Response for chat action
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub queued: bool,
}

/// Response for cancel action
#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct CredentialResponse {
    pub configured: bool,
}

#[derive(Debug, Serialize)]
pub struct NavigateResponse {
    pub current_index: usize,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub entries: Vec<ChatEntry>,
    pub agent_working: bool,
}

#[derive(Debug, Serialize)]
pub struct ToolsResponse {
    pub tools: Vec<ToolDefinition>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
