//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the executor with mock implementations.

use crate::llm::ToolDefinition;
use crate::tools::{ToolDispatcher, ToolInput, ToolOutput, ToolRegistry};
use async_trait::async_trait;
use std::sync::Arc;

/// Executor for tools
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Execute one decoded tool call to completion
    async fn execute(&self, input: &ToolInput) -> ToolOutput;

    /// Get tool definitions for LLM
    fn definitions(&self) -> Vec<ToolDefinition>;
}

#[async_trait]
impl<T: ToolExecutor + ?Sized> ToolExecutor for Arc<T> {
    async fn execute(&self, input: &ToolInput) -> ToolOutput {
        (**self).execute(input).await
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        (**self).definitions()
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Adapter pairing the declared registry with the deck dispatcher
pub struct DeckToolExecutor {
    registry: ToolRegistry,
    dispatcher: ToolDispatcher,
}

impl DeckToolExecutor {
    pub fn new(registry: ToolRegistry, dispatcher: ToolDispatcher) -> Self {
        Self {
            registry,
            dispatcher,
        }
    }
}

#[async_trait]
impl ToolExecutor for DeckToolExecutor {
    async fn execute(&self, input: &ToolInput) -> ToolOutput {
        self.dispatcher.execute(input).await
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        self.registry.definitions()
    }
}
