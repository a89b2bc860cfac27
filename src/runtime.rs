//! Runtime for executing turns
//!
//! One session owns one presentation. The runtime task serializes every
//! event for it; callers interact through a cloneable [`SessionHandle`].

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::TurnRuntime;
pub use traits::*;

use crate::deck::{DeckError, DeckObserver, DeckSnapshot, SharedPresentation};
use crate::llm::{CredentialStore, LlmService};
use crate::state_machine::{ChatKind, Event, SessionContext, TurnOutcome, TurnState};
use crate::tools::{ToolDispatcher, ToolRegistry};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, watch, RwLock};

/// Prior user/assistant messages carried into each request
pub const HISTORY_WINDOW: usize = 20;

/// One entry of the caller-visible chat projection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatEntry {
    pub id: String,
    pub kind: ChatKind,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl ChatEntry {
    pub fn new(kind: ChatKind, text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            text: text.into(),
            created_at: Utc::now(),
        }
    }
}

/// Display-only chat history
pub type ChatHistory = Arc<RwLock<Vec<ChatEntry>>>;

/// Events sent to SSE clients
#[derive(Debug, Clone)]
pub enum SseEvent {
    Init {
        presentation: DeckSnapshot,
        history: Vec<ChatEntry>,
        state: serde_json::Value,
        agent_working: bool,
    },
    Chat {
        entry: ChatEntry,
    },
    StateChange {
        /// Full state as JSON object (e.g., `{"type":"requesting","progress":{...}}`)
        state: serde_json::Value,
    },
    /// Slides or theme changed; the renderer must re-sync
    Deck {
        presentation: DeckSnapshot,
    },
    Navigate {
        index: usize,
    },
    TurnDone {
        outcome: TurnOutcome,
    },
    Error {
        message: String,
    },
}

/// Forwards deck notifications to SSE subscribers
pub struct BroadcastObserver {
    broadcast_tx: broadcast::Sender<SseEvent>,
}

impl BroadcastObserver {
    pub fn new(broadcast_tx: broadcast::Sender<SseEvent>) -> Self {
        Self { broadcast_tx }
    }
}

impl DeckObserver for BroadcastObserver {
    fn slides_changed(&self, snapshot: DeckSnapshot) {
        let _ = self.broadcast_tx.send(SseEvent::Deck {
            presentation: snapshot,
        });
    }

    fn navigated(&self, index: usize) {
        let _ = self.broadcast_tx.send(SseEvent::Navigate { index });
    }
}

/// Tunables for the model calls made by a session
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    pub max_output_tokens: Option<u32>,
    /// Deadline for one `Requesting` round trip
    pub request_timeout: Duration,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            max_output_tokens: Some(4096),
            request_timeout: Duration::from_secs(120),
        }
    }
}

/// Why a submission was refused before reaching the state machine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("API key required")]
    CredentialRequired,
    #[error("Agent is busy, cannot accept message (cancel current operation first)")]
    Busy,
    #[error("Message is empty")]
    EmptyMessage,
    #[error("Session runtime has stopped")]
    Closed,
}

/// Handle to interact with a running session
#[derive(Clone)]
pub struct SessionHandle {
    event_tx: mpsc::Sender<Event>,
    broadcast_tx: broadcast::Sender<SseEvent>,
    state_rx: watch::Receiver<TurnState>,
    presentation: SharedPresentation,
    history: ChatHistory,
    credentials: CredentialStore,
    tools: Arc<ToolRegistry>,
    /// Set by the submission that starts a turn, cleared when it finishes
    in_flight: Arc<AtomicBool>,
}

impl SessionHandle {
    /// Start a session runtime in the background and return its handle
    pub fn spawn<L: LlmService + 'static>(
        llm: L,
        context: SessionContext,
        options: RuntimeOptions,
        credentials: CredentialStore,
        presentation: SharedPresentation,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::channel(32);
        let (broadcast_tx, _) = broadcast::channel(128);
        let (state_tx, state_rx) = watch::channel(TurnState::Idle);
        let history: ChatHistory = Arc::new(RwLock::new(Vec::new()));
        let in_flight = Arc::new(AtomicBool::new(false));

        let observer = Arc::new(BroadcastObserver::new(broadcast_tx.clone()));
        let dispatcher = ToolDispatcher::new(presentation.clone(), observer);
        let executor = DeckToolExecutor::new(ToolRegistry::standard(), dispatcher);

        let session_id = context.session_id.clone();
        let runtime = TurnRuntime::new(
            context,
            llm,
            executor,
            options,
            presentation.clone(),
            history.clone(),
            event_rx,
            event_tx.clone(),
            broadcast_tx.clone(),
            state_tx,
            in_flight.clone(),
        );

        tokio::spawn(async move {
            runtime.run().await;
            tracing::info!(session_id = %session_id, "Session runtime finished");
        });

        Self {
            event_tx,
            broadcast_tx,
            state_rx,
            presentation,
            history,
            credentials,
            tools: Arc::new(ToolRegistry::standard()),
            in_flight,
        }
    }

    /// Submit a user utterance as a new turn
    pub async fn submit(&self, text: &str) -> Result<(), SubmitError> {
        if text.trim().is_empty() {
            return Err(SubmitError::EmptyMessage);
        }
        if !self.credentials.is_set() {
            return Err(SubmitError::CredentialRequired);
        }
        // Reserve the turn before it reaches the runtime
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SubmitError::Busy);
        }
        let sent = self
            .event_tx
            .send(Event::UserMessage {
                text: text.to_string(),
            })
            .await;
        if sent.is_err() {
            self.in_flight.store(false, Ordering::Release);
            return Err(SubmitError::Closed);
        }
        Ok(())
    }

    /// Cancel the in-flight model request, if any
    pub async fn cancel(&self) -> Result<(), SubmitError> {
        self.event_tx
            .send(Event::UserCancel)
            .await
            .map_err(|_| SubmitError::Closed)
    }

    /// Absorb a cursor change made through the renderer's own controls
    pub async fn navigate(&self, index: usize) -> usize {
        let index = self.presentation.write().await.deck.navigate_to_slide(index);
        let _ = self.broadcast_tx.send(SseEvent::Navigate { index });
        index
    }

    /// Move a slide on behalf of the renderer. Refused while a turn is running.
    pub async fn reorder(&self, from: usize, to: usize) -> Result<DeckSnapshot, ReorderError> {
        if self.is_busy() {
            return Err(ReorderError::Busy);
        }
        let mut presentation = self.presentation.write().await;
        presentation.deck.reorder_slide(from, to)?;
        let snapshot = presentation.snapshot();
        drop(presentation);

        let _ = self.broadcast_tx.send(SseEvent::Deck {
            presentation: snapshot.clone(),
        });
        Ok(snapshot)
    }

    /// A turn has been accepted and has not finished yet
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SseEvent> {
        self.broadcast_tx.subscribe()
    }

    pub fn state(&self) -> TurnState {
        self.state_rx.borrow().clone()
    }

    pub async fn snapshot(&self) -> DeckSnapshot {
        self.presentation.read().await.snapshot()
    }

    pub async fn history(&self) -> Vec<ChatEntry> {
        self.history.read().await.clone()
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Everything a freshly connected client needs
    pub async fn init_event(&self) -> SseEvent {
        let state = self.state();
        SseEvent::Init {
            presentation: self.snapshot().await,
            history: self.history().await,
            agent_working: state.is_working(),
            state: serde_json::to_value(&state).unwrap_or(serde_json::Value::Null),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReorderError {
    #[error("Agent is busy, cannot reorder slides")]
    Busy,
    #[error(transparent)]
    Deck(#[from] DeckError),
}
