//! Single in-flight completion with streamed progress.
//!
//! A [`CompletionSession`] owns the one request a caller is waiting on.
//! Starting a new request cancels the previous one; the superseded request
//! stops silently and never reports anything.

use super::client::CompletionClient;
use super::provider::{CompletionRequest, ProviderConfig};
use crate::error::CompletionResult;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Progress of the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A text fragment, in arrival order (streaming only)
    Chunk(String),
    /// Terminal outcome; exactly one per request that was not superseded
    Finished(CompletionResult<String>),
}

struct SessionState {
    generation: u64,
    cancel: Option<CancellationToken>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

/// Runs completions one at a time on top of a shared [`CompletionClient`].
#[derive(Clone)]
pub struct CompletionSession {
    client: Arc<CompletionClient>,
    state: Arc<Mutex<SessionState>>,
}

impl CompletionSession {
    /// Create a session and the receiver its events are delivered to.
    pub fn new(client: Arc<CompletionClient>) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Self {
            client,
            state: Arc::new(Mutex::new(SessionState {
                generation: 0,
                cancel: None,
                events: tx,
            })),
        };
        (session, rx)
    }

    /// Start a request, cancelling any request still in flight.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self, config: ProviderConfig, request: CompletionRequest) -> JoinHandle<()> {
        let cancel = CancellationToken::new();
        let generation = {
            let mut state = self.lock();
            if let Some(previous) = state.cancel.replace(cancel.clone()) {
                tracing::debug!("Superseding in-flight request");
                previous.cancel();
            }
            state.generation += 1;
            state.generation
        };

        let client = Arc::clone(&self.client);
        let state = Arc::clone(&self.state);

        tokio::spawn(async move {
            let chunk_state = Arc::clone(&state);
            let chunk_cancel = cancel.clone();
            let result = client
                .complete(&config, &request, &cancel, move |chunk| {
                    let state = lock(&chunk_state);
                    if state.generation == generation && !chunk_cancel.is_cancelled() {
                        let _ = state.events.send(SessionEvent::Chunk(chunk.to_string()));
                    }
                })
                .await;

            let mut state = lock(&state);
            if state.generation != generation {
                tracing::debug!(generation, "Dropping result of superseded request");
                return;
            }
            state.cancel = None;
            let _ = state.events.send(SessionEvent::Finished(result));
        })
    }

    /// Cancel the current request. Returns whether one was in flight.
    ///
    /// The cancelled request still reports `Finished(Err(Cancelled))` with
    /// whatever text it had received.
    pub fn cancel(&self) -> bool {
        match self.lock().cancel.take() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Whether a request is currently in flight.
    pub fn is_busy(&self) -> bool {
        self.lock().cancel.is_some()
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        lock(&self.state)
    }
}

// A panicking chunk callback must not wedge the session.
fn lock(state: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}
