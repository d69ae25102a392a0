//! Correlation engine for the tutor chat core.
//!
//! The engine owns the lifecycle of a single user turn: it mints a stable
//! turn identity, appends a provisional incoming entry to the transcript,
//! then fans out two independent asynchronous enrichment tasks closed over
//! that identity. Each task resolves at its own pace and merges its result
//! back through the transcript's identity-addressed contract:
//!
//! - the **feedback task** calls the completion service twice in sequence
//!   (grammar correction, then a Spanish explanation), joins the results
//!   with a blank line, and patches the incoming entry's feedback slot;
//! - the **reply task** calls the completion service once and appends a
//!   brand-new outgoing entry.
//!
//! The tasks race. The incoming entry always precedes the outgoing one
//! because it was appended before either task was spawned; beyond that, no
//! interleaving between the feedback patch and the reply append is
//! guaranteed, and consumers must not assume one.
//!
//! There is no retry, cancellation, or engine-level error state: the
//! completion collaborator is total (it absorbs its own failures into a
//! fallback string), so every task calls back exactly once and the worst
//! outcome of a turn is cosmetic.

#![deny(unsafe_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use tutor_transcript::{Entry, Transcript, TurnId, FEEDBACK_SLOT};

pub mod prompts;

/// Boundary to the external text-generation service.
///
/// The contract is total: `complete` never fails as observed by the engine.
/// Implementations absorb their own transport and parse failures and resolve
/// with a fallback string instead, so the engine performs no error handling
/// around this call.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, message: &str, instruction: &str) -> String;
}

/// Join handles for a started turn's enrichment tasks.
///
/// The engine never awaits these itself; they exist so front-ends and tests
/// can wait for a turn to quiesce.
pub struct TurnHandles {
    pub turn: TurnId,
    pub feedback: JoinHandle<()>,
    pub reply: JoinHandle<()>,
}

impl TurnHandles {
    /// Wait until both enrichment tasks have applied their effects.
    pub async fn settled(self) -> TurnId {
        let _ = self.feedback.await;
        let _ = self.reply.await;
        self.turn
    }
}

/// Drives one turn end-to-end against a shared transcript.
pub struct TurnEngine {
    transcript: Arc<Transcript>,
    client: Arc<dyn CompletionClient>,
    next_turn: AtomicU64,
}

impl TurnEngine {
    pub fn new(transcript: Arc<Transcript>, client: Arc<dyn CompletionClient>) -> Self {
        Self {
            transcript,
            client,
            next_turn: AtomicU64::new(1),
        }
    }

    /// The transcript this engine mutates.
    pub fn transcript(&self) -> &Arc<Transcript> {
        &self.transcript
    }

    /// Begin a turn for the given user text.
    ///
    /// Blank or whitespace-only input is a no-op: no identity is minted, no
    /// entry is appended, no task is launched, and `None` is returned. For
    /// non-blank input the text is recorded verbatim (internal whitespace
    /// preserved), the incoming entry is visible before this method returns,
    /// and both enrichment tasks are launched concurrently.
    pub fn start_turn(&self, user_text: &str) -> Option<TurnHandles> {
        if user_text.trim().is_empty() {
            return None;
        }

        let turn = TurnId(self.next_turn.fetch_add(1, Ordering::Relaxed));
        if let Err(err) = self.transcript.append(Entry::incoming(turn, user_text)) {
            warn!(%turn, error = %err, "failed to record user message; turn abandoned");
            return None;
        }
        debug!(%turn, "turn started");

        let feedback = tokio::spawn(run_feedback(
            Arc::clone(&self.transcript),
            Arc::clone(&self.client),
            turn,
            user_text.to_string(),
        ));
        let reply = tokio::spawn(run_reply(
            Arc::clone(&self.transcript),
            Arc::clone(&self.client),
            turn,
            user_text.to_string(),
        ));

        Some(TurnHandles {
            turn,
            feedback,
            reply,
        })
    }
}

/// Feedback task: two sequential completions joined by a blank line, merged
/// into the incoming entry's feedback slot. The second call is a real
/// dependency of the first resolving, not a parallel fetch.
async fn run_feedback(
    transcript: Arc<Transcript>,
    client: Arc<dyn CompletionClient>,
    turn: TurnId,
    text: String,
) {
    let correction = client
        .complete(&text, &prompts::correction_instruction(&text))
        .await;
    let explanation = client
        .complete(&text, &prompts::explanation_instruction(&text))
        .await;
    let combined = format!("{correction}\n\n{explanation}");

    match transcript.patch_slot(turn, FEEDBACK_SLOT, combined) {
        Ok(_) => debug!(%turn, "feedback task finished"),
        Err(err) => warn!(%turn, error = %err, "feedback patch dropped"),
    }
}

/// Reply task: one completion appended as a new outgoing entry — always an
/// append, never a merge into the incoming entry.
async fn run_reply(
    transcript: Arc<Transcript>,
    client: Arc<dyn CompletionClient>,
    turn: TurnId,
    text: String,
) {
    let reply = client
        .complete(&text, &prompts::reply_instruction(&text))
        .await;

    match transcript.append(Entry::outgoing(turn, reply)) {
        Ok(()) => debug!(%turn, "reply task finished"),
        Err(err) => warn!(%turn, error = %err, "reply append dropped"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CannedClient;

    #[async_trait]
    impl CompletionClient for CannedClient {
        async fn complete(&self, _message: &str, _instruction: &str) -> String {
            "ok".to_string()
        }
    }

    fn engine() -> TurnEngine {
        TurnEngine::new(Arc::new(Transcript::new()), Arc::new(CannedClient))
    }

    #[tokio::test]
    async fn blank_input_is_a_noop() {
        let engine = engine();
        assert!(engine.start_turn("").is_none());
        assert!(engine.start_turn("   ").is_none());
        assert!(engine.start_turn("\t\n").is_none());
        assert!(engine.transcript().is_empty().unwrap());
    }

    #[tokio::test]
    async fn identities_are_unique_and_increasing() {
        let engine = engine();
        let first = engine.start_turn("one").unwrap().settled().await;
        let second = engine.start_turn("two").unwrap().settled().await;
        assert!(second > first);
    }
}
