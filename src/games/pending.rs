use crate::errors::ResolverError;
use crate::games::types::Outcome;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Rounds waiting for an outcome, keyed by round id.
///
/// Every event source that can decide a round goes through [`complete_round`](Self::complete_round);
/// the first caller wins and later ones are told the round is gone.
#[derive(Clone, Default)]
pub struct PendingRounds {
    pending: Arc<DashMap<String, oneshot::Sender<Outcome>>>,
}

impl PendingRounds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a round and get the receiving half of its outcome
    pub fn register(&self, round_id: &str) -> oneshot::Receiver<Outcome> {
        let (tx, rx) = oneshot::channel();
        self.pending.insert(round_id.to_string(), tx);
        rx
    }

    /// Deliver an outcome. Fails if the round was already resolved or never registered.
    pub fn complete_round(&self, round_id: &str, outcome: Outcome) -> Result<(), ResolverError> {
        let (_, sender) = self
            .pending
            .remove(round_id)
            .ok_or_else(|| ResolverError::AlreadyResolved(round_id.to_string()))?;

        // Receiver may have given up; the round is gone either way
        let _ = sender.send(outcome);
        Ok(())
    }

    /// Drop a round without an outcome; its receiver sees a closed channel
    pub fn remove_pending(&self, round_id: &str) -> bool {
        self.pending.remove(round_id).is_some()
    }

    pub fn is_pending(&self, round_id: &str) -> bool {
        self.pending.contains_key(round_id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
