use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::models::{ClaimSnapshot, ClaimStatus};

#[derive(Debug, Default)]
struct ContextState {
    claim_id: Option<String>,
    /// Last snapshot received from the service.
    confirmed: Option<ClaimSnapshot>,
    /// Local status shown until the next confirmed snapshot arrives.
    optimistic_status: Option<ClaimStatus>,
    generation: u64,
}

impl ContextState {
    fn advance(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }
}

/// Issued when a fetch starts; only the newest ticket may apply its result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    claim_id: String,
    generation: u64,
}

impl FetchTicket {
    pub fn claim_id(&self) -> &str {
        &self.claim_id
    }
}

/// Claim state of one wizard session.
///
/// Cloning shares the same state. Snapshots are replaced wholesale, never
/// merged, and a fetch result is dropped if a newer fetch or a claim switch
/// happened after it was issued.
#[derive(Clone, Debug, Default)]
pub struct ClaimContext {
    state: Arc<RwLock<ContextState>>,
}

impl ClaimContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn claim_id(&self) -> Option<String> {
        self.state.read().await.claim_id.clone()
    }

    /// Point the context at another claim. Switching claims discards the
    /// held snapshot and invalidates outstanding fetches.
    pub async fn set_claim_id(&self, claim_id: Option<String>) -> bool {
        let mut state = self.state.write().await;
        if state.claim_id == claim_id {
            return false;
        }
        state.advance();
        state.claim_id = claim_id;
        state.confirmed = None;
        state.optimistic_status = None;
        true
    }

    /// Install a snapshot received outside the fetch path, e.g. from create.
    pub async fn replace(&self, snapshot: ClaimSnapshot) {
        let mut state = self.state.write().await;
        state.advance();
        state.claim_id = Some(snapshot.id.clone());
        state.confirmed = Some(snapshot);
        state.optimistic_status = None;
    }

    pub async fn begin_fetch(&self, claim_id: &str) -> FetchTicket {
        let mut state = self.state.write().await;
        let generation = state.advance();
        FetchTicket {
            claim_id: claim_id.to_string(),
            generation,
        }
    }

    /// Apply a fetched snapshot. Returns false when the ticket is stale.
    pub async fn complete_fetch(&self, ticket: FetchTicket, snapshot: ClaimSnapshot) -> bool {
        let mut state = self.state.write().await;
        if ticket.generation != state.generation
            || state.claim_id.as_deref() != Some(ticket.claim_id.as_str())
        {
            debug!(
                claim_id = %ticket.claim_id,
                ticket = ticket.generation,
                current = state.generation,
                "dropping stale claim snapshot"
            );
            return false;
        }
        state.confirmed = Some(snapshot);
        state.optimistic_status = None;
        true
    }

    /// Last confirmed snapshot.
    pub async fn snapshot(&self) -> Option<ClaimSnapshot> {
        self.state.read().await.confirmed.clone()
    }

    /// Confirmed snapshot with the optimistic status laid over it.
    pub async fn projection(&self) -> Option<ClaimSnapshot> {
        let state = self.state.read().await;
        let mut snapshot = state.confirmed.clone()?;
        if let Some(status) = &state.optimistic_status {
            snapshot.status = status.clone();
        }
        Some(snapshot)
    }

    pub async fn status(&self) -> Option<ClaimStatus> {
        let state = self.state.read().await;
        state
            .optimistic_status
            .clone()
            .or_else(|| state.confirmed.as_ref().map(|c| c.status.clone()))
    }

    /// Show `status` locally until confirmed; returns the overlay it replaced.
    pub async fn set_optimistic_status(&self, status: ClaimStatus) -> Option<ClaimStatus> {
        self.state.write().await.optimistic_status.replace(status)
    }

    /// Put back an overlay returned by [`Self::set_optimistic_status`].
    pub async fn restore_optimistic_status(&self, previous: Option<ClaimStatus>) {
        self.state.write().await.optimistic_status = previous;
    }

    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.advance();
        state.claim_id = None;
        state.confirmed = None;
        state.optimistic_status = None;
    }
}
