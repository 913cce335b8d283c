//! Request orchestration across the store, the ledger and the event stream.
//!
//! Local state is committed regardless of what the ledger or the broker
//! do: for sessions and votes those are best-effort side channels whose
//! outcome is reported next to the local result. Staking has no local
//! state, so there ledger failures are returned to the caller.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use votegate_chain::{wait_for_confirmation, ChainError, LedgerClient, Receipt, SessionSubmission};
use votegate_messages::{DomainEvent, EventPublisher};
use votegate_sessions::{
    DetailWaiters, IdAssignment, SessionDraft, SessionError, SessionStore, UserProfile,
    VoteReceipt, VoteRequest, VoteSession,
};
use votegate_types::{Identity, SessionId, TxRef};

use crate::error::ApiError;
use crate::metrics::GatewayMetrics;

/// What happened on the ledger side of a create or vote.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChainOutcome {
    Submitted { tx_ref: TxRef },
    Failed { error: String },
    /// The ledger was not asked, e.g. a vote on a session it never saw.
    Skipped { reason: String },
}

#[derive(Clone, Copy, Debug)]
pub struct ServiceSettings {
    /// How long a detail lookup waits for the indexer to answer.
    pub detail_wait: Duration,
    pub confirmation_timeout: Duration,
    pub confirmation_poll: Duration,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            detail_wait: Duration::from_millis(100),
            confirmation_timeout: Duration::from_secs(60),
            confirmation_poll: Duration::from_secs(1),
        }
    }
}

pub struct VotingService {
    store: Arc<SessionStore>,
    ledger: Arc<dyn LedgerClient>,
    publisher: Arc<dyn EventPublisher>,
    waiters: Arc<DetailWaiters>,
    metrics: Arc<GatewayMetrics>,
    settings: ServiceSettings,
}

impl VotingService {
    pub fn new(
        store: Arc<SessionStore>,
        ledger: Arc<dyn LedgerClient>,
        publisher: Arc<dyn EventPublisher>,
        waiters: Arc<DetailWaiters>,
        metrics: Arc<GatewayMetrics>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            store,
            ledger,
            publisher,
            waiters,
            metrics,
            settings,
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn metrics(&self) -> &Arc<GatewayMetrics> {
        &self.metrics
    }

    pub async fn list_sessions(&self, include_private: bool) -> Vec<VoteSession> {
        self.publish_best_effort(&DomainEvent::AllSessionsRequested);
        self.store.list_sessions(include_private).await
    }

    /// Look a session up, giving the indexer a bounded chance to report it
    /// when it is not known locally.
    pub async fn session(&self, id: &SessionId) -> Result<VoteSession, ApiError> {
        // Registered before the request goes out so a fast answer is not missed.
        let wait = self.waiters.register(id.clone());
        self.publish_best_effort(&DomainEvent::detail_requested(id));

        match self.store.get_session(id).await {
            Ok(session) => Ok(session),
            Err(SessionError::NotFound(_)) => {
                debug!(session_id = %id, "session unknown locally, waiting for indexer");
                wait.wait(self.settings.detail_wait)
                    .await
                    .ok_or_else(|| SessionError::NotFound(id.clone()).into())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn create_session(
        &self,
        draft: SessionDraft,
    ) -> Result<(VoteSession, ChainOutcome), ApiError> {
        draft.validate()?;

        let submission = SessionSubmission {
            title: draft.title.clone(),
            description: draft.description.clone(),
            start_time: draft.start_time,
            end_time: draft.end_time,
            min_votes: draft.min_votes,
            is_private: draft.is_private,
            allowlist: draft.allowlist.clone(),
            choices: draft.choices.clone(),
        };
        let (ids, chain) = match self.submit_session(&submission).await {
            Ok((session_id, tx)) => (
                IdAssignment::Confirmed(session_id),
                ChainOutcome::Submitted { tx_ref: tx },
            ),
            Err(e) => {
                warn!(title = %submission.title, error = %e, "ledger submission failed, using local id");
                self.metrics.upstream_failures.inc();
                (IdAssignment::Local, ChainOutcome::Failed { error: e.to_string() })
            }
        };

        let session = self.store.create_session(draft, ids).await?;
        self.metrics.sessions_created.inc();
        self.metrics
            .session_count
            .set(self.store.session_count().await as i64);
        info!(session_id = %session.id, title = %session.title, "session created");

        self.publish_best_effort(&DomainEvent::session_created(&session));
        Ok((session, chain))
    }

    async fn submit_session(
        &self,
        submission: &SessionSubmission,
    ) -> Result<(SessionId, TxRef), ChainError> {
        let submitted = self.ledger.submit_vote_session(submission).await?;
        self.confirm(&submitted.tx).await?;
        Ok((submitted.session_id, submitted.tx))
    }

    /// Run the vote protocol, then hand accepted votes to the ledger and
    /// the event stream.
    pub async fn cast_vote(
        &self,
        request: VoteRequest,
    ) -> Result<(VoteReceipt, ChainOutcome), ApiError> {
        let receipt = match self.store.cast_vote(&request).await {
            Ok(receipt) => receipt,
            Err(e) => {
                self.metrics.votes_rejected.inc();
                debug!(session_id = %request.session_id, voter = %request.voter, error = %e, "vote rejected");
                return Err(e.into());
            }
        };
        self.metrics.votes_accepted.inc();
        info!(
            session_id = %receipt.session_id,
            voter = %receipt.voter,
            option_id = %receipt.option_id,
            "vote accepted"
        );

        let chain = if receipt.session_id.is_local() {
            ChainOutcome::Skipped {
                reason: "session is not on the ledger".into(),
            }
        } else {
            match self
                .ledger
                .submit_vote(&receipt.session_id, receipt.choice_index)
                .await
            {
                Ok(tx) => ChainOutcome::Submitted { tx_ref: tx },
                Err(e) => {
                    warn!(session_id = %receipt.session_id, error = %e, "ledger vote failed");
                    self.metrics.upstream_failures.inc();
                    ChainOutcome::Failed { error: e.to_string() }
                }
            }
        };

        self.publish_best_effort(&DomainEvent::vote_cast(&receipt));
        Ok((receipt, chain))
    }

    pub async fn user_profile(&self, identity: &Identity) -> UserProfile {
        self.publish_best_effort(&DomainEvent::history_requested(identity));
        self.store.user_profile(identity).await
    }

    /// Announce a wallet to the indexer. Nothing else records the
    /// registration, so a failed publish fails the request.
    pub async fn connect_wallet(&self, identity: &Identity) -> Result<(), ApiError> {
        self.publisher
            .publish(&DomainEvent::user_registered(identity))
            .map_err(|e| {
                self.metrics.upstream_failures.inc();
                ApiError::from(e)
            })?;
        info!(user = %identity, "wallet connected");
        Ok(())
    }

    pub async fn stake(&self, staker: &Identity, amount_wei: u128) -> Result<Receipt, ApiError> {
        let tx = self.ledger.stake(staker, amount_wei).await;
        self.settle("stake", staker, tx).await
    }

    pub async fn unstake(&self, staker: &Identity) -> Result<Receipt, ApiError> {
        let tx = self.ledger.unstake(staker).await;
        self.settle("unstake", staker, tx).await
    }

    pub async fn claim(&self, staker: &Identity) -> Result<Receipt, ApiError> {
        let tx = self.ledger.claim(staker).await;
        self.settle("claim", staker, tx).await
    }

    async fn settle(
        &self,
        operation: &'static str,
        staker: &Identity,
        tx: Result<TxRef, ChainError>,
    ) -> Result<Receipt, ApiError> {
        let result = match tx {
            Ok(tx) => self.confirm(&tx).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(receipt) => {
                info!(operation, staker = %staker, tx = %receipt.tx, "staking call confirmed");
                Ok(receipt)
            }
            Err(e) => {
                warn!(operation, staker = %staker, error = %e, "staking call failed");
                if !matches!(e, ChainError::Contract(_) | ChainError::InvalidRequest(_)) {
                    self.metrics.upstream_failures.inc();
                }
                Err(e.into())
            }
        }
    }

    async fn confirm(&self, tx: &TxRef) -> Result<Receipt, ChainError> {
        wait_for_confirmation(
            self.ledger.as_ref(),
            tx,
            self.settings.confirmation_timeout,
            self.settings.confirmation_poll,
        )
        .await
    }

    fn publish_best_effort(&self, event: &DomainEvent) {
        if let Err(e) = self.publisher.publish(event) {
            warn!(event_type = event.event_type(), error = %e, "event publish failed");
            self.metrics.upstream_failures.inc();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_outcome_is_tagged_by_status() {
        let failed = ChainOutcome::Failed {
            error: "down".into(),
        };
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            serde_json::json!({"status": "failed", "error": "down"})
        );
        let submitted = ChainOutcome::Submitted {
            tx_ref: TxRef::from_bytes(&[1]),
        };
        assert_eq!(
            serde_json::to_value(&submitted).unwrap(),
            serde_json::json!({"status": "submitted", "tx_ref": "0x01"})
        );
    }
}
