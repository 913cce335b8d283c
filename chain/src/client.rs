use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use votegate_types::{Identity, SessionId, Timestamp, TxRef};

use crate::error::ChainError;

/// Parameters of an on-chain session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSubmission {
    pub title: String,
    pub description: String,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub min_votes: u64,
    pub is_private: bool,
    pub allowlist: Vec<Identity>,
    pub choices: Vec<String>,
}

/// A session the ledger accepted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmittedSession {
    pub session_id: SessionId,
    pub creator: Identity,
    pub tx: TxRef,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiptStatus {
    Success,
    Reverted,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    pub tx: TxRef,
    pub status: ReceiptStatus,
    pub block: u64,
}

/// Operations the gateway needs from the voting/staking contract.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Create a session and return the id the contract assigned to it.
    async fn submit_vote_session(
        &self,
        submission: &SessionSubmission,
    ) -> Result<SubmittedSession, ChainError>;

    async fn submit_vote(&self, session: &SessionId, choice_index: usize) -> Result<TxRef, ChainError>;

    async fn stake(&self, staker: &Identity, amount_wei: u128) -> Result<TxRef, ChainError>;

    async fn unstake(&self, staker: &Identity) -> Result<TxRef, ChainError>;

    async fn claim(&self, staker: &Identity) -> Result<TxRef, ChainError>;

    /// `None` while the transaction is still pending.
    async fn receipt(&self, tx: &TxRef) -> Result<Option<Receipt>, ChainError>;
}
