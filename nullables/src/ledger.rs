//! Nullable ledger: record calls, answer deterministically.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use votegate_chain::{
    ChainError, LedgerClient, Receipt, ReceiptStatus, SessionSubmission, SubmittedSession,
};
use votegate_types::{Identity, SessionId, TxRef};

/// A call the ledger received.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerCall {
    SubmitSession(SessionSubmission),
    SubmitVote { session: SessionId, choice_index: usize },
    Stake { staker: Identity, amount_wei: u128 },
    Unstake { staker: Identity },
    Claim { staker: Identity },
}

/// A ledger that records calls instead of sending transactions.
///
/// Session ids are sequential from 1, every transaction is confirmed
/// immediately. Failures are scripted: either permanently with
/// [`set_unavailable`](Self::set_unavailable) or one call at a time with
/// [`fail_next`](Self::fail_next).
#[derive(Debug, Default)]
pub struct NullLedger {
    calls: Mutex<Vec<LedgerCall>>,
    scripted: Mutex<VecDeque<ChainError>>,
    unavailable: AtomicBool,
    unconfirmed: AtomicBool,
    next_session: AtomicU64,
    next_tx: AtomicU64,
}

impl NullLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Never produce receipts, so confirmation waits time out.
    pub fn set_unconfirmed(&self, unconfirmed: bool) {
        self.unconfirmed.store(unconfirmed, Ordering::SeqCst);
    }

    /// Fail the next call with `error`.
    pub fn fail_next(&self, error: ChainError) {
        lock(&self.scripted).push_back(error);
    }

    /// All calls received so far (for assertions).
    pub fn calls(&self) -> Vec<LedgerCall> {
        lock(&self.calls).clone()
    }

    fn record(&self, call: LedgerCall) -> Result<TxRef, ChainError> {
        lock(&self.calls).push(call);
        if let Some(error) = lock(&self.scripted).pop_front() {
            return Err(error);
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ChainError::Unavailable("null ledger set unavailable".into()));
        }
        let n = self.next_tx.fetch_add(1, Ordering::SeqCst) + 1;
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&n.to_be_bytes());
        Ok(TxRef::from_bytes(&bytes))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl LedgerClient for NullLedger {
    async fn submit_vote_session(
        &self,
        submission: &SessionSubmission,
    ) -> Result<SubmittedSession, ChainError> {
        let tx = self.record(LedgerCall::SubmitSession(submission.clone()))?;
        let id = self.next_session.fetch_add(1, Ordering::SeqCst) + 1;
        let creator = Identity::parse("0xnull-operator")
            .map_err(|e| ChainError::InvalidRequest(e.to_string()))?;
        Ok(SubmittedSession {
            session_id: SessionId::new(id.to_string()),
            creator,
            tx,
        })
    }

    async fn submit_vote(&self, session: &SessionId, choice_index: usize) -> Result<TxRef, ChainError> {
        self.record(LedgerCall::SubmitVote {
            session: session.clone(),
            choice_index,
        })
    }

    async fn stake(&self, staker: &Identity, amount_wei: u128) -> Result<TxRef, ChainError> {
        self.record(LedgerCall::Stake {
            staker: staker.clone(),
            amount_wei,
        })
    }

    async fn unstake(&self, staker: &Identity) -> Result<TxRef, ChainError> {
        self.record(LedgerCall::Unstake {
            staker: staker.clone(),
        })
    }

    async fn claim(&self, staker: &Identity) -> Result<TxRef, ChainError> {
        self.record(LedgerCall::Claim {
            staker: staker.clone(),
        })
    }

    async fn receipt(&self, tx: &TxRef) -> Result<Option<Receipt>, ChainError> {
        if self.unconfirmed.load(Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(Some(Receipt {
            tx: tx.clone(),
            status: ReceiptStatus::Success,
            block: 1,
        }))
    }
}
