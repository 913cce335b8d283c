//! An in-process ledger with the contract's observable behaviour.
//!
//! Sessions get sequential ids starting at 1, every call is mined
//! immediately into its own block, and staking follows the contract rules:
//! a claim needs a stake and a full cooldown since the last claim (or since
//! staking).

use async_trait::async_trait;
use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info};
use votegate_types::{Clock, Identity, SessionId, Timestamp, TxRef};

use crate::client::{LedgerClient, Receipt, ReceiptStatus, SessionSubmission, SubmittedSession};
use crate::error::{ChainError, ContractError};

type Blake2b256 = Blake2b<U32>;

#[derive(Debug, Clone, Copy)]
struct StakePosition {
    amount_wei: u128,
    /// Start of the current cooldown: staking time or last claim.
    cooldown_from: Timestamp,
}

#[derive(Debug, Default)]
struct LedgerState {
    next_session: u64,
    block: u64,
    sessions: HashMap<SessionId, usize>,
    stakes: HashMap<Identity, StakePosition>,
    receipts: HashMap<TxRef, Receipt>,
}

pub struct SimulatedLedger {
    state: Mutex<LedgerState>,
    clock: Arc<dyn Clock>,
    operator: Identity,
    claim_cooldown: Duration,
}

impl SimulatedLedger {
    /// `operator` is the account that signs every transaction and therefore
    /// appears as the on-chain creator of every session.
    pub fn new(clock: Arc<dyn Clock>, operator: Identity, claim_cooldown: Duration) -> Self {
        Self {
            state: Mutex::new(LedgerState::default()),
            clock,
            operator,
            claim_cooldown,
        }
    }

    /// Amount currently staked by `staker`.
    pub fn staked(&self, staker: &Identity) -> u128 {
        self.lock()
            .stakes
            .get(staker)
            .map(|p| p.amount_wei)
            .unwrap_or(0)
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mine a transaction: derive its reference and record a receipt.
    fn mine(state: &mut LedgerState, operation: &str, payload: &[&[u8]]) -> TxRef {
        state.block += 1;
        let mut hasher = Blake2b256::new();
        hasher.update(operation.as_bytes());
        hasher.update(state.block.to_le_bytes());
        for part in payload {
            hasher.update(part);
        }
        let tx = TxRef::from_bytes(&hasher.finalize());
        state.receipts.insert(
            tx.clone(),
            Receipt {
                tx: tx.clone(),
                status: ReceiptStatus::Success,
                block: state.block,
            },
        );
        tx
    }
}

#[async_trait]
impl LedgerClient for SimulatedLedger {
    async fn submit_vote_session(
        &self,
        submission: &SessionSubmission,
    ) -> Result<SubmittedSession, ChainError> {
        if submission.start_time > submission.end_time {
            return Err(ContractError::Other("InvalidTimeRange".into()).into());
        }
        if submission.choices.is_empty() {
            return Err(ContractError::Other("NoChoices".into()).into());
        }

        let mut state = self.lock();
        state.next_session += 1;
        let session_id = SessionId::new(state.next_session.to_string());
        state
            .sessions
            .insert(session_id.clone(), submission.choices.len());
        let tx = Self::mine(
            &mut state,
            "addVoteSession",
            &[
                session_id.as_str().as_bytes(),
                submission.title.as_bytes(),
                &submission.start_time.as_secs().to_le_bytes(),
                &submission.end_time.as_secs().to_le_bytes(),
            ],
        );
        info!(session_id = %session_id, tx = %tx, "session mined");
        Ok(SubmittedSession {
            session_id,
            creator: self.operator.clone(),
            tx,
        })
    }

    async fn submit_vote(&self, session: &SessionId, choice_index: usize) -> Result<TxRef, ChainError> {
        let mut state = self.lock();
        let choices = *state
            .sessions
            .get(session)
            .ok_or_else(|| ContractError::Other(format!("VoteSessionNotFound({session})")))?;
        if choice_index >= choices {
            return Err(ContractError::Other(format!("InvalidChoice({choice_index})")).into());
        }
        let tx = Self::mine(
            &mut state,
            "vote",
            &[session.as_str().as_bytes(), &choice_index.to_le_bytes()],
        );
        debug!(session_id = %session, tx = %tx, "vote mined");
        Ok(tx)
    }

    async fn stake(&self, staker: &Identity, amount_wei: u128) -> Result<TxRef, ChainError> {
        if amount_wei == 0 {
            return Err(ChainError::InvalidRequest("stake amount must be positive".into()));
        }
        let now = self.clock.now();
        let mut state = self.lock();
        let position = state.stakes.entry(staker.clone()).or_insert(StakePosition {
            amount_wei: 0,
            cooldown_from: now,
        });
        position.amount_wei = position.amount_wei.saturating_add(amount_wei);
        Ok(Self::mine(
            &mut state,
            "stake",
            &[staker.as_str().as_bytes(), &amount_wei.to_le_bytes()],
        ))
    }

    async fn unstake(&self, staker: &Identity) -> Result<TxRef, ChainError> {
        let mut state = self.lock();
        match state.stakes.remove(staker) {
            Some(position) if position.amount_wei > 0 => Ok(Self::mine(
                &mut state,
                "unstake",
                &[staker.as_str().as_bytes()],
            )),
            _ => Err(ContractError::NothingStaked.into()),
        }
    }

    async fn claim(&self, staker: &Identity) -> Result<TxRef, ChainError> {
        let now = self.clock.now();
        let cooldown = self.claim_cooldown.as_secs();
        let mut state = self.lock();
        let position = state
            .stakes
            .get_mut(staker)
            .filter(|p| p.amount_wei > 0)
            .ok_or(ContractError::NothingToClaim)?;
        if now < position.cooldown_from.saturating_add(cooldown) {
            return Err(ContractError::CooldownClaimNotReached.into());
        }
        position.cooldown_from = now;
        Ok(Self::mine(
            &mut state,
            "getTokens",
            &[staker.as_str().as_bytes(), &now.as_secs().to_le_bytes()],
        ))
    }

    async fn receipt(&self, tx: &TxRef) -> Result<Option<Receipt>, ChainError> {
        Ok(self.lock().receipts.get(tx).cloned())
    }
}
