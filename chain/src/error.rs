use std::time::Duration;
use thiserror::Error;
use votegate_types::TxRef;

/// Revert reasons of the voting/staking contract the gateway knows about.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    #[error("nothing to claim")]
    NothingToClaim,

    #[error("claim cooldown period not reached")]
    CooldownClaimNotReached,

    #[error("no stake to withdraw")]
    NothingStaked,

    #[error("contract does not hold enough tokens")]
    NotEnoughBalanceOnContract,

    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Recognize a revert reason by name.
    pub fn from_reason(reason: &str) -> Self {
        if reason.contains("NothingToClaim") {
            Self::NothingToClaim
        } else if reason.contains("CooldownClaimNotReached") {
            Self::CooldownClaimNotReached
        } else if reason.contains("NotEnoughBalanceOnContract") {
            Self::NotEnoughBalanceOnContract
        } else if reason.contains("NothingStaked") {
            Self::NothingStaked
        } else {
            Self::Other(reason.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    #[error("contract rejected call: {0}")]
    Contract(#[from] ContractError),

    #[error("transaction {tx} not confirmed after {waited:?}")]
    Timeout { tx: TxRef, waited: Duration },

    #[error("transaction {0} reverted")]
    Reverted(TxRef),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}
