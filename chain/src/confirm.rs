//! Waiting for transactions to be mined.

use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;
use votegate_types::TxRef;

use crate::client::{LedgerClient, Receipt, ReceiptStatus};
use crate::error::ChainError;

/// Poll `client` every `poll` until `tx` has a receipt or `timeout` elapses.
pub async fn wait_for_confirmation(
    client: &dyn LedgerClient,
    tx: &TxRef,
    timeout: Duration,
    poll: Duration,
) -> Result<Receipt, ChainError> {
    let started = Instant::now();
    loop {
        if let Some(receipt) = client.receipt(tx).await? {
            return match receipt.status {
                ReceiptStatus::Success => {
                    debug!(tx = %tx, block = receipt.block, "transaction confirmed");
                    Ok(receipt)
                }
                ReceiptStatus::Reverted => Err(ChainError::Reverted(tx.clone())),
            };
        }
        let waited = started.elapsed();
        if waited >= timeout {
            return Err(ChainError::Timeout {
                tx: tx.clone(),
                waited,
            });
        }
        tokio::time::sleep(poll.min(timeout - waited)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{SessionSubmission, SubmittedSession};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use votegate_types::{Identity, SessionId};

    /// Reports the transaction as pending for `pending` polls, then answers
    /// with `status`.
    struct Scripted {
        pending: usize,
        polls: AtomicUsize,
        status: ReceiptStatus,
    }

    #[async_trait]
    impl LedgerClient for Scripted {
        async fn submit_vote_session(&self, _: &SessionSubmission) -> Result<SubmittedSession, ChainError> {
            Err(ChainError::Unavailable("scripted".into()))
        }
        async fn submit_vote(&self, _: &SessionId, _: usize) -> Result<TxRef, ChainError> {
            Err(ChainError::Unavailable("scripted".into()))
        }
        async fn stake(&self, _: &Identity, _: u128) -> Result<TxRef, ChainError> {
            Err(ChainError::Unavailable("scripted".into()))
        }
        async fn unstake(&self, _: &Identity) -> Result<TxRef, ChainError> {
            Err(ChainError::Unavailable("scripted".into()))
        }
        async fn claim(&self, _: &Identity) -> Result<TxRef, ChainError> {
            Err(ChainError::Unavailable("scripted".into()))
        }
        async fn receipt(&self, tx: &TxRef) -> Result<Option<Receipt>, ChainError> {
            let n = self.polls.fetch_add(1, Ordering::SeqCst);
            Ok((n >= self.pending).then(|| Receipt {
                tx: tx.clone(),
                status: self.status,
                block: 9,
            }))
        }
    }

    #[tokio::test]
    async fn polls_until_mined() {
        let client = Scripted {
            pending: 3,
            polls: AtomicUsize::new(0),
            status: ReceiptStatus::Success,
        };
        let tx = TxRef::from_bytes(&[1; 32]);
        let receipt = wait_for_confirmation(&client, &tx, Duration::from_secs(5), Duration::from_millis(1))
            .await
            .unwrap();
        assert_eq!(receipt.block, 9);
        assert_eq!(client.polls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn reverted_receipt_is_an_error() {
        let client = Scripted {
            pending: 0,
            polls: AtomicUsize::new(0),
            status: ReceiptStatus::Reverted,
        };
        let tx = TxRef::from_bytes(&[2; 32]);
        let err = wait_for_confirmation(&client, &tx, Duration::from_secs(1), Duration::from_millis(1))
            .await
            .unwrap_err();
        assert_eq!(err, ChainError::Reverted(tx));
    }
}
