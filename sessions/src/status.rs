//! Status and winner computation.
//!
//! `status` and `winners` carry no independent truth: both are recomputed
//! from the clock, the voting window, the counters and the threshold. The
//! recomputation is idempotent, so the periodic sweep and the inline refresh
//! on every read may race without harm.

use votegate_types::Timestamp;

use crate::session::{Choice, SessionStatus, VoteSession};

/// Derive the status of a session at `now`.
pub fn derive_status(
    now: Timestamp,
    start_time: Timestamp,
    end_time: Timestamp,
    total_votes: u64,
    min_votes: u64,
) -> SessionStatus {
    if now < start_time {
        SessionStatus::Upcoming
    } else if now > end_time {
        if total_votes < min_votes {
            SessionStatus::Rejected
        } else {
            SessionStatus::Finished
        }
    } else {
        SessionStatus::Active
    }
}

/// Titles of every choice holding the maximum count, in choice order.
///
/// A strictly greater count resets the list; equal counts append, so ties
/// produce several winners.
pub fn compute_winners(choices: &[Choice]) -> Vec<String> {
    let mut max_count: Option<u64> = None;
    let mut winners = Vec::new();
    for choice in choices {
        match max_count {
            Some(max) if choice.vote_count < max => {}
            Some(max) if choice.vote_count == max => winners.push(choice.title.clone()),
            _ => {
                max_count = Some(choice.vote_count);
                winners.clear();
                winners.push(choice.title.clone());
            }
        }
    }
    winners
}

impl VoteSession {
    /// Recompute `status` and `winners` for `now`.
    ///
    /// Returns `true` when the status changed. While a session is active the
    /// winner list is left as is; it is only trustworthy once closed.
    pub fn refresh_status(&mut self, now: Timestamp) -> bool {
        let previous = self.status;
        self.status = derive_status(
            now,
            self.start_time,
            self.end_time,
            self.total_votes,
            self.min_votes,
        );
        match self.status {
            SessionStatus::Upcoming | SessionStatus::Rejected => self.winners.clear(),
            SessionStatus::Finished => self.winners = compute_winners(&self.choices),
            SessionStatus::Active => {}
        }
        previous != self.status
    }
}
