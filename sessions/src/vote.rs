//! Vote submission protocol.
//!
//! Checks run in a fixed order and fail fast; effects are applied only after
//! every check passed, so a rejected vote leaves no trace.

use serde::{Deserialize, Serialize};
use votegate_types::{Identity, SessionId, Timestamp};

use crate::error::SessionError;
use crate::session::{SessionStatus, VoterRecord};
use crate::tables::SessionTables;

/// A vote as requested by a caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoteRequest {
    pub session_id: SessionId,
    pub voter: Identity,
    /// Signed so an out-of-range negative index from the wire is reported as
    /// an invalid option rather than a parse failure.
    pub choice_index: i64,
}

/// Outcome of an accepted vote.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteReceipt {
    pub session_id: SessionId,
    pub voter: Identity,
    pub choice_index: usize,
    /// 1-based option identifier used on the event stream.
    pub option_id: String,
    pub total_votes: u64,
    pub status: SessionStatus,
}

/// Identifier of option `index` on the event stream.
pub fn option_id(index: usize) -> String {
    (index + 1).to_string()
}

impl SessionTables {
    /// Run the vote protocol against `now`.
    pub fn cast_vote(
        &mut self,
        request: &VoteRequest,
        now: Timestamp,
    ) -> Result<VoteReceipt, SessionError> {
        let id = &request.session_id;
        let session = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.clone()))?;

        if now < session.start_time {
            return Err(SessionError::NotStarted(id.clone()));
        }
        if now > session.end_time {
            return Err(SessionError::AlreadyEnded(id.clone()));
        }

        let index = usize::try_from(request.choice_index)
            .ok()
            .filter(|i| *i < session.choices.len())
            .ok_or_else(|| SessionError::InvalidOption {
                session: id.clone(),
                index: request.choice_index,
                options: session.choices.len(),
            })?;

        if session.has_voted(&request.voter) {
            return Err(SessionError::AlreadyVoted {
                session: id.clone(),
                voter: request.voter.clone(),
            });
        }

        session.voters.insert(
            request.voter.clone(),
            VoterRecord {
                has_voted: true,
                choice_index: index,
            },
        );
        session.choices[index].vote_count += 1;
        session.total_votes += 1;
        session.refresh_status(now);

        let receipt = VoteReceipt {
            session_id: id.clone(),
            voter: request.voter.clone(),
            choice_index: index,
            option_id: option_id(index),
            total_votes: session.total_votes,
            status: session.status,
        };

        self.activity.entry(request.voter.clone()).or_default();
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::fixtures::{draft, identity};
    use crate::session::IdAssignment;

    fn active_tables(choices: &[&str]) -> (SessionTables, SessionId) {
        let mut tables = SessionTables::new();
        let s = tables
            .create_session(draft(choices, 100, 200, 1), IdAssignment::Local, Timestamp::new(0))
            .unwrap();
        (tables, s.id)
    }

    fn request(id: &SessionId, voter: &str, index: i64) -> VoteRequest {
        VoteRequest {
            session_id: id.clone(),
            voter: identity(voter),
            choice_index: index,
        }
    }

    #[test]
    fn accepted_vote_updates_counters_and_voters() {
        let (mut tables, id) = active_tables(&["A", "B"]);
        let receipt = tables
            .cast_vote(&request(&id, "0xU1", 1), Timestamp::new(150))
            .unwrap();
        assert_eq!(receipt.choice_index, 1);
        assert_eq!(receipt.option_id, "2");
        assert_eq!(receipt.total_votes, 1);
        assert_eq!(receipt.status, SessionStatus::Active);

        let s = &tables.sessions[&id];
        assert_eq!(s.choices[1].vote_count, 1);
        assert_eq!(s.total_votes, s.counted_votes());
        assert!(s.has_voted(&identity("0xu1")));
        assert_eq!(tables.participated(&identity("0xu1")).get(&id), Some(&1));
    }

    #[test]
    fn unknown_session_is_not_found() {
        let (mut tables, _) = active_tables(&["A"]);
        let err = tables
            .cast_vote(&request(&SessionId::new("9"), "0xu1", 0), Timestamp::new(150))
            .unwrap_err();
        assert!(matches!(err, SessionError::NotFound(_)));
    }

    #[test]
    fn window_checks_leave_state_unchanged() {
        let (mut tables, id) = active_tables(&["A"]);
        let before = tables.sessions[&id].clone();

        let early = tables.cast_vote(&request(&id, "0xu1", 0), Timestamp::new(99));
        assert!(matches!(early, Err(SessionError::NotStarted(_))));
        let late = tables.cast_vote(&request(&id, "0xu1", 0), Timestamp::new(201));
        assert!(matches!(late, Err(SessionError::AlreadyEnded(_))));

        assert_eq!(tables.sessions[&id], before);
        assert!(tables.activity.get(&identity("0xu1")).is_none());
    }

    #[test]
    fn window_edges_are_inclusive() {
        let (mut tables, id) = active_tables(&["A"]);
        assert!(tables.cast_vote(&request(&id, "0xu1", 0), Timestamp::new(100)).is_ok());
        assert!(tables.cast_vote(&request(&id, "0xu2", 0), Timestamp::new(200)).is_ok());
    }

    #[test]
    fn out_of_range_options_are_invalid() {
        let (mut tables, id) = active_tables(&["A", "B"]);
        for index in [-1, 2, i64::MAX] {
            let err = tables
                .cast_vote(&request(&id, "0xu1", index), Timestamp::new(150))
                .unwrap_err();
            assert!(matches!(err, SessionError::InvalidOption { .. }), "index {index}");
        }
        assert_eq!(tables.sessions[&id].total_votes, 0);
    }

    #[test]
    fn second_vote_conflicts_regardless_of_case_or_option() {
        let (mut tables, id) = active_tables(&["A", "B"]);
        tables
            .cast_vote(&request(&id, "0xAbC", 0), Timestamp::new(150))
            .unwrap();
        for index in [0, 1] {
            let err = tables
                .cast_vote(&request(&id, "0xabc", index), Timestamp::new(151))
                .unwrap_err();
            assert!(matches!(err, SessionError::AlreadyVoted { .. }));
        }
        let s = &tables.sessions[&id];
        assert_eq!(s.total_votes, 1);
        assert_eq!(s.choices[1].vote_count, 0);
    }

    #[test]
    fn time_check_precedes_option_and_duplicate_checks() {
        let (mut tables, id) = active_tables(&["A"]);
        tables
            .cast_vote(&request(&id, "0xu1", 0), Timestamp::new(150))
            .unwrap();
        let err = tables
            .cast_vote(&request(&id, "0xu1", 7), Timestamp::new(250))
            .unwrap_err();
        assert!(matches!(err, SessionError::AlreadyEnded(_)));
    }
}
