use proptest::prelude::*;

use votegate_sessions::{
    compute_winners, Choice, IdAssignment, SessionDraft, SessionError, SessionStatus,
    SessionTables, VoteRequest,
};
use votegate_types::{Identity, Timestamp};

fn draft(options: usize, start: u64, end: u64, min_votes: u64) -> SessionDraft {
    SessionDraft {
        title: "Poll".into(),
        description: String::new(),
        start_time: Timestamp::new(start),
        end_time: Timestamp::new(end),
        min_votes,
        is_private: false,
        choices: (0..options).map(|i| format!("option {i}")).collect(),
        creator: Identity::parse("0xcreator").unwrap(),
        allowlist: Vec::new(),
    }
}

proptest! {
    /// Whatever sequence of votes arrives, counters stay consistent with
    /// the recorded voters and nobody is counted twice.
    #[test]
    fn counters_match_voters(
        options in 1usize..5,
        votes in prop::collection::vec((0u8..8, -1i64..6, 0u64..30), 0..40),
    ) {
        let mut tables = SessionTables::new();
        let session = tables
            .create_session(draft(options, 5, 20, 0), IdAssignment::Local, Timestamp::new(0))
            .unwrap();

        let mut accepted = 0u64;
        for (voter, index, at) in votes {
            let request = VoteRequest {
                session_id: session.id.clone(),
                voter: Identity::parse(&format!("0xVoter{voter}")).unwrap(),
                choice_index: index,
            };
            if tables.cast_vote(&request, Timestamp::new(at)).is_ok() {
                accepted += 1;
            }
        }

        let s = tables.get_session(&session.id, Timestamp::new(10)).unwrap();
        prop_assert_eq!(s.total_votes, accepted);
        prop_assert_eq!(s.total_votes, s.counted_votes());
        prop_assert_eq!(s.voters.len() as u64, accepted);
        prop_assert!(accepted <= 8);
    }

    /// Rejected votes never change the session.
    #[test]
    fn rejected_votes_leave_no_trace(index in 0i64..10, at in 0u64..40) {
        let mut tables = SessionTables::new();
        let session = tables
            .create_session(draft(2, 10, 20, 0), IdAssignment::Local, Timestamp::new(0))
            .unwrap();
        let before = tables.get_session(&session.id, Timestamp::new(0)).unwrap();

        let request = VoteRequest {
            session_id: session.id.clone(),
            voter: Identity::parse("0xvoter").unwrap(),
            choice_index: index,
        };
        match tables.cast_vote(&request, Timestamp::new(at)) {
            Ok(receipt) => {
                prop_assert!((10..=20).contains(&at));
                prop_assert!(index < 2);
                prop_assert_eq!(receipt.total_votes, 1);
            }
            Err(SessionError::NotStarted(_)) => prop_assert!(at < 10),
            Err(SessionError::AlreadyEnded(_)) => prop_assert!(at > 20),
            Err(SessionError::InvalidOption { .. }) => prop_assert!(index >= 2),
            Err(other) => prop_assert!(false, "unexpected error {other}"),
        }

        if tables.get_session(&session.id, Timestamp::new(0)).unwrap().total_votes == 0 {
            let after = tables.get_session(&session.id, Timestamp::new(0)).unwrap();
            prop_assert_eq!(after, before);
        }
    }

    /// Every winner holds the maximum count and every choice holding the
    /// maximum is a winner.
    #[test]
    fn winners_are_exactly_the_maxima(counts in prop::collection::vec(0u64..6, 1..8)) {
        let choices: Vec<Choice> = counts
            .iter()
            .enumerate()
            .map(|(i, &vote_count)| Choice { title: format!("c{i}"), vote_count })
            .collect();
        let max = counts.iter().copied().max().unwrap_or(0);
        let expected: Vec<String> = choices
            .iter()
            .filter(|c| c.vote_count == max)
            .map(|c| c.title.clone())
            .collect();
        prop_assert_eq!(compute_winners(&choices), expected);
    }

    /// A closed session is rejected exactly when it stayed below threshold.
    #[test]
    fn closed_status_follows_threshold(votes in 0usize..6, min_votes in 0u64..6) {
        let mut tables = SessionTables::new();
        let session = tables
            .create_session(draft(1, 0, 10, min_votes), IdAssignment::Local, Timestamp::new(0))
            .unwrap();
        for v in 0..votes {
            let request = VoteRequest {
                session_id: session.id.clone(),
                voter: Identity::parse(&format!("0x{v}")).unwrap(),
                choice_index: 0,
            };
            tables.cast_vote(&request, Timestamp::new(5)).unwrap();
        }
        let closed = tables.get_session(&session.id, Timestamp::new(11)).unwrap();
        if (votes as u64) < min_votes {
            prop_assert_eq!(closed.status, SessionStatus::Rejected);
            prop_assert!(closed.winners.is_empty());
        } else {
            prop_assert_eq!(closed.status, SessionStatus::Finished);
            prop_assert_eq!(closed.winners, vec!["option 0".to_string()]);
        }
    }
}
