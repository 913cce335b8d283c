//! The session and activity tables.
//!
//! [`SessionTables`] holds every piece of mutable session state and
//! implements the rules synchronously against an explicit `now`. It is only
//! reachable through [`crate::SessionStore`], which serializes access under
//! one lock; keeping the rules here lets them be tested without a runtime.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;
use votegate_types::{Identity, SessionId, Timestamp};

use crate::activity::{HistoryEntry, UserActivity, UserProfile};
use crate::error::SessionError;
use crate::session::{Choice, IdAssignment, SessionDraft, SessionStatus, VoteSession};

/// Sessions, per-identity activity and per-identity history.
#[derive(Debug, Default)]
pub struct SessionTables {
    pub(crate) sessions: BTreeMap<SessionId, VoteSession>,
    pub(crate) activity: HashMap<Identity, UserActivity>,
    pub(crate) history: HashMap<Identity, Vec<HistoryEntry>>,
    next_local_id: u64,
}

impl SessionTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Create a session from a validated draft.
    pub fn create_session(
        &mut self,
        draft: SessionDraft,
        ids: IdAssignment,
        now: Timestamp,
    ) -> Result<VoteSession, SessionError> {
        draft.validate()?;

        let id = match ids {
            IdAssignment::Local => self.next_local_id(),
            IdAssignment::Confirmed(id) => {
                if id.is_empty() {
                    return Err(SessionError::Validation("confirmed id is empty".into()));
                }
                if self.sessions.contains_key(&id) {
                    if self.created_locally(&id) {
                        return Err(SessionError::Validation(format!(
                            "session {id} already exists"
                        )));
                    }
                    return Ok(self.adopt_indexed(id, draft, now));
                }
                id
            }
        };

        let mut session = VoteSession {
            id: id.clone(),
            creator: Some(draft.creator.clone()),
            title: draft.title,
            description: draft.description,
            start_time: draft.start_time,
            end_time: draft.end_time,
            min_votes: draft.min_votes,
            is_private: draft.is_private,
            choices: draft.choices.into_iter().map(Choice::new).collect(),
            voters: BTreeMap::new(),
            total_votes: 0,
            status: SessionStatus::Upcoming,
            winners: Vec::new(),
        };
        session.refresh_status(now);

        self.activity
            .entry(draft.creator)
            .or_default()
            .created_sessions
            .insert(id.clone());
        self.sessions.insert(id, session.clone());
        Ok(session)
    }

    fn created_locally(&self, id: &SessionId) -> bool {
        self.activity
            .values()
            .any(|a| a.created_sessions.contains(id))
    }

    /// Complete a record the indexer reported before our ledger
    /// confirmation came back. Votes already recorded are kept; the draft's
    /// options replace the indexed ones only while nothing was counted.
    fn adopt_indexed(
        &mut self,
        id: SessionId,
        draft: SessionDraft,
        now: Timestamp,
    ) -> VoteSession {
        let SessionDraft {
            title,
            description,
            start_time,
            end_time,
            min_votes,
            is_private,
            choices,
            creator,
            ..
        } = draft;

        self.activity
            .entry(creator.clone())
            .or_default()
            .created_sessions
            .insert(id.clone());

        let session = self.sessions.entry(id.clone()).or_insert_with(|| {
            VoteSession::minimal(id.clone(), String::new(), String::new(), start_time, end_time)
        });
        session.creator = Some(creator);
        session.title = title;
        session.description = description;
        session.start_time = start_time;
        session.end_time = end_time;
        session.min_votes = min_votes;
        session.is_private = is_private;
        let uncounted = session.choices.iter().all(|c| c.vote_count == 0);
        if session.voters.is_empty() && uncounted {
            session.choices = choices.into_iter().map(Choice::new).collect();
            session.total_votes = 0;
        }
        session.refresh_status(now);
        debug!(session_id = %id, "confirmed session merged into indexed record");
        session.clone()
    }

    fn next_local_id(&mut self) -> SessionId {
        loop {
            self.next_local_id += 1;
            let id = SessionId::local(self.next_local_id);
            if !self.sessions.contains_key(&id) {
                return id;
            }
        }
    }

    /// Refreshed snapshot of one session.
    pub fn get_session(
        &mut self,
        id: &SessionId,
        now: Timestamp,
    ) -> Result<VoteSession, SessionError> {
        let session = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.clone()))?;
        session.refresh_status(now);
        Ok(session.clone())
    }

    /// Refreshed snapshots of all sessions, by id, private ones only on
    /// request.
    pub fn list_sessions(&mut self, include_private: bool, now: Timestamp) -> Vec<VoteSession> {
        self.sessions
            .values_mut()
            .filter_map(|session| {
                session.refresh_status(now);
                (include_private || !session.is_private).then(|| session.clone())
            })
            .collect()
    }

    /// Sessions `identity` voted in, with the chosen option index.
    pub fn participated(&self, identity: &Identity) -> BTreeMap<SessionId, usize> {
        self.sessions
            .values()
            .filter_map(|s| {
                s.voters
                    .get(identity)
                    .filter(|v| v.has_voted)
                    .map(|v| (s.id.clone(), v.choice_index))
            })
            .collect()
    }

    /// Ids of sessions `identity` created, from the activity record and from
    /// the creator field of every known session.
    pub fn created_by(&self, identity: &Identity) -> BTreeSet<SessionId> {
        let mut created: BTreeSet<SessionId> = self
            .sessions
            .values()
            .filter(|s| s.creator.as_ref() == Some(identity))
            .map(|s| s.id.clone())
            .collect();
        if let Some(activity) = self.activity.get(identity) {
            created.extend(
                activity
                    .created_sessions
                    .iter()
                    .filter(|id| self.sessions.contains_key(*id))
                    .cloned(),
            );
        }
        created
    }

    /// Profile of `identity`; counts are computed by scanning on every call.
    pub fn user_profile(&mut self, identity: &Identity, now: Timestamp) -> UserProfile {
        let created = self.created_by(identity);
        let participated = self.participated(identity);

        let ids: BTreeSet<&SessionId> = created.iter().chain(participated.keys()).collect();
        let mut sessions = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(session) = self.sessions.get_mut(id) {
                session.refresh_status(now);
                sessions.push(session.clone());
            }
        }

        UserProfile {
            identity: identity.clone(),
            created_count: created.len(),
            participated_count: participated.len(),
            sessions,
            history: self.history.get(identity).cloned().unwrap_or_default(),
        }
    }

    /// Recompute status and winners of every session. Returns how many
    /// sessions changed status.
    pub fn refresh_all(&mut self, now: Timestamp) -> usize {
        let changed = self
            .sessions
            .values_mut()
            .map(|s| s.refresh_status(now))
            .filter(|changed| *changed)
            .count();
        if changed > 0 {
            debug!(changed, total = self.sessions.len(), "session statuses changed");
        }
        changed
    }
}
