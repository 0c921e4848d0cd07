//! Concurrency-safe per-user session store with idle expiry.
//!
//! Holds at most one active session per user. The store is an explicitly
//! constructed instance handed to the engine, not a global; tests can spin
//! up as many isolated stores as they like.

use std::time::Duration;

use chrono::Duration as ChronoDuration;
use dashmap::DashMap;
use provenant_types::message::UserId;
use provenant_types::session::Session;
use tracing::debug;

/// Default idle threshold after which a session is considered stale.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Result of looking up a user's session.
#[derive(Debug)]
pub enum SessionLookup {
    /// A live session; the idle clock has been checked.
    Active(Session),
    /// A session existed but sat idle past the threshold. It has been
    /// discarded; the caller should prompt the user to restart.
    Expired(Session),
    /// No session for this user.
    Missing,
}

/// Keyed map of in-progress sessions, safe under concurrent access.
pub struct SessionStore {
    sessions: DashMap<UserId, Session>,
    idle_timeout: ChronoDuration,
}

impl SessionStore {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            idle_timeout: ChronoDuration::from_std(idle_timeout)
                .unwrap_or_else(|_| ChronoDuration::seconds(900)),
        }
    }

    /// Fetch the user's session, applying the expiry policy.
    ///
    /// Stale sessions are removed as a side effect, bounding memory growth
    /// from abandoned conversations.
    pub fn get(&self, user: &UserId) -> SessionLookup {
        let stale = match self.sessions.get(user) {
            None => return SessionLookup::Missing,
            Some(entry) => entry.idle_for() > self.idle_timeout,
        };
        if stale {
            // Separate remove to avoid holding the shard lock across it.
            match self.sessions.remove(user) {
                Some((_, session)) => {
                    debug!(%user, flow = %session.flow, "discarded stale session");
                    SessionLookup::Expired(session)
                }
                None => SessionLookup::Missing,
            }
        } else {
            match self.sessions.get(user) {
                Some(entry) => SessionLookup::Active(entry.value().clone()),
                None => SessionLookup::Missing,
            }
        }
    }

    /// Insert or replace the user's session. Starting a new workflow
    /// implicitly discards any other in-progress session for that user.
    pub fn put(&self, session: Session) {
        self.sessions.insert(session.user.clone(), session);
    }

    /// Remove the user's session, returning it if present.
    pub fn remove(&self, user: &UserId) -> Option<Session> {
        self.sessions.remove(user).map(|(_, s)| s)
    }

    /// Whether the user currently has a session (live or stale).
    pub fn contains(&self, user: &UserId) -> bool {
        self.sessions.contains_key(user)
    }

    /// Number of tracked sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop every session that has exceeded the idle threshold.
    pub fn sweep_stale(&self) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, session| session.idle_for() <= self.idle_timeout);
        before - self.sessions.len()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_IDLE_TIMEOUT)
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("active_sessions", &self.sessions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use provenant_types::session::{FlowState, WorkflowKind};

    fn make_session(user: &str) -> Session {
        Session::new(
            UserId::new(user),
            WorkflowKind::License,
            FlowState::AwaitAssetId,
        )
    }

    #[test]
    fn test_put_get_remove() {
        let store = SessionStore::default();
        store.put(make_session("u1"));

        assert!(matches!(
            store.get(&UserId::new("u1")),
            SessionLookup::Active(_)
        ));
        assert!(store.remove(&UserId::new("u1")).is_some());
        assert!(matches!(
            store.get(&UserId::new("u1")),
            SessionLookup::Missing
        ));
    }

    #[test]
    fn test_one_session_per_user() {
        let store = SessionStore::default();
        store.put(make_session("u1"));

        let mut replacement = Session::new(
            UserId::new("u1"),
            WorkflowKind::Transfer,
            FlowState::AwaitAssetId,
        );
        replacement.touch();
        store.put(replacement);

        assert_eq!(store.len(), 1);
        match store.get(&UserId::new("u1")) {
            SessionLookup::Active(s) => assert_eq!(s.flow, WorkflowKind::Transfer),
            other => panic!("expected active session, got {other:?}"),
        }
    }

    #[test]
    fn test_stale_session_discarded_on_access() {
        let store = SessionStore::new(Duration::from_secs(900));
        let mut session = make_session("u1");
        session.last_active_at = Utc::now() - ChronoDuration::minutes(16);
        store.put(session);

        match store.get(&UserId::new("u1")) {
            SessionLookup::Expired(s) => assert_eq!(s.flow, WorkflowKind::License),
            other => panic!("expected expired session, got {other:?}"),
        }
        // Gone after the expiry access.
        assert!(matches!(
            store.get(&UserId::new("u1")),
            SessionLookup::Missing
        ));
    }

    #[test]
    fn test_fresh_session_not_discarded() {
        let store = SessionStore::new(Duration::from_secs(900));
        store.put(make_session("u1"));
        assert!(matches!(
            store.get(&UserId::new("u1")),
            SessionLookup::Active(_)
        ));
        assert!(store.contains(&UserId::new("u1")));
    }

    #[test]
    fn test_sweep_stale() {
        let store = SessionStore::new(Duration::from_secs(900));
        let mut old = make_session("old");
        old.last_active_at = Utc::now() - ChronoDuration::hours(1);
        store.put(old);
        store.put(make_session("fresh"));

        assert_eq!(store.sweep_stale(), 1);
        assert_eq!(store.len(), 1);
        assert!(store.contains(&UserId::new("fresh")));
    }

    #[test]
    fn test_sessions_isolated_per_user() {
        let store = SessionStore::default();
        let mut a = make_session("a");
        a.fields.asset_id = Some(provenant_types::asset::AssetId(1));
        let mut b = make_session("b");
        b.fields.asset_id = Some(provenant_types::asset::AssetId(2));
        store.put(a);
        store.put(b);

        match store.get(&UserId::new("a")) {
            SessionLookup::Active(s) => {
                assert_eq!(s.fields.asset_id, Some(provenant_types::asset::AssetId(1)));
            }
            other => panic!("expected active session, got {other:?}"),
        }
    }
}
