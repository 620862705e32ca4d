use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::info;
use uuid::Uuid;

use crate::interview::session::InterviewSession;

/// In-memory registry of open interview sessions.
///
/// Each session sits behind its own async mutex, so invocations on one session
/// run strictly one after another while other sessions proceed independently.
/// Handles are cloned out of the map before locking; no `DashMap` guard is held
/// across an await point.
///
/// Sessions not looked up for longer than the idle TTL are evicted by
/// `evict_idle`, which the sweeper task runs periodically.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<DashMap<Uuid, SessionEntry>>,
}

struct SessionEntry {
    session: Arc<Mutex<InterviewSession>>,
    last_seen: Instant,
}

/// Upper bound on how often the sweeper runs.
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a session with initial state and returns its id.
    pub fn create(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.sessions.insert(
            id,
            SessionEntry {
                session: Arc::new(Mutex::new(InterviewSession::new(id))),
                last_seen: Instant::now(),
            },
        );
        id
    }

    /// Returns the session handle and marks the session as recently used.
    pub fn get(&self, id: Uuid) -> Option<Arc<Mutex<InterviewSession>>> {
        self.sessions.get_mut(&id).map(|mut entry| {
            entry.last_seen = Instant::now();
            entry.session.clone()
        })
    }

    /// Discards a session. Returns false if it did not exist.
    pub fn remove(&self, id: Uuid) -> bool {
        self.sessions.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Drops every session idle for at least `ttl`. Returns how many were removed.
    /// A turn already running keeps its own handle and still finishes.
    pub fn evict_idle(&self, ttl: Duration) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, entry| entry.last_seen.elapsed() < ttl);
        before.saturating_sub(self.sessions.len())
    }

    /// Spawns the periodic idle-session sweeper.
    pub fn spawn_sweeper(&self, ttl: Duration) -> JoinHandle<()> {
        let store = self.clone();
        let period = ttl.min(MAX_SWEEP_INTERVAL).max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let evicted = store.evict_idle(ttl);
                if evicted > 0 {
                    info!(
                        "Evicted {evicted} idle interview sessions ({} open)",
                        store.len()
                    );
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interview::session::Phase;

    #[tokio::test]
    async fn test_created_session_starts_not_started() {
        let store = SessionStore::new();
        let id = store.create();

        let handle = store.get(id).unwrap();
        let session = handle.lock().await;
        assert_eq!(session.id, id);
        assert_eq!(session.state.phase(), Phase::NotStarted);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = SessionStore::new();
        let a = store.create();
        let b = store.create();

        store.get(a).unwrap().lock().await.state.started = true;

        assert!(!store.get(b).unwrap().lock().await.state.started);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_remove_discards_session() {
        let store = SessionStore::new();
        let id = store.create();
        assert!(store.remove(id));
        assert!(store.get(id).is_none());
        assert!(!store.remove(id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_evict_idle_removes_only_stale_sessions() {
        let store = SessionStore::new();
        let active = store.create();
        let abandoned = store.create();

        tokio::time::advance(Duration::from_secs(30 * 60)).await;
        assert!(store.get(active).is_some());
        tokio::time::advance(Duration::from_secs(40 * 60)).await;

        let evicted = store.evict_idle(Duration::from_secs(60 * 60));

        assert_eq!(evicted, 1);
        assert!(store.get(active).is_some());
        assert!(store.get(abandoned).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_evicts_abandoned_sessions() {
        let store = SessionStore::new();
        store.create();
        let sweeper = store.spawn_sweeper(Duration::from_secs(120));

        tokio::time::sleep(Duration::from_secs(200)).await;

        assert_eq!(store.len(), 0);
        sweeper.abort();
    }
}
