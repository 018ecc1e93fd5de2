//! Conversation identity plus a shared key/value scratchpad.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::time::Instant;

/// Idle time after which a hub-owned store drops a session.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// One logical conversation.
///
/// The key/value map is guarded by a single lock per instance. Agents that
/// delegate share the same `Arc<Session>`, so nested runs read and write the
/// same slots.
#[derive(Debug)]
pub struct Session {
    id: String,
    data: RwLock<Map<String, Value>>,
    touched: Mutex<Instant>,
}

impl Session {
    /// Create a session with a fresh v4 id.
    pub fn new() -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string())
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            data: RwLock::new(Map::new()),
            touched: Mutex::new(Instant::now()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.touch();
        self.data
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.touch();
        self.data
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
    }

    /// Copy of every slot, taken under the read lock.
    pub fn snapshot(&self) -> Map<String, Value> {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Insert every entry of `other`, overwriting existing keys.
    pub fn merge(&self, other: Map<String, Value>) {
        if other.is_empty() {
            return;
        }
        self.touch();
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        data.extend(other);
    }

    /// Insert entries of `defaults` whose keys are not yet present.
    pub fn merge_missing(&self, defaults: &Map<String, Value>) {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        for (key, value) in defaults {
            data.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }

    pub fn touch(&self) {
        *self.touched.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    fn idle_for(&self, now: Instant) -> Duration {
        let touched = *self.touched.lock().unwrap_or_else(PoisonError::into_inner);
        now.saturating_duration_since(touched)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Sessions by id, shared by every agent built from one hub.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create a session by id.
    pub fn get_or_create(&self, session_id: &str) -> Arc<Session> {
        if let Some(session) = self.get(session_id) {
            session.touch();
            return session;
        }
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Session::with_id(session_id)))
            .clone()
    }

    /// Create a session with a generated id.
    pub fn create(&self) -> Arc<Session> {
        let session = Arc::new(Session::new());
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session.id().to_string(), session.clone());
        session
    }

    pub fn get(&self, session_id: &str) -> Option<Arc<Session>> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
            .cloned()
    }

    pub fn remove(&self, session_id: &str) -> Option<Arc<Session>> {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(session_id)
    }

    pub fn session_ids(&self) -> Vec<String> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Drop sessions idle for longer than `ttl`. Returns how many were removed.
    pub fn reap_idle(&self, ttl: Duration) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let before = sessions.len();
        sessions.retain(|_, session| session.idle_for(now) <= ttl);
        before - sessions.len()
    }

    /// Periodically reap idle sessions until the store is dropped.
    pub fn spawn_reaper(
        self: &Arc<Self>,
        every: Duration,
        ttl: Duration,
    ) -> tokio::task::JoinHandle<()> {
        let store: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(store) = store.upgrade() else { break };
                let removed = store.reap_idle(ttl);
                if removed > 0 {
                    tracing::debug!(removed, "reaped idle sessions");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(Session::new().id(), Session::new().id());
    }

    #[test]
    fn merge_overwrites_and_merge_missing_does_not() {
        let session = Session::with_id("s1");
        session.set("city", "Shenzhen");
        let mut defaults = Map::new();
        defaults.insert("city".into(), "Beijing".into());
        defaults.insert("unit".into(), "c".into());
        session.merge_missing(&defaults);
        assert_eq!(session.get("city"), Some(Value::from("Shenzhen")));
        assert_eq!(session.get("unit"), Some(Value::from("c")));

        session.merge(defaults);
        assert_eq!(session.get("city"), Some(Value::from("Beijing")));
    }

    #[test]
    fn store_returns_the_same_instance_for_an_id() {
        let store = SessionStore::new();
        let a = store.get_or_create("abc");
        a.set("k", 1);
        let b = store.get_or_create("abc");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(b.get("k"), Some(Value::from(1)));
        assert!(store.remove("abc").is_some());
        assert!(store.get("abc").is_none());
    }

    #[test]
    fn reap_idle_keeps_recent_sessions() {
        let store = SessionStore::new();
        store.get_or_create("fresh");
        assert_eq!(store.reap_idle(Duration::from_secs(60)), 0);
        assert_eq!(store.session_ids(), vec!["fresh".to_string()]);
    }

    #[tokio::test]
    async fn reaper_removes_idle_sessions_and_stops_with_the_store() {
        let store = Arc::new(SessionStore::new());
        store.get_or_create("stale");
        let reaper = store.spawn_reaper(Duration::from_millis(20), Duration::ZERO);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(store.get("stale").is_none());

        drop(store);
        tokio::time::timeout(Duration::from_secs(1), reaper)
            .await
            .expect("reaper exits once the store is gone")
            .unwrap();
    }
}
