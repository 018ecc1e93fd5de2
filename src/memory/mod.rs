//! Capacity- and age-bounded conversation memory.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::types::Message;

/// Default sweep interval for [`MemoryStore::spawn_sweeper`].
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Default)]
struct MemoryInner {
    sessions: HashMap<String, Vec<Message>>,
    system: Option<Message>,
}

/// Ordered message lists keyed by session id.
///
/// One reader/writer lock guards the whole store, so appends are serialized
/// per store instance. The system message lives outside the per-session
/// lists and does not count against `limit`.
#[derive(Debug)]
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
    limit: usize,
    ttl: Duration,
}

impl MemoryStore {
    pub fn new(limit: usize, ttl: Duration) -> Self {
        Self {
            inner: RwLock::new(MemoryInner::default()),
            limit: limit.max(1),
            ttl,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn set_system(&self, message: Message) {
        self.inner.write().unwrap_or_else(PoisonError::into_inner).system = Some(message);
    }

    pub fn system(&self) -> Option<Message> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .system
            .clone()
    }

    /// Append messages to a session, dropping the oldest beyond the limit.
    pub fn push(&self, session_id: &str, messages: impl IntoIterator<Item = Message>) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let list = inner.sessions.entry(session_id.to_string()).or_default();
        list.extend(messages.into_iter().map(|mut message| {
            message.session_id = Some(session_id.to_string());
            message
        }));
        if list.len() > self.limit {
            let overflow = list.len() - self.limit;
            list.drain(..overflow);
        }
    }

    /// The most recent `k` messages of a session, oldest first.
    pub fn latest(&self, session_id: &str, k: usize) -> Vec<Message> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .sessions
            .get(session_id)
            .map(|list| list[list.len().saturating_sub(k)..].to_vec())
            .unwrap_or_default()
    }

    /// System message (if any) followed by the latest `k` session messages.
    pub fn context(&self, session_id: &str, k: usize) -> Vec<Message> {
        let mut messages: Vec<Message> = self.system().into_iter().collect();
        messages.extend(self.latest(session_id, k));
        messages
    }

    pub fn len(&self, session_id: &str) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .sessions
            .get(session_id)
            .map_or(0, Vec::len)
    }

    pub fn session_ids(&self) -> Vec<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .sessions
            .keys()
            .cloned()
            .collect()
    }

    /// Forget one session, or every session when `session_id` is `None`.
    pub fn clear(&self, session_id: Option<&str>) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        match session_id {
            Some(id) => {
                inner.sessions.remove(id);
            }
            None => inner.sessions.clear(),
        }
    }

    /// Drop messages older than the TTL; sessions left empty are removed.
    /// Returns the number of messages evicted.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let Ok(ttl) = chrono::Duration::from_std(self.ttl) else {
            return 0;
        };
        let cutoff = now - ttl;
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let mut evicted = 0;
        inner.sessions.retain(|_, list| {
            let before = list.len();
            list.retain(|message| message.created_at >= cutoff);
            evicted += before - list.len();
            !list.is_empty()
        });
        evicted
    }

    /// Sweep on a fixed interval until the store is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        let store: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(store) = store.upgrade() else { break };
                let evicted = store.sweep_expired(Utc::now());
                if evicted > 0 {
                    tracing::debug!(evicted, "memory sweep evicted expired messages");
                }
            }
        })
    }
}
