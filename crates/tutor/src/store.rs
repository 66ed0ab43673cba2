use crate::session::Session;
use lru::LruCache;
use rethink_protocol::Subject;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Handle to one session. Holding the lock serializes every mutation of that session.
pub type SharedSession = Arc<tokio::sync::Mutex<Session>>;

pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(3600);
pub const DEFAULT_SESSION_CAPACITY: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// Idle time after which a session is forgotten
    pub ttl: Duration,
    /// Maximum live sessions; the least recently used one is evicted beyond this
    pub capacity: NonZeroUsize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_SESSION_TTL,
            capacity: NonZeroUsize::new(DEFAULT_SESSION_CAPACITY).unwrap_or(NonZeroUsize::MIN),
        }
    }
}

struct Entry {
    session: SharedSession,
    last_access: Instant,
}

/// In-memory session map with LRU capacity bound and idle TTL.
///
/// The map lock is only held for lookups and inserts. Requests for different sessions never wait
/// on each other beyond that.
pub struct SessionStore {
    entries: Mutex<LruCache<String, Entry>>,
    ttl: Duration,
}

impl SessionStore {
    #[must_use]
    pub fn new(config: StoreConfig) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(config.capacity)),
            ttl: config.ttl,
        }
    }

    /// Return the live session for `id`, or mint a new one.
    ///
    /// A missing, unknown or expired id is not an error here: a fresh id and an empty session
    /// with `subject` are created.
    pub fn resolve_or_create(&self, id: Option<&str>, subject: Subject) -> (String, SharedSession) {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(id) = id {
            if let Some(session) = Self::touch(&mut entries, id, now, self.ttl) {
                return (id.to_string(), session);
            }
        }

        let id = uuid::Uuid::new_v4().to_string();
        let session: SharedSession = Arc::new(tokio::sync::Mutex::new(Session::new(subject)));
        let entry = Entry {
            session: session.clone(),
            last_access: now,
        };
        if let Some((evicted, _)) = entries.push(id.clone(), entry) {
            if evicted != id {
                log::debug!("session {evicted} evicted (capacity reached)");
            }
        }
        log::debug!("session {id} created (subject={subject})");
        (id, session)
    }

    /// Look up a live session without creating one.
    pub fn get(&self, id: &str) -> Option<SharedSession> {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Self::touch(&mut entries, id, now, self.ttl)
    }

    /// Drop every session idle for longer than the TTL. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| now.saturating_duration_since(entry.last_access) > self.ttl)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            entries.pop(id);
        }
        if !expired.is_empty() {
            log::debug!("purged {} expired sessions", expired.len());
        }
        expired.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn touch(
        entries: &mut LruCache<String, Entry>,
        id: &str,
        now: Instant,
        ttl: Duration,
    ) -> Option<SharedSession> {
        let entry = entries.get_mut(id)?;
        if now.saturating_duration_since(entry.last_access) <= ttl {
            entry.last_access = now;
            return Some(entry.session.clone());
        }
        entries.pop(id);
        log::debug!("session {id} expired");
        None
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}
