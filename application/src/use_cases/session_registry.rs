//! Session registry: the concurrent map of live relay sessions.
//!
//! Ids are never resurrected: a removed id is remembered (bounded) so a late
//! duplicate forward-request is reported instead of silently relayed twice.

use super::relay_session::RelaySession;
use relay_domain::RequestId;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::debug;

/// How many finished ids are remembered.
pub const RETIRED_CAPACITY: usize = 4096;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Session {0} is already running")]
    DuplicateSession(RequestId),

    #[error("Session {0} already finished")]
    SessionRetired(RequestId),
}

#[derive(Default)]
struct RegistryState {
    live: HashMap<RequestId, Arc<RelaySession>>,
    retired: VecDeque<RequestId>,
    retired_set: HashSet<RequestId>,
}

impl RegistryState {
    fn retire(&mut self, id: RequestId, capacity: usize) {
        if !self.retired_set.insert(id.clone()) {
            return;
        }
        self.retired.push_back(id);
        while self.retired.len() > capacity {
            if let Some(old) = self.retired.pop_front() {
                self.retired_set.remove(&old);
            }
        }
    }
}

/// Concurrent-safe `id → RelaySession` mapping.
///
/// Uses `std::sync::RwLock`: the lock is held only for map operations and
/// never across an await point.
pub struct SessionRegistry {
    state: RwLock<RegistryState>,
    retired_capacity: usize,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::with_retired_capacity(RETIRED_CAPACITY)
    }

    pub fn with_retired_capacity(capacity: usize) -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            retired_capacity: capacity,
        }
    }

    /// Register a new session for `id`.
    pub fn create(&self, id: RequestId) -> Result<Arc<RelaySession>, RegistryError> {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if state.live.contains_key(&id) {
            return Err(RegistryError::DuplicateSession(id));
        }
        if state.retired_set.contains(&id) {
            return Err(RegistryError::SessionRetired(id));
        }

        let session = Arc::new(RelaySession::new(id.clone()));
        state.live.insert(id, session.clone());
        debug!("Registry: created session {} ({} live)", session.id(), state.live.len());
        Ok(session)
    }

    /// Look up a live session. Absent means there is nothing to act on.
    pub fn get(&self, id: &RequestId) -> Option<Arc<RelaySession>> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.live.get(id).cloned()
    }

    /// Remove a session that reached a terminal state.
    pub fn remove(&self, id: &RequestId) -> Option<Arc<RelaySession>> {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        let removed = state.live.remove(id);
        if removed.is_some() {
            state.retire(id.clone(), self.retired_capacity);
            debug!("Registry: removed session {} ({} live)", id, state.live.len());
        }
        removed
    }

    /// Cancel every live session. Returns how many were newly cancelled.
    pub fn cancel_all(&self) -> usize {
        let sessions: Vec<Arc<RelaySession>> = {
            let state = self.state.read().unwrap_or_else(|e| e.into_inner());
            state.live.values().cloned().collect()
        };
        sessions.iter().filter(|s| s.cancel()).count()
    }

    pub fn len(&self) -> usize {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> RequestId {
        RequestId::new(s).unwrap()
    }

    #[test]
    fn test_create_and_get() {
        let registry = SessionRegistry::new();
        let session = registry.create(id("a")).unwrap();
        assert_eq!(registry.len(), 1);
        let found = registry.get(&id("a")).unwrap();
        assert!(Arc::ptr_eq(&session, &found));
        assert!(registry.get(&id("missing")).is_none());
    }

    #[test]
    fn test_duplicate_live_session_rejected() {
        let registry = SessionRegistry::new();
        registry.create(id("a")).unwrap();
        assert_eq!(
            registry.create(id("a")).unwrap_err(),
            RegistryError::DuplicateSession(id("a"))
        );
    }

    #[test]
    fn test_removed_session_is_never_resurrected() {
        let registry = SessionRegistry::new();
        registry.create(id("a")).unwrap();
        assert!(registry.remove(&id("a")).is_some());
        assert!(registry.is_empty());
        assert_eq!(
            registry.create(id("a")).unwrap_err(),
            RegistryError::SessionRetired(id("a"))
        );
        assert!(registry.remove(&id("a")).is_none());
    }

    #[test]
    fn test_retired_memory_is_bounded() {
        let registry = SessionRegistry::with_retired_capacity(2);
        for name in ["a", "b", "c"] {
            registry.create(id(name)).unwrap();
            registry.remove(&id(name));
        }
        // "a" fell out of the retired window
        assert!(registry.create(id("a")).is_ok());
        assert!(registry.create(id("c")).is_err());
    }

    #[test]
    fn test_cancel_all() {
        let registry = SessionRegistry::new();
        let a = registry.create(id("a")).unwrap();
        let b = registry.create(id("b")).unwrap();
        a.cancel();

        assert_eq!(registry.cancel_all(), 1);
        assert!(a.is_cancelled());
        assert!(b.is_cancelled());
        assert_eq!(registry.cancel_all(), 0);
        // Cancelling does not remove; the session's task does
        assert_eq!(registry.len(), 2);
    }
}
