//! Session registry: maps session ids to live protocol connections.
//!
//! The protocol engine drives the lifecycle through [`SessionRegistry::begin_connecting`],
//! [`SessionRegistry::register`] and [`SessionRegistry::deregister`]. Request
//! handlers only see the read side, [`SessionLookup`].

use std::sync::Arc;

use courier_core::{Connection, SessionId};
use dashmap::DashMap;
use serde::Serialize;

/// Shared handle to a session's connection.
pub type ConnectionHandle = Arc<dyn Connection>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Known to the engine but not yet authenticated.
    Connecting,
    Ready,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("session not found: {0}")]
    NotFound(SessionId),
    #[error("session not ready: {0}")]
    NotReady(SessionId),
}

/// Read side of the registry used by request handlers.
pub trait SessionLookup: Send + Sync {
    /// Current handle for `id`. Never blocks on I/O.
    fn lookup(&self, id: &SessionId) -> Result<ConnectionHandle, RegistryError>;

    /// All known sessions with their state, sorted by id.
    fn sessions(&self) -> Vec<(SessionId, SessionState)>;
}

enum Entry {
    Connecting,
    Ready(ConnectionHandle),
}

impl Entry {
    fn state(&self) -> SessionState {
        match self {
            Self::Connecting => SessionState::Connecting,
            Self::Ready(_) => SessionState::Ready,
        }
    }

    fn into_handle(self) -> Option<ConnectionHandle> {
        match self {
            Self::Connecting => None,
            Self::Ready(handle) => Some(handle),
        }
    }
}

/// Concurrent session map. At most one handle per session id.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<SessionId, Entry>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a ready session.
    pub fn get(&self, id: &SessionId) -> Result<ConnectionHandle, RegistryError> {
        match self.sessions.get(id).as_deref() {
            Some(Entry::Ready(handle)) => Ok(Arc::clone(handle)),
            Some(Entry::Connecting) => Err(RegistryError::NotReady(id.clone())),
            None => Err(RegistryError::NotFound(id.clone())),
        }
    }

    /// Mark a session as connecting. A ready session is left untouched.
    pub fn begin_connecting(&self, id: SessionId) {
        let _ = self.sessions.entry(id.clone()).or_insert(Entry::Connecting);
        tracing::debug!(session_id = %id, "Session connecting");
    }

    /// Install the connection for a session, returning the handle it
    /// replaced so the caller can close it.
    pub fn register(&self, id: SessionId, handle: ConnectionHandle) -> Option<ConnectionHandle> {
        let previous = self
            .sessions
            .insert(id.clone(), Entry::Ready(handle))
            .and_then(Entry::into_handle);
        if previous.is_some() {
            tracing::info!(session_id = %id, "Session connection replaced");
        } else {
            tracing::info!(session_id = %id, "Session registered");
        }
        previous
    }

    /// Remove a session. In-flight requests keep their clone of the handle.
    pub fn deregister(&self, id: &SessionId) -> Option<ConnectionHandle> {
        let removed = self.sessions.remove(id).map(|(_, entry)| entry);
        if removed.is_some() {
            tracing::info!(session_id = %id, "Session deregistered");
        }
        removed.and_then(Entry::into_handle)
    }

    pub fn state(&self, id: &SessionId) -> Option<SessionState> {
        self.sessions.get(id).map(|e| e.state())
    }

    /// Ids of every known session, sorted.
    pub fn session_ids(&self) -> Vec<SessionId> {
        SessionLookup::sessions(self).into_iter().map(|(id, _)| id).collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl SessionLookup for SessionRegistry {
    fn lookup(&self, id: &SessionId) -> Result<ConnectionHandle, RegistryError> {
        self.get(id)
    }

    fn sessions(&self) -> Vec<(SessionId, SessionState)> {
        let mut all: Vec<_> = self
            .sessions
            .iter()
            .map(|e| (e.key().clone(), e.value().state()))
            .collect();
        all.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::MockConnection;

    fn handle() -> ConnectionHandle {
        Arc::new(MockConnection::new())
    }

    #[test]
    fn absent_session_is_not_found() {
        let registry = SessionRegistry::new();
        let id = SessionId::from_raw("nobody");
        assert_eq!(registry.get(&id).err(), Some(RegistryError::NotFound(id)));
    }

    #[test]
    fn connecting_session_is_not_ready() {
        let registry = SessionRegistry::new();
        let id = SessionId::from_raw("pending");
        registry.begin_connecting(id.clone());
        assert_eq!(registry.state(&id), Some(SessionState::Connecting));
        assert_eq!(registry.get(&id).err(), Some(RegistryError::NotReady(id)));
    }

    #[test]
    fn register_then_get_returns_same_handle() {
        let registry = SessionRegistry::new();
        let id = SessionId::from_raw("default");
        let h = handle();
        assert!(registry.register(id.clone(), Arc::clone(&h)).is_none());
        let got = registry.get(&id).unwrap();
        assert!(Arc::ptr_eq(&got, &h));
        assert_eq!(registry.state(&id), Some(SessionState::Ready));
    }

    #[test]
    fn begin_connecting_does_not_demote_ready_session() {
        let registry = SessionRegistry::new();
        let id = SessionId::from_raw("default");
        registry.register(id.clone(), handle());
        registry.begin_connecting(id.clone());
        assert!(registry.get(&id).is_ok());
    }

    #[test]
    fn register_replaces_and_returns_previous() {
        let registry = SessionRegistry::new();
        let id = SessionId::from_raw("default");
        let first = handle();
        let second = handle();
        registry.register(id.clone(), Arc::clone(&first));
        let previous = registry.register(id.clone(), Arc::clone(&second)).unwrap();
        assert!(Arc::ptr_eq(&previous, &first));
        assert!(Arc::ptr_eq(&registry.get(&id).unwrap(), &second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn deregister_removes_but_outstanding_handles_survive() {
        let registry = SessionRegistry::new();
        let id = SessionId::from_raw("default");
        registry.register(id.clone(), handle());
        let in_flight = registry.get(&id).unwrap();

        assert!(registry.deregister(&id).is_some());
        assert!(matches!(registry.get(&id), Err(RegistryError::NotFound(_))));
        assert!(registry.deregister(&id).is_none());
        assert!(registry.is_empty());
        // The clone held by an in-flight request is still usable.
        assert_eq!(Arc::strong_count(&in_flight), 1);
    }

    #[test]
    fn sessions_are_listed_sorted() {
        let registry = SessionRegistry::new();
        registry.register(SessionId::from_raw("b"), handle());
        registry.begin_connecting(SessionId::from_raw("a"));
        assert_eq!(
            registry.session_ids(),
            vec![SessionId::from_raw("a"), SessionId::from_raw("b")]
        );
        let listed = registry.sessions();
        assert_eq!(
            listed,
            vec![
                (SessionId::from_raw("a"), SessionState::Connecting),
                (SessionId::from_raw("b"), SessionState::Ready),
            ]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_lookups_of_unregistered_id_all_fail() {
        let registry = Arc::new(SessionRegistry::new());
        let tasks: Vec<_> = (0..64)
            .map(|_| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move { registry.get(&SessionId::from_raw("ghost")) })
            })
            .collect();
        for t in tasks {
            assert!(matches!(t.await.unwrap(), Err(RegistryError::NotFound(_))));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_lookups_see_one_consistent_handle() {
        let registry = Arc::new(SessionRegistry::new());
        let id = SessionId::from_raw("shared");
        let h = handle();
        registry.register(id.clone(), Arc::clone(&h));

        let tasks: Vec<_> = (0..64)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let id = id.clone();
                tokio::spawn(async move { registry.get(&id).unwrap() })
            })
            .collect();
        for t in tasks {
            assert!(Arc::ptr_eq(&t.await.unwrap(), &h));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn lookups_race_with_register_and_deregister() {
        let registry = Arc::new(SessionRegistry::new());
        let id = SessionId::from_raw("churn");
        let h = handle();

        let writer = {
            let registry = Arc::clone(&registry);
            let id = id.clone();
            let h = Arc::clone(&h);
            tokio::spawn(async move {
                for _ in 0..200 {
                    registry.register(id.clone(), Arc::clone(&h));
                    tokio::task::yield_now().await;
                    registry.deregister(&id);
                }
            })
        };
        let readers: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let id = id.clone();
                let h = Arc::clone(&h);
                tokio::spawn(async move {
                    for _ in 0..200 {
                        match registry.get(&id) {
                            Ok(got) => assert!(Arc::ptr_eq(&got, &h)),
                            Err(e) => assert_eq!(e, RegistryError::NotFound(id.clone())),
                        }
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();

        writer.await.unwrap();
        for r in readers {
            r.await.unwrap();
        }
    }
}
