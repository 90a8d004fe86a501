use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use uuid::Uuid;

use crate::agenda::Viewer;

/// MCP sessions keyed by `Mcp-Session-Id`. A session starts at `initialize`
/// and ends on DELETE; each one remembers the viewer who opened it.
#[derive(Debug, Clone, Default)]
pub struct SessionManager {
    sessions: Arc<Mutex<HashMap<String, Viewer>>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave the map half-updated, so a
    // poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Viewer>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Open a session for `viewer`. Returns the session ID.
    pub fn create_session(&self, viewer: &Viewer) -> String {
        let session_id = Uuid::new_v4().to_string();
        let mut sessions = self.lock();
        sessions.insert(session_id.clone(), viewer.clone());
        tracing::debug!(
            session_id = %session_id,
            user_id = %viewer.user_id,
            active = sessions.len(),
            "mcp session opened"
        );
        session_id
    }

    pub fn viewer_for(&self, session_id: &str) -> Option<Viewer> {
        self.lock().get(session_id).cloned()
    }

    /// Close a session. Returns whether it existed.
    pub fn remove_session(&self, session_id: &str) -> bool {
        let removed = self.lock().remove(session_id).is_some();
        if removed {
            tracing::debug!(session_id, "mcp session closed");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Viewer {
        Viewer::new("user-123", "alice")
    }

    #[test]
    fn test_create_and_get_session() {
        let mgr = SessionManager::new();
        let sid = mgr.create_session(&alice());
        assert_eq!(mgr.viewer_for(&sid), Some(alice()));
    }

    #[test]
    fn test_remove_session() {
        let mgr = SessionManager::new();
        let sid = mgr.create_session(&alice());
        assert!(mgr.remove_session(&sid));
        assert!(!mgr.remove_session(&sid));
        assert_eq!(mgr.viewer_for(&sid), None);
    }

    #[test]
    fn test_sessions_are_distinct() {
        let mgr = SessionManager::new();
        let a = mgr.create_session(&alice());
        let b = mgr.create_session(&Viewer::new("user-456", "bob"));
        assert_ne!(a, b);
        assert_eq!(mgr.viewer_for(&b).unwrap().username, "bob");
    }

    #[test]
    fn test_unknown_session() {
        let mgr = SessionManager::new();
        assert_eq!(mgr.viewer_for("nonexistent"), None);
    }
}
