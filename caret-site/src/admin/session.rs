//! Browser sessions for the admin panel.
//!
//! Each signed-in browser gets an opaque session id (the cookie value) that
//! maps to its own [`AdminPanel`]. Panels live in memory only; the auth
//! provider's tokens inside them are what actually authorize backend calls.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rand::distr::Alphanumeric;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::admin::panel::AdminPanel;
use crate::backend::Backend;

/// A panel shared between the requests of one browser session.
pub type SharedPanel = Arc<Mutex<AdminPanel>>;

struct SessionEntry {
    panel: SharedPanel,
    expires_at: DateTime<Utc>,
}

/// In-memory registry of admin sessions.
pub struct SessionStore {
    backend: Arc<dyn Backend>,
    sessions: RwLock<HashMap<String, SessionEntry>>,
    timeout: Duration,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn Backend>, timeout: Duration) -> Self {
        Self {
            backend,
            sessions: RwLock::new(HashMap::new()),
            timeout,
        }
    }

    /// A fresh panel (state `Loading`) bound to the store's backend.
    pub fn new_panel(&self) -> AdminPanel {
        AdminPanel::new(self.backend.clone())
    }

    /// Generate a cryptographically secure session ID.
    fn generate_session_id() -> String {
        rand::rng()
            .sample_iter(&Alphanumeric)
            .take(64)
            .map(char::from)
            .collect()
    }

    /// Register a panel and return its session id.
    pub async fn insert(&self, panel: AdminPanel) -> String {
        let session_id = Self::generate_session_id();
        let entry = SessionEntry {
            panel: Arc::new(Mutex::new(panel)),
            expires_at: Utc::now()
                .checked_add_signed(self.timeout)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        };
        self.sessions.write().await.insert(session_id.clone(), entry);
        session_id
    }

    /// Look up a live session. Expired sessions are dropped on access.
    pub async fn get(&self, session_id: &str) -> Option<SharedPanel> {
        {
            let sessions = self.sessions.read().await;
            match sessions.get(session_id) {
                Some(entry) if entry.expires_at > Utc::now() => {
                    return Some(entry.panel.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }

        self.remove(session_id).await;
        None
    }

    pub async fn remove(&self, session_id: &str) -> bool {
        self.sessions.write().await.remove(session_id).is_some()
    }

    /// Drop every expired session. Returns how many were removed.
    pub async fn cleanup_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| entry.expires_at > now);
        before - sessions.len()
    }

    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
