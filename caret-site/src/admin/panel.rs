//! Per-operator admin panel state.
//!
//! An [`AdminPanel`] holds what one signed-in browser sees: the gate state,
//! the auth provider's tokens and the two fetched lists. Every mutation goes
//! to the backend first and the local lists only change once the backend has
//! confirmed it.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::admin::csv::subscribers_csv;
use crate::backend::{AuthSession, Backend, BackendError};
use crate::models::{ContactMessage, NewsletterSubscriber};

/// Where the session gate currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// Session check not done yet
    Loading,
    LoggedOut,
    LoggedIn,
}

/// Feedback shown once on the next dashboard render
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Error(String),
}

impl Notice {
    pub fn is_error(&self) -> bool {
        matches!(self, Notice::Error(_))
    }

    pub fn text(&self) -> &str {
        match self {
            Notice::Info(text) | Notice::Error(text) => text,
        }
    }
}

pub struct AdminPanel {
    backend: Arc<dyn Backend>,
    state: GateState,
    session: Option<AuthSession>,
    messages: Vec<ContactMessage>,
    subscribers: Vec<NewsletterSubscriber>,
    login_error: Option<String>,
    notices: Vec<Notice>,
}

impl AdminPanel {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            state: GateState::Loading,
            session: None,
            messages: Vec::new(),
            subscribers: Vec::new(),
            login_error: None,
            notices: Vec::new(),
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn messages(&self) -> &[ContactMessage] {
        &self.messages
    }

    pub fn subscribers(&self) -> &[NewsletterSubscriber] {
        &self.subscribers
    }

    pub fn unread_count(&self) -> usize {
        self.messages.iter().filter(|m| !m.read).count()
    }

    /// Email of the signed-in operator
    pub fn operator_email(&self) -> Option<&str> {
        self.session.as_ref().and_then(|s| s.user.email.as_deref())
    }

    /// Error from the last failed sign-in, as reported by the provider
    pub fn login_error(&self) -> Option<&str> {
        self.login_error.as_deref()
    }

    /// Drain pending notices.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Page load: check the session and, when it holds, fetch both lists.
    pub async fn mount(&mut self) -> GateState {
        if self.check_session().await == GateState::LoggedIn {
            self.fetch().await;
        }
        self.state
    }

    /// Ask the auth provider whether the stored session is still valid,
    /// refreshing the access token when it is about to expire.
    pub async fn check_session(&mut self) -> GateState {
        let Some(session) = self.session.clone() else {
            self.state = GateState::LoggedOut;
            return self.state;
        };

        let session = if session.needs_refresh() {
            match self.backend.refresh_session(&session.refresh_token).await {
                Ok(refreshed) => {
                    debug!("Refreshed access token for {:?}", refreshed.user.email);
                    self.session = Some(refreshed.clone());
                    refreshed
                }
                Err(e) => {
                    warn!("Session refresh failed: {}", e);
                    self.clear();
                    return self.state;
                }
            }
        } else {
            session
        };

        match self.backend.get_user(&session.access_token).await {
            Ok(_) => self.state = GateState::LoggedIn,
            Err(e) => {
                warn!("Session check failed: {}", e);
                self.clear();
            }
        }
        self.state
    }

    /// Password sign-in without loading any data. The browser flow uses this
    /// and lets the dashboard render that follows do the fetch.
    pub async fn sign_in(&mut self, email: &str, password: &str) -> bool {
        self.login_error = None;

        match self.backend.sign_in_with_password(email, password).await {
            Ok(session) => {
                info!("Admin signed in: {}", email);
                self.session = Some(session);
                self.state = GateState::LoggedIn;
                true
            }
            Err(e) => {
                warn!("Admin sign-in failed for {}: {}", email, e);
                self.login_error = Some(e.to_string());
                self.state = GateState::LoggedOut;
                false
            }
        }
    }

    /// Password sign-in. On success the lists are fetched right away.
    pub async fn login(&mut self, email: &str, password: &str) -> bool {
        if !self.sign_in(email, password).await {
            return false;
        }
        self.fetch().await;
        true
    }

    /// Sign out with the provider and forget everything fetched.
    pub async fn logout(&mut self) {
        if let Some(session) = &self.session
            && let Err(e) = self.backend.sign_out(&session.access_token).await
        {
            warn!("Sign-out failed: {}", e);
        }
        self.clear();
    }

    /// Run both list queries. A successful query replaces its list, even with
    /// an empty result; a failed one leaves the list alone and adds a notice.
    pub async fn fetch(&mut self) {
        let Some(token) = self.access_token() else {
            return;
        };

        let (messages, subscribers) = tokio::join!(
            self.backend.list_messages(&token),
            self.backend.list_subscribers(&token)
        );

        match messages {
            Ok(rows) => self.messages = rows,
            Err(e) => {
                warn!("Failed to fetch messages: {}", e);
                self.notices
                    .push(Notice::Error(format!("Could not load messages: {e}")));
            }
        }
        match subscribers {
            Ok(rows) => self.subscribers = rows,
            Err(e) => {
                warn!("Failed to fetch subscribers: {}", e);
                self.notices
                    .push(Notice::Error(format!("Could not load subscribers: {e}")));
            }
        }
    }

    /// Mark a message as read and adopt the row the backend returns.
    pub async fn mark_as_read(&mut self, id: &str) -> Result<(), BackendError> {
        let token = self.require_token()?;

        match self.backend.mark_message_read(&token, id).await {
            Ok(Some(updated)) => {
                if let Some(entry) = self.messages.iter_mut().find(|m| m.id == id) {
                    *entry = updated;
                }
                Ok(())
            }
            Ok(None) => {
                self.messages.retain(|m| m.id != id);
                self.notices.push(Notice::Info(
                    "That message no longer exists and was removed from the list.".to_string(),
                ));
                Ok(())
            }
            Err(e) => Err(self.failed("mark message as read", e)),
        }
    }

    pub async fn delete_message(&mut self, id: &str) -> Result<(), BackendError> {
        let token = self.require_token()?;

        match self.backend.delete_message(&token, id).await {
            Ok(()) => {
                self.messages.retain(|m| m.id != id);
                Ok(())
            }
            Err(e) => Err(self.failed("delete message", e)),
        }
    }

    pub async fn delete_subscriber(&mut self, id: &str) -> Result<(), BackendError> {
        let token = self.require_token()?;

        match self.backend.delete_subscriber(&token, id).await {
            Ok(()) => {
                self.subscribers.retain(|s| s.id != id);
                Ok(())
            }
            Err(e) => Err(self.failed("delete subscriber", e)),
        }
    }

    /// CSV of the subscribers currently held, without a backend round-trip.
    pub fn export_csv(&self) -> String {
        subscribers_csv(&self.subscribers)
    }

    fn access_token(&self) -> Option<String> {
        match self.state {
            GateState::LoggedIn => self.session.as_ref().map(|s| s.access_token.clone()),
            _ => None,
        }
    }

    fn require_token(&self) -> Result<String, BackendError> {
        self.access_token().ok_or(BackendError::Unauthorized)
    }

    fn failed(&mut self, action: &str, error: BackendError) -> BackendError {
        self.notices
            .push(Notice::Error(format!("Failed to {action}: {error}")));
        error
    }

    fn clear(&mut self) {
        self.session = None;
        self.messages.clear();
        self.subscribers.clear();
        self.state = GateState::LoggedOut;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;

    const EMAIL: &str = "admin@example.com";
    const PASSWORD: &str = "hunter2";

    fn message(id: &str, created_at: &str) -> ContactMessage {
        ContactMessage {
            id: id.to_string(),
            name: format!("Sender {id}"),
            email: format!("{id}@example.com"),
            company: None,
            message: "Hello".to_string(),
            created_at: created_at.to_string(),
            read: false,
        }
    }

    fn subscriber(id: &str, created_at: &str) -> NewsletterSubscriber {
        NewsletterSubscriber {
            id: id.to_string(),
            email: format!("{id}@example.com"),
            created_at: created_at.to_string(),
        }
    }

    async fn seeded_backend() -> Arc<InMemoryBackend> {
        let backend = Arc::new(InMemoryBackend::with_operator(EMAIL, PASSWORD).await);
        backend.seed_message(message("m1", "2025-01-01T00:00:00Z")).await;
        backend.seed_message(message("m2", "2025-01-02T00:00:00Z")).await;
        backend
            .seed_subscriber(subscriber("s1", "2025-01-01T00:00:00Z"))
            .await;
        backend
    }

    async fn logged_in(backend: &Arc<InMemoryBackend>) -> AdminPanel {
        let mut panel = AdminPanel::new(backend.clone());
        assert!(panel.login(EMAIL, PASSWORD).await);
        panel
    }

    #[tokio::test]
    async fn test_no_session_is_logged_out() {
        let backend = seeded_backend().await;
        let mut panel = AdminPanel::new(backend.clone());
        assert_eq!(panel.state(), GateState::Loading);

        assert_eq!(panel.mount().await, GateState::LoggedOut);
        assert_eq!(backend.select_count(), 0);
    }

    #[tokio::test]
    async fn test_login_fetches_both_lists_newest_first() {
        let backend = seeded_backend().await;
        let panel = logged_in(&backend).await;

        assert_eq!(panel.state(), GateState::LoggedIn);
        assert_eq!(backend.select_count(), 2);
        let ids: Vec<&str> = panel.messages().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m2", "m1"]);
        assert_eq!(panel.subscribers().len(), 1);
        assert_eq!(panel.operator_email(), Some(EMAIL));
    }

    #[tokio::test]
    async fn test_sign_in_defers_fetch_to_mount() {
        let backend = seeded_backend().await;
        let mut panel = AdminPanel::new(backend.clone());

        assert!(panel.sign_in(EMAIL, PASSWORD).await);
        assert_eq!(panel.state(), GateState::LoggedIn);
        assert_eq!(backend.select_count(), 0);
        assert!(panel.messages().is_empty());

        assert_eq!(panel.mount().await, GateState::LoggedIn);
        assert_eq!(backend.select_count(), 2);
        assert_eq!(panel.messages().len(), 2);
    }

    #[tokio::test]
    async fn test_mount_with_valid_session_issues_two_queries() {
        let backend = seeded_backend().await;
        let mut panel = logged_in(&backend).await;
        let before = backend.select_count();

        assert_eq!(panel.mount().await, GateState::LoggedIn);
        assert_eq!(backend.select_count(), before + 2);
    }

    #[tokio::test]
    async fn test_failed_login_keeps_provider_message() {
        let backend = seeded_backend().await;
        let mut panel = AdminPanel::new(backend.clone());

        assert!(!panel.login(EMAIL, "wrong").await);
        assert_eq!(panel.state(), GateState::LoggedOut);
        assert_eq!(panel.login_error(), Some("Invalid login credentials"));
        assert!(panel.messages().is_empty());
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed() {
        let backend = seeded_backend().await;
        let mut panel = logged_in(&backend).await;
        let old_token = panel.access_token().unwrap();
        backend.expire_access_token(&old_token).await;
        panel.session.as_mut().unwrap().expires_at = chrono::Utc::now();

        assert_eq!(panel.check_session().await, GateState::LoggedIn);
        assert_ne!(panel.access_token().unwrap(), old_token);
    }

    #[tokio::test]
    async fn test_revoked_session_logs_out() {
        let backend = seeded_backend().await;
        let mut panel = logged_in(&backend).await;
        let token = panel.access_token().unwrap();
        backend.sign_out(&token).await.unwrap();

        assert_eq!(panel.mount().await, GateState::LoggedOut);
        assert!(panel.messages().is_empty());
        assert!(panel.subscribers().is_empty());
    }

    #[tokio::test]
    async fn test_mark_as_read_only_touches_target() {
        let backend = seeded_backend().await;
        let mut panel = logged_in(&backend).await;

        panel.mark_as_read("m1").await.unwrap();

        let m1 = panel.messages().iter().find(|m| m.id == "m1").unwrap();
        let m2 = panel.messages().iter().find(|m| m.id == "m2").unwrap();
        assert!(m1.read);
        assert!(!m2.read);
        assert_eq!(panel.unread_count(), 1);
    }

    #[tokio::test]
    async fn test_mark_as_read_on_missing_row_drops_it() {
        let backend = seeded_backend().await;
        let mut panel = logged_in(&backend).await;

        // Someone else deleted it after our fetch
        let token = panel.access_token().unwrap();
        backend.delete_message(&token, "m1").await.unwrap();

        panel.mark_as_read("m1").await.unwrap();
        assert_eq!(panel.messages().len(), 1);
        let notices = panel.take_notices();
        assert_eq!(notices.len(), 1);
        assert!(!notices[0].is_error());
    }

    #[tokio::test]
    async fn test_delete_message_removes_one() {
        let backend = seeded_backend().await;
        let mut panel = logged_in(&backend).await;

        panel.delete_message("m2").await.unwrap();
        assert_eq!(panel.messages().len(), 1);
        assert!(panel.messages().iter().all(|m| m.id != "m2"));
        assert_eq!(backend.messages().await.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_subscriber_removes_one() {
        let backend = seeded_backend().await;
        let mut panel = logged_in(&backend).await;

        panel.delete_subscriber("s1").await.unwrap();
        assert!(panel.subscribers().is_empty());
        assert!(backend.subscribers().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_mutations_leave_state_unchanged() {
        let backend = seeded_backend().await;
        let mut panel = logged_in(&backend).await;
        let messages = panel.messages().to_vec();
        let subscribers = panel.subscribers().to_vec();

        backend.set_unavailable(true);
        assert!(panel.mark_as_read("m1").await.is_err());
        assert!(panel.delete_message("m1").await.is_err());
        assert!(panel.delete_subscriber("s1").await.is_err());

        assert_eq!(panel.messages(), messages.as_slice());
        assert_eq!(panel.subscribers(), subscribers.as_slice());
        let notices = panel.take_notices();
        assert_eq!(notices.len(), 3);
        assert!(notices.iter().all(Notice::is_error));
    }

    #[tokio::test]
    async fn test_fetch_replaces_with_empty_and_keeps_on_error() {
        let backend = seeded_backend().await;
        let mut panel = logged_in(&backend).await;

        backend.set_unavailable(true);
        panel.fetch().await;
        assert_eq!(panel.messages().len(), 2);
        assert_eq!(panel.take_notices().len(), 2);

        backend.set_unavailable(false);
        let token = panel.access_token().unwrap();
        backend.delete_message(&token, "m1").await.unwrap();
        backend.delete_message(&token, "m2").await.unwrap();
        panel.fetch().await;
        assert!(panel.messages().is_empty());
        assert_eq!(panel.subscribers().len(), 1);
    }

    #[tokio::test]
    async fn test_logout_clears_and_relogin_refetches() {
        let backend = seeded_backend().await;
        let mut panel = logged_in(&backend).await;

        panel.logout().await;
        assert_eq!(panel.state(), GateState::LoggedOut);
        assert!(panel.messages().is_empty());
        assert!(panel.subscribers().is_empty());
        assert!(panel.delete_message("m1").await.is_err());

        let before = backend.select_count();
        assert!(panel.login(EMAIL, PASSWORD).await);
        assert_eq!(backend.select_count(), before + 2);
        assert_eq!(panel.messages().len(), 2);
    }

    #[tokio::test]
    async fn test_export_uses_held_list() {
        let backend = seeded_backend().await;
        let panel = logged_in(&backend).await;
        let before = backend.select_count();

        assert_eq!(
            panel.export_csv(),
            "email,subscribed_at\ns1@example.com,2025-01-01T00:00:00Z"
        );
        assert_eq!(backend.select_count(), before);
    }
}
