//! Access to the hosted backend (auth provider + table storage).
//!
//! The [`Backend`] trait abstracts the data source so we can use either:
//! - The real Supabase project (production)
//! - An in-memory backend (dry-run/testing)

pub mod error;
pub mod memory;
pub mod supabase;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::models::{ContactMessage, NewContactMessage, NewSubscriber, NewsletterSubscriber};

pub use error::{BackendError, Result, UNIQUE_VIOLATION};
pub use memory::InMemoryBackend;
pub use supabase::SupabaseClient;

/// Authenticated user as reported by the auth provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
}

/// Session issued by the auth provider after sign-in or refresh
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: AuthUser,
}

impl AuthSession {
    /// Check if the access token should be refreshed (with a 60-second buffer)
    pub fn needs_refresh(&self) -> bool {
        self.expires_at <= Utc::now() + Duration::seconds(60)
    }
}

/// Operations the site and admin panel need from the backend.
///
/// Admin calls take the operator's access token; public inserts run with
/// the anonymous key.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Password sign-in. Errors carry the provider's message.
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession>;

    /// Exchange a refresh token for a new session.
    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession>;

    /// Look up the user behind an access token.
    ///
    /// Returns [`BackendError::Unauthorized`] when the token is no longer valid.
    async fn get_user(&self, access_token: &str) -> Result<AuthUser>;

    /// Revoke the session behind an access token.
    async fn sign_out(&self, access_token: &str) -> Result<()>;

    /// All contact messages, newest first.
    async fn list_messages(&self, access_token: &str) -> Result<Vec<ContactMessage>>;

    /// All newsletter subscribers, newest first.
    async fn list_subscribers(&self, access_token: &str) -> Result<Vec<NewsletterSubscriber>>;

    /// Set `read = true` on a message and return the updated row.
    ///
    /// `None` means no row with that id exists.
    async fn mark_message_read(
        &self,
        access_token: &str,
        id: &str,
    ) -> Result<Option<ContactMessage>>;

    async fn delete_message(&self, access_token: &str, id: &str) -> Result<()>;

    async fn delete_subscriber(&self, access_token: &str, id: &str) -> Result<()>;

    /// Insert a contact form submission (anonymous).
    async fn insert_message(&self, message: &NewContactMessage) -> Result<()>;

    /// Insert a newsletter subscriber (anonymous).
    ///
    /// A duplicate email fails with the backend's uniqueness error
    /// (see [`BackendError::is_unique_violation`]).
    async fn insert_subscriber(&self, subscriber: &NewSubscriber) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_expiring_in(delta: Duration) -> AuthSession {
        AuthSession {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: Utc::now() + delta,
            user: AuthUser {
                id: "user-1".to_string(),
                email: Some("admin@example.com".to_string()),
            },
        }
    }

    #[test]
    fn test_session_refresh_window() {
        assert!(!session_expiring_in(Duration::hours(1)).needs_refresh());
        assert!(session_expiring_in(Duration::seconds(30)).needs_refresh());
        assert!(session_expiring_in(Duration::minutes(-5)).needs_refresh());
    }
}
