//! In-memory backend for dry-run mode and tests.
//!
//! Mirrors the behaviour the site relies on from the hosted backend:
//! password sign-in with expiring access tokens, newest-first selects,
//! return-the-updated-row patches, and the unique constraint on subscriber
//! emails (reported with the same `23505` code).

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::StatusCode;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tracing::info;

use super::error::{BackendError, Result, UNIQUE_VIOLATION};
use super::{AuthSession, AuthUser, Backend};
use crate::models::{ContactMessage, NewContactMessage, NewSubscriber, NewsletterSubscriber};

/// Lifetime of issued access tokens
const ACCESS_TOKEN_TTL_SECS: i64 = 3600;

#[derive(Debug, Clone)]
struct Account {
    user: AuthUser,
    password: String,
}

#[derive(Debug, Clone)]
struct IssuedToken {
    user: AuthUser,
    expires_at: DateTime<Utc>,
}

/// A stored row plus its insertion sequence (tie-breaker for equal timestamps)
#[derive(Debug, Clone)]
struct Stored<T> {
    seq: u64,
    row: T,
}

#[derive(Debug, Default)]
struct Tables {
    messages: Vec<Stored<ContactMessage>>,
    subscribers: Vec<Stored<NewsletterSubscriber>>,
}

#[derive(Debug, Default)]
struct Auth {
    accounts: HashMap<String, Account>,
    access_tokens: HashMap<String, IssuedToken>,
    /// refresh token -> email
    refresh_tokens: HashMap<String, String>,
}

/// Backend that keeps everything in process memory.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    tables: RwLock<Tables>,
    auth: RwLock<Auth>,
    seq: AtomicU64,
    /// Number of select queries served (both tables)
    select_count: AtomicUsize,
    /// When set, every table call fails as if the backend were down
    unavailable: AtomicBool,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend with one operator account, used by `serve --dry-run`.
    pub async fn with_operator(email: &str, password: &str) -> Self {
        let backend = Self::new();
        backend.add_user(email, password).await;
        info!("DRY-RUN: in-memory backend with operator account '{}'", email);
        backend
    }

    /// Register an account that can sign in.
    pub async fn add_user(&self, email: &str, password: &str) {
        let mut auth = self.auth.write().await;
        auth.accounts.insert(
            email.to_lowercase(),
            Account {
                user: AuthUser {
                    id: uuid::Uuid::new_v4().to_string(),
                    email: Some(email.to_string()),
                },
                password: password.to_string(),
            },
        );
    }

    /// Store a message row as-is (seeding).
    pub async fn seed_message(&self, message: ContactMessage) {
        let seq = self.next_seq();
        self.tables.write().await.messages.push(Stored { seq, row: message });
    }

    /// Store a subscriber row as-is (seeding).
    pub async fn seed_subscriber(&self, subscriber: NewsletterSubscriber) {
        let seq = self.next_seq();
        self.tables
            .write()
            .await
            .subscribers
            .push(Stored { seq, row: subscriber });
    }

    /// Number of select queries served so far.
    pub fn select_count(&self) -> usize {
        self.select_count.load(Ordering::SeqCst)
    }

    /// Simulate an outage of the table API.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Force an issued access token to expire now.
    pub async fn expire_access_token(&self, access_token: &str) {
        if let Some(token) = self.auth.write().await.access_tokens.get_mut(access_token) {
            token.expires_at = Utc::now() - Duration::seconds(1);
        }
    }

    /// Snapshot of stored messages, newest first.
    pub async fn messages(&self) -> Vec<ContactMessage> {
        let tables = self.tables.read().await;
        newest_first(&tables.messages, |m| &m.created_at)
    }

    /// Snapshot of stored subscribers, newest first.
    pub async fn subscribers(&self) -> Vec<NewsletterSubscriber> {
        let tables = self.tables.read().await;
        newest_first(&tables.subscribers, |s| &s.created_at)
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(BackendError::Api {
                status: StatusCode::SERVICE_UNAVAILABLE,
                code: None,
                message: "Backend unavailable".to_string(),
            });
        }
        Ok(())
    }

    /// Validate an access token the way the table API's RLS would.
    async fn authorize(&self, access_token: &str) -> Result<AuthUser> {
        let auth = self.auth.read().await;
        match auth.access_tokens.get(access_token) {
            Some(token) if token.expires_at > Utc::now() => Ok(token.user.clone()),
            _ => Err(BackendError::Unauthorized),
        }
    }

    async fn issue_session(&self, email: &str, user: AuthUser) -> AuthSession {
        let access_token = uuid::Uuid::new_v4().to_string();
        let refresh_token = uuid::Uuid::new_v4().to_string();
        let expires_at = Utc::now() + Duration::seconds(ACCESS_TOKEN_TTL_SECS);

        let mut auth = self.auth.write().await;
        auth.access_tokens.insert(
            access_token.clone(),
            IssuedToken {
                user: user.clone(),
                expires_at,
            },
        );
        auth.refresh_tokens
            .insert(refresh_token.clone(), email.to_lowercase());

        AuthSession {
            access_token,
            refresh_token,
            expires_at,
            user,
        }
    }
}

/// Rows sorted by `created_at` descending, later inserts first on ties.
fn newest_first<T: Clone>(rows: &[Stored<T>], created_at: impl Fn(&T) -> &str) -> Vec<T> {
    let mut sorted: Vec<&Stored<T>> = rows.iter().collect();
    sorted.sort_by(|a, b| {
        let ta = DateTime::parse_from_rfc3339(created_at(&a.row)).ok();
        let tb = DateTime::parse_from_rfc3339(created_at(&b.row)).ok();
        tb.cmp(&ta).then(b.seq.cmp(&a.seq))
    });
    sorted.into_iter().map(|s| s.row.clone()).collect()
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, false)
}

#[async_trait]
impl Backend for InMemoryBackend {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession> {
        let account = {
            let auth = self.auth.read().await;
            auth.accounts.get(&email.to_lowercase()).cloned()
        };

        match account {
            Some(account) if account.password == password => {
                Ok(self.issue_session(email, account.user).await)
            }
            _ => Err(BackendError::Auth("Invalid login credentials".to_string())),
        }
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession> {
        let (email, account) = {
            let mut auth = self.auth.write().await;
            // Refresh tokens are single-use
            let email = auth
                .refresh_tokens
                .remove(refresh_token)
                .ok_or_else(|| BackendError::Auth("Invalid Refresh Token".to_string()))?;
            let account = auth
                .accounts
                .get(&email)
                .cloned()
                .ok_or_else(|| BackendError::Auth("User not found".to_string()))?;
            (email, account)
        };
        Ok(self.issue_session(&email, account.user).await)
    }

    async fn get_user(&self, access_token: &str) -> Result<AuthUser> {
        self.authorize(access_token).await
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        let mut auth = self.auth.write().await;
        if let Some(token) = auth.access_tokens.remove(access_token) {
            // Revoke every refresh token of that user as well
            let email = token.user.email.unwrap_or_default().to_lowercase();
            auth.refresh_tokens.retain(|_, e| *e != email);
        }
        Ok(())
    }

    async fn list_messages(&self, access_token: &str) -> Result<Vec<ContactMessage>> {
        self.check_available()?;
        self.authorize(access_token).await?;
        self.select_count.fetch_add(1, Ordering::SeqCst);
        Ok(self.messages().await)
    }

    async fn list_subscribers(&self, access_token: &str) -> Result<Vec<NewsletterSubscriber>> {
        self.check_available()?;
        self.authorize(access_token).await?;
        self.select_count.fetch_add(1, Ordering::SeqCst);
        Ok(self.subscribers().await)
    }

    async fn mark_message_read(
        &self,
        access_token: &str,
        id: &str,
    ) -> Result<Option<ContactMessage>> {
        self.check_available()?;
        self.authorize(access_token).await?;
        let mut tables = self.tables.write().await;
        Ok(tables
            .messages
            .iter_mut()
            .find(|s| s.row.id == id)
            .map(|s| {
                s.row.read = true;
                s.row.clone()
            }))
    }

    async fn delete_message(&self, access_token: &str, id: &str) -> Result<()> {
        self.check_available()?;
        self.authorize(access_token).await?;
        self.tables.write().await.messages.retain(|s| s.row.id != id);
        Ok(())
    }

    async fn delete_subscriber(&self, access_token: &str, id: &str) -> Result<()> {
        self.check_available()?;
        self.authorize(access_token).await?;
        self.tables
            .write()
            .await
            .subscribers
            .retain(|s| s.row.id != id);
        Ok(())
    }

    async fn insert_message(&self, message: &NewContactMessage) -> Result<()> {
        self.check_available()?;
        let row = ContactMessage {
            id: uuid::Uuid::new_v4().to_string(),
            name: message.name.clone(),
            email: message.email.clone(),
            company: message.company.clone(),
            message: message.message.clone(),
            created_at: now_timestamp(),
            read: false,
        };
        self.seed_message(row).await;
        Ok(())
    }

    async fn insert_subscriber(&self, subscriber: &NewSubscriber) -> Result<()> {
        self.check_available()?;
        let seq = self.next_seq();
        let mut tables = self.tables.write().await;
        if tables
            .subscribers
            .iter()
            .any(|s| s.row.email == subscriber.email)
        {
            return Err(BackendError::Api {
                status: StatusCode::CONFLICT,
                code: Some(UNIQUE_VIOLATION.to_string()),
                message: "duplicate key value violates unique constraint \"newsletter_subscribers_email_key\""
                    .to_string(),
            });
        }
        tables.subscribers.push(Stored {
            seq,
            row: NewsletterSubscriber {
                id: uuid::Uuid::new_v4().to_string(),
                email: subscriber.email.clone(),
                created_at: now_timestamp(),
            },
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subscriber(id: &str, email: &str, created_at: &str) -> NewsletterSubscriber {
        NewsletterSubscriber {
            id: id.to_string(),
            email: email.to_string(),
            created_at: created_at.to_string(),
        }
    }

    #[tokio::test]
    async fn test_sign_in() {
        let backend = InMemoryBackend::with_operator("admin@example.com", "hunter2").await;

        let err = backend
            .sign_in_with_password("admin@example.com", "wrong")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid login credentials");

        let session = backend
            .sign_in_with_password("Admin@Example.com", "hunter2")
            .await
            .unwrap();
        let user = backend.get_user(&session.access_token).await.unwrap();
        assert_eq!(user, session.user);
    }

    #[tokio::test]
    async fn test_selects_require_valid_token() {
        let backend = InMemoryBackend::new();
        assert!(matches!(
            backend.list_messages("nope").await,
            Err(BackendError::Unauthorized)
        ));
        assert_eq!(backend.select_count(), 0);
    }

    #[tokio::test]
    async fn test_refresh_rotates_tokens() {
        let backend = InMemoryBackend::with_operator("admin@example.com", "pw").await;
        let session = backend
            .sign_in_with_password("admin@example.com", "pw")
            .await
            .unwrap();
        backend.expire_access_token(&session.access_token).await;
        assert!(backend.get_user(&session.access_token).await.is_err());

        let refreshed = backend.refresh_session(&session.refresh_token).await.unwrap();
        assert!(backend.get_user(&refreshed.access_token).await.is_ok());

        // Single-use
        assert!(backend.refresh_session(&session.refresh_token).await.is_err());
    }

    #[tokio::test]
    async fn test_subscribers_newest_first() {
        let backend = InMemoryBackend::new();
        backend
            .seed_subscriber(subscriber("1", "old@x.com", "2024-01-01T00:00:00Z"))
            .await;
        backend
            .seed_subscriber(subscriber("2", "new@x.com", "2025-01-01T00:00:00Z"))
            .await;
        backend
            .seed_subscriber(subscriber("3", "mid@x.com", "2024-06-01T00:00:00+00:00"))
            .await;

        let ids: Vec<String> = backend.subscribers().await.into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["2", "3", "1"]);
    }

    #[tokio::test]
    async fn test_duplicate_subscriber_is_unique_violation() {
        let backend = InMemoryBackend::new();
        let sub = NewSubscriber {
            email: "a@x.com".to_string(),
        };
        backend.insert_subscriber(&sub).await.unwrap();
        let err = backend.insert_subscriber(&sub).await.unwrap_err();
        assert!(err.is_unique_violation());
        assert_eq!(backend.subscribers().await.len(), 1);
    }
}
