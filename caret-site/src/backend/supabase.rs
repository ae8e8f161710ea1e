//! Supabase REST client.
//!
//! Handles:
//! - Password sign-in, token refresh, session check and sign-out (GoTrue, `/auth/v1`)
//! - Table select/update/delete/insert (PostgREST, `/rest/v1`)

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::{BackendError, Result};
use super::{AuthSession, AuthUser, Backend};
use crate::config::BackendConfig;
use crate::models::{
    CONTACT_MESSAGES, ContactMessage, NEWSLETTER_SUBSCRIBERS, NewContactMessage, NewSubscriber,
    NewsletterSubscriber,
};

/// Response from the token endpoint (password and refresh grants)
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: Option<i64>,
    /// Unix seconds
    expires_at: Option<i64>,
    user: UserResponse,
}

/// User object from the auth API
#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

impl From<UserResponse> for AuthUser {
    fn from(user: UserResponse) -> Self {
        AuthUser {
            id: user.id,
            email: user.email,
        }
    }
}

/// Error body shapes returned by GoTrue and PostgREST.
///
/// GoTrue uses `msg`/`error_description`, PostgREST uses `code`/`message`.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ErrorBody {
    fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }

    fn message(&self) -> Option<String> {
        self.msg
            .clone()
            .or_else(|| self.error_description.clone())
            .or_else(|| self.message.clone())
            .or_else(|| self.error.clone())
    }

    /// PostgREST codes are strings ("23505"); GoTrue sometimes sends the HTTP status as a number.
    fn code(&self) -> Option<String> {
        match &self.code {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            _ => None,
        }
    }
}

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RefreshGrant<'a> {
    refresh_token: &'a str,
}

#[derive(Serialize)]
struct ReadPatch {
    read: bool,
}

/// Supabase API client for the site and the admin panel
pub struct SupabaseClient {
    /// Project URL without trailing slash (e.g. `https://xyz.supabase.co`)
    base_url: String,

    /// Public anon key, sent as `apikey` on every request
    anon_key: String,

    /// HTTP client
    http_client: Client,
}

impl SupabaseClient {
    /// Create a new client from configuration
    pub fn new(config: &BackendConfig) -> anyhow::Result<Self> {
        let mut builder = Client::builder().user_agent("caret-site");
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(std::time::Duration::from_secs(secs));
        }
        let http_client = builder.build().context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            http_client,
        })
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.base_url, path)
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// Attach the API key and bearer token (the anon key when signed out).
    fn with_keys(&self, request: RequestBuilder, access_token: Option<&str>) -> RequestBuilder {
        let bearer = access_token.unwrap_or(&self.anon_key);
        request
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {bearer}"))
    }

    /// Turn a non-success auth response into a provider-message error.
    async fn auth_error(response: Response) -> BackendError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = ErrorBody::parse(&body)
            .message()
            .unwrap_or_else(|| format!("Authentication failed ({status})"));
        BackendError::Auth(message)
    }

    /// Turn a non-success table response into an API error.
    async fn api_error(response: Response) -> BackendError {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return BackendError::Unauthorized;
        }
        let body = response.text().await.unwrap_or_default();
        let parsed = ErrorBody::parse(&body);
        BackendError::Api {
            status,
            code: parsed.code(),
            message: parsed.message().unwrap_or(body),
        }
    }

    async fn token_request<B: Serialize + ?Sized>(
        &self,
        grant_type: &str,
        body: &B,
    ) -> Result<AuthSession> {
        let response = self
            .with_keys(self.http_client.post(self.auth_url("/token")), None)
            .query(&[("grant_type", grant_type)])
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::auth_error(response).await);
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;

        let expires_at = match (token.expires_at, token.expires_in) {
            (Some(at), _) => DateTime::from_timestamp(at, 0).unwrap_or_else(Utc::now),
            (None, Some(secs)) => Utc::now() + Duration::seconds(secs),
            (None, None) => Utc::now() + Duration::hours(1),
        };

        Ok(AuthSession {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at,
            user: token.user.into(),
        })
    }

    /// `select=*` ordered by `created_at` descending.
    async fn select_ordered<T: DeserializeOwned>(
        &self,
        table: &str,
        access_token: &str,
    ) -> Result<Vec<T>> {
        debug!(table, "Selecting all rows");
        let response = self
            .with_keys(self.http_client.get(self.table_url(table)), Some(access_token))
            .query(&[("select", "*"), ("order", "created_at.desc")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))
    }

    /// PATCH the row with the given id and return the updated rows.
    async fn update_by_id<T: DeserializeOwned, P: Serialize + ?Sized>(
        &self,
        table: &str,
        id: &str,
        patch: &P,
        access_token: &str,
    ) -> Result<Vec<T>> {
        debug!(table, id, "Updating row");
        let response = self
            .with_keys(self.http_client.patch(self.table_url(table)), Some(access_token))
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=representation")
            .json(patch)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))
    }

    async fn delete_by_id(&self, table: &str, id: &str, access_token: &str) -> Result<()> {
        debug!(table, id, "Deleting row");
        let response = self
            .with_keys(self.http_client.delete(self.table_url(table)), Some(access_token))
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=minimal")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        Ok(())
    }

    /// Insert one row with the anon key. Public inserts cannot read back under RLS,
    /// so nothing is returned.
    async fn insert<P: Serialize + ?Sized>(&self, table: &str, row: &P) -> Result<()> {
        debug!(table, "Inserting row");
        let response = self
            .with_keys(self.http_client.post(self.table_url(table)), None)
            .header("Prefer", "return=minimal")
            .json(&[row])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        Ok(())
    }
}

#[async_trait]
impl Backend for SupabaseClient {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession> {
        self.token_request("password", &PasswordGrant { email, password })
            .await
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession> {
        self.token_request("refresh_token", &RefreshGrant { refresh_token })
            .await
    }

    async fn get_user(&self, access_token: &str) -> Result<AuthUser> {
        let response = self
            .with_keys(self.http_client.get(self.auth_url("/user")), Some(access_token))
            .send()
            .await?;

        match response.status() {
            s if s.is_success() => {
                let user: UserResponse = response
                    .json()
                    .await
                    .map_err(|e| BackendError::Decode(e.to_string()))?;
                Ok(user.into())
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(BackendError::Unauthorized),
            _ => Err(Self::auth_error(response).await),
        }
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        let response = self
            .with_keys(self.http_client.post(self.auth_url("/logout")), Some(access_token))
            .send()
            .await?;

        // 204 No Content is the success response; 401 means the session is already gone
        if response.status().is_success() || response.status() == StatusCode::UNAUTHORIZED {
            return Ok(());
        }
        Err(Self::auth_error(response).await)
    }

    async fn list_messages(&self, access_token: &str) -> Result<Vec<ContactMessage>> {
        self.select_ordered(CONTACT_MESSAGES, access_token).await
    }

    async fn list_subscribers(&self, access_token: &str) -> Result<Vec<NewsletterSubscriber>> {
        self.select_ordered(NEWSLETTER_SUBSCRIBERS, access_token)
            .await
    }

    async fn mark_message_read(
        &self,
        access_token: &str,
        id: &str,
    ) -> Result<Option<ContactMessage>> {
        let rows: Vec<ContactMessage> = self
            .update_by_id(CONTACT_MESSAGES, id, &ReadPatch { read: true }, access_token)
            .await?;
        Ok(rows.into_iter().find(|m| m.id == id))
    }

    async fn delete_message(&self, access_token: &str, id: &str) -> Result<()> {
        self.delete_by_id(CONTACT_MESSAGES, id, access_token).await
    }

    async fn delete_subscriber(&self, access_token: &str, id: &str) -> Result<()> {
        self.delete_by_id(NEWSLETTER_SUBSCRIBERS, id, access_token)
            .await
    }

    async fn insert_message(&self, message: &NewContactMessage) -> Result<()> {
        self.insert(CONTACT_MESSAGES, message).await
    }

    async fn insert_subscriber(&self, subscriber: &NewSubscriber) -> Result<()> {
        self.insert(NEWSLETTER_SUBSCRIBERS, subscriber).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(url: &str) -> SupabaseClient {
        SupabaseClient::new(&BackendConfig {
            url: url.to_string(),
            anon_key: "anon".to_string(),
            request_timeout_secs: None,
        })
        .unwrap()
    }

    #[test]
    fn test_urls() {
        let c = client("https://xyz.supabase.co/");
        assert_eq!(c.auth_url("/token"), "https://xyz.supabase.co/auth/v1/token");
        assert_eq!(
            c.table_url(CONTACT_MESSAGES),
            "https://xyz.supabase.co/rest/v1/contact_messages"
        );
    }

    #[test]
    fn test_error_body_postgrest() {
        let body = r#"{"code":"23505","details":"Key (email)=(a@x.com) already exists.","hint":null,"message":"duplicate key value violates unique constraint \"newsletter_subscribers_email_key\""}"#;
        let parsed = ErrorBody::parse(body);
        assert_eq!(parsed.code().as_deref(), Some("23505"));
        assert!(parsed.message().unwrap().starts_with("duplicate key"));
    }

    #[test]
    fn test_error_body_gotrue() {
        let newer = r#"{"code":400,"error_code":"invalid_credentials","msg":"Invalid login credentials"}"#;
        let parsed = ErrorBody::parse(newer);
        assert_eq!(parsed.code(), None);
        assert_eq!(parsed.message().as_deref(), Some("Invalid login credentials"));

        let older = r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#;
        assert_eq!(
            ErrorBody::parse(older).message().as_deref(),
            Some("Invalid login credentials")
        );

        assert_eq!(ErrorBody::parse("<html>bad gateway</html>").message(), None);
    }

    #[test]
    fn test_parse_token_response() {
        let body = r#"{
            "access_token": "jwt",
            "token_type": "bearer",
            "expires_in": 3600,
            "expires_at": 1735693200,
            "refresh_token": "r1",
            "user": {"id": "u1", "email": "admin@example.com", "aud": "authenticated"}
        }"#;
        let token: TokenResponse = serde_json::from_str(body).unwrap();
        assert_eq!(token.access_token, "jwt");
        assert_eq!(token.expires_at, Some(1735693200));
        assert_eq!(token.user.email.as_deref(), Some("admin@example.com"));
    }
}
