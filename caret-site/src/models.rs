//! Row types for the two backend tables.
//!
//! Rows are owned by the hosted backend: ids are assigned at insert time and
//! `created_at` is kept exactly as the backend returned it.

use chrono::DateTime;
use serde::{Deserialize, Serialize};

/// Table holding contact form submissions
pub const CONTACT_MESSAGES: &str = "contact_messages";

/// Table holding newsletter signups (unique on `email`)
pub const NEWSLETTER_SUBSCRIBERS: &str = "newsletter_subscribers";

/// A contact form submission.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ContactMessage {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub company: Option<String>,
    pub message: String,
    pub created_at: String,
    #[serde(default)]
    pub read: bool,
}

impl ContactMessage {
    /// Human readable creation time for the dashboard.
    pub fn created_at_display(&self) -> String {
        format_timestamp(&self.created_at)
    }
}

/// A newsletter subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NewsletterSubscriber {
    pub id: String,
    pub email: String,
    pub created_at: String,
}

impl NewsletterSubscriber {
    pub fn created_at_display(&self) -> String {
        format_timestamp(&self.created_at)
    }
}

/// Insert payload for `contact_messages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewContactMessage {
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub message: String,
}

impl NewContactMessage {
    /// Build a submission from raw form input.
    ///
    /// Fields are trimmed and a blank company becomes `None`. Returns a
    /// user-facing message when a required field is missing.
    pub fn from_form(
        name: &str,
        email: &str,
        company: &str,
        message: &str,
    ) -> Result<Self, &'static str> {
        let name = name.trim();
        let email = email.trim();
        let company = company.trim();
        let message = message.trim();

        if name.is_empty() || message.is_empty() {
            return Err("Please fill in your name and a message.");
        }
        if !looks_like_email(email) {
            return Err("Please enter a valid email address.");
        }

        Ok(Self {
            name: name.to_string(),
            email: email.to_string(),
            company: (!company.is_empty()).then(|| company.to_string()),
            message: message.to_string(),
        })
    }
}

/// Insert payload for `newsletter_subscribers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewSubscriber {
    pub email: String,
}

impl NewSubscriber {
    pub fn from_form(email: &str) -> Result<Self, &'static str> {
        let email = email.trim();
        if !looks_like_email(email) {
            return Err("Please enter a valid email address.");
        }
        Ok(Self {
            email: email.to_string(),
        })
    }
}

/// Minimal shape check; the backend stays the source of truth.
fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty(),
        None => false,
    }
}

/// Format a backend timestamp as e.g. `Jan 1, 2025, 12:00 AM` (UTC).
///
/// Falls back to the raw string when it is not RFC 3339.
pub fn format_timestamp(raw: &str) -> String {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => dt.format("%b %-d, %Y, %I:%M %p").to_string(),
        Err(_) => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_backend_rows() {
        let json = r#"[{
            "id": "6f1c",
            "name": "Ada",
            "email": "ada@example.com",
            "company": null,
            "message": "Hello",
            "created_at": "2025-01-01T00:00:00.123456+00:00",
            "read": false
        }]"#;
        let rows: Vec<ContactMessage> = serde_json::from_str(json).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].company, None);
        assert!(!rows[0].read);
        assert_eq!(rows[0].created_at, "2025-01-01T00:00:00.123456+00:00");
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(
            format_timestamp("2025-01-01T00:00:00Z"),
            "Jan 1, 2025, 12:00 AM"
        );
        assert_eq!(
            format_timestamp("2025-03-14T15:09:26.5+00:00"),
            "Mar 14, 2025, 03:09 PM"
        );
        assert_eq!(format_timestamp("yesterday"), "yesterday");
    }

    #[test]
    fn test_contact_form_blank_company_is_none() {
        let msg = NewContactMessage::from_form(" Ada ", "ada@example.com", "  ", "Hi").unwrap();
        assert_eq!(msg.name, "Ada");
        assert_eq!(msg.company, None);

        let json = serde_json::to_value(&msg).unwrap();
        assert!(json["company"].is_null());
    }

    #[test]
    fn test_contact_form_validation() {
        assert!(NewContactMessage::from_form("", "a@x.com", "", "Hi").is_err());
        assert!(NewContactMessage::from_form("Ada", "not-an-email", "", "Hi").is_err());
        assert!(NewContactMessage::from_form("Ada", "a@x.com", "", "   ").is_err());
    }

    #[test]
    fn test_subscriber_form() {
        assert_eq!(
            NewSubscriber::from_form(" a@x.com ").unwrap().email,
            "a@x.com"
        );
        assert!(NewSubscriber::from_form("@x.com").is_err());
        assert!(NewSubscriber::from_form("").is_err());
    }
}
