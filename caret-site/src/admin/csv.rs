//! Subscriber CSV export.

use crate::models::NewsletterSubscriber;

/// Download name for the export
pub const CSV_FILENAME: &str = "subscribers.csv";

const HEADER: &str = "email,subscribed_at";

/// Render subscribers as `email,subscribed_at` lines joined by `\n`.
///
/// Values are written verbatim (no quoting) and there is no trailing newline.
pub fn subscribers_csv(subscribers: &[NewsletterSubscriber]) -> String {
    let rows: Vec<String> = subscribers
        .iter()
        .map(|s| format!("{},{}", s.email, s.created_at))
        .collect();

    format!("{HEADER}\n{}", rows.join("\n"))
}
