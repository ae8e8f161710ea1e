//! Admin state and constants.

use crate::admin::session::SessionStore;
use crate::site::theme::Theme;

/// Cookie name for the session ID
pub const SESSION_COOKIE: &str = "caret_admin_session";

/// State shared by admin routes
pub struct AdminState {
    /// Browser sessions and their panels
    pub sessions: SessionStore,
    /// Theme for operators without a theme cookie
    pub default_theme: Theme,
    /// Brand name shown in the panel header
    pub site_name: String,
}
