//! Askama templates for the admin UI.

use askama::Template;

use crate::admin::panel::Notice;
use crate::models::{ContactMessage, NewsletterSubscriber};
use crate::site::theme::Theme;

/// Base data available to all templates
pub struct BaseContext {
    pub site_name: String,
    pub theme: Theme,
}

/// Login page template
#[derive(Template)]
#[template(path = "admin/login.html")]
pub struct LoginTemplate {
    pub base: BaseContext,
    pub email: String,
    pub error: Option<String>,
}

/// Which list the dashboard shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Messages,
    Subscribers,
}

impl Tab {
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("subscribers") => Tab::Subscribers,
            _ => Tab::Messages,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tab::Messages => "messages",
            Tab::Subscribers => "subscribers",
        }
    }
}

/// Dashboard page template
#[derive(Template)]
#[template(path = "admin/dashboard.html")]
pub struct DashboardTemplate {
    pub base: BaseContext,
    pub operator: String,
    pub tab: Tab,
    pub notices: Vec<Notice>,
    pub unread_count: usize,
    pub messages: Vec<ContactMessage>,
    pub subscribers: Vec<NewsletterSubscriber>,
}

impl DashboardTemplate {
    pub fn is_messages(&self) -> bool {
        self.tab == Tab::Messages
    }
}
