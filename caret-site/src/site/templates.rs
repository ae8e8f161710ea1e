//! Askama templates for the public pages.

use askama::Template;

use crate::site::brand::Brand;
use crate::site::theme::Theme;

/// Data every public page needs
pub struct PageContext<'a> {
    pub brand: &'a Brand,
    pub theme: Theme,
    /// Path of the page, for canonical links
    pub path: &'static str,
}

impl PageContext<'_> {
    pub fn canonical_url(&self) -> String {
        self.brand.url_for(self.path)
    }
}

/// One-shot feedback after a form post
pub struct Toast {
    pub message: String,
    pub is_error: bool,
}

impl Toast {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            is_error: false,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            is_error: true,
        }
    }
}

#[derive(Template)]
#[template(path = "site/landing.html")]
pub struct LandingTemplate<'a> {
    pub page: PageContext<'a>,
    pub hero_words: Vec<String>,
    pub toast: Option<Toast>,
    /// Initial-frame rules, only active under `html.js`
    pub initial_css: &'a str,
    /// Section timelines, already escaped for a `<script>` element
    pub timelines_json: &'a str,
}

#[derive(Template)]
#[template(path = "site/privacy.html")]
pub struct PrivacyTemplate<'a> {
    pub page: PageContext<'a>,
}

#[derive(Template)]
#[template(path = "site/terms.html")]
pub struct TermsTemplate<'a> {
    pub page: PageContext<'a>,
}

#[derive(Template)]
#[template(path = "site/not_found.html")]
pub struct NotFoundTemplate<'a> {
    pub page: PageContext<'a>,
}
