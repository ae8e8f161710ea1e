//! Public route handlers: pages, contact form, newsletter signup, theme toggle.

use axum::{
    Form, Router,
    body::Body,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::backend::Backend;
use crate::models::{NewContactMessage, NewSubscriber};
use crate::render;
use crate::site::brand::Brand;
use crate::site::sections::{hero_words, landing_timelines};
use crate::site::templates::{
    LandingTemplate, NotFoundTemplate, PageContext, PrivacyTemplate, TermsTemplate, Toast,
};
use crate::site::theme::Theme;
use crate::site::timeline::Scheduler;

pub const CONTACT_SENT: &str = "Thanks for reaching out! We'll get back to you soon.";
pub const SUBSCRIBED: &str = "You're in! We'll keep you posted on the good stuff.";
pub const ALREADY_SUBSCRIBED: &str = "You're already subscribed!";
pub const GENERIC_ERROR: &str = "Something went wrong. Please try again.";

/// Browser side of the section timelines
const TIMELINE_JS: &str = include_str!("../../assets/timeline.js");

/// Class the page sets on `<html>` once script runs
const SCRIPT_SCOPE: &str = "html.js";

/// State shared by the public routes
pub struct SiteState {
    pub backend: Arc<dyn Backend>,
    pub brand: Brand,
    pub default_theme: Theme,
    initial_css: String,
    timelines_json: String,
}

impl SiteState {
    pub fn new(backend: Arc<dyn Backend>, brand: Brand, default_theme: Theme) -> Self {
        let timelines = landing_timelines(&brand);
        let initial_css = Scheduler::initial_stylesheet(&timelines, SCRIPT_SCOPE);
        let timelines_json = serde_json::to_string(&timelines)
            .map(|json| script_safe(&json))
            .unwrap_or_else(|e| {
                error!("Failed to serialize timelines: {}", e);
                "[]".to_string()
            });

        Self {
            backend,
            brand,
            default_theme,
            initial_css,
            timelines_json,
        }
    }

    fn page(&self, jar: &CookieJar, path: &'static str) -> PageContext<'_> {
        PageContext {
            brand: &self.brand,
            theme: Theme::resolve(jar, self.default_theme),
            path,
        }
    }
}

/// Keep JSON from closing the surrounding `<script>` element.
fn script_safe(json: &str) -> String {
    json.replace("</", "<\\/")
}

/// Build the public site router.
pub fn site_router(state: Arc<SiteState>) -> Router {
    Router::new()
        .route("/", get(landing))
        .route("/privacy", get(privacy))
        .route("/terms", get(terms))
        .route("/contact", post(contact_submit))
        .route("/subscribe", post(subscribe_submit))
        .route("/theme", post(toggle_theme))
        .route("/health", get(health))
        .route("/assets/timeline.js", get(timeline_js))
        .fallback(not_found)
        .with_state(state)
}

fn render_landing(state: &SiteState, jar: &CookieJar, toast: Option<Toast>) -> Response {
    let template = LandingTemplate {
        page: state.page(jar, "/"),
        hero_words: hero_words(&state.brand),
        toast,
        initial_css: &state.initial_css,
        timelines_json: &state.timelines_json,
    };
    render::html(&template)
}

async fn landing(State(state): State<Arc<SiteState>>, jar: CookieJar) -> Response {
    render_landing(&state, &jar, None)
}

async fn privacy(State(state): State<Arc<SiteState>>, jar: CookieJar) -> Response {
    let template = PrivacyTemplate {
        page: state.page(&jar, "/privacy"),
    };
    render::html(&template)
}

async fn terms(State(state): State<Arc<SiteState>>, jar: CookieJar) -> Response {
    let template = TermsTemplate {
        page: state.page(&jar, "/terms"),
    };
    render::html(&template)
}

async fn not_found(State(state): State<Arc<SiteState>>, jar: CookieJar) -> Response {
    let template = NotFoundTemplate {
        page: state.page(&jar, "/404"),
    };
    render::html_with_status(StatusCode::NOT_FOUND, &template)
}

async fn health() -> &'static str {
    "OK"
}

async fn timeline_js() -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/javascript; charset=utf-8"),
            (header::CACHE_CONTROL, "public, max-age=3600"),
        ],
        TIMELINE_JS,
    )
        .into_response()
}

/// Contact form data.
#[derive(Deserialize)]
pub struct ContactForm {
    name: String,
    email: String,
    #[serde(default)]
    company: String,
    message: String,
}

async fn contact_submit(
    State(state): State<Arc<SiteState>>,
    jar: CookieJar,
    Form(form): Form<ContactForm>,
) -> Response {
    let message =
        match NewContactMessage::from_form(&form.name, &form.email, &form.company, &form.message) {
            Ok(message) => message,
            Err(reason) => return render_landing(&state, &jar, Some(Toast::error(reason))),
        };

    let toast = match state.backend.insert_message(&message).await {
        Ok(()) => {
            info!("Contact message received from {}", message.email);
            Toast::success(CONTACT_SENT)
        }
        Err(e) => {
            error!("Failed to store contact message: {}", e);
            Toast::error(GENERIC_ERROR)
        }
    };

    render_landing(&state, &jar, Some(toast))
}

/// Newsletter form data.
#[derive(Deserialize)]
pub struct SubscribeForm {
    email: String,
}

async fn subscribe_submit(
    State(state): State<Arc<SiteState>>,
    jar: CookieJar,
    Form(form): Form<SubscribeForm>,
) -> Response {
    let subscriber = match NewSubscriber::from_form(&form.email) {
        Ok(subscriber) => subscriber,
        Err(reason) => return render_landing(&state, &jar, Some(Toast::error(reason))),
    };

    let toast = match state.backend.insert_subscriber(&subscriber).await {
        Ok(()) => {
            info!("New newsletter subscriber");
            Toast::success(SUBSCRIBED)
        }
        Err(e) if e.is_unique_violation() => {
            debug!("Duplicate newsletter signup");
            Toast::success(ALREADY_SUBSCRIBED)
        }
        Err(e) => {
            error!("Failed to store newsletter subscriber: {}", e);
            Toast::error(GENERIC_ERROR)
        }
    };

    render_landing(&state, &jar, Some(toast))
}

/// Flip the visitor's theme and return to the page they came from.
async fn toggle_theme(
    State(state): State<Arc<SiteState>>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Response {
    let theme = Theme::resolve(&jar, state.default_theme).toggled();
    let location = referer_path(&headers);

    Response::builder()
        .status(StatusCode::SEE_OTHER)
        .header(header::LOCATION, location.as_str())
        .header(header::SET_COOKIE, theme.cookie())
        .body(Body::empty())
        .unwrap_or_else(|_| Redirect::to("/").into_response())
}

/// Local path of the `Referer` header, `/` when absent or unusable.
///
/// Only the path (and query) is kept so the redirect never leaves the site.
fn referer_path(headers: &HeaderMap) -> String {
    let Some(referer) = headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
    else {
        return "/".to_string();
    };

    let path = match referer.split_once("://") {
        Some((_, rest)) => rest.find('/').map(|i| &rest[i..]).unwrap_or("/"),
        None => referer,
    };

    if path.starts_with('/') && !path.starts_with("//") {
        path.to_string()
    } else {
        "/".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn with_referer(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::REFERER, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_referer_path() {
        assert_eq!(referer_path(&HeaderMap::new()), "/");
        assert_eq!(
            referer_path(&with_referer("https://caretdesign.co/privacy")),
            "/privacy"
        );
        assert_eq!(referer_path(&with_referer("http://localhost:8080")), "/");
        assert_eq!(referer_path(&with_referer("/terms?x=1")), "/terms?x=1");
        assert_eq!(referer_path(&with_referer("//evil.example/")), "/");
    }

    #[test]
    fn test_script_safe() {
        assert_eq!(script_safe(r#"{"a":"</script>"}"#), r#"{"a":"<\/script>"}"#);
    }
}
