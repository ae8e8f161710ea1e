//! Admin route handlers.
//!
//! Provides HTTP handlers for the admin UI: login, logout, dashboard,
//! message/subscriber mutations and the CSV download.

use crate::admin::csv::CSV_FILENAME;
use crate::admin::middleware::{AdminState, SESSION_COOKIE};
use crate::admin::panel::GateState;
use crate::admin::session::SharedPanel;
use crate::admin::templates::{BaseContext, DashboardTemplate, LoginTemplate, Tab};
use crate::render;
use crate::site::theme::Theme;
use axum::{
    Form, Router,
    body::Body,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};

/// Build the admin router.
pub fn admin_router(state: Arc<AdminState>) -> Router {
    Router::new()
        .route("/login", get(login_page))
        .route("/login", post(login_submit))
        .route("/logout", post(logout))
        .route("/dashboard", get(dashboard))
        .route("/messages/{id}/read", post(message_read))
        .route("/messages/{id}/delete", post(message_delete))
        .route("/subscribers/{id}/delete", post(subscriber_delete))
        .route("/subscribers.csv", get(subscribers_csv))
        .with_state(state)
}

fn base_context(state: &AdminState, jar: &CookieJar) -> BaseContext {
    BaseContext {
        site_name: state.site_name.clone(),
        theme: Theme::resolve(jar, state.default_theme),
    }
}

/// Panel behind the session cookie, if any.
async fn session_panel(state: &AdminState, jar: &CookieJar) -> Option<(String, SharedPanel)> {
    let session_id = jar.get(SESSION_COOKIE)?.value().to_string();
    let panel = state.sessions.get(&session_id).await?;
    Some((session_id, panel))
}

/// Check session and return the panel if its operator is signed in.
///
/// Runs the session gate (with token refresh) but not the list queries.
async fn check_auth(state: &AdminState, jar: &CookieJar) -> Option<SharedPanel> {
    let (session_id, panel) = session_panel(state, jar).await?;
    let gate = panel.lock().await.check_session().await;
    if gate == GateState::LoggedIn {
        Some(panel)
    } else {
        state.sessions.remove(&session_id).await;
        None
    }
}

fn render_login(base: BaseContext, email: String, error: Option<String>) -> Response {
    render::html(&LoginTemplate { base, email, error })
}

fn clear_cookie_redirect(location: &str) -> Response {
    let cookie = format!("{SESSION_COOKIE}=; Path=/admin; HttpOnly; SameSite=Strict; Max-Age=0");

    Response::builder()
        .status(StatusCode::SEE_OTHER)
        .header(header::LOCATION, location)
        .header(header::SET_COOKIE, cookie)
        .body(Body::empty())
        .unwrap_or_else(|_| Redirect::to(location).into_response())
}

/// Login page handler.
async fn login_page(State(state): State<Arc<AdminState>>, jar: CookieJar) -> Response {
    // If already logged in, redirect to dashboard
    if check_auth(&state, &jar).await.is_some() {
        return Redirect::to("/admin/dashboard").into_response();
    }

    render_login(base_context(&state, &jar), String::new(), None)
}

/// Login form data.
#[derive(Deserialize)]
pub struct LoginForm {
    email: String,
    password: String,
}

/// Login form submission handler.
async fn login_submit(
    State(state): State<Arc<AdminState>>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    let mut panel = state.sessions.new_panel();

    // The dashboard render after the redirect loads the lists
    if !panel.sign_in(form.email.trim(), &form.password).await {
        let error = panel
            .login_error()
            .unwrap_or("Invalid login credentials")
            .to_string();
        return render_login(base_context(&state, &jar), form.email, Some(error));
    }

    // A fresh id on every sign-in; drop whatever session the browser had
    if let Some(old) = jar.get(SESSION_COOKIE) {
        state.sessions.remove(old.value()).await;
    }
    let session_id = state.sessions.insert(panel).await;

    // Set session cookie
    let cookie = format!("{SESSION_COOKIE}={session_id}; Path=/admin; HttpOnly; SameSite=Strict");

    Response::builder()
        .status(StatusCode::SEE_OTHER)
        .header(header::LOCATION, "/admin/dashboard")
        .header(header::SET_COOKIE, cookie)
        .body(Body::empty())
        .unwrap_or_else(|_| Redirect::to("/admin/dashboard").into_response())
}

/// Logout handler.
async fn logout(State(state): State<Arc<AdminState>>, jar: CookieJar) -> Response {
    if let Some((session_id, panel)) = session_panel(&state, &jar).await {
        panel.lock().await.logout().await;
        state.sessions.remove(&session_id).await;
        info!("Admin signed out");
    }

    clear_cookie_redirect("/admin/login")
}

#[derive(Deserialize)]
pub struct DashboardQuery {
    tab: Option<String>,
}

/// Dashboard handler: session gate, then both list queries, then render.
async fn dashboard(
    State(state): State<Arc<AdminState>>,
    jar: CookieJar,
    Query(query): Query<DashboardQuery>,
) -> Response {
    let Some((session_id, panel)) = session_panel(&state, &jar).await else {
        return Redirect::to("/admin/login").into_response();
    };

    let mut panel = panel.lock().await;
    if panel.mount().await != GateState::LoggedIn {
        drop(panel);
        state.sessions.remove(&session_id).await;
        return clear_cookie_redirect("/admin/login");
    }

    let template = DashboardTemplate {
        base: base_context(&state, &jar),
        operator: panel.operator_email().unwrap_or("admin").to_string(),
        tab: Tab::parse(query.tab.as_deref()),
        notices: panel.take_notices(),
        unread_count: panel.unread_count(),
        messages: panel.messages().to_vec(),
        subscribers: panel.subscribers().to_vec(),
    };

    render::html(&template)
}

fn back_to(tab: Tab) -> Response {
    Redirect::to(&format!("/admin/dashboard?tab={}", tab.as_str())).into_response()
}

/// Mark a message as read.
async fn message_read(
    State(state): State<Arc<AdminState>>,
    jar: CookieJar,
    Path(id): Path<String>,
) -> Response {
    let Some(panel) = check_auth(&state, &jar).await else {
        return Redirect::to("/admin/login").into_response();
    };

    if let Err(e) = panel.lock().await.mark_as_read(&id).await {
        error!("Failed to mark message {} as read: {}", id, e);
    }

    back_to(Tab::Messages)
}

/// Delete a message.
async fn message_delete(
    State(state): State<Arc<AdminState>>,
    jar: CookieJar,
    Path(id): Path<String>,
) -> Response {
    let Some(panel) = check_auth(&state, &jar).await else {
        return Redirect::to("/admin/login").into_response();
    };

    if let Err(e) = panel.lock().await.delete_message(&id).await {
        error!("Failed to delete message {}: {}", id, e);
    }

    back_to(Tab::Messages)
}

/// Delete a subscriber.
async fn subscriber_delete(
    State(state): State<Arc<AdminState>>,
    jar: CookieJar,
    Path(id): Path<String>,
) -> Response {
    let Some(panel) = check_auth(&state, &jar).await else {
        return Redirect::to("/admin/login").into_response();
    };

    if let Err(e) = panel.lock().await.delete_subscriber(&id).await {
        error!("Failed to delete subscriber {}: {}", id, e);
    }

    back_to(Tab::Subscribers)
}

/// Download the subscribers currently held by the panel as CSV.
async fn subscribers_csv(State(state): State<Arc<AdminState>>, jar: CookieJar) -> Response {
    let Some(panel) = check_auth(&state, &jar).await else {
        return Redirect::to("/admin/login").into_response();
    };

    let csv = panel.lock().await.export_csv();

    (
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{CSV_FILENAME}\""),
            ),
        ],
        csv,
    )
        .into_response()
}
