//! HTTP server: route assembly and the listener loop.

use anyhow::{Context, Result};
use axum::{Router, response::Redirect, routing::get};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::admin::{AdminState, admin_router};
use crate::site::{SiteState, site_router};

/// Configuration for the HTTP server
pub struct ServerConfig {
    /// Address to listen on
    pub listen_addr: SocketAddr,
}

/// Build the full router: public site plus the admin UI under `/admin`.
pub fn http_router(site_state: Arc<SiteState>, admin_state: Arc<AdminState>) -> Router {
    // Handle both /admin and /admin/ by redirecting to dashboard
    let admin = Router::new()
        .route("/admin", get(|| async { Redirect::to("/admin/dashboard") }))
        .route("/admin/", get(|| async { Redirect::to("/admin/dashboard") }))
        .nest("/admin", admin_router(admin_state));

    admin.merge(site_router(site_state))
}

/// Sweep expired admin sessions every minute.
pub fn spawn_session_cleanup(admin_state: Arc<AdminState>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(60));

        loop {
            ticker.tick().await;
            let removed = admin_state.sessions.cleanup_expired().await;
            if removed > 0 {
                info!("Removed {} expired admin sessions", removed);
            }
            debug!(
                "Admin sessions active: {}",
                admin_state.sessions.count().await
            );
        }
    });
}

/// Bind the listener and serve until the process is stopped.
pub async fn run_server(config: ServerConfig, router: Router) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;

    info!("HTTP server listening on {}", config.listen_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown requested");
    }
}
