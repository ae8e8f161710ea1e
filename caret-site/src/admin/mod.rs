//! Web administration UI module.
//!
//! Provides:
//! - Session gate backed by the hosted auth provider
//! - Per-browser admin panels (fetched lists and their reconciliation)
//! - Admin routes for the dashboard, mutations and CSV export

pub mod csv;
pub mod middleware;
pub mod panel;
pub mod routes;
pub mod session;
pub mod templates;

pub use middleware::AdminState;
pub use panel::{AdminPanel, GateState, Notice};
pub use routes::admin_router;
pub use session::SessionStore;
