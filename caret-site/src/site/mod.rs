//! Public marketing site.
//!
//! Pages are rendered server-side from a [`brand::Brand`] and the visitor's
//! [`theme::Theme`]. Animated landing page elements get their initial frame
//! from [`timeline::Scheduler`].

pub mod brand;
pub mod pages;
pub mod sections;
pub mod templates;
pub mod theme;
pub mod timeline;

pub use pages::{SiteState, site_router};
