//! clonesite-axum: Axum adapter for clonesite.
//!
//! Builds the public router (content sections, pages, navigation, sitemap,
//! robots) on top of a [`clonesite_core::SiteApp`].

pub mod app;
pub mod params;
pub mod routes;
pub mod state;
mod error;
pub use error::SiteAxumError;
pub use state::SiteState;

pub use app::{axum, AxumApp};
