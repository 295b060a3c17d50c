//! Request extractors shared by authenticated handlers.
//!
//! - [`auth::AuthUser`] -- the user behind a JWT Bearer token.

pub mod auth;
