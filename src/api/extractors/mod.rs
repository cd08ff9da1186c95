//! Request extractors.

pub mod auth;
pub mod body;

pub use auth::AuthContext;
pub use body::JsonBody;
