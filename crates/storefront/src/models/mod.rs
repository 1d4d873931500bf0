//! Types stored in the server-side session.

pub mod session;

pub use session::{OAuthData, keys as session_keys};
