//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (add unique ID to each request)
//! 4. Session layer (tower-sessions, in-memory store, login state only)
//! 5. Wix session gate (visitor/member credential per request)
//! 6. Rate limiting on `/api` (governor)

pub mod rate_limit;
pub mod request_id;
pub mod session;
pub mod visitor_session;

pub use rate_limit::api_rate_limiter;
pub use request_id::{RequestId, request_id_middleware};
pub use session::create_session_layer;
pub use visitor_session::{
    OptionalPlatformSession, PlatformSession, SessionOutcome, WIX_SESSION_COOKIE,
    removal_cookie, session_cookie, visitor_session_middleware,
};
