//! Keys stored in the `tower_sessions` session.

pub const CSRF_STATE: &str = "csrf_state";
pub const PKCE_VERIFIER: &str = "pkce_verifier";
pub const RETURN_URL: &str = "return_url";
pub const USER_EMAIL: &str = "user_email";
