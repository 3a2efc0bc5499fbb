// ==============
// crates/backend-lib/src/metrics.rs

//! Central place for metric keys
pub const SESSION_CREATED: &str = "session.created";
pub const SESSION_REFRESHED: &str = "session.refreshed";
pub const SESSION_DESTROYED: &str = "session.destroyed";
pub const SESSION_TOUCH_FAILED: &str = "session.touch_failed";
pub const AUTH_REJECTED: &str = "auth.rejected";
pub const CSRF_REJECTED: &str = "csrf.rejected";
pub const WS_CONNECTION: &str = "ws.connection";
pub const WS_REJECTED: &str = "ws.rejected";
pub const WS_ACTIVE: &str = "ws.active";
