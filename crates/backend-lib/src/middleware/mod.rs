// crates/backend-lib/src/middleware/mod.rs

//! Request guards and cookie helpers for the `sessiongate` HTTP surface.

pub mod cookies;
pub mod csrf;
pub mod guard;

pub use csrf::{check_csrf, require_csrf};
pub use guard::{require_refresh_session, require_session, AuthUser, RefreshSession};
