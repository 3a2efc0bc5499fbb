// ============================
// sessiongate-backend/src/auth/mod.rs
// ============================
//! Authentication module.

pub mod password;
pub mod provider;
pub mod session;
pub mod token;
pub mod token_generator;
mod service;

pub use provider::{IdentityProvider, ProviderError, ProviderSession, ProviderUser};
pub use service::{AuthOutcome, SessionManager};
pub use session::{ClientInfo, Session};
pub use token::{Claims, DecodeError, TokenIssuer};
