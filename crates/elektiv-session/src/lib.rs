//! Session management for the elektiv client.
//!
//! This crate owns the access/refresh token lifecycle:
//! - Login, logout, and startup validation against the auth endpoints
//! - Proactive token renewal scheduled from the access token's expiry claim
//! - A single-flight refresh that collapses concurrent triggers into one
//!   network call and broadcasts the outcome to every waiter
//! - Explicit FSM-based session state tracking

mod claims;
mod error;
mod fsm;
mod session;

#[cfg(test)]
mod tests;

pub use claims::{decode_claims, expiry, ClaimsError, TokenClaims};
pub use error::{AuthError, AuthResult};
pub use fsm::{SessionInput, SessionMachine, SessionMachineState, SessionState};
pub use session::{SessionEvent, SessionEventCallback, SessionManager, UserProfile};

pub use elektiv_storage::UserType;
