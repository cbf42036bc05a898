//! Authenticated HTTP gateway for the elektiv backend.
//!
//! Every request goes through one dispatch path that attaches the bearer
//! token, and on a 401 refreshes the session and replays the request exactly
//! once. Refresh and login requests never pass through here, so they can
//! never recurse into another refresh.

mod client;
mod error;
mod types;

#[cfg(test)]
mod tests;

pub use client::ApiGateway;
pub use error::{GatewayError, GatewayResult};
pub use types::{
    NewReview, PreferenceKind, Preferences, Review, StudentData, StudentForm, Subject, SubjectInfo,
};
