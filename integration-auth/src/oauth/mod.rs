//! OAuth 2.0 authorization-code infrastructure.

mod provider;

pub mod providers;
pub mod token;

pub use provider::{AccessibleResource, AuthorizationRequest, Provider, UserInfo};
