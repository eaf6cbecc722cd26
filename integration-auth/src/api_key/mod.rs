//! Request authentication for providers that use static credentials.
//!
//! Trello takes a key/token pair as query parameters, Jira Cloud takes HTTP Basic
//! (account email + API token) or an OAuth bearer token.

mod auth;
mod bearer;

pub use auth::{BasicAuth, ProviderAuth, QueryKeyAuth};
pub use bearer::BearerTokenAuth;
