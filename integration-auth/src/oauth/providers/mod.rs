//! OAuth provider implementations.

pub mod atlassian;
