pub use entity::{integration_credentials, Id};

pub mod error;
pub mod integration_credential;
