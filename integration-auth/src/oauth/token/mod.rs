//! OAuth token types.

mod tokens;

pub use tokens::{is_expiring, RefreshResult, Tokens, EXPIRY_MARGIN_SECS};
