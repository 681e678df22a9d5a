//! Uploads may be restricted to holders of a static shared token.
//!
//! The token is sent in the `X-Upload-Token` request header. If no tokens are
//! configured, anyone may upload. Retrieval is never restricted.
use log::debug;

use crate::error::{
    RelayError,
    Result,
};

/// Request header carrying the upload token.
pub const TOKEN_HEADER: &str = "X-Upload-Token";

/// Verify the token presented by a client against the configured set.
///
/// # Arguments
///
/// * `tokens` - Configured tokens. Empty disables the check.
/// * `token` - Token presented by the client, if any.
pub fn auth_check(tokens: &[String], token: Option<&str>) -> Result<()> {
    if tokens.is_empty() {
        return Ok(());
    }
    match token {
        Some(v) if tokens.iter().any(|t| t == v) => {
            Ok(())
        },
        Some(_) => {
            debug!("unknown upload token");
            Err(RelayError::Forbidden)
        },
        None => {
            debug!("missing upload token");
            Err(RelayError::Forbidden)
        },
    }
}
