//! Authorization header providers.

use std::collections::BTreeMap;

use crate::error::{Result, TechreadError};

/// Header name/value pairs attached to the control channel handshake and to
/// authorized HTTPS requests.
pub type AuthHeaders = BTreeMap<String, String>;

/// Source of authorization headers.
pub trait AuthProvider: Send + Sync {
    /// Headers to attach to the next request.
    fn auth_headers(&self) -> Result<AuthHeaders>;
}

/// Static API token, sent as `Authorization: Token <token>`.
#[derive(Clone)]
pub struct TokenAuth {
    token: String,
}

impl TokenAuth {
    /// Create a provider for `token`.
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(TechreadError::Config("Auth token is empty".to_string()));
        }
        Ok(Self { token })
    }
}

impl std::fmt::Debug for TokenAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenAuth").field("token", &"***").finish()
    }
}

impl AuthProvider for TokenAuth {
    fn auth_headers(&self) -> Result<AuthHeaders> {
        let mut headers = AuthHeaders::new();
        headers.insert("Authorization".to_string(), format!("Token {}", self.token));
        Ok(headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_header() {
        let auth = TokenAuth::new("abc").unwrap();
        let headers = auth.auth_headers().unwrap();
        assert_eq!(headers.get("Authorization").map(String::as_str), Some("Token abc"));
    }

    #[test]
    fn test_empty_token_rejected() {
        assert!(matches!(TokenAuth::new("  "), Err(TechreadError::Config(_))));
    }

    #[test]
    fn test_debug_hides_token() {
        let auth = TokenAuth::new("abc").unwrap();
        assert!(!format!("{auth:?}").contains("abc"));
    }
}
