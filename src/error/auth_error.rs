use thiserror::Error;

/// Tipos de erro específicos para autenticação (API key e OAuth2)
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not authenticated: {0}")]
    NotAuthenticated(String),

    /// Token endpoint recusou (ou foi inalcançável) durante a troca do
    /// authorization code. `body` preserva a resposta upstream sem alteração.
    #[error("Authorization code exchange failed: {body}")]
    Exchange { status: Option<u16>, body: String },

    /// Token endpoint recusou (ou foi inalcançável) durante o refresh.
    /// O TokenState anterior permanece intacto quando este erro é emitido.
    #[error("Token refresh failed: {body}")]
    Refresh { status: Option<u16>, body: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Environment error: {0}")]
    Env(String),

    #[error("Callback server error: {0}")]
    Callback(String),

    #[error("Authorization denied: {0}")]
    AccessDenied(String),

    #[error("OAuth2 state mismatch")]
    InvalidState,

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Timed out waiting for authorization")]
    Timeout,
}

impl AuthError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn not_authenticated(msg: impl Into<String>) -> Self {
        Self::NotAuthenticated(msg.into())
    }

    pub fn env(msg: impl Into<String>) -> Self {
        Self::Env(msg.into())
    }

    pub fn callback(msg: impl Into<String>) -> Self {
        Self::Callback(msg.into())
    }

    pub fn browser(msg: impl Into<String>) -> Self {
        Self::Browser(msg.into())
    }
}

/// Tipo de resultado padrão para operações de autenticação
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let config = AuthError::config("LINEAR_CLIENT_ID is empty");
        assert_eq!(
            config.to_string(),
            "Configuration error: LINEAR_CLIENT_ID is empty"
        );

        let not_auth = AuthError::not_authenticated("no token available");
        assert_eq!(not_auth.to_string(), "Not authenticated: no token available");

        let state = AuthError::InvalidState;
        assert_eq!(state.to_string(), "OAuth2 state mismatch");

        let timeout = AuthError::Timeout;
        assert_eq!(timeout.to_string(), "Timed out waiting for authorization");
    }

    #[test]
    fn test_exchange_error_preserves_upstream_body() {
        let error = AuthError::Exchange {
            status: Some(400),
            body: r#"{"error":"invalid_grant"}"#.to_string(),
        };
        assert_eq!(
            error.to_string(),
            r#"Authorization code exchange failed: {"error":"invalid_grant"}"#
        );
        assert!(matches!(
            error,
            AuthError::Exchange { status: Some(400), .. }
        ));
    }

    #[test]
    fn test_refresh_error_without_status() {
        // Falha de transporte: não há status nem corpo upstream
        let error = AuthError::Refresh {
            status: None,
            body: "connection refused".to_string(),
        };
        assert_eq!(error.to_string(), "Token refresh failed: connection refused");
    }

    #[test]
    fn test_url_parse_error_from() {
        let url_error = url::Url::parse("not-a-valid-url").unwrap_err();
        let auth_error = AuthError::from(url_error);
        assert!(auth_error.to_string().contains("URL parse error"));
    }

    #[test]
    fn test_io_error_from() {
        use std::io::{Error, ErrorKind};
        let io_error = Error::new(ErrorKind::NotFound, "file not found");
        let auth_error = AuthError::from(io_error);
        assert!(auth_error.to_string().contains("IO error"));
    }

    #[test]
    fn test_auth_result_type() {
        fn returns_auth_result() -> AuthResult<String> {
            Ok("ok".to_string())
        }

        fn returns_auth_error() -> AuthResult<String> {
            Err(AuthError::Timeout)
        }

        assert!(returns_auth_result().is_ok());
        assert!(matches!(returns_auth_error().unwrap_err(), AuthError::Timeout));
    }
}
