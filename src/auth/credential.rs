//! Credenciais de autenticação
//!
//! Valores imutáveis que selecionam a estratégia: API key pessoal (sem
//! expiração) ou o trio client/secret/redirect do fluxo OAuth2.

use serde::{Deserialize, Serialize};

use crate::error::{AuthError, AuthResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthConfig {
    /// Client ID registrado no Linear
    pub client_id: String,

    /// Client Secret registrado no Linear
    pub client_secret: String,

    /// URL de callback registrada na aplicação OAuth
    pub redirect_uri: String,
}

impl OAuthConfig {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
        }
    }

    /// Valida a presença dos três campos e a sintaxe da redirect URI
    pub fn validate(&self) -> AuthResult<()> {
        if self.client_id.trim().is_empty() {
            return Err(AuthError::config("client_id must not be empty"));
        }
        if self.client_secret.trim().is_empty() {
            return Err(AuthError::config("client_secret must not be empty"));
        }
        if self.redirect_uri.trim().is_empty() {
            return Err(AuthError::config("redirect_uri must not be empty"));
        }
        url::Url::parse(&self.redirect_uri).map_err(|e| {
            AuthError::config(format!(
                "invalid redirect_uri '{}': {}",
                self.redirect_uri, e
            ))
        })?;
        Ok(())
    }
}

/// Credencial aceita por `LinearAuth::initialize`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Credential {
    /// API key pessoal do Linear, usada diretamente como credencial bearer
    ApiKey { token: String },

    /// Aplicação OAuth2: exige a troca de um authorization code antes de
    /// existir qualquer token
    OAuth(OAuthConfig),
}

impl Credential {
    pub fn api_key(token: impl Into<String>) -> Self {
        Self::ApiKey {
            token: token.into(),
        }
    }

    pub fn oauth(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self::OAuth(OAuthConfig::new(client_id, client_secret, redirect_uri))
    }

    /// Valida os campos obrigatórios da variante selecionada
    pub fn validate(&self) -> AuthResult<()> {
        match self {
            Self::ApiKey { token } => {
                if token.trim().is_empty() {
                    return Err(AuthError::config("API key must not be empty"));
                }
                Ok(())
            }
            Self::OAuth(config) => config.validate(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_validates_when_present() {
        let credential = Credential::api_key("lin_api_123");
        assert!(credential.validate().is_ok());
    }

    #[test]
    fn test_empty_api_key_is_config_error() {
        let credential = Credential::api_key("   ");
        let error = credential.validate().unwrap_err();
        assert!(matches!(error, AuthError::Config(_)));
    }

    #[test]
    fn test_oauth_requires_all_three_fields() {
        let missing_secret = Credential::oauth("c", "", "http://x/cb");
        assert!(matches!(
            missing_secret.validate().unwrap_err(),
            AuthError::Config(_)
        ));

        let missing_id = Credential::oauth("", "s", "http://x/cb");
        assert!(matches!(
            missing_id.validate().unwrap_err(),
            AuthError::Config(_)
        ));

        let missing_redirect = Credential::oauth("c", "s", "");
        assert!(matches!(
            missing_redirect.validate().unwrap_err(),
            AuthError::Config(_)
        ));
    }

    #[test]
    fn test_oauth_rejects_malformed_redirect_uri() {
        let credential = Credential::oauth("c", "s", "not a url");
        let error = credential.validate().unwrap_err();
        assert!(error.to_string().contains("redirect_uri"));
    }

    #[test]
    fn test_oauth_accepts_valid_config() {
        let credential = Credential::oauth("c", "s", "http://x/cb");
        assert!(credential.validate().is_ok());
    }
}
