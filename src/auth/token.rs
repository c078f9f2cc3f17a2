use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Margem de renovação antecipada: o token é tratado como expirado
/// este número de segundos antes do instante real de expiração.
pub const REFRESH_MARGIN_SECS: i64 = 300;

/// Estado corrente de autenticação: access token, refresh token opcional
/// e instante absoluto de expiração.
///
/// `expires_at = None` representa um token que nunca expira (API keys e
/// respostas sem `expires_in`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenState {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenState {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at,
        }
    }

    /// Estado para uma credencial estática: sem refresh e sem expiração
    pub fn permanent(access_token: impl Into<String>) -> Self {
        Self::new(access_token, None, None)
    }

    /// Verifica se o token está expirado, com a margem de renovação
    /// antecipada de 5 minutos já aplicada
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => {
                Utc::now() >= expires_at - Duration::seconds(REFRESH_MARGIN_SECS)
            }
            None => false,
        }
    }

    /// Tempo restante em segundos até a expiração real (sem margem)
    pub fn time_to_expiry(&self) -> Option<i64> {
        self.expires_at
            .map(|expires_at| (expires_at - Utc::now()).num_seconds().max(0))
    }

    /// Constrói o novo estado a partir da resposta do token endpoint.
    ///
    /// Quando a resposta não traz `refresh_token`, o anterior é mantido;
    /// quando traz, o novo substitui o antigo (rotação). Um `expires_in`
    /// além do intervalo representável vira ausência de expiração em vez
    /// de derrubar a troca.
    pub fn from_response(response: TokenResponse, previous_refresh: Option<String>) -> Self {
        let expires_at = response
            .expires_in
            .and_then(|secs| i64::try_from(secs).ok())
            .and_then(Duration::try_seconds)
            .and_then(|ttl| Utc::now().checked_add_signed(ttl));
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token.or(previous_refresh),
            expires_at,
        }
    }
}

/// Resposta JSON do token endpoint (exchange e refresh usam o mesmo formato)
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permanent_token_never_expires() {
        let state = TokenState::permanent("lin_api_abc");
        assert_eq!(state.access_token, "lin_api_abc");
        assert!(state.refresh_token.is_none());
        assert!(state.expires_at.is_none());
        assert!(!state.is_expired());
        assert!(state.time_to_expiry().is_none());
    }

    #[test]
    fn test_expired_one_second_ago() {
        let state = TokenState::new(
            "a1",
            Some("r1".to_string()),
            Some(Utc::now() - Duration::seconds(1)),
        );
        assert!(state.is_expired());
        assert_eq!(state.time_to_expiry(), Some(0));
    }

    #[test]
    fn test_not_expired_one_hour_ahead() {
        let state = TokenState::new(
            "a1",
            Some("r1".to_string()),
            Some(Utc::now() + Duration::hours(1)),
        );
        assert!(!state.is_expired());
        let left = state.time_to_expiry().unwrap();
        assert!(left > 3500 && left <= 3600);
    }

    #[test]
    fn test_margin_counts_as_expired() {
        // Dentro da margem de 300s: expira em 200s, logo já deve renovar
        let state = TokenState::new(
            "a1",
            Some("r1".to_string()),
            Some(Utc::now() + Duration::seconds(200)),
        );
        assert!(state.is_expired());
    }

    #[test]
    fn test_from_response_computes_absolute_expiry() {
        let response = TokenResponse {
            access_token: "a1".to_string(),
            refresh_token: Some("r1".to_string()),
            expires_in: Some(3600),
            token_type: Some("Bearer".to_string()),
            scope: Some("read,write".to_string()),
        };
        let state = TokenState::from_response(response, None);
        assert_eq!(state.access_token, "a1");
        assert_eq!(state.refresh_token.as_deref(), Some("r1"));
        let left = state.time_to_expiry().unwrap();
        assert!(left > 3500 && left <= 3600);
    }

    #[test]
    fn test_from_response_rotates_refresh_token() {
        let response = TokenResponse {
            access_token: "a2".to_string(),
            refresh_token: Some("r2".to_string()),
            expires_in: Some(3600),
            token_type: None,
            scope: None,
        };
        let state = TokenState::from_response(response, Some("r1".to_string()));
        assert_eq!(state.refresh_token.as_deref(), Some("r2"));
    }

    #[test]
    fn test_from_response_keeps_previous_refresh_when_absent() {
        let response = TokenResponse {
            access_token: "a2".to_string(),
            refresh_token: None,
            expires_in: Some(3600),
            token_type: None,
            scope: None,
        };
        let state = TokenState::from_response(response, Some("r1".to_string()));
        assert_eq!(state.refresh_token.as_deref(), Some("r1"));
    }

    #[test]
    fn test_from_response_without_expires_in_never_expires() {
        let response = TokenResponse {
            access_token: "a1".to_string(),
            refresh_token: None,
            expires_in: None,
            token_type: None,
            scope: None,
        };
        let state = TokenState::from_response(response, None);
        assert!(state.expires_at.is_none());
        assert!(!state.is_expired());
    }

    #[test]
    fn test_from_response_huge_expires_in_means_no_expiry() {
        // Estoura o que Duration representa
        let response = TokenResponse {
            access_token: "a1".to_string(),
            refresh_token: Some("r1".to_string()),
            expires_in: Some(10_000_000_000_000_000),
            token_type: None,
            scope: None,
        };
        let state = TokenState::from_response(response, None);
        assert_eq!(state.access_token, "a1");
        assert_eq!(state.refresh_token.as_deref(), Some("r1"));
        assert!(state.expires_at.is_none());
        assert!(!state.is_expired());
    }

    #[test]
    fn test_from_response_expiry_beyond_datetime_range_means_no_expiry() {
        // Cabe em Duration, mas a soma passa do intervalo do DateTime
        let response = TokenResponse {
            access_token: "a1".to_string(),
            refresh_token: None,
            expires_in: Some(9_000_000_000_000),
            token_type: None,
            scope: None,
        };
        let state = TokenState::from_response(response, None);
        assert!(state.expires_at.is_none());
        assert!(!state.is_expired());
    }

    #[test]
    fn test_from_response_expires_in_above_i64_means_no_expiry() {
        let response = TokenResponse {
            access_token: "a1".to_string(),
            refresh_token: None,
            expires_in: Some(u64::MAX),
            token_type: None,
            scope: None,
        };
        let state = TokenState::from_response(response, None);
        assert!(state.expires_at.is_none());
    }
}
