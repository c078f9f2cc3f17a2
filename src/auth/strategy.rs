//! Estratégia de autenticação do Linear
//!
//! `LinearAuth` cobre os dois modos de credencial (API key pessoal e
//! aplicação OAuth2) atrás de uma única superfície: inicialização,
//! verificação de expiração, renovação antecipada e emissão de clients
//! vinculados ao token corrente.
//!
//! O ciclo de vida do token é todo interno: o estado só é substituído por
//! inteiro (nunca campo a campo) e uma falha de troca ou de renovação
//! preserva o estado anterior intacto.

use tokio::sync::{Mutex, RwLock};

use crate::auth::credential::{Credential, OAuthConfig};
use crate::auth::token::{TokenResponse, TokenState};
use crate::client::LinearClient;
use crate::config::Endpoints;
use crate::error::{AuthError, AuthResult};

/// Escopo fixo solicitado no fluxo OAuth2
const OAUTH_SCOPE: &str = "read,write";

/// Variante selecionada por `initialize`
#[derive(Debug, Clone)]
enum AuthMode {
    ApiKey,
    OAuth(OAuthConfig),
}

/// Estratégia de autenticação com gerenciamento do ciclo de vida do token.
///
/// Uma instância é criada vazia, recebe uma `Credential` via `initialize`
/// e a partir daí emite `LinearClient`s vinculados ao access token
/// corrente. Instâncias são independentes entre si; não há estado global.
///
/// # Exemplo
///
/// ```no_run
/// use linear_ops::auth::{Credential, LinearAuth};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut auth = LinearAuth::new();
///     auth.initialize(Credential::api_key("lin_api_..."))?;
///     let client = auth.client().await?;
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct LinearAuth {
    mode: Option<AuthMode>,
    tokens: RwLock<Option<TokenState>>,
    /// Guarda single-flight: mantida do início da renovação até a
    /// substituição do estado, serializando refreshes concorrentes
    refresh_gate: Mutex<()>,
    http: reqwest::Client,
    endpoints: Endpoints,
}

/// Falha do token endpoint antes de virar `AuthError::Exchange`/`Refresh`
struct TokenEndpointFailure {
    status: Option<u16>,
    body: String,
}

impl LinearAuth {
    /// Cria uma estratégia vazia apontando para os endpoints de produção
    pub fn new() -> Self {
        Self::with_endpoints(Endpoints::default())
    }

    /// Cria uma estratégia vazia com endpoints customizados
    pub fn with_endpoints(endpoints: Endpoints) -> Self {
        Self {
            mode: None,
            tokens: RwLock::new(None),
            refresh_gate: Mutex::new(()),
            http: reqwest::Client::new(),
            endpoints,
        }
    }

    /// Configura a estratégia com uma credencial.
    ///
    /// Chamadas repetidas substituem a configuração anterior por completo e
    /// invalidam qualquer TokenState retido. Uma credencial inválida falha
    /// com `AuthError::Config` sem alterar nada.
    pub fn initialize(&mut self, credential: Credential) -> AuthResult<()> {
        credential.validate()?;

        match credential {
            Credential::ApiKey { token } => {
                self.mode = Some(AuthMode::ApiKey);
                *self.tokens.get_mut() = Some(TokenState::permanent(token));
            }
            Credential::OAuth(config) => {
                self.mode = Some(AuthMode::OAuth(config));
                *self.tokens.get_mut() = None;
            }
        }
        Ok(())
    }

    /// Verdadeiro se existe um TokenState com access token não vazio
    pub async fn is_authenticated(&self) -> bool {
        self.tokens
            .read()
            .await
            .as_ref()
            .map(|state| !state.access_token.is_empty())
            .unwrap_or(false)
    }

    /// Verdadeiro quando o token entrou na margem de renovação e há um
    /// refresh token disponível. API keys nunca precisam de renovação;
    /// sem TokenState ainda não há o que renovar (falta trocar o code).
    pub async fn needs_refresh(&self) -> bool {
        if !matches!(self.mode, Some(AuthMode::OAuth(_))) {
            return false;
        }
        let tokens = self.tokens.read().await;
        match tokens.as_ref() {
            Some(state) => state.is_expired() && state.refresh_token.is_some(),
            None => false,
        }
    }

    /// Emite um novo `LinearClient` vinculado ao access token corrente.
    ///
    /// Cada chamada devolve um client novo: um token renovado exige um
    /// client novo, handles antigos permanecem amarrados ao token antigo.
    pub async fn client(&self) -> AuthResult<LinearClient> {
        let tokens = self.tokens.read().await;
        let state = tokens.as_ref().ok_or_else(|| {
            AuthError::not_authenticated("no token available; exchange a code first")
        })?;
        if state.access_token.is_empty() {
            return Err(AuthError::not_authenticated("access token is empty"));
        }

        // API keys pessoais vão cruas no header; tokens OAuth usam Bearer
        let authorization = match self.mode {
            Some(AuthMode::ApiKey) => state.access_token.clone(),
            _ => format!("Bearer {}", state.access_token),
        };

        Ok(LinearClient::new(
            authorization,
            self.endpoints.api_url.clone(),
        )?)
    }

    /// Monta a URL de autorização com um `state` anti-forgery novo.
    ///
    /// Retorna `(url, state)`; quem valida o `state` no retorno é o dono do
    /// endpoint de callback. Cada chamada gera um `state` independente.
    pub fn authorization_url(&self) -> AuthResult<(String, String)> {
        let config = self.oauth_config()?;
        let state = uuid::Uuid::new_v4().simple().to_string();
        let url = format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}&access_type=offline",
            self.endpoints.authorize_url,
            config.client_id,
            urlencoding::encode(&config.redirect_uri),
            OAUTH_SCOPE,
            state,
        );
        Ok((url, state))
    }

    /// Troca um authorization code por tokens (grant `authorization_code`).
    ///
    /// Sucesso substitui o TokenState atomicamente; qualquer falha deixa o
    /// estado anterior como estava.
    pub async fn exchange_code(&self, code: &str) -> AuthResult<()> {
        let config = self.oauth_config()?.clone();

        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", config.redirect_uri.as_str()),
        ];

        let response = self.request_token(&params).await.map_err(|failure| {
            AuthError::Exchange {
                status: failure.status,
                body: failure.body,
            }
        })?;

        let state = TokenState::from_response(response, None);
        tracing::info!(
            expires_in = ?state.time_to_expiry(),
            "Access token obtained via authorization code"
        );
        *self.tokens.write().await = Some(state);
        Ok(())
    }

    /// Renova o access token (grant `refresh_token`).
    ///
    /// Renovações concorrentes são serializadas: apenas uma requisição
    /// upstream é emitida e quem esperou a guarda reaproveita o resultado.
    /// Falha preserva o TokenState anterior e devolve `AuthError::Refresh`.
    pub async fn refresh(&self) -> AuthResult<()> {
        let config = self.oauth_config()?.clone();
        let _gate = self.refresh_gate.lock().await;

        // Re-verifica sob a guarda: outro chamador pode ter renovado
        // enquanto esta chamada aguardava o lock
        let (refresh_token, expired) = {
            let tokens = self.tokens.read().await;
            match tokens.as_ref() {
                Some(state) => (state.refresh_token.clone(), state.is_expired()),
                None => {
                    return Err(AuthError::not_authenticated(
                        "no token available; exchange a code first",
                    ))
                }
            }
        };
        let refresh_token = refresh_token.ok_or_else(|| {
            AuthError::not_authenticated("no refresh token available")
        })?;
        if !expired {
            tracing::debug!("token already fresh; reusing concurrent refresh result");
            return Ok(());
        }

        let params = [
            ("grant_type", "refresh_token"),
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
            ("refresh_token", refresh_token.as_str()),
        ];

        let response = self.request_token(&params).await.map_err(|failure| {
            AuthError::Refresh {
                status: failure.status,
                body: failure.body,
            }
        })?;

        let mut tokens = self.tokens.write().await;
        let previous_refresh = tokens.as_ref().and_then(|s| s.refresh_token.clone());
        let state = TokenState::from_response(response, previous_refresh);
        tracing::info!(
            expires_in = ?state.time_to_expiry(),
            "Access token refreshed"
        );
        *tokens = Some(state);
        Ok(())
    }

    /// Cópia do TokenState corrente (para persistência por colaboradores)
    pub async fn token_state(&self) -> Option<TokenState> {
        self.tokens.read().await.clone()
    }

    /// Restaura um TokenState persistido externamente (CLI entre execuções)
    pub async fn restore_tokens(&self, state: TokenState) -> AuthResult<()> {
        if self.mode.is_none() {
            return Err(AuthError::config("initialize a credential first"));
        }
        if state.access_token.is_empty() {
            return Err(AuthError::config("restored access token is empty"));
        }
        *self.tokens.write().await = Some(state);
        Ok(())
    }

    fn oauth_config(&self) -> AuthResult<&OAuthConfig> {
        match &self.mode {
            Some(AuthMode::OAuth(config)) => Ok(config),
            Some(AuthMode::ApiKey) => Err(AuthError::config(
                "operation requires an OAuth credential, not an API key",
            )),
            None => Err(AuthError::config("initialize a credential first")),
        }
    }

    /// Caminho único para o token endpoint; exchange e refresh diferem
    /// apenas nos parâmetros do form
    async fn request_token(
        &self,
        params: &[(&str, &str)],
    ) -> Result<TokenResponse, TokenEndpointFailure> {
        let response = self
            .http
            .post(&self.endpoints.token_url)
            .form(params)
            .send()
            .await
            .map_err(|e| TokenEndpointFailure {
                status: None,
                body: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            // Corpo upstream preservado sem alteração para diagnóstico
            let body = response.text().await.unwrap_or_default();
            return Err(TokenEndpointFailure {
                status: Some(status.as_u16()),
                body,
            });
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| TokenEndpointFailure {
                status: Some(status.as_u16()),
                body: format!("malformed token response: {}", e),
            })
    }
}

impl Default for LinearAuth {
    fn default() -> Self {
        Self::new()
    }
}
