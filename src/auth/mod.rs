//! # Autenticação Linear
//!
//! Módulo isolado para autenticação com a API do Linear, cobrindo os dois
//! modos suportados: API key estática e OAuth2 (authorization code).
//!
//! ## Responsabilidades:
//! - Validar credenciais e inicializar a estratégia de autenticação
//! - Montar a URL de autorização e capturar o callback local
//! - Trocar authorization code por access token
//! - Renovar tokens expirados com serialização de refreshes concorrentes
//!
//! ## Estrutura:
//! - `credential.rs`: Credenciais aceitas na inicialização
//! - `token.rs`: Estado de token e margem de expiração
//! - `strategy.rs`: `LinearAuth`, o ponto de entrada do módulo
//! - `callback.rs`: Servidor HTTP local para o redirect OAuth2

pub mod callback;
pub mod credential;
pub mod strategy;
pub mod token;

pub use callback::{CallbackHandle, CallbackResult, CallbackServer};
pub use credential::{Credential, OAuthConfig};
pub use strategy::LinearAuth;
pub use token::{TokenResponse, TokenState, REFRESH_MARGIN_SECS};
