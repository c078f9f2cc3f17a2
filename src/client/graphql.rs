//! Cliente HTTP para o endpoint GraphQL do Linear

use reqwest::{Client as HttpClient, Response};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Envelope de requisição GraphQL: documento fixo mais variáveis
#[derive(Debug, Serialize)]
pub struct GraphQlRequest<'a> {
    pub query: &'a str,
    pub variables: Value,
}

/// Handle de transporte vinculado a um único header Authorization.
///
/// É um snapshot imutável: quando a estratégia renova o token, ela emite um
/// client novo. Handles antigos continuam amarrados ao token com que
/// nasceram, então uma requisição em voo nunca muda de credencial no meio.
#[derive(Clone)]
pub struct LinearClient {
    http_client: HttpClient,
    authorization: String,
    endpoint: String,
}

impl LinearClient {
    /// Cria um client vinculado a um header Authorization já formatado
    /// (`Bearer <token>` para OAuth, a própria API key no modo estático)
    ///
    /// # Timeouts
    ///
    /// - Total: 30s
    /// - Connect: 5s
    pub fn new(
        authorization: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Result<Self, reqwest::Error> {
        Self::with_timeouts(authorization, endpoint, 30, 5)
    }

    /// Cria um client com timeouts customizados
    pub fn with_timeouts(
        authorization: impl Into<String>,
        endpoint: impl Into<String>,
        total_timeout_secs: u64,
        connect_timeout_secs: u64,
    ) -> Result<Self, reqwest::Error> {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(total_timeout_secs))
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .build()?;

        Ok(Self {
            http_client,
            authorization: authorization.into(),
            endpoint: endpoint.into(),
        })
    }

    /// Envia um POST GraphQL e devolve a resposta crua; o tratamento de
    /// status e envelope pertence ao executor
    pub(crate) async fn post_graphql(
        &self,
        request: &GraphQlRequest<'_>,
    ) -> Result<Response, reqwest::Error> {
        tracing::debug!("POST {}", self.endpoint);

        self.http_client
            .post(&self.endpoint)
            .header("Authorization", &self.authorization)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
    }

    /// Header Authorization ao qual este handle está vinculado
    pub fn authorization(&self) -> &str {
        &self.authorization
    }

    /// Endpoint GraphQL alvo
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}
