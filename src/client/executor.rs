//! Execução de operações GraphQL nomeadas
//!
//! Uma tentativa por chamada: nada de retry, backoff ou cache aqui;
//! política de repetição pertence a quem chama.

use serde_json::Value;

use crate::client::graphql::{GraphQlRequest, LinearClient};
use crate::client::operations::Operation;
use crate::error::{OperationError, OperationResult};

/// Executa uma operação nomeada sobre um `LinearClient` emprestado.
///
/// O executor não possui nenhum estado de autenticação: ele empresta o
/// client por chamada e traduz o resultado do transporte para a taxonomia
/// de erros da camada de operações.
pub struct OperationExecutor<'a> {
    client: &'a LinearClient,
}

impl<'a> OperationExecutor<'a> {
    pub fn new(client: &'a LinearClient) -> Self {
        Self { client }
    }

    /// Executa a operação e devolve o payload sob o campo raiz dela.
    ///
    /// Mapeamento do resultado:
    /// - falha de rede, status não-2xx ou JSON ilegível → `RemoteCall`,
    ///   com o corpo upstream preservado na mensagem;
    /// - 2xx com array `errors` não vazio ou `success: false` no payload
    ///   → `Rejected`, carregando o payload parcial;
    /// - caso contrário → o payload da operação.
    pub async fn run(&self, operation: &Operation, variables: Value) -> OperationResult<Value> {
        tracing::debug!(operation = operation.name, "executing GraphQL operation");

        let request = GraphQlRequest {
            query: operation.document,
            variables,
        };

        let response = self.client.post_graphql(&request).await.map_err(|e| {
            OperationError::RemoteCall {
                operation: operation.name,
                message: e.to_string(),
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                operation = operation.name,
                status = status.as_u16(),
                "GraphQL endpoint returned an error status"
            );
            return Err(OperationError::RemoteCall {
                operation: operation.name,
                message: format!("status {}: {}", status.as_u16(), body),
            });
        }

        let envelope: Value = response.json().await.map_err(|e| {
            OperationError::RemoteCall {
                operation: operation.name,
                message: format!("malformed response body: {}", e),
            }
        })?;

        // Erros GraphQL chegam com status 200; são falha da operação,
        // não do transporte
        if let Some(errors) = envelope.get("errors").and_then(Value::as_array) {
            if !errors.is_empty() {
                tracing::warn!(
                    operation = operation.name,
                    "operation rejected via GraphQL errors"
                );
                return Err(OperationError::Rejected {
                    operation: operation.name,
                    payload: envelope.clone(),
                });
            }
        }

        let payload = envelope
            .get("data")
            .and_then(|data| data.get(operation.field))
            .cloned()
            .ok_or_else(|| OperationError::RemoteCall {
                operation: operation.name,
                message: format!("response missing data.{}", operation.field),
            })?;

        // Mutations do Linear carregam a própria flag de sucesso
        if payload.get("success").and_then(Value::as_bool) == Some(false) {
            tracing::warn!(operation = operation.name, "operation reported success=false");
            return Err(OperationError::Rejected {
                operation: operation.name,
                payload,
            });
        }

        Ok(payload)
    }
}
