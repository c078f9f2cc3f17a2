use serde_json::Value;
use thiserror::Error;

/// Erros da camada de execução de operações GraphQL
#[derive(Error, Debug)]
pub enum OperationError {
    /// Falha de transporte: rede, status não-2xx ou payload ilegível.
    /// O corpo upstream entra em `message` sem alteração.
    #[error("Operation '{operation}' transport failure: {message}")]
    RemoteCall {
        operation: &'static str,
        message: String,
    },

    /// A API respondeu 2xx mas sinalizou falha no próprio envelope
    /// (array `errors` ou flag `success: false` no payload da mutation).
    #[error("Operation '{operation}' rejected by the API: {payload}")]
    Rejected {
        operation: &'static str,
        payload: Value,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl OperationError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Nome da operação envolvida, quando houver
    pub fn operation(&self) -> Option<&'static str> {
        match self {
            Self::RemoteCall { operation, .. } | Self::Rejected { operation, .. } => {
                Some(operation)
            }
            _ => None,
        }
    }
}

/// Tipo de resultado padrão para operações remotas
pub type OperationResult<T> = Result<T, OperationError>;

/// Falha em um workflow composto de múltiplos passos.
///
/// Carrega o passo que falhou e os payloads dos passos já concluídos:
/// efeitos remotos já confirmados que o chamador precisa conhecer (por
/// exemplo, o id do projeto criado antes da falha do lote de issues).
#[derive(Error, Debug)]
#[error("Workflow step '{step}' failed: {source}")]
pub struct WorkflowError {
    pub step: &'static str,
    pub completed: serde_json::Map<String, Value>,
    #[source]
    pub source: OperationError,
}

impl WorkflowError {
    pub fn new(step: &'static str, source: OperationError) -> Self {
        Self {
            step,
            completed: serde_json::Map::new(),
            source,
        }
    }

    pub fn with_completed(
        step: &'static str,
        completed: serde_json::Map<String, Value>,
        source: OperationError,
    ) -> Self {
        Self {
            step,
            completed,
            source,
        }
    }

    /// Payload de um passo já concluído, se presente
    pub fn completed_step(&self, step: &str) -> Option<&Value> {
        self.completed.get(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_remote_call_display_carries_operation_and_body() {
        let error = OperationError::RemoteCall {
            operation: "ProjectCreate",
            message: "status 500: internal error".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Operation 'ProjectCreate' transport failure: status 500: internal error"
        );
        assert_eq!(error.operation(), Some("ProjectCreate"));
    }

    #[test]
    fn test_rejected_display_includes_payload() {
        let error = OperationError::Rejected {
            operation: "IssueBatchCreate",
            payload: json!({"success": false}),
        };
        assert!(error.to_string().contains("IssueBatchCreate"));
        assert!(error.to_string().contains(r#""success":false"#));
    }

    #[test]
    fn test_validation_has_no_operation() {
        let error = OperationError::validation("ids list is empty");
        assert_eq!(error.operation(), None);
        assert_eq!(error.to_string(), "Validation error: ids list is empty");
    }

    #[test]
    fn test_workflow_error_exposes_completed_steps() {
        let mut completed = serde_json::Map::new();
        completed.insert(
            "project_create".to_string(),
            json!({"project": {"id": "proj_1"}}),
        );
        let error = WorkflowError::with_completed(
            "issue_batch_create",
            completed,
            OperationError::RemoteCall {
                operation: "IssueBatchCreate",
                message: "status 502: bad gateway".to_string(),
            },
        );

        assert_eq!(error.step, "issue_batch_create");
        let project = error.completed_step("project_create").unwrap();
        assert_eq!(project["project"]["id"], "proj_1");
        assert!(error.completed_step("issue_batch_create").is_none());
        assert!(error.to_string().contains("issue_batch_create"));
    }
}
