//! Workflows compostos sobre o executor de operações
//!
//! O `WorkflowManager` encadeia operações independentes em fluxos nomeados
//! com contrato de falha parcial definido. Ele não guarda estado entre
//! chamadas: cada workflow é uma execução isolada, e o que já foi
//! confirmado remotamente antes de uma falha é reportado ao chamador em
//! vez de desfeito.

use serde_json::{json, Map, Value};

use crate::client::executor::OperationExecutor;
use crate::client::graphql::LinearClient;
use crate::client::operations::{
    IssueCreateInput, IssueUpdateInput, ProjectCreateInput, ISSUE_BATCH_CREATE,
    ISSUE_BATCH_UPDATE, PROJECT_CREATE,
};
use crate::error::{OperationError, OperationResult, WorkflowError};

/// Nome do passo de criação do projeto no workflow composto
pub const STEP_PROJECT_CREATE: &str = "project_create";
/// Nome do passo de criação do lote de issues no workflow composto
pub const STEP_ISSUE_BATCH_CREATE: &str = "issue_batch_create";

/// Resultado de um workflow com todos os passos concluídos: payload de
/// cada passo sob o nome do passo
#[derive(Debug, Clone, serde::Serialize)]
pub struct WorkflowOutcome {
    pub steps: Map<String, Value>,
}

impl WorkflowOutcome {
    /// Payload de um passo pelo nome
    pub fn step(&self, name: &str) -> Option<&Value> {
        self.steps.get(name)
    }

    /// Id do projeto criado pelo workflow composto, quando presente
    pub fn project_id(&self) -> Option<&str> {
        self.step(STEP_PROJECT_CREATE)?
            .get("project")?
            .get("id")?
            .as_str()
    }
}

/// Orquestrador de workflows: projeto-com-issues e operações em lote.
///
/// Operações em lote são sempre uma única chamada remota carregando a
/// lista completa, nunca uma chamada por item. Quem garante (ou não)
/// atomicidade dentro dessa chamada é a API remota.
pub struct WorkflowManager {
    client: LinearClient,
}

impl WorkflowManager {
    pub fn new(client: LinearClient) -> Self {
        Self { client }
    }

    /// Cria um projeto e, em seguida, um lote de issues dentro dele.
    ///
    /// Sequência:
    /// 1. `projectCreate`; falhou, nada mais é tentado.
    /// 2. O id do projeto é anexado a cada issue sob `projectId`, sem
    ///    sobrescrever um `project_id` já preenchido pelo chamador.
    /// 3. `issueBatchCreate` com a lista completa, em uma única chamada.
    ///
    /// Composição **não atômica**: se o lote falhar depois do projeto ter
    /// sido criado, o erro reporta o passo `issue_batch_create` como
    /// falho e carrega o payload do projeto já criado (id incluído).
    /// Nenhuma exclusão compensatória é feita; essa decisão fica com o
    /// chamador.
    pub async fn create_project_with_issues(
        &self,
        project: ProjectCreateInput,
        issues: Vec<IssueCreateInput>,
    ) -> Result<WorkflowOutcome, WorkflowError> {
        if issues.is_empty() {
            return Err(WorkflowError::new(
                STEP_ISSUE_BATCH_CREATE,
                OperationError::validation(
                    "issues list is empty; use a plain project create instead",
                ),
            ));
        }

        let project_value = serde_json::to_value(&project)
            .map_err(|e| WorkflowError::new(STEP_PROJECT_CREATE, OperationError::Json(e)))?;

        tracing::info!(
            project = %project.name,
            issues = issues.len(),
            "starting project-with-issues workflow"
        );

        let executor = OperationExecutor::new(&self.client);
        let project_payload = executor
            .run(&PROJECT_CREATE, json!({ "input": project_value }))
            .await
            .map_err(|e| WorkflowError::new(STEP_PROJECT_CREATE, e))?;

        let mut completed = Map::new();
        completed.insert(STEP_PROJECT_CREATE.to_string(), project_payload.clone());

        let project_id = match project_payload
            .get("project")
            .and_then(|p| p.get("id"))
            .and_then(Value::as_str)
        {
            Some(id) => id.to_string(),
            None => {
                return Err(WorkflowError::with_completed(
                    STEP_PROJECT_CREATE,
                    completed,
                    OperationError::RemoteCall {
                        operation: PROJECT_CREATE.name,
                        message: "payload missing project.id".to_string(),
                    },
                ))
            }
        };

        // Merge campo a campo: anexa o id do projeto sem tocar em
        // referências já presentes
        let mut issues = issues;
        for issue in &mut issues {
            if issue.project_id.is_none() {
                issue.project_id = Some(project_id.clone());
            }
        }

        let issues_value = serde_json::to_value(&issues).map_err(|e| {
            WorkflowError::with_completed(
                STEP_ISSUE_BATCH_CREATE,
                completed.clone(),
                OperationError::Json(e),
            )
        })?;

        let batch_payload = executor
            .run(
                &ISSUE_BATCH_CREATE,
                json!({ "input": { "issues": issues_value } }),
            )
            .await
            .map_err(|e| {
                tracing::warn!(
                    project_id = %project_id,
                    "project created but issue batch failed; no rollback is attempted"
                );
                WorkflowError::with_completed(STEP_ISSUE_BATCH_CREATE, completed.clone(), e)
            })?;

        tracing::info!(project_id = %project_id, "project-with-issues workflow completed");

        let mut steps = completed;
        steps.insert(STEP_ISSUE_BATCH_CREATE.to_string(), batch_payload);
        Ok(WorkflowOutcome { steps })
    }

    /// Cria um lote de issues em uma única chamada
    pub async fn create_issues(
        &self,
        issues: Vec<IssueCreateInput>,
    ) -> OperationResult<Value> {
        if issues.is_empty() {
            return Err(OperationError::validation("issues list is empty"));
        }

        let issues_value = serde_json::to_value(&issues)?;
        OperationExecutor::new(&self.client)
            .run(
                &ISSUE_BATCH_CREATE,
                json!({ "input": { "issues": issues_value } }),
            )
            .await
    }

    /// Aplica o mesmo update a todas as issues do lote, em uma única
    /// chamada carregando a lista completa de ids
    pub async fn update_issues(
        &self,
        ids: &[String],
        input: IssueUpdateInput,
    ) -> OperationResult<Value> {
        if ids.is_empty() {
            return Err(OperationError::validation("ids list is empty"));
        }
        if input.is_empty() {
            return Err(OperationError::validation("update payload is empty"));
        }

        let input_value = serde_json::to_value(&input)?;
        OperationExecutor::new(&self.client)
            .run(
                &ISSUE_BATCH_UPDATE,
                json!({ "ids": ids, "input": input_value }),
            )
            .await
    }

    /// Move um lote de issues para a lixeira em uma única chamada
    pub async fn delete_issues(&self, ids: &[String]) -> OperationResult<Value> {
        if ids.is_empty() {
            return Err(OperationError::validation("ids list is empty"));
        }

        tracing::info!(count = ids.len(), "trashing issues in a single batched call");
        self.update_issues(ids, IssueUpdateInput::trash()).await
    }
}
