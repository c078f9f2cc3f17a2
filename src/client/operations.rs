//! Catálogo de operações GraphQL
//!
//! Todos os documentos são constantes resolvidas em tempo de compilação:
//! nenhuma operação é montada ou carregada em tempo de execução. Cada
//! descritor conhece o campo raiz do payload, onde o executor localiza o
//! resultado e a flag `success` das mutations.

use serde::{Deserialize, Serialize};

/// Descritor de uma operação nomeada: puro dado, sem comportamento
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
    /// Nome da operação (diagnóstico e tagging de erros)
    pub name: &'static str,
    /// Campo raiz sob `data` onde o payload desta operação chega
    pub field: &'static str,
    /// Documento GraphQL completo
    pub document: &'static str,
}

/// Cria um projeto
pub const PROJECT_CREATE: Operation = Operation {
    name: "ProjectCreate",
    field: "projectCreate",
    document: r#"mutation ProjectCreate($input: ProjectCreateInput!) {
  projectCreate(input: $input) {
    success
    project {
      id
      name
      url
    }
  }
}"#,
};

/// Cria um lote de issues em uma única chamada
pub const ISSUE_BATCH_CREATE: Operation = Operation {
    name: "IssueBatchCreate",
    field: "issueBatchCreate",
    document: r#"mutation IssueBatchCreate($input: IssueBatchCreateInput!) {
  issueBatchCreate(input: $input) {
    success
    issues {
      id
      identifier
      title
      url
    }
  }
}"#,
};

/// Atualiza um lote de issues em uma única chamada; com `trashed: true`
/// no input é também a forma batched de exclusão
pub const ISSUE_BATCH_UPDATE: Operation = Operation {
    name: "IssueBatchUpdate",
    field: "issueBatchUpdate",
    document: r#"mutation IssueBatchUpdate($ids: [UUID!]!, $input: IssueUpdateInput!) {
  issueBatchUpdate(ids: $ids, input: $input) {
    success
    issues {
      id
      identifier
    }
  }
}"#,
};

/// Identidade do usuário autenticado
pub const VIEWER: Operation = Operation {
    name: "Viewer",
    field: "viewer",
    document: r#"query Viewer {
  viewer {
    id
    name
    email
  }
}"#,
};

/// Times do workspace (ids necessários para criar issues)
pub const TEAMS: Operation = Operation {
    name: "Teams",
    field: "teams",
    document: r#"query Teams {
  teams {
    nodes {
      id
      name
      key
    }
  }
}"#,
};

/// Busca textual de issues
pub const ISSUE_SEARCH: Operation = Operation {
    name: "IssueSearch",
    field: "searchIssues",
    document: r#"query IssueSearch($term: String!, $first: Int) {
  searchIssues(term: $term, first: $first) {
    nodes {
      id
      identifier
      title
      url
    }
  }
}"#,
};

/// Input de criação de projeto
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectCreateInput {
    pub name: String,
    pub team_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ProjectCreateInput {
    pub fn new(name: impl Into<String>, team_ids: Vec<String>) -> Self {
        Self {
            name: name.into(),
            team_ids,
            description: None,
        }
    }
}

/// Input de criação de issue.
///
/// `project_id` normalmente fica vazio e é preenchido pelo workflow
/// composto com o id do projeto recém-criado.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueCreateInput {
    pub title: String,
    pub team_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_ids: Option<Vec<String>>,
}

impl IssueCreateInput {
    pub fn new(title: impl Into<String>, team_id: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            team_id: team_id.into(),
            description: None,
            priority: None,
            project_id: None,
            assignee_id: None,
            label_ids: None,
        }
    }
}

/// Input de atualização compartilhado por todas as issues de um lote
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueUpdateInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trashed: Option<bool>,
}

impl IssueUpdateInput {
    /// Input que move as issues para a lixeira (exclusão batched)
    pub fn trash() -> Self {
        Self {
            trashed: Some(true),
            ..Self::default()
        }
    }

    /// Verdadeiro quando nenhum campo foi preenchido
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.state_id.is_none()
            && self.priority.is_none()
            && self.assignee_id.is_none()
            && self.trashed.is_none()
    }
}
