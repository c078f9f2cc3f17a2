//! # Linear Ops
//!
//! Uma biblioteca Rust para automação de workflows na API GraphQL do Linear.
//!
//! ## Features
//!
//! - Autenticação por API key ou OAuth2 com refresh automático
//! - Executor de operações GraphQL pré-definidas
//! - Workflows compostos (projeto + lote de issues) com relato de falha parcial
//! - Operações em lote em uma única chamada remota
//!
//! ## Exemplo
//!
//! ```no_run
//! use linear_ops::auth::{Credential, LinearAuth};
//! use linear_ops::client::WorkflowManager;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut auth = LinearAuth::new();
//!     auth.initialize(Credential::api_key("lin_api_..."))?;
//!
//!     let manager = WorkflowManager::new(auth.client().await?);
//!     let issues = vec![linear_ops::client::IssueCreateInput::new("Primeira issue", "team_id")];
//!     let result = manager.create_issues(issues).await?;
//!     println!("Issues criadas: {}", result);
//!     Ok(())
//! }
//! ```

/// Módulo de autenticação (API key e OAuth2)
pub mod auth;

/// Módulo de cliente GraphQL e workflows
pub mod client;

/// Módulo de configuração por ambiente
pub mod config;

/// Módulo de tratamento de erros
pub mod error;

// Re-exportações para conveniência
pub use auth::{Credential, LinearAuth};
pub use client::{LinearClient, OperationExecutor, WorkflowManager};
pub use config::EnvManager;
pub use error::{AuthError, AuthResult, OperationError, OperationResult, WorkflowError};
