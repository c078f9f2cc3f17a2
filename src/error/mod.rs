pub mod auth_error;
pub mod operation_error;

pub use auth_error::{AuthError, AuthResult};
pub use operation_error::{OperationError, OperationResult, WorkflowError};
