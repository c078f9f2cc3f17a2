//! Cliente GraphQL, catálogo de operações e workflows

pub mod executor;
pub mod graphql;
pub mod operations;
pub mod workflows;

pub use executor::OperationExecutor;
pub use graphql::LinearClient;
pub use operations::{
    IssueCreateInput, IssueUpdateInput, Operation, ProjectCreateInput, ISSUE_BATCH_CREATE,
    ISSUE_BATCH_UPDATE, ISSUE_SEARCH, PROJECT_CREATE, TEAMS, VIEWER,
};
pub use workflows::{
    WorkflowManager, WorkflowOutcome, STEP_ISSUE_BATCH_CREATE, STEP_PROJECT_CREATE,
};
