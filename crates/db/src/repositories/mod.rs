use thiserror::Error;

use orgroute_core::org_graph::OrgGraphError;

pub mod org_graph;

pub use org_graph::{OrgSummary, SqlOrgGraphReader};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for OrgGraphError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Database(error) => OrgGraphError::Storage(error.to_string()),
            RepositoryError::Decode(message) => OrgGraphError::Decode(message),
        }
    }
}
