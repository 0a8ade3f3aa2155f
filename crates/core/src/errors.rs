use thiserror::Error;

use crate::org_graph::OrgGraphError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("authority level {value} is outside the 0..=100 scale")]
    InvalidAuthorityLevel { value: i64 },
}

/// Failure to complete a resolution call. Unresolvable requests are not errors; only a
/// failing org-graph store ends up here.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ResolutionError {
    #[error(transparent)]
    OrgGraph(#[from] OrgGraphError),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => "The approval request is invalid. Check inputs and try again.",
            Self::ServiceUnavailable { .. } => {
                "The organization directory is temporarily unavailable. Please retry shortly."
            }
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        match self {
            Self::Domain(error) => {
                InterfaceError::BadRequest { message: error.to_string(), correlation_id }
            }
            Self::Resolution(error) => {
                InterfaceError::ServiceUnavailable { message: error.to_string(), correlation_id }
            }
        }
    }
}
