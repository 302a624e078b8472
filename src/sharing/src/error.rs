use common::RepositoryError;

use crate::cloud::CloudError;

#[derive(Debug, thiserror::Error)]
pub enum SharingError {
    /// No transition is defined for the requested (status, action) pair
    #[error("Transition from {from} with action {action} is not possible")]
    InvalidTransition { from: String, action: String },
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },
    #[error("Failed to create table processor: {0}")]
    ProcessorConstruction(String),
    #[error("Disabled by config: {0}")]
    FeatureDisabled(&'static str),
    #[error("Repository error: {0}")]
    Repository(RepositoryError),
    #[error("Cloud error: {0}")]
    Cloud(#[from] CloudError),
}

impl From<RepositoryError> for SharingError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound { kind, id } => SharingError::NotFound { kind, id },
            other => SharingError::Repository(other),
        }
    }
}

impl From<sqlx::Error> for SharingError {
    fn from(e: sqlx::Error) -> Self {
        SharingError::Repository(RepositoryError::Database(e))
    }
}

pub type SharingResult<T> = Result<T, SharingError>;
