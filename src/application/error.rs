use thiserror::Error;

use crate::{
    api::ApiError, config::LoadError, infra::error::InfraError, infra::storage::StorageError,
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("failed to load configuration: {0}")]
    Config(#[from] LoadError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// Process exit code for the command-line front end.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Validation(_) => 2,
            AppError::Api(err) if err.is_unauthorized() => 3,
            AppError::Api(_) => 4,
            AppError::Config(_) => 78,
            AppError::Storage(_) | AppError::Infra(_) | AppError::Unexpected(_) => 1,
        }
    }
}
