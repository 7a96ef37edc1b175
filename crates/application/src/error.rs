use domain::{DomainError, RepositoryError};
use thiserror::Error;

use crate::password::PasswordHasherError;
use crate::token::TokenError;

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("repository error: {0}")]
    Repository(RepositoryError),
    #[error("password error: {0}")]
    Password(#[from] PasswordHasherError),
    #[error("token error: {0}")]
    Token(#[from] TokenError),
}

impl ApplicationError {
    /// 是否为"资源不存在"
    pub fn is_not_found(&self) -> bool {
        match self {
            ApplicationError::Domain(err) => err.is_not_found(),
            ApplicationError::Repository(RepositoryError::NotFound) => true,
            _ => false,
        }
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        ApplicationError::Repository(value)
    }
}
