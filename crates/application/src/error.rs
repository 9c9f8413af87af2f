use domain::{DomainError, RepositoryError};
use thiserror::Error;

use crate::channel::ChannelError;
use crate::notifier::DispatchError;

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),
}

pub type ApplicationResult<T> = Result<T, ApplicationError>;
