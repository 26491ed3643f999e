//! Error types for assistant operations

use crate::store::StoreError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssistError {
    #[error("analysis already in progress")]
    Busy,

    #[error("problem description is empty")]
    EmptyProblem,

    #[error("invalid e-mail or password")]
    InvalidCredentials,

    #[error("not logged in")]
    NotAuthenticated,

    #[error("{action} requires an administrator")]
    Forbidden { action: &'static str },

    #[error("cannot read photo {}: {source}", path.display())]
    Photo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("photo {} is empty", .0.display())]
    EmptyPhoto(PathBuf),

    #[error(transparent)]
    Store(#[from] StoreError),
}
