use thiserror::Error;

/// Outcomes of the auth core that callers must handle explicitly.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    #[error("email already registered")]
    DuplicateEmail,

    /// Covers both unknown email and wrong password; callers must not be able
    /// to tell the two apart.
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("not authenticated")]
    NotAuthenticated,

    /// A stored password hash failed to parse. Indicates data corruption.
    #[error("stored credential is unreadable")]
    CorruptCredential,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<sqlx::Error> for AuthError {
    fn from(e: sqlx::Error) -> Self {
        AuthError::Internal(e.into())
    }
}
