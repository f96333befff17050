use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("An account with this email already exists: {0}")]
    DuplicateAccount(String),
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Not authenticated")]
    Unauthenticated,
    #[error("Storage read failed: {0}")]
    StorageRead(String),
    #[error("Storage write failed: {0}")]
    StorageWrite(String),
    #[error("Internal error: {0}")]
    Internal(String),
}
