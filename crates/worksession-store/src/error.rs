use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Username already registered: {0}")]
    DuplicateUsername(String),

    #[error("Value out of range: {0}")]
    OutOfRange(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl From<StoreError> for worksession_core::Error {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateUsername(name) => worksession_core::Error::InvalidArgument(
                format!("username '{}' is already registered", name),
            ),
            StoreError::OutOfRange(msg) => worksession_core::Error::InvalidArgument(msg),
            StoreError::Database(e) => worksession_core::Error::Storage(e.to_string()),
        }
    }
}
