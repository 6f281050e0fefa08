use thiserror::Error;

#[derive(Error, Debug)]
pub enum PledgeError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Invalid notification: {0}")]
    InvalidNotification(String),
    #[error("Payment gateway error: {0}")]
    GatewayError(String),
    #[error("Store error: {0}")]
    StoreError(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl PledgeError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Wraps a backend failure message as a [`PledgeError::StoreError`].
    pub fn store(message: impl Into<String>) -> Self {
        Self::StoreError(Box::new(std::io::Error::other(message.into())))
    }
}

impl From<serde_json::Error> for PledgeError {
    fn from(err: serde_json::Error) -> Self {
        Self::StoreError(Box::new(err))
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for PledgeError {
    fn from(err: rocksdb::Error) -> Self {
        Self::StoreError(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, PledgeError>;
