use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Lookup by id found nothing; the message is surfaced to callers as-is.
    #[error("{0}")]
    NotFound(String),
    #[error("database error: {0}")]
    Db(String),
    #[error("model error: {0}")]
    Model(#[from] models::errors::ModelError),
}

impl ServiceError {
    pub fn not_found(message: impl Into<String>) -> Self { Self::NotFound(message.into()) }

    pub fn is_not_found(&self) -> bool { matches!(self, Self::NotFound(_)) }
}
