use libris_http::error::AppError;
use thiserror::Error;

/// Failures raised by the store facade.
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt row in {table}: {message}")]
    CorruptRow {
        table: &'static str,
        message: String,
    },
}

/// Failures surfaced by the catalog service.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Caller-correctable; the message is safe to echo.
    #[error("{0}")]
    InvalidInput(String),

    #[error(transparent)]
    Internal(#[from] RepositoryError),

    #[error("price arithmetic overflowed for book {book_id}")]
    PriceOverflow { book_id: i64 },
}

impl CatalogError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}

impl From<CatalogError> for AppError {
    fn from(error: CatalogError) -> Self {
        match error {
            CatalogError::InvalidInput(message) => AppError::bad_request(message),
            CatalogError::Internal(e) => AppError::Internal(e.into()),
            e @ CatalogError::PriceOverflow { .. } => AppError::Internal(e.into()),
        }
    }
}
