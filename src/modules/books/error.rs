use bookshelf_http::AppError;
use bookshelf_media::{MediaError, StageError};
use serde_json::json;

use super::models::BookId;
use super::repository::RepositoryError;

#[derive(thiserror::Error, Debug)]
pub enum BookError {
    #[error("{message}")]
    Validation {
        field: Option<&'static str>,
        message: String,
    },

    #[error("Book not found")]
    NotFound(BookId),

    #[error("document store error: {0}")]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Media(#[from] MediaError),

    /// Some owned images survived a delete; the book keeps exactly those.
    #[error("{remaining} cover image(s) could not be deleted: {source}")]
    PartialDelete {
        remaining: usize,
        #[source]
        source: MediaError,
    },

    #[error(transparent)]
    Staging(#[from] StageError),
}

impl BookError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Validation {
            field: None,
            message: message.into(),
        }
    }

    pub fn invalid_field(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field: Some(field),
            message: message.into(),
        }
    }
}

impl From<BookError> for AppError {
    fn from(err: BookError) -> Self {
        match err {
            BookError::Validation { field, message } => {
                let details = field
                    .map(|field| vec![json!({ "field": field, "error": message })])
                    .unwrap_or_default();
                AppError::validation(details, message)
            }
            BookError::NotFound(_) => AppError::not_found("Book not found"),
            BookError::Staging(StageError::TooLarge { limit }) => AppError::validation(
                vec![json!({ "field": "coverImages", "error": "too_large", "limit": limit })],
                format!("Each image must be at most {limit} bytes"),
            ),
            BookError::Staging(StageError::Body(reason)) => {
                AppError::validation(vec![], format!("Malformed upload: {reason}"))
            }
            BookError::Staging(StageError::Io(err)) => {
                AppError::Internal(anyhow::Error::new(err).context("failed to stage upload"))
            }
            upstream @ (BookError::Repository(_)
            | BookError::Media(_)
            | BookError::PartialDelete { .. }) => AppError::upstream(upstream),
        }
    }
}
