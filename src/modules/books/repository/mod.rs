//! Persistence for book records.

mod memory;
mod mongo;

pub use memory::MemoryBookRepository;
pub use mongo::MongoBookRepository;

use async_trait::async_trait;

use super::models::{Book, BookId, NewBook};
use super::query::BookQuery;

/// Collection (or table) holding book records.
pub const COLLECTION: &str = "books";

#[derive(thiserror::Error, Debug)]
pub enum RepositoryError {
    #[error(transparent)]
    Database(#[from] mongodb::error::Error),

    #[error("stored book {id} is unreadable: {reason}")]
    Corrupt { id: String, reason: String },
}

/// Storage of book records. Ids that the store could never have issued behave
/// like ids of books that do not exist.
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Insert a record; the store assigns id and both timestamps.
    async fn insert(&self, book: NewBook) -> Result<Book, RepositoryError>;

    async fn find_by_id(&self, id: &BookId) -> Result<Option<Book>, RepositoryError>;

    /// Replace the stored record with `book`, refreshing `updatedAt`.
    /// Returns `None` when no record has that id.
    async fn update(&self, book: &Book) -> Result<Option<Book>, RepositoryError>;

    /// Returns whether a record was removed.
    async fn delete(&self, id: &BookId) -> Result<bool, RepositoryError>;

    async fn find(&self, query: &BookQuery) -> Result<Vec<Book>, RepositoryError>;
}
