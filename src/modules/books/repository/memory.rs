use async_trait::async_trait;
use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use tokio::sync::RwLock;

use super::{BookRepository, RepositoryError};
use crate::modules::books::{
    models::{Book, BookId, NewBook},
    query::BookQuery,
};

/// Process-local [`BookRepository`]. Issues the same id format as MongoDB.
#[derive(Default)]
pub struct MemoryBookRepository {
    books: RwLock<Vec<Book>>,
}

impl MemoryBookRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.books.read().await.len()
    }
}

#[async_trait]
impl BookRepository for MemoryBookRepository {
    async fn insert(&self, book: NewBook) -> Result<Book, RepositoryError> {
        let now = Utc::now();
        let book = Book {
            id: BookId::new(ObjectId::new().to_hex()),
            title: book.title,
            author: book.author,
            isbn: book.isbn,
            publication_date: book.publication_date,
            genre: book.genre,
            cover_images: book.cover_images,
            created_at: now,
            updated_at: now,
        };
        self.books.write().await.push(book.clone());
        Ok(book)
    }

    async fn find_by_id(&self, id: &BookId) -> Result<Option<Book>, RepositoryError> {
        let books = self.books.read().await;
        Ok(books.iter().find(|book| &book.id == id).cloned())
    }

    async fn update(&self, book: &Book) -> Result<Option<Book>, RepositoryError> {
        let mut books = self.books.write().await;
        let Some(stored) = books.iter_mut().find(|stored| stored.id == book.id) else {
            return Ok(None);
        };
        *stored = Book {
            updated_at: Utc::now(),
            ..book.clone()
        };
        Ok(Some(stored.clone()))
    }

    async fn delete(&self, id: &BookId) -> Result<bool, RepositoryError> {
        let mut books = self.books.write().await;
        let before = books.len();
        books.retain(|book| &book.id != id);
        Ok(books.len() < before)
    }

    async fn find(&self, query: &BookQuery) -> Result<Vec<Book>, RepositoryError> {
        let books = self.books.read().await;
        let mut matching: Vec<Book> = books
            .iter()
            .filter(|book| query.matches(book))
            .cloned()
            .collect();
        matching.sort_by(|a, b| query.compare(a, b));

        Ok(match query.page {
            Some(page) => matching
                .into_iter()
                .skip(usize::try_from(page.skip()).unwrap_or(usize::MAX))
                .take(usize::try_from(page.limit).unwrap_or(usize::MAX))
                .collect(),
            None => matching,
        })
    }
}
