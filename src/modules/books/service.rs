//! Book lifecycle: keeps records and their cover images in step.
//!
//! The document store and the image store share no transaction. Each operation
//! orders its steps so that a failure at any point leaves every `coverImages`
//! entry pointing at a live asset; images that end up referenced by nothing are
//! logged as orphans.

use std::sync::Arc;

use bookshelf_media::{destroy_all, upload_all, ImageStore, StagedImage};

use super::error::BookError;
use super::models::{Book, BookFields, BookId, CoverImage, NewBook};
use super::query::{BookQuery, ListParams};
use super::repository::BookRepository;

pub struct BookService {
    books: Arc<dyn BookRepository>,
    images: Arc<dyn ImageStore>,
    max_page_size: Option<u64>,
}

impl BookService {
    pub fn new(books: Arc<dyn BookRepository>, images: Arc<dyn ImageStore>) -> Self {
        Self {
            books,
            images,
            max_page_size: None,
        }
    }

    pub fn with_max_page_size(mut self, max_page_size: Option<u64>) -> Self {
        self.max_page_size = max_page_size;
        self
    }

    /// Upload `files` in order and store a new book referencing them.
    pub async fn create(
        &self,
        fields: BookFields,
        files: Vec<StagedImage>,
    ) -> Result<Book, BookError> {
        if files.is_empty() {
            return Err(BookError::invalid_field("coverImages", "No image files uploaded"));
        }
        let new_book = NewBook::from_fields(fields)?;

        let cover_images = self.upload(files).await?;
        let new_book = new_book.with_cover_images(cover_images);
        let uploaded = image_ids(&new_book.cover_images);

        match self.books.insert(new_book).await {
            Ok(book) => {
                tracing::info!(book_id = %book.id, images = book.cover_images.len(), "book created");
                Ok(book)
            }
            Err(err) => {
                self.discard(&uploaded, "create rollback").await;
                Err(err.into())
            }
        }
    }

    pub async fn get_by_id(&self, id: &BookId) -> Result<Book, BookError> {
        self.books
            .find_by_id(id)
            .await?
            .ok_or_else(|| BookError::NotFound(id.clone()))
    }

    /// Replace the cover images and merge the scalar fields.
    ///
    /// New files are uploaded before anything changes, the record is written
    /// next, and the previous images are destroyed last. An update without
    /// files leaves the book with no cover images.
    pub async fn update(
        &self,
        id: &BookId,
        fields: BookFields,
        files: Vec<StagedImage>,
    ) -> Result<Book, BookError> {
        let mut book = self.get_by_id(id).await?;
        let previous = std::mem::take(&mut book.cover_images);

        book.cover_images = self.upload(files).await?;
        fields.merge_into(&mut book);

        let updated = match self.books.update(&book).await {
            Ok(Some(updated)) => updated,
            outcome => {
                self.discard(&image_ids(&book.cover_images), "update rollback")
                    .await;
                return match outcome {
                    Ok(_) => Err(BookError::NotFound(id.clone())),
                    Err(err) => Err(err.into()),
                };
            }
        };

        if !previous.is_empty() {
            self.discard(&image_ids(&previous), "replaced cover images")
                .await;
        }

        tracing::info!(
            book_id = %updated.id,
            replaced = previous.len(),
            images = updated.cover_images.len(),
            "book updated"
        );
        Ok(updated)
    }

    /// Destroy every owned image, then the record.
    ///
    /// When some images cannot be destroyed the record is kept, trimmed to
    /// exactly those images, so a retry picks up where this one stopped.
    pub async fn delete(&self, id: &BookId) -> Result<(), BookError> {
        let mut book = self.get_by_id(id).await?;

        let report = destroy_all(
            self.images.as_ref(),
            book.cover_images
                .iter()
                .map((|image| image.image_id.as_str()) as fn(&CoverImage) -> &str),
        )
        .await;

        if !report.is_complete() {
            let remaining: Vec<&str> = report.remaining_ids().collect();
            book.cover_images
                .retain(|image| remaining.contains(&image.image_id.as_str()));
            let remaining = book.cover_images.len();

            tracing::warn!(
                book_id = %book.id,
                destroyed = report.destroyed.len(),
                remaining,
                "book delete incomplete, keeping record with surviving images"
            );
            self.books.update(&book).await?;

            return match report.into_first_error() {
                Some(source) => Err(BookError::PartialDelete { remaining, source }),
                None => Ok(()),
            };
        }

        if !self.books.delete(id).await? {
            return Err(BookError::NotFound(id.clone()));
        }
        tracing::info!(book_id = %id, images = report.destroyed.len(), "book deleted");
        Ok(())
    }

    /// Filtered, sorted page of books.
    pub async fn list(&self, params: ListParams) -> Result<Vec<Book>, BookError> {
        let query = BookQuery::from_params(params, self.max_page_size)?;
        Ok(self.books.find(&query).await?)
    }

    /// Every book, newest first.
    pub async fn get_all(&self) -> Result<Vec<Book>, BookError> {
        Ok(self.books.find(&BookQuery::everything()).await?)
    }

    async fn upload(&self, files: Vec<StagedImage>) -> Result<Vec<CoverImage>, BookError> {
        let stored = upload_all(self.images.as_ref(), files).await?;
        Ok(stored.into_iter().map(CoverImage::from).collect())
    }

    async fn discard(&self, image_ids: &[String], context: &str) {
        let report = destroy_all(self.images.as_ref(), image_ids.iter().map(String::as_str)).await;
        report.log_orphans(context);
    }
}

fn image_ids(images: &[CoverImage]) -> Vec<String> {
    images.iter().map(|image| image.image_id.clone()).collect()
}
