use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{
    bson::{self, doc, oid::ObjectId, Document},
    Collection, Database,
};
use serde::{Deserialize, Serialize};

use super::{BookRepository, RepositoryError, COLLECTION};
use crate::modules::books::{
    models::{Book, BookId, CoverImage, NewBook},
    query::{escape_pattern, BookQuery},
};

/// Stored shape of a book.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    author: Option<String>,
    #[serde(rename = "ISBN", default, skip_serializing_if = "Option::is_none")]
    isbn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    publication_date: Option<bson::DateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    genre: Option<String>,
    #[serde(default)]
    cover_images: Vec<CoverImage>,
    created_at: bson::DateTime,
    updated_at: bson::DateTime,
}

impl BookDocument {
    fn from_book(id: ObjectId, book: &Book) -> Self {
        Self {
            id,
            title: book.title.clone(),
            author: book.author.clone(),
            isbn: book.isbn.clone(),
            publication_date: book.publication_date.map(to_bson),
            genre: book.genre.clone(),
            cover_images: book.cover_images.clone(),
            created_at: to_bson(book.created_at),
            updated_at: to_bson(book.updated_at),
        }
    }
}

impl TryFrom<BookDocument> for Book {
    type Error = RepositoryError;

    fn try_from(doc: BookDocument) -> Result<Self, Self::Error> {
        let id = doc.id.to_hex();
        let convert = |at: bson::DateTime| {
            DateTime::<Utc>::from_timestamp_millis(at.timestamp_millis()).ok_or_else(|| {
                RepositoryError::Corrupt {
                    id: id.clone(),
                    reason: format!("timestamp {} out of range", at.timestamp_millis()),
                }
            })
        };

        Ok(Book {
            publication_date: doc.publication_date.map(convert).transpose()?,
            created_at: convert(doc.created_at)?,
            updated_at: convert(doc.updated_at)?,
            id: BookId::new(id),
            title: doc.title,
            author: doc.author,
            isbn: doc.isbn,
            genre: doc.genre,
            cover_images: doc.cover_images,
        })
    }
}

/// [`BookRepository`] over a MongoDB collection.
#[derive(Clone)]
pub struct MongoBookRepository {
    collection: Collection<BookDocument>,
}

impl MongoBookRepository {
    pub fn new(database: &Database) -> Self {
        Self {
            collection: database.collection(COLLECTION),
        }
    }
}

#[async_trait]
impl BookRepository for MongoBookRepository {
    async fn insert(&self, book: NewBook) -> Result<Book, RepositoryError> {
        let now = bson::DateTime::now();
        let document = BookDocument {
            id: ObjectId::new(),
            title: book.title,
            author: book.author,
            isbn: book.isbn,
            publication_date: book.publication_date.map(to_bson),
            genre: book.genre,
            cover_images: book.cover_images,
            created_at: now,
            updated_at: now,
        };

        self.collection.insert_one(&document).await?;
        tracing::debug!(book_id = %document.id, "book inserted");
        document.try_into()
    }

    async fn find_by_id(&self, id: &BookId) -> Result<Option<Book>, RepositoryError> {
        let Some(oid) = object_id(id) else {
            return Ok(None);
        };
        self.collection
            .find_one(doc! { "_id": oid })
            .await?
            .map(Book::try_from)
            .transpose()
    }

    async fn update(&self, book: &Book) -> Result<Option<Book>, RepositoryError> {
        let Some(oid) = object_id(&book.id) else {
            return Ok(None);
        };
        let mut document = BookDocument::from_book(oid, book);
        document.updated_at = bson::DateTime::now();

        let result = self
            .collection
            .replace_one(doc! { "_id": oid }, &document)
            .await?;
        if result.matched_count == 0 {
            return Ok(None);
        }
        document.try_into().map(Some)
    }

    async fn delete(&self, id: &BookId) -> Result<bool, RepositoryError> {
        let Some(oid) = object_id(id) else {
            return Ok(false);
        };
        let result = self.collection.delete_one(doc! { "_id": oid }).await?;
        Ok(result.deleted_count > 0)
    }

    async fn find(&self, query: &BookQuery) -> Result<Vec<Book>, RepositoryError> {
        let mut find = self
            .collection
            .find(filter_for(query))
            .sort(sort_for(query));
        if let Some(page) = query.page {
            find = find
                .skip(page.skip())
                .limit(i64::try_from(page.limit).unwrap_or(i64::MAX));
        }

        let documents: Vec<BookDocument> = find.await?.try_collect().await?;
        documents.into_iter().map(Book::try_from).collect()
    }
}

fn object_id(id: &BookId) -> Option<ObjectId> {
    ObjectId::parse_str(id.as_str()).ok()
}

fn to_bson(at: DateTime<Utc>) -> bson::DateTime {
    bson::DateTime::from_millis(at.timestamp_millis())
}

fn filter_for(query: &BookQuery) -> Document {
    let mut filter = Document::new();
    if let Some(search) = &query.search {
        let pattern = escape_pattern(search);
        filter.insert(
            "$or",
            vec![
                doc! { "title": { "$regex": pattern.as_str(), "$options": "i" } },
                doc! { "author": { "$regex": pattern.as_str(), "$options": "i" } },
            ],
        );
    }
    if let Some(genre) = &query.genre {
        filter.insert("genre", genre.as_str());
    }
    filter
}

fn sort_for(query: &BookQuery) -> Document {
    let direction = query.order.as_i32();
    let mut sort = Document::new();
    sort.insert(query.sort.key(), direction);
    sort.insert("_id", direction);
    sort
}
