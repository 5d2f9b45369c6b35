use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use bookshelf_media::StoredImage;

use super::error::BookError;

/// Identifier assigned by the document store. Opaque to callers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(String);

impl BookId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BookId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A cover image owned by exactly one book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverImage {
    pub image_url: String,
    pub image_id: String,
}

impl From<StoredImage> for CoverImage {
    fn from(stored: StoredImage) -> Self {
        Self {
            image_url: stored.url,
            image_id: stored.id,
        }
    }
}

/// A book record as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    #[serde(rename = "_id")]
    pub id: BookId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(rename = "ISBN", default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default)]
    pub cover_images: Vec<CoverImage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Scalar fields of a create or update request. Blank input counts as absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookFields {
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub publication_date: Option<DateTime<Utc>>,
    pub genre: Option<String>,
}

impl BookFields {
    /// Overwrite the fields of `book` that this request provides; keep the rest.
    pub fn merge_into(self, book: &mut Book) {
        if let Some(title) = self.title {
            book.title = title;
        }
        if self.author.is_some() {
            book.author = self.author;
        }
        if self.isbn.is_some() {
            book.isbn = self.isbn;
        }
        if self.publication_date.is_some() {
            book.publication_date = self.publication_date;
        }
        if self.genre.is_some() {
            book.genre = self.genre;
        }
    }
}

/// A record ready to be inserted; the store assigns id and timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBook {
    pub title: String,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub publication_date: Option<DateTime<Utc>>,
    pub genre: Option<String>,
    pub cover_images: Vec<CoverImage>,
}

impl NewBook {
    /// Validate the request fields. Cover images are attached after upload.
    pub fn from_fields(fields: BookFields) -> Result<Self, BookError> {
        let title = fields
            .title
            .ok_or_else(|| BookError::invalid_field("title", "Title is required"))?;

        Ok(Self {
            title,
            author: fields.author,
            isbn: fields.isbn,
            publication_date: fields.publication_date,
            genre: fields.genre,
            cover_images: Vec::new(),
        })
    }

    pub fn with_cover_images(mut self, cover_images: Vec<CoverImage>) -> Self {
        self.cover_images = cover_images;
        self
    }
}

/// Trim `value` and drop it when nothing is left.
pub fn non_blank(value: impl AsRef<str>) -> Option<String> {
    let trimmed = value.as_ref().trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Accepts `YYYY-MM-DD` (midnight UTC) or a full RFC 3339 timestamp.
pub fn parse_publication_date(raw: &str) -> Result<DateTime<Utc>, BookError> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|_| {
            BookError::invalid_field(
                "publicationDate",
                format!("'{raw}' is not a date (expected YYYY-MM-DD)"),
            )
        })
}
