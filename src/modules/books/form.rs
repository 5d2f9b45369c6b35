//! `multipart/form-data` intake for create and update requests.

use std::path::PathBuf;

use axum::extract::{multipart::Field, Multipart};
use bookshelf_kernel::settings::UploadSettings;
use bookshelf_media::StagedImage;

use super::error::BookError;
use super::models::{non_blank, parse_publication_date, BookFields};

/// Name of the file field carrying cover images.
pub const FILE_FIELD: &str = "coverImages";

/// Allowance for the text fields and multipart framing on top of the files.
const FORM_OVERHEAD: usize = 64 * 1024;

/// Limits applied to incoming cover image uploads.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub dir: PathBuf,
    pub max_files: usize,
    pub max_file_size: u64,
    pub allowed_mime_prefixes: Vec<String>,
}

impl UploadPolicy {
    pub fn from_settings(settings: &UploadSettings) -> Self {
        Self {
            dir: settings.dir.clone(),
            max_files: settings.max_files,
            max_file_size: settings.max_file_size,
            allowed_mime_prefixes: settings.allowed_mime_prefixes.clone(),
        }
    }

    /// Largest request body a well-formed upload can need.
    pub fn body_limit(&self) -> usize {
        let per_file = usize::try_from(self.max_file_size).unwrap_or(usize::MAX);
        per_file
            .saturating_mul(self.max_files)
            .saturating_add(FORM_OVERHEAD)
    }

    pub fn accepts(&self, content_type: &str) -> bool {
        self.allowed_mime_prefixes
            .iter()
            .any(|prefix| content_type.starts_with(prefix.as_str()))
    }
}

/// Parsed form: scalar fields plus the files staged on disk.
#[derive(Debug, Default)]
pub struct BookForm {
    pub fields: BookFields,
    pub files: Vec<StagedImage>,
}

/// Read every part of `multipart`, staging files as they stream in.
///
/// Unknown text fields are ignored, as is a `coverImages` part without a
/// filename; unknown file fields are rejected. Files staged before an error
/// are removed when the partial form is dropped.
pub async fn read_book_form(
    mut multipart: Multipart,
    policy: &UploadPolicy,
) -> Result<BookForm, BookError> {
    let mut form = BookForm::default();

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_string();

        if name == FILE_FIELD && field.file_name().is_some() {
            if form.files.len() >= policy.max_files {
                return Err(BookError::invalid_field(
                    FILE_FIELD,
                    format!("Too many files; at most {} allowed", policy.max_files),
                ));
            }
            form.files.push(stage_file(field, policy).await?);
            continue;
        }

        if field.file_name().is_some() {
            return Err(BookError::invalid_field(FILE_FIELD, format!("Unexpected file field '{name}'")));
        }

        let target = match name.as_str() {
            "title" => &mut form.fields.title,
            "author" => &mut form.fields.author,
            "ISBN" => &mut form.fields.isbn,
            "genre" => &mut form.fields.genre,
            "publicationDate" => {
                let text = field.text().await.map_err(malformed)?;
                if let Some(raw) = non_blank(&text) {
                    form.fields.publication_date = Some(parse_publication_date(&raw)?);
                }
                continue;
            }
            other => {
                tracing::debug!(field = other, "ignoring unknown form field");
                continue;
            }
        };
        *target = non_blank(field.text().await.map_err(malformed)?);
    }

    Ok(form)
}

async fn stage_file(field: Field<'_>, policy: &UploadPolicy) -> Result<StagedImage, BookError> {
    let content_type = field.content_type().unwrap_or_default().to_string();
    if !policy.accepts(&content_type) {
        return Err(BookError::invalid_field(FILE_FIELD, "Invalid file format: Image Only"));
    }
    let file_name = field.file_name().map(str::to_string);

    Ok(StagedImage::stage(
        &policy.dir,
        &content_type,
        file_name.as_deref(),
        policy.max_file_size,
        field,
    )
    .await?)
}

fn malformed(err: axum::extract::multipart::MultipartError) -> BookError {
    BookError::invalid(format!("Malformed multipart body: {}", err.body_text()))
}
