use std::path::Path;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;

use crate::error::StageError;

const TEMP_PREFIX: &str = "coverImages_";

/// An uploaded file held on local disk until the image store has a durable copy.
///
/// The backing file is removed when the value is dropped, on success and error
/// paths alike.
#[derive(Debug)]
pub struct StagedImage {
    temp: NamedTempFile,
    content_type: String,
    file_name: Option<String>,
    size: u64,
}

impl StagedImage {
    /// Stream `body` into a new temporary file under `dir`.
    ///
    /// Fails with [`StageError::TooLarge`] as soon as more than `max_size` bytes
    /// arrive; the partial file is removed before returning.
    pub async fn stage<S, E>(
        dir: &Path,
        content_type: &str,
        file_name: Option<&str>,
        max_size: u64,
        body: S,
    ) -> Result<Self, StageError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: std::fmt::Display,
    {
        let temp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(&format!(".{}", extension_for(content_type)))
            .tempfile_in(dir)?;
        let mut file = tokio::fs::File::from_std(temp.as_file().try_clone()?);

        let mut size = 0u64;
        let mut body = std::pin::pin!(body);
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|err| StageError::Body(err.to_string()))?;
            size += chunk.len() as u64;
            if size > max_size {
                return Err(StageError::TooLarge { limit: max_size });
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        tracing::debug!(
            path = %temp.path().display(),
            content_type,
            size,
            "upload staged"
        );

        Ok(Self {
            temp,
            content_type: content_type.to_string(),
            file_name: file_name.map(str::to_string),
            size,
        })
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Name the client gave the file, if any.
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Extension derived from the MIME subtype, e.g. `png` for `image/png`.
    pub fn extension(&self) -> String {
        extension_for(&self.content_type)
    }
}

/// `image/svg+xml; charset=utf-8` -> `svg`; anything unusable -> `bin`.
pub(crate) fn extension_for(content_type: &str) -> String {
    let subtype = content_type
        .split(';')
        .next()
        .and_then(|essence| essence.split_once('/'))
        .map(|(_, subtype)| subtype.split('+').next().unwrap_or(subtype))
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if !subtype.is_empty() && subtype.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        subtype
    } else {
        "bin".to_string()
    }
}
