//! Sequential multi-image operations.
//!
//! Uploads are all-or-nothing: if any file fails, the images already uploaded in
//! the same batch are destroyed again before the error is returned. Deletes try
//! every id and report per-item outcomes so the caller can keep its records in
//! line with what is still live.

use crate::{
    error::MediaError,
    staged::StagedImage,
    store::{ImageStore, StoredImage},
};

/// Upload `images` in order, consuming them.
///
/// Each staged file is dropped (and its temp file removed) as soon as its upload
/// succeeds. Nothing is retried.
pub async fn upload_all(
    store: &dyn ImageStore,
    images: Vec<StagedImage>,
) -> Result<Vec<StoredImage>, MediaError> {
    let total = images.len();
    let mut uploaded = Vec::with_capacity(total);

    for (index, image) in images.into_iter().enumerate() {
        match store.upload(&image).await {
            Ok(stored) => {
                drop(image);
                uploaded.push(stored);
            }
            Err(err) => {
                tracing::warn!(
                    failed_at = index,
                    total,
                    error = %err,
                    "upload batch failed, rolling back"
                );
                let ids: Vec<&str> = uploaded.iter().map(|s: &StoredImage| s.id.as_str()).collect();
                let report = destroy_all(store, ids).await;
                report.log_orphans("upload rollback");
                return Err(err);
            }
        }
    }

    Ok(uploaded)
}

/// Outcome of [`destroy_all`].
#[derive(Debug, Default)]
pub struct DestroyReport {
    pub destroyed: Vec<String>,
    pub failed: Vec<(String, MediaError)>,
}

impl DestroyReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Ids that could not be destroyed and are therefore still live.
    pub fn remaining_ids(&self) -> impl Iterator<Item = &str> {
        self.failed.iter().map(|(id, _)| id.as_str())
    }

    /// Log every failure as an asset nothing references any more.
    pub fn log_orphans(&self, context: &str) {
        for (image_id, err) in &self.failed {
            tracing::warn!(image_id = %image_id, error = %err, context, "orphaned image");
        }
    }

    /// First failure, consuming the report.
    pub fn into_first_error(self) -> Option<MediaError> {
        self.failed.into_iter().next().map(|(_, err)| err)
    }
}

/// Destroy every id in order, attempting all of them.
pub async fn destroy_all<'a, I>(store: &dyn ImageStore, image_ids: I) -> DestroyReport
where
    I: IntoIterator<Item = &'a str>,
{
    let mut report = DestroyReport::default();
    for image_id in image_ids {
        match store.destroy(image_id).await {
            Ok(()) => report.destroyed.push(image_id.to_string()),
            Err(err) => report.failed.push((image_id.to_string(), err)),
        }
    }
    report
}
