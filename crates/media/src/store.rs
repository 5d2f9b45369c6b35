use std::sync::Arc;

use async_trait::async_trait;
use bookshelf_kernel::settings::{MediaBackend, MediaSettings};
use object_store::{
    aws::AmazonS3Builder, local::LocalFileSystem, memory::InMemory, path::Path, Attribute,
    Attributes, ObjectStore, PutOptions, PutPayload,
};
use uuid::Uuid;

use crate::{error::MediaError, staged::StagedImage};

/// A durable copy of an uploaded image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    /// Publicly reachable URL.
    pub url: String,
    /// Identifier used to delete the asset later.
    pub id: String,
}

/// Remote home of cover images.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Copy a staged file to the store.
    async fn upload(&self, image: &StagedImage) -> Result<StoredImage, MediaError>;

    /// Remove an asset. Removing an asset that is already gone succeeds.
    async fn destroy(&self, image_id: &str) -> Result<(), MediaError>;
}

/// [`ImageStore`] over any `object_store` backend.
pub struct ObjectImageStore {
    store: Arc<dyn ObjectStore>,
    key_prefix: String,
    public_base_url: String,
    content_type_attributes: bool,
}

impl ObjectImageStore {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        key_prefix: impl Into<String>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            key_prefix: key_prefix.into().trim_matches('/').to_string(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            content_type_attributes: false,
        }
    }

    /// Record the MIME type as an object attribute. Only some backends support it.
    pub fn with_content_type_attributes(mut self, enabled: bool) -> Self {
        self.content_type_attributes = enabled;
        self
    }

    /// Build the store selected by configuration.
    pub async fn from_settings(settings: &MediaSettings) -> Result<Self, MediaError> {
        let (store, attributes): (Arc<dyn ObjectStore>, bool) = match settings.backend {
            MediaBackend::Memory => (Arc::new(InMemory::new()), true),
            MediaBackend::Local => {
                tokio::fs::create_dir_all(&settings.local_root)
                    .await
                    .map_err(|err| {
                        MediaError::Config(format!(
                            "cannot create {}: {err}",
                            settings.local_root.display()
                        ))
                    })?;
                (
                    Arc::new(LocalFileSystem::new_with_prefix(&settings.local_root)?),
                    false,
                )
            }
            MediaBackend::S3 => {
                let s3 = &settings.s3;
                let bucket = s3.bucket.as_deref().ok_or_else(|| {
                    MediaError::Config("media.s3.bucket is required for the s3 backend".into())
                })?;

                let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);
                if let Some(region) = &s3.region {
                    builder = builder.with_region(region);
                }
                if let Some(endpoint) = &s3.endpoint {
                    builder = builder
                        .with_endpoint(endpoint)
                        .with_allow_http(endpoint.starts_with("http://"));
                }
                if let Some(key) = &s3.access_key_id {
                    builder = builder.with_access_key_id(key);
                }
                if let Some(secret) = &s3.secret_access_key {
                    builder = builder.with_secret_access_key(secret);
                }
                (Arc::new(builder.build()?), true)
            }
        };

        tracing::info!(
            backend = ?settings.backend,
            base_url = %settings.public_base_url,
            "image store ready"
        );

        Ok(Self::new(store, &settings.key_prefix, &settings.public_base_url)
            .with_content_type_attributes(attributes))
    }

    /// Whether an asset with this id currently exists.
    pub async fn exists(&self, image_id: &str) -> Result<bool, MediaError> {
        let location = parse_id(image_id)?;
        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    fn new_key(&self, extension: &str) -> String {
        let name = format!("{}.{}", Uuid::now_v7(), extension);
        if self.key_prefix.is_empty() {
            name
        } else {
            format!("{}/{}", self.key_prefix, name)
        }
    }

    fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }
}

#[async_trait]
impl ImageStore for ObjectImageStore {
    async fn upload(&self, image: &StagedImage) -> Result<StoredImage, MediaError> {
        let bytes = tokio::fs::read(image.path())
            .await
            .map_err(|source| MediaError::Read {
                path: image.path().to_path_buf(),
                source,
            })?;

        let key = self.new_key(&image.extension());
        let location = parse_id(&key)?;

        let mut options = PutOptions::default();
        if self.content_type_attributes {
            let mut attributes = Attributes::new();
            attributes.insert(Attribute::ContentType, image.content_type().to_string().into());
            options.attributes = attributes;
        }

        self.store
            .put_opts(&location, PutPayload::from(bytes), options)
            .await?;

        tracing::debug!(
            image_id = %key,
            file_name = image.file_name().unwrap_or_default(),
            size = image.size(),
            "image uploaded"
        );
        Ok(StoredImage {
            url: self.url_for(&key),
            id: key,
        })
    }

    async fn destroy(&self, image_id: &str) -> Result<(), MediaError> {
        let location = parse_id(image_id)?;
        match self.store.delete(&location).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => {
                tracing::debug!(image_id, "image destroyed");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}

fn parse_id(image_id: &str) -> Result<Path, MediaError> {
    if image_id.is_empty() {
        return Err(MediaError::InvalidId(image_id.to_string()));
    }
    Path::parse(image_id).map_err(|_| MediaError::InvalidId(image_id.to_string()))
}
