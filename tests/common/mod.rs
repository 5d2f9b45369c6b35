//! Shared harness: the full router over in-memory backends.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use bookshelf_app::{modules::books::repository::MemoryBookRepository, App};
use bookshelf_kernel::settings::{DatabaseDriver, MediaBackend, Settings};
use bookshelf_media::ObjectImageStore;
use object_store::memory::InMemory;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

pub const BOUNDARY: &str = "bookshelf-test-boundary";
pub const PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake-cover";

pub struct TestApp {
    pub router: Router,
    pub images: Arc<ObjectImageStore>,
    pub books: Arc<MemoryBookRepository>,
    uploads: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_settings(|_| {}).await
    }

    pub async fn with_settings(adjust: impl FnOnce(&mut Settings)) -> Self {
        let uploads = tempfile::tempdir().unwrap();

        let mut settings = Settings::default();
        settings.database.driver = DatabaseDriver::Memory;
        settings.media.backend = MediaBackend::Memory;
        settings.uploads.dir = uploads.path().to_path_buf();
        adjust(&mut settings);

        let images = Arc::new(ObjectImageStore::new(
            Arc::new(InMemory::new()),
            "covers",
            "https://images.test",
        ));
        let books = Arc::new(MemoryBookRepository::new());

        let app = App::with_backends(settings, books.clone(), images.clone());
        app.init().await.unwrap();

        Self {
            router: app.router(),
            images,
            books,
            uploads,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::delete(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn post_form(&self, uri: &str, form: Form) -> (StatusCode, Value) {
        self.send(form.into_request(Request::post(uri))).await
    }

    pub async fn put_form(&self, uri: &str, form: Form) -> (StatusCode, Value) {
        self.send(form.into_request(Request::put(uri))).await
    }

    /// Create a book with one cover and return the response `data`.
    pub async fn create(&self, title: &str, author: &str, genre: &str) -> Value {
        let form = Form::new()
            .text("title", title)
            .text("author", author)
            .text("genre", genre)
            .file("coverImages", "cover.png", "image/png", PNG);
        let (status, body) = self.post_form("/books/createbook", form).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"].clone()
    }

    pub async fn image_exists(&self, image_id: &str) -> bool {
        self.images.exists(image_id).await.unwrap()
    }

    /// Files still sitting in the staging directory.
    pub fn staged_files(&self) -> usize {
        std::fs::read_dir(self.uploads.path()).unwrap().count()
    }
}

/// Minimal `multipart/form-data` body builder.
#[derive(Default)]
pub struct Form {
    body: Vec<u8>,
}

impl Form {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, content: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(content);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn into_request(mut self, builder: axum::http::request::Builder) -> Request<Body> {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        builder
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(self.body))
            .unwrap()
    }
}

pub fn image_ids(book: &Value) -> Vec<String> {
    book["coverImages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|image| image["imageId"].as_str().unwrap().to_string())
        .collect()
}
