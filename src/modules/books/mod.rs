pub mod error;
pub mod form;
pub mod handlers;
pub mod models;
pub mod query;
pub mod repository;
pub mod service;

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use bookshelf_kernel::{IndexOrder, InitCtx, Migration, Module};
use serde_json::json;

use form::UploadPolicy;
use handlers::BooksState;
use service::BookService;

/// Book catalogue: CRUD over records whose cover images live in the image store.
pub struct BooksModule {
    state: BooksState,
}

impl BooksModule {
    pub fn new(service: Arc<BookService>, uploads: UploadPolicy) -> Self {
        Self {
            state: BooksState {
                service,
                uploads: Arc::new(uploads),
            },
        }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    fn mount_path(&self) -> String {
        "/books".to_string()
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let dir = &self.state.uploads.dir;
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("failed to create upload directory {}", dir.display()))?;

        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            upload_dir = %dir.display(),
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        let upload_limit = DefaultBodyLimit::max(self.state.uploads.body_limit());

        Router::new()
            .route("/", get(handlers::list_all_books))
            .route("/createbook", post(handlers::create_book))
            .route("/getbook/{id}", get(handlers::get_book))
            .route("/update/{id}", put(handlers::update_book))
            .route("/delete/{id}", delete(handlers::delete_book))
            .route("/book", get(handlers::search_books))
            .layer(upload_limit)
            .with_state(self.state.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(openapi_fragment(&self.state.uploads))
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![
            Migration {
                id: "books_created_at",
                collection: repository::COLLECTION,
                keys: &[("createdAt", IndexOrder::Descending)],
                unique: false,
            },
            Migration {
                id: "books_genre",
                collection: repository::COLLECTION,
                keys: &[("genre", IndexOrder::Ascending)],
                unique: false,
            },
        ]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

fn openapi_fragment(uploads: &UploadPolicy) -> serde_json::Value {
    let error = |description: &str| {
        json!({
            "description": description,
            "content": {
                "application/json": {
                    "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                }
            }
        })
    };
    let envelope = |description: &str, data: serde_json::Value| {
        json!({
            "description": description,
            "content": {
                "application/json": {
                    "schema": {
                        "type": "object",
                        "properties": {
                            "message": { "type": "string" },
                            "data": data
                        },
                        "required": ["message"]
                    }
                }
            }
        })
    };
    let book_ref = json!({ "$ref": "#/components/schemas/Book" });
    let book_list = json!({ "type": "array", "items": { "$ref": "#/components/schemas/Book" } });
    let id_param = json!({
        "name": "id",
        "in": "path",
        "required": true,
        "schema": { "type": "string" },
        "description": "Book id"
    });
    let form = |required: Vec<&str>| {
        json!({
            "required": !required.is_empty(),
            "content": {
                "multipart/form-data": {
                    "schema": {
                        "type": "object",
                        "required": required,
                        "properties": {
                            "title": { "type": "string", "example": "Atomic Habits" },
                            "author": { "type": "string", "example": "James Clear" },
                            "ISBN": { "type": "string", "example": "9780735211292" },
                            "publicationDate": { "type": "string", "format": "date", "example": "2018-10-16" },
                            "genre": { "type": "string", "example": "Self-help" },
                            "coverImages": {
                                "type": "array",
                                "maxItems": uploads.max_files,
                                "items": { "type": "string", "format": "binary" },
                                "description": format!(
                                    "Up to {} files of at most {} bytes each",
                                    uploads.max_files, uploads.max_file_size
                                )
                            }
                        }
                    }
                }
            }
        })
    };
    let query_param = |name: &str, schema: serde_json::Value, description: &str| {
        json!({ "name": name, "in": "query", "required": false, "schema": schema, "description": description })
    };

    json!({
        "paths": {
            "/": {
                "get": {
                    "summary": "List every book, newest first",
                    "tags": ["Books"],
                    "responses": {
                        "200": envelope("Books fetched successfully", book_list.clone()),
                        "500": error("Internal server error")
                    }
                }
            },
            "/createbook": {
                "post": {
                    "summary": "Create a book with cover images",
                    "tags": ["Books"],
                    "requestBody": form(vec!["title", "coverImages"]),
                    "responses": {
                        "201": envelope("Book created successfully", book_ref.clone()),
                        "400": error("Missing title, no files, or a rejected file"),
                        "500": error("Internal server error")
                    }
                }
            },
            "/getbook/{id}": {
                "get": {
                    "summary": "Fetch one book",
                    "tags": ["Books"],
                    "parameters": [id_param.clone()],
                    "responses": {
                        "200": envelope("Book fetched successfully", book_ref.clone()),
                        "404": error("Book not found"),
                        "500": error("Internal server error")
                    }
                }
            },
            "/update/{id}": {
                "put": {
                    "summary": "Update a book and replace its cover images",
                    "tags": ["Books"],
                    "parameters": [id_param.clone()],
                    "requestBody": form(vec![]),
                    "responses": {
                        "200": envelope("Book updated successfully", book_ref),
                        "400": error("Rejected file"),
                        "404": error("Book not found"),
                        "500": error("Internal server error")
                    }
                }
            },
            "/delete/{id}": {
                "delete": {
                    "summary": "Delete a book and its cover images",
                    "tags": ["Books"],
                    "parameters": [id_param],
                    "responses": {
                        "200": {
                            "description": "Book deleted successfully",
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "object",
                                        "properties": { "message": { "type": "string" } },
                                        "required": ["message"]
                                    }
                                }
                            }
                        },
                        "404": error("Book not found"),
                        "500": error("Internal server error")
                    }
                }
            },
            "/book": {
                "get": {
                    "summary": "Search, filter, sort and page books",
                    "tags": ["Books"],
                    "parameters": [
                        query_param("page", json!({ "type": "integer", "minimum": 1, "default": 1 }), "Page number"),
                        query_param("limit", json!({ "type": "integer", "minimum": 1, "default": 10 }), "Page size"),
                        query_param("search", json!({ "type": "string" }), "Case-insensitive text in title or author"),
                        query_param("genre", json!({ "type": "string" }), "Exact genre"),
                        query_param(
                            "sortBy",
                            json!({
                                "type": "string",
                                "default": "createdAt",
                                "enum": ["createdAt", "updatedAt", "title", "author", "genre", "ISBN", "publicationDate"]
                            }),
                            "Sort field"
                        ),
                        query_param("order", json!({ "type": "string", "enum": ["asc", "desc"], "default": "desc" }), "Sort direction")
                    ],
                    "responses": {
                        "200": {
                            "description": "Matching books",
                            "content": { "application/json": { "schema": book_list } }
                        },
                        "400": error("Invalid query parameter"),
                        "500": error("Internal server error")
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "CoverImage": {
                    "type": "object",
                    "properties": {
                        "imageUrl": { "type": "string" },
                        "imageId": { "type": "string" }
                    },
                    "required": ["imageUrl", "imageId"]
                },
                "Book": {
                    "type": "object",
                    "properties": {
                        "_id": { "type": "string", "example": "6652e212bca21e6e48793c3e" },
                        "title": { "type": "string" },
                        "author": { "type": "string" },
                        "ISBN": { "type": "string" },
                        "publicationDate": { "type": "string", "format": "date-time" },
                        "genre": { "type": "string" },
                        "coverImages": {
                            "type": "array",
                            "items": { "$ref": "#/components/schemas/CoverImage" }
                        },
                        "createdAt": { "type": "string", "format": "date-time" },
                        "updatedAt": { "type": "string", "format": "date-time" }
                    },
                    "required": ["_id", "title", "coverImages", "createdAt", "updatedAt"]
                }
            }
        }
    })
}

/// Create the books module over the given service.
pub fn create_module(service: Arc<BookService>, uploads: UploadPolicy) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(service, uploads))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookshelf_kernel::settings::UploadSettings;

    #[test]
    fn openapi_fragment_documents_every_route() {
        let fragment = openapi_fragment(&UploadPolicy::from_settings(&UploadSettings::default()));
        let paths = fragment["paths"].as_object().unwrap();

        for path in ["/", "/createbook", "/getbook/{id}", "/update/{id}", "/delete/{id}", "/book"] {
            assert!(paths.contains_key(path), "{path} missing");
        }
        assert_eq!(
            fragment["paths"]["/createbook"]["post"]["requestBody"]["content"]["multipart/form-data"]
                ["schema"]["properties"]["coverImages"]["maxItems"],
            5
        );
        assert!(fragment["components"]["schemas"]["Book"].is_object());
    }
}
