use std::{future::Future, sync::Arc};

use axum::{
    extract::{multipart::MultipartRejection, rejection::QueryRejection, Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use bookshelf_http::{AppError, Envelope};

use super::error::BookError;
use super::form::{read_book_form, BookForm, UploadPolicy};
use super::models::{Book, BookId};
use super::query::ListParams;
use super::service::BookService;

/// Shared state of the books routes.
#[derive(Clone)]
pub struct BooksState {
    pub service: Arc<BookService>,
    pub uploads: Arc<UploadPolicy>,
}

/// A request that is not `multipart/form-data` carries no fields and no files.
async fn form_or_empty(
    multipart: Result<Multipart, MultipartRejection>,
    policy: &UploadPolicy,
) -> Result<BookForm, BookError> {
    match multipart {
        Ok(multipart) => read_book_form(multipart, policy).await,
        Err(rejection) => {
            tracing::debug!(reason = %rejection.body_text(), "request body is not multipart");
            Ok(BookForm::default())
        }
    }
}

/// Run a mutation on its own task. It completes even if the request is dropped.
async fn run_detached<T, F>(work: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, BookError>> + Send + 'static,
    T: Send + 'static,
{
    let outcome = tokio::spawn(work)
        .await
        .map_err(|err| anyhow::Error::new(err).context("book operation task failed"))?;
    Ok(outcome?)
}

pub async fn create_book(
    State(state): State<BooksState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Envelope<Book>), AppError> {
    let form = form_or_empty(multipart, &state.uploads).await?;
    let service = state.service.clone();
    let book = run_detached(async move { service.create(form.fields, form.files).await }).await?;
    Ok((
        StatusCode::CREATED,
        Envelope::with_data("Book created successfully", book),
    ))
}

pub async fn list_all_books(
    State(state): State<BooksState>,
) -> Result<Envelope<Vec<Book>>, AppError> {
    let books = state.service.get_all().await?;
    Ok(Envelope::with_data("Books fetched successfully", books))
}

pub async fn get_book(
    State(state): State<BooksState>,
    Path(id): Path<String>,
) -> Result<Envelope<Book>, AppError> {
    let book = state.service.get_by_id(&BookId::new(id)).await?;
    Ok(Envelope::with_data("Book fetched successfully", book))
}

pub async fn update_book(
    State(state): State<BooksState>,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Envelope<Book>, AppError> {
    let form = form_or_empty(multipart, &state.uploads).await?;
    let service = state.service.clone();
    let book = run_detached(async move {
        service
            .update(&BookId::new(id), form.fields, form.files)
            .await
    })
    .await?;
    Ok(Envelope::with_data("Book updated successfully", book))
}

pub async fn delete_book(
    State(state): State<BooksState>,
    Path(id): Path<String>,
) -> Result<Envelope<()>, AppError> {
    let service = state.service.clone();
    run_detached(async move { service.delete(&BookId::new(id)).await }).await?;
    Ok(Envelope::message("Book deleted successfully"))
}

/// Filtered listing; answers with a bare array.
pub async fn search_books(
    State(state): State<BooksState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<Book>>, AppError> {
    let Query(params) =
        params.map_err(|rejection| AppError::validation(vec![], rejection.body_text()))?;
    let books = state.service.list(params).await?;
    Ok(Json(books))
}
