use axum::{extract::Path, response::Response};

use crate::{
    catalog_pages, catalog_router, error::ApiResult, form::BookForm, rest_api::deleted,
    service::BookService,
};

catalog_pages!(BookService, BookForm, "/catalog/books");
catalog_router!("/books", "/book");

/// Refused with `409 Conflict` while copies of the book exist.
pub async fn delete(Path(id): Path<i64>, service: BookService) -> ApiResult<Response> {
    let deletion = service.delete(id).await?;
    Ok(deleted(deletion, LIST_PATH))
}
