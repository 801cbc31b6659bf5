use axum::{extract::Path, response::Response};

use crate::{
    catalog_pages, catalog_router, error::ApiResult, form::AuthorForm, rest_api::deleted,
    service::AuthorService,
};

catalog_pages!(AuthorService, AuthorForm, "/catalog/authors");
catalog_router!("/authors", "/author");

/// Refused with `409 Conflict` while the author has books.
pub async fn delete(Path(id): Path<i64>, service: AuthorService) -> ApiResult<Response> {
    let deletion = service.delete(id).await?;
    Ok(deleted(deletion, LIST_PATH))
}
