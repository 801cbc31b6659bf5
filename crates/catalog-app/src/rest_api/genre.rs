use axum::{extract::Path, response::Response};

use crate::{
    catalog_pages, catalog_router, error::ApiResult, form::GenreForm, rest_api::deleted,
    service::GenreService,
};

catalog_pages!(GenreService, GenreForm, "/catalog/genres");
catalog_router!("/genres", "/genre");

pub async fn delete(Path(id): Path<i64>, service: GenreService) -> ApiResult<Response> {
    let deletion = service.delete(id).await?;
    Ok(deleted(deletion, LIST_PATH))
}
