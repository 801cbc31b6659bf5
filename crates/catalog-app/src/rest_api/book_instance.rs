use axum::{
    extract::Path,
    response::{IntoResponse as _, Redirect, Response},
};

use crate::{
    catalog_pages, catalog_router, error::ApiResult, form::BookInstanceForm, service::Deletion,
    service::BookInstanceService,
};

catalog_pages!(
    BookInstanceService,
    BookInstanceForm,
    "/catalog/bookinstances"
);
catalog_router!("/bookinstances", "/bookinstance");

pub async fn delete(Path(id): Path<i64>, service: BookInstanceService) -> ApiResult<Response> {
    match service.delete(id).await? {
        Deletion::Deleted | Deletion::Missing => Ok(Redirect::to(LIST_PATH).into_response()),
        Deletion::Blocked(never) => match never {},
    }
}
