/// Handlers shared by all catalog entities, generated into module `pages`.
///
/// Deletion differs between entities in what can block it, so every
/// entity module provides its own `delete` handler.
#[macro_export]
macro_rules! catalog_pages {
    ($service:ty, $form:ty, $list_path:expr) => {
        pub const LIST_PATH: &str = $list_path;

        pub mod pages {
            use super::*;
            use crate::{
                error::ApiResult,
                rest_api::{created, delete_form, updated, FormBody},
            };
            use axum::{
                extract::Path,
                response::{IntoResponse, Response},
                Json,
            };
            use http::StatusCode;

            pub async fn list(service: $service) -> ApiResult<impl IntoResponse> {
                let records = service.list().await?;
                Ok((StatusCode::OK, Json(records)))
            }

            pub async fn get(
                Path(id): Path<i64>,
                service: $service,
            ) -> ApiResult<impl IntoResponse> {
                let record = service.get(id).await?;
                Ok((StatusCode::OK, Json(record)))
            }

            pub async fn create_form(service: $service) -> ApiResult<impl IntoResponse> {
                let page = service.prepare_create_form().await?;
                Ok((StatusCode::OK, Json(page)))
            }

            pub async fn create(
                service: $service,
                FormBody(form): FormBody<$form>,
            ) -> ApiResult<Response> {
                let submission = service.create(form).await?;
                Ok(created(submission))
            }

            pub async fn update_form(
                Path(id): Path<i64>,
                service: $service,
            ) -> ApiResult<impl IntoResponse> {
                let page = service.prepare_update_form(id).await?;
                Ok((StatusCode::OK, Json(page)))
            }

            pub async fn update(
                Path(id): Path<i64>,
                service: $service,
                FormBody(form): FormBody<$form>,
            ) -> ApiResult<Response> {
                let submission = service.update(id, form).await?;
                Ok(updated(submission))
            }

            pub async fn delete_confirm(
                Path(id): Path<i64>,
                service: $service,
            ) -> ApiResult<Response> {
                let record = service.prepare_delete(id).await?;
                Ok(delete_form(record, LIST_PATH))
            }
        }
    };
}

/// Routes of one entity: listing at `$list`, records under `$entity`.
#[macro_export]
macro_rules! catalog_router {
    ($list:literal, $entity:literal) => {
        pub fn router() -> axum::Router<crate::state::AppState> {
            use axum::routing::get;
            axum::Router::new()
                .route($list, get(pages::list))
                .route(
                    concat!($entity, "/create"),
                    get(pages::create_form).post(pages::create),
                )
                .route(concat!($entity, "/{id}"), get(pages::get))
                .route(
                    concat!($entity, "/{id}/update"),
                    get(pages::update_form).post(pages::update),
                )
                .route(
                    concat!($entity, "/{id}/delete"),
                    get(pages::delete_confirm).post(delete),
                )
        }
    };
}
