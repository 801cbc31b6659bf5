use axum::{
    extract::{DefaultBodyLimit, FromRequest, Request},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use axum_extra::extract::Form;
use http::{header, StatusCode};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    error::ApiResult,
    service::{Deletion, Submission, SummaryService},
    state::AppState,
};

pub mod author;
pub mod book;
pub mod book_instance;
pub mod genre;
pub mod macros;

/// Body of a submitted form, either urlencoded (repeated keys allowed)
/// or JSON, chosen by content type.
#[derive(Debug, Clone, Default)]
pub struct FormBody<T>(pub T);

impl<T> FromRequest<AppState> for FormBody<T>
where
    T: DeserializeOwned + Send,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));
        if is_json {
            let Json(value) = Json::<T>::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            Ok(FormBody(value))
        } else {
            let Form(value) = Form::<T>::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            Ok(FormBody(value))
        }
    }
}

pub(crate) fn created<F: Serialize, C: Serialize>(submission: Submission<F, C>) -> Response {
    match submission {
        Submission::Saved(saved) => (
            StatusCode::CREATED,
            [(header::LOCATION, saved.url.clone())],
            Json(saved),
        )
            .into_response(),
        Submission::Rejected(rejected) => {
            (StatusCode::UNPROCESSABLE_ENTITY, Json(rejected)).into_response()
        }
    }
}

pub(crate) fn updated<F: Serialize, C: Serialize>(submission: Submission<F, C>) -> Response {
    match submission {
        Submission::Saved(saved) => (StatusCode::OK, Json(saved)).into_response(),
        Submission::Rejected(rejected) => {
            (StatusCode::UNPROCESSABLE_ENTITY, Json(rejected)).into_response()
        }
    }
}

/// Confirmation data for a delete, missing records go back to the listing.
pub(crate) fn delete_form<T: Serialize>(record: Option<T>, list_path: &str) -> Response {
    match record {
        Some(record) => (StatusCode::OK, Json(record)).into_response(),
        None => Redirect::to(list_path).into_response(),
    }
}

pub(crate) fn deleted<D: Serialize>(deletion: Deletion<D>, list_path: &str) -> Response {
    match deletion {
        Deletion::Deleted | Deletion::Missing => Redirect::to(list_path).into_response(),
        Deletion::Blocked(dependents) => (StatusCode::CONFLICT, Json(dependents)).into_response(),
    }
}

async fn summary(service: SummaryService) -> ApiResult<impl IntoResponse> {
    let summary = service.summary().await?;
    Ok((StatusCode::OK, Json(summary)))
}

/// Catalog pages, to be nested under `/catalog`.
pub fn router(body_limit_kb: usize) -> Router<AppState> {
    Router::new()
        .route("/", get(summary))
        .merge(author::router())
        .merge(genre::router())
        .merge(book::router())
        .merge(book_instance::router())
        .layer(DefaultBodyLimit::max(body_limit_kb * 1024))
}
