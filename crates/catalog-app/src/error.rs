use axum::{
    response::{IntoResponse, Response},
    Json,
};
use http::StatusCode;
use serde_json::json;

pub type Result<T, E = Error> = std::result::Result<T, E>;
pub type ApiResult<T> = Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Store error: {0}")]
    Store(#[from] catalog_dal::Error),
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound(_) => (
                StatusCode::NOT_FOUND,
                Json(json!({"error": self.to_string()})),
            )
                .into_response(),
            Error::Store(e) => {
                tracing::error!("Store failure: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": "Internal server error"})),
                )
                    .into_response()
            }
        }
    }
}
