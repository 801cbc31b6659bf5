pub mod error;
pub mod form;
pub mod rest_api;
pub mod service;
pub mod state;

/// Lets a service be taken directly as a handler argument, built on top of
/// the shared connection pool.
#[macro_export]
macro_rules! service_from_request {
    ($service:ty) => {
        impl axum::extract::FromRequestParts<$crate::state::AppState> for $service {
            type Rejection = http::StatusCode;

            fn from_request_parts(
                _parts: &mut http::request::Parts,
                state: &$crate::state::AppState,
            ) -> impl std::future::Future<Output = std::result::Result<Self, Self::Rejection>>
                   + core::marker::Send {
                futures::future::ready(std::result::Result::Ok(<$service>::new(
                    state.pool().clone(),
                )))
            }
        }
    };
}
