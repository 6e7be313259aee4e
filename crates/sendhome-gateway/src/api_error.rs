//! `GameError` as an HTTP response: status code plus `{ "code", "message" }`,
//! and a JSON body extractor whose rejections use the same shape.

use axum::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use sendhome_core::GameError;
use serde::Serialize;

#[derive(Debug)]
pub struct ApiError(pub GameError);

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    message: String,
}

impl From<GameError> for ApiError {
    fn from(err: GameError) -> Self {
        Self(err)
    }
}

pub fn status_for(err: &GameError) -> StatusCode {
    match err {
        GameError::NotFound(_) => StatusCode::NOT_FOUND,
        GameError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        GameError::ResourceExhausted(_) => StatusCode::TOO_MANY_REQUESTS,
        GameError::FailedPrecondition(_) => StatusCode::CONFLICT,
        GameError::Cancelled(_) | GameError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::debug!(error = %self.0, "request rejected");
        }
        let body = ErrorBody {
            code: self.0.code(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// `Json<T>` whose rejection (bad syntax, missing field, unknown decision kind,
/// wrong content type) is an `invalid_argument` error.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError(GameError::InvalidArgument(rejection.body_text()))),
        }
    }
}
