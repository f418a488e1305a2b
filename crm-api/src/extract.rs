/// Request extractors that reject with [`ApiError`]
///
/// Drop-in replacements for axum's `Json`, `Path` and `Query`. A body,
/// path segment or query string that fails to parse produces the usual JSON
/// error envelope instead of axum's plain-text rejection.

use crate::error::ApiError;
use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Request},
    response::{IntoResponse, Response},
};
use serde::{de::DeserializeOwned, Serialize};

/// JSON request body, also usable as a JSON response
#[derive(Debug, Clone, Copy, Default, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// Path parameters
#[derive(Debug, Clone, Copy, Default, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct Path<T>(pub T);

/// Query string parameters
#[derive(Debug, Clone, Copy, Default, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct Query<T>(pub T);

/// JSON body that may be absent
///
/// An empty body yields `None`. A body that is present but not valid JSON
/// for `T` is rejected like [`Json`] would reject it.
#[derive(Debug, Clone, Default)]
pub struct OptionalJson<T>(pub Option<T>);

#[async_trait]
impl<T, S> FromRequest<S> for OptionalJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(OptionalJson(None));
        }

        let axum::Json(value) = axum::Json::<T>::from_bytes(&bytes)?;
        Ok(OptionalJson(Some(value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct ReadFlag {
        read: bool,
    }

    fn request(body: &'static str) -> Request {
        Request::builder()
            .method("PATCH")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_optional_json_empty_body_is_none() {
        let OptionalJson(value) = OptionalJson::<ReadFlag>::from_request(request(""), &())
            .await
            .unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_optional_json_parses_present_body() {
        let OptionalJson(value) =
            OptionalJson::<ReadFlag>::from_request(request(r#"{"read": false}"#), &())
                .await
                .unwrap();
        assert!(!value.unwrap().read);
    }

    #[tokio::test]
    async fn test_optional_json_rejects_malformed_body() {
        let err = OptionalJson::<ReadFlag>::from_request(request("{not json"), &())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err = OptionalJson::<ReadFlag>::from_request(request(r#"{"read": "yes"}"#), &())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
