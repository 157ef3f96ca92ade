//! Request extractors whose rejections are [`AppError`]s.
//!
//! The bare axum extractors answer a malformed body, query string or path
//! segment with a `422 text/plain`. These wrappers turn every rejection into
//! [`AppError::Validation`] so clients always get the JSON error body.

use axum::{
    async_trait,
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequest, FromRequestParts, Request,
    },
    http::request::Parts,
    response::{IntoResponse, Response},
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::error::{AppError, FieldError};

/// JSON body extractor that also serializes responses like [`axum::Json`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for Json<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let axum::Json(value) = axum::Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Query<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for Query<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let axum::extract::Query(value) =
            axum::extract::Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Path<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for Path<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let axum::extract::Path(value) =
            axum::extract::Path::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        debug!(error = %rejection, "json body rejected");
        AppError::Validation(vec![FieldError::new("body", rejection.body_text())])
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        debug!(error = %rejection, "query string rejected");
        AppError::Validation(vec![FieldError::new("query", rejection.body_text())])
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        debug!(error = %rejection, "path rejected");
        AppError::Validation(vec![FieldError::new("path", rejection.body_text())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::header::CONTENT_TYPE};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Login {
        #[allow(dead_code)]
        username: String,
    }

    #[tokio::test]
    async fn missing_body_field_is_a_validation_error() {
        let req = axum::http::Request::builder()
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"password":"secret"}"#))
            .unwrap();
        match Json::<Login>::from_request(req, &()).await {
            Err(AppError::Validation(errors)) => {
                assert_eq!(errors[0].field, "body");
                assert!(errors[0].message.contains("username"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn body_without_json_content_type_is_rejected() {
        let req = axum::http::Request::builder()
            .body(Body::from(r#"{"username":"marina"}"#))
            .unwrap();
        assert!(matches!(
            Json::<Login>::from_request(req, &()).await,
            Err(AppError::Validation(_))
        ));
    }
}
