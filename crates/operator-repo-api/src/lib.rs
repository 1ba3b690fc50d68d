use axum::http::{HeaderName, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use operator_repo_storage::StorageError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// JSON body of every error response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct ErrorBody {
    /// Machine readable kind: invalid | not-found | unprocessable | unavailable | exception
    pub code: String,
    /// Human-readable description
    pub message: String,
}

impl ErrorBody {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// High-level API errors to be mapped to HTTP responses
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Unprocessable entity: {0}")]
    UnprocessableEntity(String),
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
    pub fn unprocessable_entity(msg: impl Into<String>) -> Self {
        Self::UnprocessableEntity(msg.into())
    }
    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        Self::ServiceUnavailable(msg.into())
    }
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// The single not-found outcome used for missing and foreign operators alike.
    pub fn operator_not_found() -> Self {
        Self::not_found("Operator not found")
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "invalid",
            ApiError::NotFound(_) => "not-found",
            ApiError::UnprocessableEntity(_) => "unprocessable",
            ApiError::ServiceUnavailable(_) => "unavailable",
            ApiError::Internal(_) => "exception",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::NotFound(msg)
            | ApiError::UnprocessableEntity(msg)
            | ApiError::ServiceUnavailable(msg)
            | ApiError::Internal(msg) => msg,
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody::new(self.code(), self.message())
    }

    /// Replaces the message of server-side failures with a generic one.
    ///
    /// Used outside debug mode so store details are only logged.
    pub fn redacted(self) -> Self {
        match self {
            ApiError::Internal(_) => ApiError::Internal("Internal server error".into()),
            ApiError::ServiceUnavailable(_) => {
                ApiError::ServiceUnavailable("Storage unavailable".into())
            }
            other => other,
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidQuery { message } => ApiError::BadRequest(message),
            StorageError::ConnectionError { .. } => ApiError::ServiceUnavailable(err.to_string()),
            StorageError::Serialization { .. } | StorageError::Internal { .. } => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

fn json_response(
    status: StatusCode,
    body: Vec<u8>,
    extra: Vec<(HeaderName, HeaderValue)>,
) -> Response {
    let mut builder = axum::http::Response::builder().status(status);
    builder = builder.header(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    for (n, v) in extra.into_iter() {
        builder = builder.header(n, v);
    }
    builder
        .body(axum::body::Body::from(body))
        .unwrap_or_else(|_| {
            let mut fallback = Response::new(axum::body::Body::from("{}"));
            *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            fallback
        })
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = serde_json::to_vec(&self.to_body()).unwrap_or_else(|_| b"{}".to_vec());
        json_response(status, body, Vec::new())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub value: Option<T>,
    pub status: StatusCode,
    pub headers: Vec<(HeaderName, HeaderValue)>,
}

impl<T> ApiResponse<T> {
    pub fn new(value: T, status: StatusCode) -> Self {
        Self {
            value: Some(value),
            status,
            headers: Vec::new(),
        }
    }

    pub fn ok(value: T) -> Self {
        Self::new(value, StatusCode::OK)
    }

    pub fn created(value: T) -> Self {
        Self::new(value, StatusCode::CREATED)
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.push((name, value));
        self
    }
}

impl ApiResponse<()> {
    /// 204 with an empty body.
    pub fn no_content() -> Self {
        Self {
            value: None,
            status: StatusCode::NO_CONTENT,
            headers: Vec::new(),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let Some(value) = self.value else {
            let mut res = StatusCode::NO_CONTENT.into_response();
            *res.status_mut() = self.status;
            for (n, v) in self.headers {
                res.headers_mut().insert(n, v);
            }
            return res;
        };
        let body = match serde_json::to_vec(&value) {
            Ok(b) => b,
            Err(_) => {
                let error = ApiError::internal("Serialization failure");
                return error.into_response();
            }
        };
        json_response(self.status, body, self.headers)
    }
}


#[cfg(test)]
mod response_tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn api_response_ok_sets_status_and_content_type() {
        let resp = ApiResponse::ok(json!({"name": "adder"})).into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        let content_type = resp.headers().get(header::CONTENT_TYPE).unwrap();
        assert_eq!(content_type, &HeaderValue::from_static("application/json"));
    }

    #[test]
    fn api_response_created() {
        let resp = ApiResponse::created(json!({})).into_response();
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    #[test]
    fn api_response_can_add_headers() {
        let resp = ApiResponse::ok(json!({}))
            .with_header(header::LOCATION, HeaderValue::from_static("/operator/1"))
            .into_response();
        let location = resp.headers().get(header::LOCATION).unwrap();
        assert_eq!(location, &HeaderValue::from_static("/operator/1"));
    }

    #[test]
    fn no_content_has_no_content_type() {
        let resp = ApiResponse::no_content().into_response();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert!(resp.headers().get(header::CONTENT_TYPE).is_none());
    }
}
