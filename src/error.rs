// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Structured API errors.
//!
//! Every failure that reaches a client is rendered through [`ApiError`]:
//!
//! ```json
//! { "success": false, "http_status_code": 403,
//!   "err": { "type": "AUTH_USER_REQUIRED", "dev_description": "...",
//!            "reference_id": null, "extras": { } } }
//! ```
//!
//! Frontends branch on `err.type`, which is the symbolic name of the
//! [`ErrorCode`] and never changes between releases. `dev_description` is
//! for humans only.

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::auth::password::PasswordError;
use crate::auth::token::TokenError;
use crate::storage::StorageError;

/// Error codes returned by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    UnhandledException,
    DbError,
    Genuine404,
    ResourceNotFound,
    AuthHeaderInvalid,
    AuthOnetimeInvalid,
    AuthWebappInvalid,
    AuthDecodeError,
    AuthClientRequired,
    AuthClientNotPermitted,
    AuthWebOnly,
    AuthUserRequired,
    AuthUserNotPermitted,
    DataValidationError,
    EmailAlreadyExists,
    UserNotFound,
    PasswordIncorrect,
}

impl ErrorCode {
    /// Symbolic name sent as `err.type`.
    pub fn name(&self) -> &'static str {
        match self {
            ErrorCode::UnhandledException => "UNHANDLED_EXCEPTION",
            ErrorCode::DbError => "DB_ERROR",
            ErrorCode::Genuine404 => "GENUINE_404",
            ErrorCode::ResourceNotFound => "RESOURCE_NOT_FOUND",
            ErrorCode::AuthHeaderInvalid => "AUTH_HEADER_INVALID",
            ErrorCode::AuthOnetimeInvalid => "AUTH_ONETIME_INVALID",
            ErrorCode::AuthWebappInvalid => "AUTH_WEBAPP_INVALID",
            ErrorCode::AuthDecodeError => "AUTH_DECODE_ERROR",
            ErrorCode::AuthClientRequired => "AUTH_CLIENT_REQUIRED",
            ErrorCode::AuthClientNotPermitted => "AUTH_CLIENT_NOT_PERMITTED",
            ErrorCode::AuthWebOnly => "AUTH_WEB_ONLY",
            ErrorCode::AuthUserRequired => "AUTH_USER_REQUIRED",
            ErrorCode::AuthUserNotPermitted => "AUTH_USER_NOT_PERMITTED",
            ErrorCode::DataValidationError => "DATA_VALIDATION_ERROR",
            ErrorCode::EmailAlreadyExists => "EMAIL_ALREADY_EXISTS",
            ErrorCode::UserNotFound => "USER_NOT_FOUND",
            ErrorCode::PasswordIncorrect => "PASSWORD_INCORRECT",
        }
    }

    /// HTTP status used for both the status line and `http_status_code`.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::UnhandledException | ErrorCode::DbError | ErrorCode::AuthDecodeError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ErrorCode::Genuine404 | ErrorCode::ResourceNotFound | ErrorCode::UserNotFound => {
                StatusCode::NOT_FOUND
            }
            ErrorCode::AuthHeaderInvalid
            | ErrorCode::AuthWebappInvalid
            | ErrorCode::DataValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::AuthOnetimeInvalid
            | ErrorCode::AuthClientRequired
            | ErrorCode::AuthClientNotPermitted
            | ErrorCode::AuthWebOnly
            | ErrorCode::AuthUserRequired
            | ErrorCode::AuthUserNotPermitted => StatusCode::FORBIDDEN,
            ErrorCode::EmailAlreadyExists => StatusCode::CONFLICT,
            // Frontends treat a wrong password as a soft failure.
            ErrorCode::PasswordIncorrect => StatusCode::ACCEPTED,
        }
    }

    /// Default developer-facing description.
    pub fn dev_description(&self) -> &'static str {
        match self {
            ErrorCode::UnhandledException => "An unhandled exception occurred.",
            ErrorCode::DbError => {
                "An error occurred reading or updating the database. The transaction during which the error occurred was rolled back."
            }
            ErrorCode::Genuine404 => {
                "The URL to which this request was made does not correspond to a valid route on this API."
            }
            ErrorCode::ResourceNotFound => {
                "Your request reached a valid URL on the API, but the requested resource was not found or is not permitted for access."
            }
            ErrorCode::AuthHeaderInvalid => {
                "The Authorization header is in an unexpected format. Should be \"Authorization: Bearer <token>\""
            }
            ErrorCode::AuthOnetimeInvalid => "Invalid one-time code for login",
            ErrorCode::AuthWebappInvalid => {
                "The client credentials provided do not match a registered client application."
            }
            ErrorCode::AuthDecodeError => {
                "An error occurred decoding the authorization bearer token, or the decoded token data is malformed."
            }
            ErrorCode::AuthClientRequired => "This endpoint requires an authorized API client",
            ErrorCode::AuthClientNotPermitted => {
                "The authorized API client is not permitted to access this endpoint"
            }
            ErrorCode::AuthWebOnly => "Only the web frontend is permitted to access this endpoint.",
            ErrorCode::AuthUserRequired => {
                "An authenticated user is required to access this endpoint."
            }
            ErrorCode::AuthUserNotPermitted => {
                "The authenticated user does not have permission to access this endpoint"
            }
            ErrorCode::DataValidationError => {
                "An error (or multiple errors) occurred when validating request data."
            }
            ErrorCode::EmailAlreadyExists => "A user with this email address already exists.",
            ErrorCode::UserNotFound => {
                "A user record was not found. This may mean a user has had access revoked."
            }
            ErrorCode::PasswordIncorrect => "The password provided is not correct.",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned by handlers, guards and the request resolver.
#[derive(Debug, thiserror::Error)]
#[error("{code}: {dev_description}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub dev_description: String,
    /// Incident id of a server-side log entry for this failure.
    pub reference_id: Option<String>,
    pub extras: Map<String, Value>,
}

/// Wire shape of an error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Always `false`.
    pub success: bool,
    /// Mirrors the HTTP status line.
    pub http_status_code: u16,
    pub err: ErrorDetail,
}

/// The `err` object of an [`ErrorResponse`].
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorDetail {
    /// Symbolic error code, e.g. `AUTH_HEADER_INVALID`.
    #[serde(rename = "type")]
    pub error_type: String,
    pub dev_description: String,
    pub reference_id: Option<String>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    #[schema(value_type = Object)]
    pub extras: Map<String, Value>,
}

impl ApiError {
    pub fn new(code: ErrorCode) -> Self {
        Self {
            code,
            dev_description: code.dev_description().to_string(),
            reference_id: None,
            extras: Map::new(),
        }
    }

    /// Replace the default description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.dev_description = description.into();
        self
    }

    pub fn with_reference_id(mut self, reference_id: impl Into<String>) -> Self {
        self.reference_id = Some(reference_id.into());
        self
    }

    /// Attach an entry to `err.extras`.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extras.insert(key.into(), value.into());
        self
    }

    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    pub fn not_found(description: impl Into<String>) -> Self {
        Self::new(ErrorCode::ResourceNotFound).with_description(description)
    }

    pub fn validation(description: impl Into<String>) -> Self {
        Self::new(ErrorCode::DataValidationError).with_description(description)
    }

    /// Database failure. The cause is logged under a fresh incident id
    /// which is returned to the client as `reference_id`.
    pub fn db_error(cause: impl std::fmt::Display) -> Self {
        let reference_id = uuid::Uuid::new_v4().to_string();
        tracing::error!(reference_id = %reference_id, error = %cause, "database error");
        Self::new(ErrorCode::DbError).with_reference_id(reference_id)
    }

    /// Unexpected server-side failure, logged like [`ApiError::db_error`].
    pub fn internal(cause: impl std::fmt::Display) -> Self {
        let reference_id = uuid::Uuid::new_v4().to_string();
        tracing::error!(reference_id = %reference_id, error = %cause, "unhandled error");
        Self::new(ErrorCode::UnhandledException).with_reference_id(reference_id)
    }

    pub fn to_body(&self) -> ErrorResponse {
        ErrorResponse {
            success: false,
            http_status_code: self.status_code().as_u16(),
            err: ErrorDetail {
                error_type: self.code.name().to_string(),
                dev_description: self.dev_description.clone(),
                reference_id: self.reference_id.clone(),
                extras: self.extras.clone(),
            },
        }
    }
}

impl From<ErrorCode> for ApiError {
    fn from(code: ErrorCode) -> Self {
        ApiError::new(code)
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(what) => {
                ApiError::new(ErrorCode::ResourceNotFound).with_extra("resource", what)
            }
            StorageError::Conflict(what) => ApiError::validation(format!("conflicting record: {what}")),
            other => ApiError::db_error(other),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Invalid(_) => ApiError::new(ErrorCode::AuthDecodeError),
            other => ApiError::internal(other),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::internal(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.to_body())).into_response()
    }
}

/// `Json` extractor whose rejections use the structured error body.
#[derive(Debug, axum::extract::FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `Path` extractor whose rejections use the structured error body.
#[derive(Debug, axum::extract::FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// Fallback for requests that match no route.
pub async fn route_not_found() -> ApiError {
    ApiError::new(ErrorCode::Genuine404)
}

/// Fallback for a known path requested with a method it does not serve.
pub async fn method_not_allowed(method: Method) -> ApiError {
    ApiError::new(ErrorCode::Genuine404)
        .with_description(format!("This route does not accept {method} requests."))
        .with_extra("method", method.as_str())
}

/// Response for a panic caught by `CatchPanicLayer`.
pub fn panic_response(_panic: Box<dyn std::any::Any + Send + 'static>) -> Response {
    ApiError::internal("handler panicked").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn header_invalid_renders_full_envelope() {
        let response = ApiError::new(ErrorCode::AuthHeaderInvalid).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["http_status_code"], 400);
        assert_eq!(body["err"]["type"], "AUTH_HEADER_INVALID");
        assert_eq!(
            body["err"]["dev_description"],
            ErrorCode::AuthHeaderInvalid.dev_description()
        );
        assert!(body["err"]["reference_id"].is_null());
        assert!(body["err"].get("extras").is_none());
    }

    #[tokio::test]
    async fn body_status_matches_status_line_for_every_code() {
        let codes = [
            ErrorCode::UnhandledException,
            ErrorCode::DbError,
            ErrorCode::Genuine404,
            ErrorCode::AuthDecodeError,
            ErrorCode::AuthClientRequired,
            ErrorCode::AuthWebOnly,
            ErrorCode::EmailAlreadyExists,
            ErrorCode::PasswordIncorrect,
        ];
        for code in codes {
            let response = ApiError::new(code).into_response();
            let status = response.status().as_u16();
            let body = body_json(response).await;
            assert_eq!(body["http_status_code"], status, "{code}");
            assert_eq!(body["err"]["type"], code.name());
        }
    }

    #[tokio::test]
    async fn extras_and_reference_id_are_serialized() {
        let response = ApiError::new(ErrorCode::DataValidationError)
            .with_description("capacity must be positive")
            .with_reference_id("incident-1")
            .with_extra("field", "capacity")
            .into_response();

        let body = body_json(response).await;
        assert_eq!(body["err"]["dev_description"], "capacity must be positive");
        assert_eq!(body["err"]["reference_id"], "incident-1");
        assert_eq!(body["err"]["extras"]["field"], "capacity");
    }

    #[test]
    fn db_error_carries_incident_id() {
        let err = ApiError::db_error("disk on fire");
        assert_eq!(err.code, ErrorCode::DbError);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.reference_id.is_some());
    }

    #[test]
    fn genuine_404_name_keeps_digits() {
        assert_eq!(ErrorCode::Genuine404.to_string(), "GENUINE_404");
    }
}
