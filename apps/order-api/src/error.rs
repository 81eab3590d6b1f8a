//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Order API                          │
//! │                                                                         │
//! │  Handler → Result<T, ApiError>                                          │
//! │                                                                         │
//! │  ValidationError ─────────────────────► 400 VALIDATION_ERROR            │
//! │  CoreError::BillMismatch ─────────────► 400 BILL_MISMATCH               │
//! │  CoreError::PromotionNotApplicable ───► 400 PROMOTION_NOT_APPLICABLE    │
//! │  CoreError::*NotFound / DbError::NotFound ► 404 NOT_FOUND               │
//! │  DbError::UsageLimitReached ──────────► 409 PROMOTION_UNAVAILABLE       │
//! │  DbError::Conflict ───────────────────► 409 CONFLICT                    │
//! │  anything else ───────────────────────► 500, logged, generic message    │
//! │                                                                         │
//! │  Body: { "success": false, "code": "...", "message": "..." }            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bistro_core::{CoreError, ValidationError};
use bistro_db::DbError;
use serde::Serialize;

/// Error returned from every handler.
///
/// ## Serialization
/// ```json
/// {
///   "success": false,
///   "code": "BILL_MISMATCH",
///   "message": "Bill mismatch on total: expected 34200, submitted 30000"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    /// Submitted bills disagree with the server (400)
    BillMismatch,

    /// Claimed promotion does not apply to this order (400)
    PromotionNotApplicable,

    /// Promotion ran out between pricing and commit (409)
    PromotionUnavailable,

    /// State conflict, e.g. cancelling twice (409)
    Conflict,

    /// Database operation failed (500)
    DatabaseError,

    /// Internal server error (500)
    Internal,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::ValidationError
            | ErrorCode::BillMismatch
            | ErrorCode::PromotionNotApplicable => StatusCode::BAD_REQUEST,
            ErrorCode::PromotionUnavailable | ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::DatabaseError | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Result type for handlers and services.
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Serialize)]
struct ErrorBody<'a> {
    success: bool,
    code: ErrorCode,
    message: &'a str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            code: self.code,
            message: &self.message,
        };
        (self.code.status(), Json(body)).into_response()
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::ValidationError,
                format!("{} '{}' already exists", field, value),
            ),
            err @ DbError::UsageLimitReached { .. } => ApiError::new(
                ErrorCode::PromotionUnavailable,
                format!("{}. Refresh pricing and resubmit the order", err),
            ),
            DbError::Conflict(message) => ApiError::new(ErrorCode::Conflict, message),
            DbError::Domain(core) => ApiError::from(core),
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::new(ErrorCode::ValidationError, "Invalid reference")
            }
            DbError::ConnectionFailed(_) | DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) | DbError::Serialization(e) | DbError::Internal(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database operation failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::PromotionNotFound(id) => ApiError::not_found("Promotion", &id),
            CoreError::CouponNotFound(_) => ApiError::new(ErrorCode::NotFound, err.to_string()),
            CoreError::DishNotFound(_)
            | CoreError::DishUnavailable(_)
            | CoreError::StackingNotAllowed { .. } => ApiError::validation(err.to_string()),
            CoreError::BillMismatch { .. } => {
                ApiError::new(ErrorCode::BillMismatch, err.to_string())
            }
            CoreError::PromotionNotApplicable { .. } => {
                ApiError::new(ErrorCode::PromotionNotApplicable, err.to_string())
            }
            CoreError::InvalidPromotion { .. } => {
                tracing::error!("{}", err);
                ApiError::internal("A stored promotion is misconfigured")
            }
            CoreError::Validation(e) => ApiError::from(e),
        }
    }
}

/// Converts validation errors to API errors.
impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}
