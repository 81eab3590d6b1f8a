//! # HTTP Handlers
//!
//! Thin axum handlers: extract, call a service, wrap the result.
//!
//! ## Response Envelope
//! ```text
//! success:  { "success": true,  "data": ... }
//! failure:  { "success": false, "code": "...", "message": "..." }
//! ```
//!
//! - [`order`] - `/api/order/*`
//! - [`promotion`] - `/api/promotion/*`
//! - [`health`] - `/api/health`

pub mod health;
pub mod order;
pub mod promotion;

use axum::extract::{FromRequest, FromRequestParts};
use serde::Serialize;

use crate::error::ApiError;

/// JSON body extractor whose rejections use the API error envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Query string extractor whose rejections use the API error envelope.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// Success envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data,
        }
    }
}
