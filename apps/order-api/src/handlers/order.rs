//! `/api/order` handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use bistro_core::{Order, OrderSubmission, PlacedOrder, PricingOutcome};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::handlers::{ApiJson, ApiResponse};
use crate::services::orders;
use crate::AppState;

/// Body of `POST /api/order/price`: an order plus an optional coupon.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRequest {
    #[serde(flatten)]
    pub order: Order,
    #[serde(default)]
    pub coupon_code: Option<String>,
}

/// `POST /api/order`
pub async fn submit_order(
    State(state): State<AppState>,
    ApiJson(submission): ApiJson<OrderSubmission>,
) -> ApiResult<(StatusCode, Json<ApiResponse<PlacedOrder>>)> {
    let placed = orders::submit(&state, submission).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(placed))))
}

/// `POST /api/order/price`
pub async fn price_order(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<PriceRequest>,
) -> ApiResult<Json<ApiResponse<PricingOutcome>>> {
    let outcome = orders::preview(&state, request.order, request.coupon_code.as_deref()).await?;
    Ok(Json(ApiResponse::ok(outcome)))
}

/// `GET /api/order/:id`
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<PlacedOrder>>> {
    let order = orders::get(&state, &id).await?;
    Ok(Json(ApiResponse::ok(order)))
}

/// `POST /api/order/:id/cancel`
pub async fn cancel_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<PlacedOrder>>> {
    let order = orders::cancel(&state, &id).await?;
    Ok(Json(ApiResponse::ok(order)))
}
